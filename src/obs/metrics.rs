// self
use crate::{
	error::ErrorCode,
	obs::{CheckKind, CheckOutcome},
};

/// Label used for the `code` dimension when a check passes.
pub const NO_CODE: &str = "none";

/// Records one evaluated check via the global metrics recorder (when enabled).
///
/// `code` is the error the check rejected with; passes carry `None`. The outcome label is derived
/// from it, so a pass can never be recorded with an error code attached.
pub fn record_check_outcome(kind: CheckKind, code: Option<ErrorCode>) {
	let outcome = match code {
		Some(_) => CheckOutcome::Reject,
		None => CheckOutcome::Pass,
	};

	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"account_gate_check_total",
			"check" => kind.as_str(),
			"outcome" => outcome.as_str(),
			"code" => code.map_or(NO_CODE, ErrorCode::as_str)
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_check_outcome_noop_without_metrics() {
		record_check_outcome(CheckKind::Resolve, None);
		record_check_outcome(CheckKind::RateLimited, Some(ErrorCode::TooManyRequests));
	}
}
