//! Optional observability helpers for gate checks.
//!
//! Token-based admission first reports a `resolve` check for the session lookup. The three
//! admission checks then run inside a span with the `checks` stage, and an admitted body runs
//! inside a second span with the `procedure` stage. Every evaluated [`CheckKind`] reports exactly
//! one [`CheckOutcome`], in the order of [`CheckKind::ORDER`]. Evaluation stops at the first
//! rejection, so a throttled call reports `authenticated` and `not_blacklisted` as passes before
//! `rate_limited` rejects, and a blacklisted one never reaches `rate_limited`.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to run every gated call inside an `account_gate.gate` span carrying the
//!   `procedure` and `stage` fields. Caller rejections (`UNAUTHORIZED`, `FORBIDDEN`,
//!   `NOT_FOUND`, `TOO_MANY_REQUESTS`) are `info` events; dependency failures are `warn` events.
//! - Enable `metrics` to increment the `account_gate_check_total` counter once per evaluated
//!   check, labeled by `check`, `outcome` and `code` (the wire error code, `none` on a pass).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Checks performed by the gate, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckKind {
	/// Session lookup through the resolver.
	Resolve,
	/// Session and session user are present.
	Authenticated,
	/// Session user is not blacklisted.
	NotBlacklisted,
	/// Identity fits inside the rate limit budget.
	RateLimited,
}
impl CheckKind {
	/// Evaluation order of the checks.
	pub const ORDER: [CheckKind; 4] = [
		CheckKind::Resolve,
		CheckKind::Authenticated,
		CheckKind::NotBlacklisted,
		CheckKind::RateLimited,
	];

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CheckKind::Resolve => "resolve",
			CheckKind::Authenticated => "authenticated",
			CheckKind::NotBlacklisted => "not_blacklisted",
			CheckKind::RateLimited => "rate_limited",
		}
	}
}
impl Display for CheckKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckOutcome {
	/// The check let the call through.
	Pass,
	/// The check rejected the call.
	Reject,
}
impl CheckOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CheckOutcome::Pass => "pass",
			CheckOutcome::Reject => "reject",
		}
	}
}
impl Display for CheckOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn check_labels_follow_evaluation_order() {
		let labels = CheckKind::ORDER.map(CheckKind::as_str);

		assert_eq!(labels, ["resolve", "authenticated", "not_blacklisted", "rate_limited"]);
	}
}
