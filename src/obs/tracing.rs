// self
use crate::{
	_prelude::*,
	error::ErrorCode,
	obs::CheckKind,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedGate<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedGate<F> = F;

/// A span builder used by gated calls.
#[derive(Clone, Debug)]
pub struct GateSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl GateSpan {
	/// Creates a new span tagged with the procedure name + stage.
	pub fn new(procedure: &'static str, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("account_gate.gate", procedure, stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (procedure, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedGate<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a rejection event inside the current span (when enabled).
///
/// Dependency failures are logged at `warn`; every other code is a verdict about the caller and
/// stays at `info`.
pub fn log_rejection(check: CheckKind, code: ErrorCode) {
	#[cfg(feature = "tracing")]
	{
		if code.is_dependency_failure() {
			tracing::warn!(check = check.as_str(), code = code.as_str(), "gate failed closed");
		} else {
			tracing::info!(check = check.as_str(), code = code.as_str(), "gate rejected call");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (check, code);
	}
}
