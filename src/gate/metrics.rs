// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::error::Error;

/// Thread-safe counters for gate verdicts.
#[derive(Debug, Default)]
pub struct GateMetrics {
	admitted: AtomicU64,
	unauthorized: AtomicU64,
	forbidden: AtomicU64,
	throttled: AtomicU64,
	failed: AtomicU64,
}
impl GateMetrics {
	/// Returns the number of admitted calls.
	pub fn admitted(&self) -> u64 {
		self.admitted.load(Ordering::Relaxed)
	}

	/// Returns the number of calls rejected for a missing or expired session.
	pub fn unauthorized(&self) -> u64 {
		self.unauthorized.load(Ordering::Relaxed)
	}

	/// Returns the number of calls rejected for a blacklisted user.
	pub fn forbidden(&self) -> u64 {
		self.forbidden.load(Ordering::Relaxed)
	}

	/// Returns the number of calls rejected by the rate limiter.
	pub fn throttled(&self) -> u64 {
		self.throttled.load(Ordering::Relaxed)
	}

	/// Returns the number of calls rejected for any other reason (missing identity, dependency
	/// failures).
	pub fn failed(&self) -> u64 {
		self.failed.load(Ordering::Relaxed)
	}

	pub(crate) fn record_admitted(&self) {
		self.admitted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rejection(&self, error: &Error) {
		let counter = match error {
			Error::Unauthorized => &self.unauthorized,
			Error::Forbidden => &self.forbidden,
			Error::TooManyRequests { .. } => &self.throttled,
			_ => &self.failed,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}
}
