//! Per-identity admission control consulted by the gate before a protected call runs.
//!
//! The gate only reads [`RateLimitResult::success`]; the remaining fields are informational and
//! feed the `retry_after` hint attached to [`Error::TooManyRequests`]. Implementations must make
//! the increment-and-check for one identity atomic so concurrent calls cannot overspend the
//! budget.

pub mod fixed_window;
pub mod sliding_window;

pub use fixed_window::FixedWindowLimiter;
pub use sliding_window::SlidingWindowLimiter;

// self
use crate::{_prelude::*, error::ConfigError};

/// Boxed future returned by [`RateLimiter::limit`].
pub type LimitFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RateLimitResult, LimiterError>> + 'a + Send>>;

/// Decides whether a new call for `identity` is admitted.
pub trait RateLimiter
where
	Self: Send + Sync,
{
	/// Consumes one unit of the identity's budget when available.
	fn limit<'a>(&'a self, identity: &'a str) -> LimitFuture<'a>;
}

/// Verdict returned by a [`RateLimiter`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitResult {
	/// Whether the call is admitted.
	pub success: bool,
	/// Maximum calls per window.
	pub limit: u32,
	/// Calls left in the current window after this one.
	pub remaining: u32,
	/// Instant the current window ends.
	#[serde(with = "time::serde::rfc3339")]
	pub reset_at: OffsetDateTime,
}
impl RateLimitResult {
	/// Builds an admitting verdict.
	pub fn admitted(limit: u32, remaining: u32, reset_at: OffsetDateTime) -> Self {
		Self { success: true, limit, remaining, reset_at }
	}

	/// Builds a denying verdict.
	pub fn denied(limit: u32, reset_at: OffsetDateTime) -> Self {
		Self { success: false, limit, remaining: 0, reset_at }
	}

	/// Time left until the window resets, clamped at zero.
	pub fn retry_after(&self, now: OffsetDateTime) -> Duration {
		let remaining = self.reset_at - now;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}

/// Error type produced by [`RateLimiter`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum LimiterError {
	/// Counter backend failure (e.g. a remote store is unreachable).
	#[error("Rate limit backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Counting algorithm used by the built-in limiters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowAlgorithm {
	/// Windows aligned to multiples of the window length since the Unix epoch.
	Fixed,
	/// Current window plus the previous window weighted by how much of it still overlaps.
	#[default]
	Sliding,
}
impl WindowAlgorithm {
	/// Builds the limiter for this algorithm.
	pub fn build(self, policy: RateLimitPolicy) -> Arc<dyn RateLimiter> {
		match self {
			WindowAlgorithm::Fixed => Arc::new(FixedWindowLimiter::new(policy)),
			WindowAlgorithm::Sliding => Arc::new(SlidingWindowLimiter::new(policy)),
		}
	}
}

/// Budget enforced by the built-in limiters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
	max_requests: u32,
	window: Duration,
}
impl RateLimitPolicy {
	const MAX_WINDOW: Duration = Duration::days(366);
	const MIN_WINDOW: Duration = Duration::milliseconds(1);

	/// Creates a policy admitting `max_requests` calls per `window`.
	pub fn new(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
		if max_requests == 0 {
			return Err(ConfigError::InvalidPolicy { reason: "max_requests must be positive" });
		}
		if window < Self::MIN_WINDOW {
			return Err(ConfigError::InvalidPolicy {
				reason: "window must be at least one millisecond",
			});
		}
		if window > Self::MAX_WINDOW {
			return Err(ConfigError::InvalidPolicy { reason: "window must not exceed 366 days" });
		}

		Ok(Self { max_requests, window })
	}

	/// Maximum calls admitted per window.
	pub fn max_requests(&self) -> u32 {
		self.max_requests
	}

	/// Window length.
	pub fn window(&self) -> Duration {
		self.window
	}

	pub(crate) fn window_millis(&self) -> i64 {
		i64::try_from(self.window.whole_milliseconds()).unwrap_or(i64::MAX)
	}
}
impl Default for RateLimitPolicy {
	fn default() -> Self {
		Self { max_requests: 10, window: Duration::seconds(10) }
	}
}

/// Position of an instant inside the window grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WindowSlot {
	/// Window number since the Unix epoch.
	pub(crate) index: i64,
	/// Milliseconds elapsed inside the window.
	pub(crate) elapsed_ms: i64,
	/// Instant the window ends.
	pub(crate) reset_at: OffsetDateTime,
}
impl WindowSlot {
	pub(crate) fn locate(now: OffsetDateTime, window_ms: i64) -> Self {
		let now_ms = i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX);
		let index = now_ms.div_euclid(window_ms);
		let elapsed_ms = now_ms.rem_euclid(window_ms);
		let reset_at = now + Duration::milliseconds(window_ms - elapsed_ms);

		Self { index, elapsed_ms, reset_at }
	}

	/// Start of window `index`.
	pub(crate) fn start_of(index: i64, window_ms: i64) -> Self {
		let start =
			OffsetDateTime::UNIX_EPOCH + Duration::milliseconds(index.saturating_mul(window_ms));

		Self { index, elapsed_ms: 0, reset_at: start + Duration::milliseconds(window_ms) }
	}

	/// Pins a slot that lags behind window `index` to the start of that window.
	///
	/// A caller that read the clock before a boundary can take the bucket lock after a caller
	/// that read it past the boundary, and wall clocks can step back. Buckets only move forward.
	pub(crate) fn not_before(self, index: i64, window_ms: i64) -> Self {
		if self.index >= index { self } else { Self::start_of(index, window_ms) }
	}
}

/// Per-identity buckets shared by the built-in limiters.
#[derive(Debug)]
pub(crate) struct BucketTable<B> {
	pub(crate) buckets: HashMap<String, B>,
	swept_index: i64,
}
impl<B> BucketTable<B> {
	/// Drops buckets rejected by `keep`, at most once per window index.
	pub(crate) fn sweep(&mut self, index: i64, keep: impl FnMut(&B) -> bool) -> usize {
		if index <= self.swept_index {
			return 0;
		}

		self.swept_index = index;

		self.retain(keep)
	}

	pub(crate) fn retain(&mut self, mut keep: impl FnMut(&B) -> bool) -> usize {
		let before = self.buckets.len();

		self.buckets.retain(|_, bucket| keep(bucket));

		before - self.buckets.len()
	}
}
impl<B> Default for BucketTable<B> {
	fn default() -> Self {
		Self { buckets: HashMap::new(), swept_index: i64::MIN }
	}
}
