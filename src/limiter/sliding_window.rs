//! Sliding-window [`RateLimiter`] approximating a rolling budget with two adjacent counters.
//!
//! The previous window's count is weighted by the fraction of it that still overlaps the
//! rolling window ending now, so bursts straddling a boundary cannot double the budget.

// self
use crate::{
	_prelude::*,
	limiter::{
		BucketTable, LimitFuture, RateLimitPolicy, RateLimitResult, RateLimiter, WindowSlot,
	},
};

#[derive(Clone, Copy, Debug)]
struct SlidingBucket {
	index: i64,
	current: u32,
	previous: u32,
}
impl SlidingBucket {
	fn roll(&mut self, index: i64) {
		match index - self.index {
			// Older windows never rewind a bucket.
			..=0 => {},
			1 => *self = Self { index, current: 0, previous: self.current },
			_ => *self = Self { index, current: 0, previous: 0 },
		}
	}
}

/// Rolling per-identity budget with denied calls left uncounted.
#[derive(Clone, Debug)]
pub struct SlidingWindowLimiter {
	policy: RateLimitPolicy,
	buckets: Arc<Mutex<BucketTable<SlidingBucket>>>,
}
impl SlidingWindowLimiter {
	/// Creates a limiter enforcing `policy`.
	pub fn new(policy: RateLimitPolicy) -> Self {
		Self { policy, buckets: Default::default() }
	}

	/// Policy enforced by this limiter.
	pub fn policy(&self) -> RateLimitPolicy {
		self.policy
	}

	/// Increments and checks the identity's counters as of `now`.
	///
	/// An instant older than the identity's current window is evaluated at the start of that
	/// window, where the previous window still weighs in fully.
	pub fn check_at(&self, identity: &str, now: OffsetDateTime) -> RateLimitResult {
		let window_ms = self.policy.window_millis();
		let now_slot = WindowSlot::locate(now, window_ms);
		let limit = self.policy.max_requests();
		let mut table = self.buckets.lock();

		table.sweep(now_slot.index, |bucket| bucket.index >= now_slot.index - 1);

		let bucket = table
			.buckets
			.entry(identity.to_owned())
			.or_insert(SlidingBucket { index: now_slot.index, current: 0, previous: 0 });
		let slot = now_slot.not_before(bucket.index, window_ms);

		bucket.roll(slot.index);

		let overlap = 1.0 - slot.elapsed_ms as f64 / window_ms as f64;
		let weighted = f64::from(bucket.previous) * overlap + f64::from(bucket.current);

		if weighted + 1.0 > f64::from(limit) {
			return RateLimitResult::denied(limit, slot.reset_at);
		}

		bucket.current += 1;

		let remaining = (f64::from(limit) - weighted - 1.0).floor().max(0.0) as u32;

		RateLimitResult::admitted(limit, remaining, slot.reset_at)
	}

	/// Drops counters that no longer influence the rolling window. Returns the number removed.
	pub fn prune_idle(&self, now: OffsetDateTime) -> usize {
		let slot = WindowSlot::locate(now, self.policy.window_millis());

		self.buckets.lock().retain(|bucket| bucket.index >= slot.index - 1)
	}

	/// Number of identities currently tracked.
	pub fn tracked(&self) -> usize {
		self.buckets.lock().buckets.len()
	}
}
impl RateLimiter for SlidingWindowLimiter {
	fn limit<'a>(&'a self, identity: &'a str) -> LimitFuture<'a> {
		let result = self.check_at(identity, OffsetDateTime::now_utc());

		Box::pin(async move { Ok(result) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn limiter(max: u32) -> SlidingWindowLimiter {
		SlidingWindowLimiter::new(
			RateLimitPolicy::new(max, Duration::seconds(10)).expect("Policy fixture should be valid."),
		)
	}

	#[test]
	fn previous_window_weighs_into_the_budget() {
		let limiter = limiter(4);
		let late = macros::datetime!(2030-01-01 00:00:09 UTC);

		for _ in 0..4 {
			assert!(limiter.check_at("user-1", late).success);
		}

		// 2.5 s into the next window, 75% of the previous window still overlaps: 4 * 0.75 = 3.
		let next = macros::datetime!(2030-01-01 00:00:12.500 UTC);
		let admitted = limiter.check_at("user-1", next);

		assert!(admitted.success);
		assert_eq!(admitted.remaining, 0);
		assert!(!limiter.check_at("user-1", next).success);
	}

	#[test]
	fn budget_recovers_once_previous_window_slides_out() {
		let limiter = limiter(2);
		let start = macros::datetime!(2030-01-01 00:00:01 UTC);

		assert!(limiter.check_at("user-1", start).success);
		assert!(limiter.check_at("user-1", start).success);
		assert!(!limiter.check_at("user-1", start).success);

		let two_windows_later = start + Duration::seconds(20);

		assert!(limiter.check_at("user-1", two_windows_later).success);
		assert!(limiter.check_at("user-1", two_windows_later).success);
	}

	#[test]
	fn denied_calls_do_not_consume_budget() {
		let limiter = limiter(2);
		let start = macros::datetime!(2030-01-01 00:00:01 UTC);

		assert!(limiter.check_at("user-1", start).success);
		assert!(limiter.check_at("user-1", start).success);

		for _ in 0..5 {
			assert!(!limiter.check_at("user-1", start).success);
		}

		// Only the two admitted calls carry over: 2 * 0.5 overlap halfway through the next window.
		let halfway = macros::datetime!(2030-01-01 00:00:15 UTC);

		assert!(limiter.check_at("user-1", halfway).success);
	}

	#[test]
	fn prune_keeps_buckets_that_still_overlap() {
		let limiter = limiter(3);
		let now = macros::datetime!(2030-01-01 00:00:01 UTC);

		limiter.check_at("user-1", now);
		limiter.check_at("user-2", now + Duration::seconds(10));

		assert_eq!(limiter.prune_idle(now + Duration::seconds(10)), 0);
		assert_eq!(limiter.prune_idle(now + Duration::seconds(20)), 1);
		assert_eq!(limiter.tracked(), 1);
	}

	#[test]
	fn first_call_of_a_window_sweeps_identities_that_no_longer_overlap() {
		let limiter = limiter(3);
		let now = macros::datetime!(2030-01-01 00:00:01 UTC);

		for n in 0..100 {
			limiter.check_at(&format!("user-{n}"), now);
		}

		limiter.check_at("user-0", now + Duration::seconds(10));

		assert_eq!(limiter.tracked(), 100, "Previous-window buckets still overlap.");

		limiter.check_at("user-0", now + Duration::hours(1));

		assert_eq!(limiter.tracked(), 1);
	}

	#[test]
	fn late_callers_never_rewind_the_bucket() {
		let limiter = limiter(2);
		let before = macros::datetime!(2030-01-01 00:00:09.999 UTC);
		let after = macros::datetime!(2030-01-01 00:00:10.001 UTC);
		let mut admitted = 0;

		for _ in 0..3 {
			for instant in [after, before] {
				if limiter.check_at("user-1", instant).success {
					admitted += 1;
				}
			}
		}

		assert_eq!(admitted, 2);
		assert!(!limiter.check_at("user-1", after).success);
	}
}
