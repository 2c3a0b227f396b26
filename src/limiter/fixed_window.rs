//! Fixed-window [`RateLimiter`] keeping per-identity counters in-process.

// self
use crate::{
	_prelude::*,
	limiter::{
		BucketTable, LimitFuture, RateLimitPolicy, RateLimitResult, RateLimiter, WindowSlot,
	},
};

#[derive(Clone, Copy, Debug)]
struct FixedBucket {
	index: i64,
	count: u32,
}

/// Counts calls per identity inside windows aligned to the Unix epoch.
///
/// Denied calls do not consume budget. Counters of past windows are swept on the first call of
/// each new window.
#[derive(Clone, Debug)]
pub struct FixedWindowLimiter {
	policy: RateLimitPolicy,
	buckets: Arc<Mutex<BucketTable<FixedBucket>>>,
}
impl FixedWindowLimiter {
	/// Creates a limiter enforcing `policy`.
	pub fn new(policy: RateLimitPolicy) -> Self {
		Self { policy, buckets: Default::default() }
	}

	/// Policy enforced by this limiter.
	pub fn policy(&self) -> RateLimitPolicy {
		self.policy
	}

	/// Increments and checks the identity's counter as of `now`.
	///
	/// An instant older than the identity's current window counts against that window.
	pub fn check_at(&self, identity: &str, now: OffsetDateTime) -> RateLimitResult {
		let window_ms = self.policy.window_millis();
		let now_slot = WindowSlot::locate(now, window_ms);
		let limit = self.policy.max_requests();
		let mut table = self.buckets.lock();

		table.sweep(now_slot.index, |bucket| bucket.index >= now_slot.index);

		let bucket = table
			.buckets
			.entry(identity.to_owned())
			.or_insert(FixedBucket { index: now_slot.index, count: 0 });
		let slot = now_slot.not_before(bucket.index, window_ms);

		if bucket.index < slot.index {
			*bucket = FixedBucket { index: slot.index, count: 0 };
		}
		if bucket.count >= limit {
			return RateLimitResult::denied(limit, slot.reset_at);
		}

		bucket.count += 1;

		RateLimitResult::admitted(limit, limit - bucket.count, slot.reset_at)
	}

	/// Drops counters whose window has passed. Returns the number removed.
	pub fn prune_idle(&self, now: OffsetDateTime) -> usize {
		let slot = WindowSlot::locate(now, self.policy.window_millis());

		self.buckets.lock().retain(|bucket| bucket.index >= slot.index)
	}

	/// Number of identities currently tracked.
	pub fn tracked(&self) -> usize {
		self.buckets.lock().buckets.len()
	}
}
impl RateLimiter for FixedWindowLimiter {
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

	fn limiter(max: u32) -> FixedWindowLimiter {
		FixedWindowLimiter::new(
			RateLimitPolicy::new(max, Duration::seconds(10)).expect("Policy fixture should be valid."),
		)
	}

	#[test]
	fn denies_after_budget_and_resets_next_window() {
		let limiter = limiter(2);
		let start = macros::datetime!(2030-01-01 00:00:01 UTC);

		assert!(limiter.check_at("user-1", start).success);

		let second = limiter.check_at("user-1", start + Duration::seconds(1));

		assert!(second.success);
		assert_eq!(second.remaining, 0);

		let third = limiter.check_at("user-1", start + Duration::seconds(2));

		assert!(!third.success);
		assert_eq!(third.reset_at, macros::datetime!(2030-01-01 00:00:10 UTC));
		assert!(limiter.check_at("user-1", macros::datetime!(2030-01-01 00:00:10 UTC)).success);
	}

	#[test]
	fn identities_have_independent_budgets() {
		let limiter = limiter(1);
		let now = macros::datetime!(2030-01-01 00:00:01 UTC);

		assert!(limiter.check_at("user-1", now).success);
		assert!(!limiter.check_at("user-1", now).success);
		assert!(limiter.check_at("user-2", now).success);
	}

	#[test]
	fn prune_drops_stale_windows() {
		let limiter = limiter(3);
		let now = macros::datetime!(2030-01-01 00:00:01 UTC);

		limiter.check_at("user-1", now);

		assert_eq!(limiter.prune_idle(now + Duration::seconds(5)), 0);
		assert_eq!(limiter.prune_idle(now + Duration::seconds(10)), 1);
		assert_eq!(limiter.tracked(), 0);
	}

	#[test]
	fn first_call_of_a_window_sweeps_idle_identities() {
		let limiter = limiter(3);
		let now = macros::datetime!(2030-01-01 00:00:01 UTC);

		for n in 0..100 {
			limiter.check_at(&format!("user-{n}"), now);
		}

		assert_eq!(limiter.tracked(), 100);

		limiter.check_at("user-0", now + Duration::hours(1));

		assert_eq!(limiter.tracked(), 1);
	}

	#[test]
	fn late_callers_count_against_the_newer_window() {
		let limiter = limiter(2);
		let before = macros::datetime!(2030-01-01 00:00:09.999 UTC);
		let after = macros::datetime!(2030-01-01 00:00:10.001 UTC);
		let mut admitted = 0;

		for _ in 0..3 {
			for instant in [after, before] {
				let result = limiter.check_at("user-1", instant);

				if result.success {
					admitted += 1;

					assert_eq!(result.reset_at, macros::datetime!(2030-01-01 00:00:20 UTC));
				}
			}
		}

		assert_eq!(admitted, 2);
	}
}
