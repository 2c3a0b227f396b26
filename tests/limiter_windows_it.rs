// std
use std::{sync::Arc, thread};
// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use account_gate::{
	gate::GateConfig,
	limiter::{
		FixedWindowLimiter, RateLimitPolicy, RateLimiter, SlidingWindowLimiter, WindowAlgorithm,
	},
};

const LATE: OffsetDateTime = macros::datetime!(2030-01-01 00:00:09.999 UTC);
const EARLY: OffsetDateTime = macros::datetime!(2030-01-01 00:00:10.001 UTC);
const MID: OffsetDateTime = macros::datetime!(2030-01-01 00:00:10.500 UTC);

fn boundary_policy() -> RateLimitPolicy {
	RateLimitPolicy::new(2, Duration::seconds(10)).expect("Policy should be valid.")
}

/// Feeds calls that straddle the 00:00:10 boundary in alternating order.
fn replay_across_boundary(check: impl Fn(OffsetDateTime) -> bool) -> usize {
	(0..3).flat_map(|_| [EARLY, LATE]).filter(|&now| check(now)).count()
}

/// Saturates the window that starts at 00:00:10, then races late and current callers against it.
fn race_after_saturation(check: impl Fn(OffsetDateTime) -> bool + Sync) -> usize {
	assert!(check(EARLY));
	assert!(check(EARLY));

	let check = &check;

	thread::scope(|scope| {
		let workers = (0..8)
			.map(move |i| {
				scope.spawn(move || {
					let now = if i % 2 == 0 { LATE } else { MID };

					(0..16).filter(|_| check(now)).count()
				})
			})
			.collect::<Vec<_>>();

		workers.into_iter().map(|worker| worker.join().expect("Worker should not panic.")).sum()
	})
}

async fn hammer(limiter: Arc<dyn RateLimiter>, identity: &'static str, calls: usize) -> usize {
	let mut tasks = Vec::with_capacity(calls);

	for _ in 0..calls {
		let limiter = limiter.clone();

		tasks.push(tokio::spawn(async move {
			limiter.limit(identity).await.expect("In-process limiters should not fail.").success
		}));
	}

	let mut admitted = 0;

	for task in tasks {
		if task.await.expect("Limiter task should not panic.") {
			admitted += 1;
		}
	}

	admitted
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_never_overspend_the_budget() {
	let policy = RateLimitPolicy::new(10, Duration::hours(1)).expect("Policy should be valid.");

	for algorithm in [WindowAlgorithm::Sliding, WindowAlgorithm::Fixed] {
		let limiter = algorithm.build(policy);
		let admitted = hammer(limiter.clone(), "user-1", 64).await;

		assert_eq!(admitted, 10, "{algorithm:?} admitted {admitted} calls");

		let other = hammer(limiter, "user-2", 3).await;

		assert_eq!(other, 3, "{algorithm:?} must track identities independently");
	}
}

#[tokio::test]
async fn configured_limiter_reports_remaining_budget() {
	let config = GateConfig::from_json(
		r#"{ "rate_limit": { "algorithm": "fixed", "max_requests": 3, "window_secs": 3600 } }"#,
	)
	.expect("Config should parse.");
	let limiter = config.build_limiter().expect("Limiter should build.");
	let first = limiter.limit("user-1").await.expect("In-process limiters should not fail.");

	assert!(first.success);
	assert_eq!(first.limit, 3);
	assert_eq!(first.remaining, 2);
}

#[test]
fn out_of_order_calls_across_a_boundary_share_one_budget() {
	let fixed = FixedWindowLimiter::new(boundary_policy());
	let sliding = SlidingWindowLimiter::new(boundary_policy());

	assert_eq!(replay_across_boundary(|now| fixed.check_at("user-1", now).success), 2);
	assert_eq!(replay_across_boundary(|now| sliding.check_at("user-1", now).success), 2);
	assert_eq!(fixed.check_at("user-1", MID).remaining, 0);
	assert_eq!(sliding.check_at("user-1", MID).remaining, 0);
}

#[test]
fn late_callers_cannot_reopen_a_saturated_window() {
	let fixed = FixedWindowLimiter::new(boundary_policy());
	let sliding = SlidingWindowLimiter::new(boundary_policy());

	assert_eq!(race_after_saturation(|now| fixed.check_at("user-1", now).success), 0);
	assert_eq!(race_after_saturation(|now| sliding.check_at("user-1", now).success), 0);

	let next = macros::datetime!(2030-01-01 00:00:20.000 UTC);

	assert!(fixed.check_at("user-1", next).success);
	assert_eq!(fixed.tracked(), 1);
}
