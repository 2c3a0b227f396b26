//! Session-gated procedures for account management: ordered authentication, blacklist, and
//! rate-limit checks in front of linked-account operations.
//!
//! Every protected call flows through a [`gate::Gate`]: the caller's [`auth::SessionState`] must
//! be authenticated, the session user must not be blacklisted, and the user's identity must fit
//! inside the injected [`limiter::RateLimiter`] budget. Only then does the procedure receive a
//! [`gate::ProtectedContext`] with a non-nullable session.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod accounts;
pub mod auth;
pub mod error;
pub mod gate;
pub mod limiter;
pub mod obs;
pub mod resolver;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for unit and integration tests; enabled via `cfg(test)`
	//! or the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		sync::atomic::{AtomicUsize, Ordering},
		time::Duration as StdDuration,
	};
	// self
	use crate::{
		auth::{ProviderId, Session, SessionState, SessionToken, SessionUser, UserId},
		gate::{Gate, ProtectedContext},
		limiter::{LimitFuture, LimiterError, RateLimitResult, RateLimiter},
		resolver::{ResolverError, ResolverFuture, SessionResolver},
	};

	/// Parses a user identifier fixture.
	pub fn test_user_id(value: &str) -> UserId {
		UserId::new(value).expect("User fixture should be valid.")
	}

	/// Parses a provider fixture.
	pub fn test_provider(value: &str) -> ProviderId {
		ProviderId::new(value).expect("Provider fixture should be valid.")
	}

	/// Builds a session user signed in through `provider`.
	pub fn test_user(id: &str, provider: &str) -> SessionUser {
		SessionUser::new(test_user_id(id), test_provider(provider))
	}

	/// Wraps a user into a session that expires an hour from now.
	pub fn test_session(user: SessionUser) -> Session {
		Session::new(user, OffsetDateTime::now_utc() + Duration::hours(1))
	}

	/// Admits `user` through a gate whose limiter always says yes.
	pub async fn test_context(user: SessionUser) -> ProtectedContext {
		let gate = Gate::new(Arc::new(FailingResolver), Arc::new(CountingLimiter::admitting()));

		gate.admit(SessionState::Authenticated(test_session(user)))
			.await
			.expect("Fixture session should be admitted.")
	}

	/// Limiter that records every call and answers with a fixed verdict.
	#[derive(Debug)]
	pub struct CountingLimiter {
		verdict: bool,
		calls: AtomicUsize,
	}
	impl CountingLimiter {
		/// Limiter that admits every call.
		pub fn admitting() -> Self {
			Self { verdict: true, calls: AtomicUsize::new(0) }
		}

		/// Limiter that denies every call.
		pub fn denying() -> Self {
			Self { verdict: false, calls: AtomicUsize::new(0) }
		}

		/// Number of `limit` invocations observed so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl RateLimiter for CountingLimiter {
		fn limit<'a>(&'a self, _identity: &'a str) -> LimitFuture<'a> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let reset_at = OffsetDateTime::now_utc() + Duration::seconds(10);
			let result = if self.verdict {
				RateLimitResult::admitted(10, 9, reset_at)
			} else {
				RateLimitResult::denied(10, reset_at)
			};

			Box::pin(async move { Ok(result) })
		}
	}

	/// Limiter that never answers within any sane timeout.
	#[derive(Debug)]
	pub struct StalledLimiter;
	impl RateLimiter for StalledLimiter {
		fn limit<'a>(&'a self, _identity: &'a str) -> LimitFuture<'a> {
			Box::pin(async move {
				tokio::time::sleep(StdDuration::from_secs(60)).await;

				Err(LimiterError::Backend { message: "stalled".into() })
			})
		}
	}

	/// Limiter whose backend is down.
	#[derive(Debug)]
	pub struct BrokenLimiter;
	impl RateLimiter for BrokenLimiter {
		fn limit<'a>(&'a self, _identity: &'a str) -> LimitFuture<'a> {
			Box::pin(async move {
				Err(LimiterError::Backend { message: "connection refused".into() })
			})
		}
	}

	/// Resolver whose backend is down.
	#[derive(Debug)]
	pub struct FailingResolver;
	impl SessionResolver for FailingResolver {
		fn resolve<'a>(&'a self, _token: Option<&'a SessionToken>) -> ResolverFuture<'a> {
			Box::pin(async move {
				Err(ResolverError::Backend { message: "provider offline".into() })
			})
		}
	}

	/// Resolver that never answers within any sane timeout.
	#[derive(Debug)]
	pub struct StalledResolver;
	impl SessionResolver for StalledResolver {
		fn resolve<'a>(&'a self, _token: Option<&'a SessionToken>) -> ResolverFuture<'a> {
			Box::pin(async move {
				tokio::time::sleep(StdDuration::from_secs(60)).await;

				Ok(SessionState::Unauthenticated)
			})
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use color_eyre as _;
