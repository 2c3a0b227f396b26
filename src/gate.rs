//! Authorization pipeline guarding protected procedures.
//!
//! A [`Gate`] runs three checks in a fixed order and stops at the first failure:
//!
//! 1. [`authenticate`] turns a [`SessionState`] into an [`AuthenticatedSession`] or fails with
//!    [`Error::Unauthorized`].
//! 2. [`reject_blacklisted`] fails with [`Error::Forbidden`] for blacklisted users.
//! 3. The rate limit check fails with [`Error::NotFound`] when the user carries no identity and
//!    with [`Error::TooManyRequests`] when the injected [`RateLimiter`] denies the call.
//!
//! Blacklist and rate limit checks never run for unauthenticated callers, so anonymous traffic
//! cannot spend limiter budget. Resolver and limiter calls are the only suspension points and
//! both are bounded by the timeouts in [`GateConfig`]. Gate futures hold no locks across
//! `.await`, so dropping one mid-flight (e.g. on client disconnect) needs no cleanup.

pub mod config;

mod metrics;

pub use config::*;
pub use metrics::GateMetrics;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{AuthenticatedSession, SessionState, SessionToken, UserId, VerifiedSession},
	error::{ConfigError, Dependency, DependencyError},
	limiter::{RateLimitResult, RateLimiter},
	obs::{self, CheckKind, GateSpan},
	resolver::SessionResolver,
};

/// Context handed to a procedure once every check has passed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtectedContext {
	/// Caller session with a guaranteed user and identity.
	pub session: VerifiedSession,
	/// Verdict returned by the rate limiter for this call.
	pub rate_limit: RateLimitResult,
	/// Instant the checks started.
	pub admitted_at: OffsetDateTime,
}
impl ProtectedContext {
	/// Identity of the caller.
	pub fn user_id(&self) -> &UserId {
		&self.session.user_id
	}
}

/// Ordered authentication, blacklist, and rate limit checks in front of protected procedures.
///
/// The resolver and limiter are injected once at startup; clones share them along with the
/// verdict counters.
#[derive(Clone)]
pub struct Gate {
	resolver: Arc<dyn SessionResolver>,
	limiter: Arc<dyn RateLimiter>,
	config: GateConfig,
	metrics: Arc<GateMetrics>,
}
impl Gate {
	/// Creates a gate with the default [`GateConfig`].
	pub fn new(resolver: Arc<dyn SessionResolver>, limiter: Arc<dyn RateLimiter>) -> Self {
		Self { resolver, limiter, config: GateConfig::default(), metrics: Default::default() }
	}

	/// Replaces the configuration (timeouts only; the limiter is already built).
	///
	/// The configuration is validated first, so zero timeouts set through the public fields are
	/// rejected here.
	pub fn with_config(mut self, config: GateConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		self.config = config;

		Ok(self)
	}

	/// Active configuration.
	pub fn config(&self) -> &GateConfig {
		&self.config
	}

	/// Verdict counters shared by every clone of this gate.
	pub fn metrics(&self) -> &GateMetrics {
		&self.metrics
	}

	/// Resolves the caller's session through the injected resolver, bounded by the resolver
	/// timeout.
	pub async fn resolve(&self, token: Option<&SessionToken>) -> Result<SessionState> {
		let timeout = StdDuration::from_millis(self.config.resolver_timeout_ms);
		let result: Result<SessionState> =
			match tokio::time::timeout(timeout, self.resolver.resolve(token)).await {
				Ok(resolved) => resolved.map_err(|e| DependencyError::from(e).into()),
				Err(_) => Err(DependencyError::Timeout {
					dependency: Dependency::SessionResolver,
					after: self.config.resolver_timeout(),
				}
				.into()),
			};

		observe(CheckKind::Resolve, result)
	}

	/// Runs every check against `state`.
	pub async fn admit(&self, state: SessionState) -> Result<ProtectedContext> {
		self.admit_as("admit", state).await
	}

	/// Resolves `token` and runs every check against the resulting session.
	pub async fn admit_token(&self, token: Option<&SessionToken>) -> Result<ProtectedContext> {
		let state = match self.resolve(token).await {
			Ok(state) => state,
			Err(e) => {
				self.metrics.record_rejection(&e);

				return Err(e);
			},
		};

		self.admit_as("admit_token", state).await
	}

	/// Admits the call and then runs `body` with the resulting [`ProtectedContext`].
	///
	/// `body` is never invoked when a check fails.
	pub async fn run<T, F, Fut>(
		&self,
		procedure: &'static str,
		state: SessionState,
		body: F,
	) -> Result<T>
	where
		F: FnOnce(ProtectedContext) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let context = self.admit_as(procedure, state).await?;

		GateSpan::new(procedure, "procedure").instrument(body(context)).await
	}

	async fn admit_as(
		&self,
		procedure: &'static str,
		state: SessionState,
	) -> Result<ProtectedContext> {
		let span = GateSpan::new(procedure, "checks");
		let result = span.instrument(self.check(state)).await;

		match &result {
			Ok(_) => self.metrics.record_admitted(),
			Err(e) => self.metrics.record_rejection(e),
		}

		result
	}

	async fn check(&self, state: SessionState) -> Result<ProtectedContext> {
		let now = OffsetDateTime::now_utc();
		let session = observe(CheckKind::Authenticated, authenticate(state, now))?;
		let session = observe(CheckKind::NotBlacklisted, reject_blacklisted(session))?;
		let (session, rate_limit) =
			observe(CheckKind::RateLimited, self.enforce_rate_limit(session, now).await)?;

		Ok(ProtectedContext { session, rate_limit, admitted_at: now })
	}

	async fn enforce_rate_limit(
		&self,
		session: AuthenticatedSession,
		now: OffsetDateTime,
	) -> Result<(VerifiedSession, RateLimitResult)> {
		let AuthenticatedSession { user, expires_at } = session;
		let Some(user_id) = user.id.clone() else {
			return Err(Error::missing_identity());
		};
		let timeout = StdDuration::from_millis(self.config.limiter_timeout_ms);
		let verdict = tokio::time::timeout(timeout, self.limiter.limit(&user_id))
			.await
			.map_err(|_| DependencyError::Timeout {
				dependency: Dependency::RateLimiter,
				after: self.config.limiter_timeout(),
			})?
			.map_err(DependencyError::from)?;

		if !verdict.success {
			return Err(Error::TooManyRequests { retry_after: Some(verdict.retry_after(now)) });
		}

		Ok((VerifiedSession { user_id, user, expires_at }, verdict))
	}
}
impl Debug for Gate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gate")
			.field("config", &self.config)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

/// Requires an attached, unexpired session with a user.
pub fn authenticate(state: SessionState, now: OffsetDateTime) -> Result<AuthenticatedSession> {
	let SessionState::Authenticated(session) = state else {
		return Err(Error::Unauthorized);
	};

	if session.is_expired_at(now) {
		return Err(Error::Unauthorized);
	}

	let expires_at = session.expires_at;
	let user = session.user.ok_or(Error::Unauthorized)?;

	Ok(AuthenticatedSession { user, expires_at })
}

/// Rejects blacklisted users.
pub fn reject_blacklisted(session: AuthenticatedSession) -> Result<AuthenticatedSession> {
	if session.user.blacklisted {
		return Err(Error::Forbidden);
	}

	Ok(session)
}

fn observe<T>(check: CheckKind, result: Result<T>) -> Result<T> {
	match &result {
		Ok(_) => obs::record_check_outcome(check, None),
		Err(e) => {
			let code = e.code();

			obs::record_check_outcome(check, Some(code));
			obs::log_rejection(check, code);
		},
	}

	result
}
