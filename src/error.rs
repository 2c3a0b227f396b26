//! Gate-level error types shared across the pipeline, limiter, resolver, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// No session, no session user, or an expired session.
	#[error("Caller is not authenticated.")]
	Unauthorized,
	/// Session user is blacklisted.
	#[error("Caller is not allowed to access this resource.")]
	Forbidden,
	/// Session carries no stable identity to rate limit against.
	#[error("{message}")]
	NotFound {
		/// Caller-facing message.
		message: String,
	},
	/// Rate limiter rejected the call; callers should back off before retrying.
	#[error("Too many requests.")]
	TooManyRequests {
		/// Time until the current window resets, when the limiter reports it.
		retry_after: Option<Duration>,
	},
	/// Business-rule violation raised by an account operation.
	#[error("Invalid operation: {0}")]
	InvalidOperation(#[from] InvalidOperation),

	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Session resolver or rate limiter failed or timed out.
	#[error(transparent)]
	Dependency(#[from] DependencyError),
}
impl Error {
	/// Builds the [`Error::NotFound`] raised when a session has no user identity.
	pub fn missing_identity() -> Self {
		Self::NotFound { message: "No user with the current session found.".into() }
	}

	/// Returns the stable code surfaced to callers.
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::Unauthorized => ErrorCode::Unauthorized,
			Self::Forbidden => ErrorCode::Forbidden,
			Self::NotFound { .. } => ErrorCode::NotFound,
			Self::TooManyRequests { .. } => ErrorCode::TooManyRequests,
			Self::InvalidOperation(_) => ErrorCode::BadRequest,
			Self::Dependency(DependencyError::Timeout { .. }) => ErrorCode::Timeout,
			Self::Storage(_) | Self::Config(_) | Self::Dependency(_) =>
				ErrorCode::InternalServerError,
		}
	}
}

/// Caller-facing error codes; the surrounding transport maps them onto its own status space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Request lacked a usable session.
	Unauthorized,
	/// Session is valid but access is revoked.
	Forbidden,
	/// Requested identity or resource does not exist.
	NotFound,
	/// Rate limit exceeded.
	TooManyRequests,
	/// Business-rule violation.
	BadRequest,
	/// Upstream dependency did not answer in time.
	Timeout,
	/// Any other server-side failure.
	InternalServerError,
}
impl ErrorCode {
	/// Whether the code reports a failing dependency rather than a verdict about the caller.
	pub const fn is_dependency_failure(self) -> bool {
		matches!(self, ErrorCode::Timeout | ErrorCode::InternalServerError)
	}

	/// Returns the wire label (e.g. `TOO_MANY_REQUESTS`).
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorCode::Unauthorized => "UNAUTHORIZED",
			ErrorCode::Forbidden => "FORBIDDEN",
			ErrorCode::NotFound => "NOT_FOUND",
			ErrorCode::TooManyRequests => "TOO_MANY_REQUESTS",
			ErrorCode::BadRequest => "BAD_REQUEST",
			ErrorCode::Timeout => "TIMEOUT",
			ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
		}
	}

	/// Conventional HTTP status for the code.
	pub const fn http_status(self) -> u16 {
		match self {
			ErrorCode::Unauthorized => 401,
			ErrorCode::Forbidden => 403,
			ErrorCode::NotFound => 404,
			ErrorCode::TooManyRequests => 429,
			ErrorCode::BadRequest => 400,
			ErrorCode::Timeout => 408,
			ErrorCode::InternalServerError => 500,
		}
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Business-rule violations raised by account operations.
///
/// Accounts owned by other users are reported as [`InvalidOperation::AccountNotFound`] so
/// callers cannot tell foreign account identifiers from missing ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum InvalidOperation {
	/// The account does not exist for the caller.
	#[error("linked account `{account_id}` was not found.")]
	AccountNotFound {
		/// Requested account identifier.
		account_id: String,
	},
	/// The account backs the caller's active session and cannot be unlinked.
	#[error("the `{provider}` account backs the active session and cannot be unlinked.")]
	ActiveProvider {
		/// Provider of the active session.
		provider: String,
	},
	/// The caller already has an account linked for the provider.
	#[error("a `{provider}` account is already linked.")]
	AlreadyLinked {
		/// Provider that is already linked.
		provider: String,
	},
}

/// External dependencies consulted by the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dependency {
	/// Session resolver backed by the authentication provider.
	SessionResolver,
	/// Rate limiter.
	RateLimiter,
}
impl Dependency {
	/// Returns a stable label suitable for messages and span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Dependency::SessionResolver => "session_resolver",
			Dependency::RateLimiter => "rate_limiter",
		}
	}
}
impl Display for Dependency {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Failures of the resolver or limiter seen from the gate.
#[derive(Debug, ThisError)]
pub enum DependencyError {
	/// Dependency did not answer within its configured timeout.
	#[error("The {dependency} did not respond within {after}.")]
	Timeout {
		/// Dependency that timed out.
		dependency: Dependency,
		/// Configured timeout.
		after: Duration,
	},
	/// Dependency reported a failure.
	#[error("The {dependency} failed.")]
	Unavailable {
		/// Failing dependency.
		dependency: Dependency,
		/// Underlying failure.
		#[source]
		source: BoxError,
	},
}
impl DependencyError {
	/// Wraps a dependency failure.
	pub fn unavailable(
		dependency: Dependency,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Unavailable { dependency, source: Box::new(src) }
	}
}
impl From<crate::resolver::ResolverError> for DependencyError {
	fn from(e: crate::resolver::ResolverError) -> Self {
		Self::unavailable(Dependency::SessionResolver, e)
	}
}
impl From<crate::limiter::LimiterError> for DependencyError {
	fn from(e: crate::limiter::LimiterError) -> Self {
		Self::unavailable(Dependency::RateLimiter, e)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration file could not be read.
	#[error("Configuration file {path} could not be read.")]
	Read {
		/// Path that was attempted.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration is malformed at `{path}`.")]
	Parse {
		/// Path to the offending field.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// A dependency timeout was configured as zero.
	#[error("The {dependency} timeout must be positive.")]
	NonPositiveTimeout {
		/// Dependency the timeout applies to.
		dependency: Dependency,
	},
	/// Rate limit policy is unusable.
	#[error("Rate limit policy is invalid: {reason}.")]
	InvalidPolicy {
		/// Validation failure description.
		reason: &'static str,
	},
	/// Identifier supplied in configuration or a request failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: e.into_inner() }
	}
}
