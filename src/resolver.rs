//! Session resolver contract consulted by the gate to turn a caller credential into a
//! [`SessionState`].
//!
//! Resolvers wrap whatever authentication provider backs the deployment. The gate treats them as
//! an opaque async lookup and bounds every call with a timeout.

pub mod memory;

pub use memory::MemorySessionResolver;

// self
use crate::{
	_prelude::*,
	auth::{SessionState, SessionToken},
};

/// Boxed future returned by [`SessionResolver::resolve`].
pub type ResolverFuture<'a> =
	Pin<Box<dyn Future<Output = Result<SessionState, ResolverError>> + 'a + Send>>;

/// Looks up the session attached to an incoming call.
pub trait SessionResolver
where
	Self: Send + Sync,
{
	/// Resolves the caller's session. A missing token must resolve to
	/// [`SessionState::Unauthenticated`].
	fn resolve<'a>(&'a self, token: Option<&'a SessionToken>) -> ResolverFuture<'a>;
}

/// Error type produced by [`SessionResolver`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ResolverError {
	/// The authentication provider could not be reached or answered with garbage.
	#[error("Session backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
