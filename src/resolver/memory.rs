//! Thread-safe in-memory [`SessionResolver`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{Session, SessionState, SessionToken, UserId},
	resolver::{ResolverFuture, SessionResolver},
};

type SessionMap = Arc<RwLock<HashMap<SessionToken, Session>>>;

/// Resolver keeping issued sessions in-process, keyed by token.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionResolver(SessionMap);
impl MemorySessionResolver {
	/// Registers `session` under `token`, replacing any previous session.
	pub fn issue(&self, token: SessionToken, session: Session) {
		self.0.write().insert(token, session);
	}

	/// Signs the token out. Returns the removed session, if any.
	pub fn revoke(&self, token: &SessionToken) -> Option<Session> {
		self.0.write().remove(token)
	}

	/// Flips the blacklist flag on every session owned by `user_id`.
	///
	/// Returns the number of sessions updated.
	pub fn set_blacklisted(&self, user_id: &UserId, blacklisted: bool) -> usize {
		let mut guard = self.0.write();
		let mut updated = 0;

		for user in guard.values_mut().filter_map(|session| session.user.as_mut()) {
			if user.id.as_ref() == Some(user_id) {
				user.blacklisted = blacklisted;
				updated += 1;
			}
		}

		updated
	}

	fn resolve_now(map: SessionMap, token: Option<SessionToken>) -> SessionState {
		let Some(token) = token else {
			return SessionState::Unauthenticated;
		};

		map.read().get(&token).cloned().into()
	}
}
impl SessionResolver for MemorySessionResolver {
	fn resolve<'a>(&'a self, token: Option<&'a SessionToken>) -> ResolverFuture<'a> {
		let map = self.0.clone();
		let token = token.cloned();

		Box::pin(async move { Ok(Self::resolve_now(map, token)) })
	}
}
