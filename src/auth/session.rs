//! Session models handed to the gate by the authentication subsystem.
//!
//! The gate never mutates sessions. It narrows them instead: a [`SessionState`] becomes an
//! [`AuthenticatedSession`] once a user is known to be present, and a [`VerifiedSession`] once
//! that user also carries a stable identity.

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, UserId},
};

/// Profile attached to a session by the authentication subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
	/// Stable user identity. Absent only for malformed sessions.
	pub id: Option<UserId>,
	/// Identity provider used to create the session.
	pub provider: ProviderId,
	/// Access revoked by an administrator.
	#[serde(default)]
	pub blacklisted: bool,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
	/// Contact email.
	#[serde(default)]
	pub email: Option<String>,
	/// Avatar URL.
	#[serde(default)]
	pub image: Option<Url>,
}
impl SessionUser {
	/// Creates a non-blacklisted user without profile details.
	pub fn new(id: UserId, provider: ProviderId) -> Self {
		Self { id: Some(id), provider, blacklisted: false, name: None, email: None, image: None }
	}

	/// Overrides the blacklist flag.
	pub fn with_blacklisted(mut self, blacklisted: bool) -> Self {
		self.blacklisted = blacklisted;

		self
	}

	/// Sets the display name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	/// Sets the contact email.
	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());

		self
	}

	/// Sets the avatar URL.
	pub fn with_image(mut self, image: Url) -> Self {
		self.image = Some(image);

		self
	}

	/// Drops the identity, producing the malformed shape some providers emit.
	pub fn without_id(mut self) -> Self {
		self.id = None;

		self
	}
}

/// Server-side session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Signed-in user, if the provider attached one.
	pub user: Option<SessionUser>,
	/// Instant after which the session must be treated as absent.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl Session {
	/// Creates a session for `user` that expires at `expires_at`.
	pub fn new(user: SessionUser, expires_at: OffsetDateTime) -> Self {
		Self { user: Some(user), expires_at }
	}

	/// Creates a session without a user attached.
	pub fn anonymous(expires_at: OffsetDateTime) -> Self {
		Self { user: None, expires_at }
	}

	/// Returns true when the session is expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

/// Resolution status reported by the authentication provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
	/// Lookup still in flight.
	Loading,
	/// Provider confirmed a session.
	Authenticated,
	/// Provider confirmed there is no session.
	Unauthenticated,
}

/// Caller session as seen by the gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
	/// The session lookup has not completed yet.
	Unresolved,
	/// A session is attached.
	Authenticated(Session),
	/// The caller has no session.
	Unauthenticated,
}
impl SessionState {
	/// Folds a provider status plus optional session payload into a single state.
	///
	/// An `Authenticated` status without a payload is treated as `Unauthenticated`.
	pub fn from_status(status: SessionStatus, session: Option<Session>) -> Self {
		match (status, session) {
			(SessionStatus::Loading, _) => Self::Unresolved,
			(SessionStatus::Authenticated, Some(session)) => Self::Authenticated(session),
			(SessionStatus::Authenticated, None) | (SessionStatus::Unauthenticated, _) =>
				Self::Unauthenticated,
		}
	}

	/// Returns the attached session, if any.
	pub fn session(&self) -> Option<&Session> {
		match self {
			Self::Authenticated(session) => Some(session),
			_ => None,
		}
	}

	/// Returns true when the lookup is still pending.
	pub fn is_unresolved(&self) -> bool {
		matches!(self, Self::Unresolved)
	}
}
impl From<Option<Session>> for SessionState {
	fn from(value: Option<Session>) -> Self {
		match value {
			Some(session) => Self::Authenticated(session),
			None => Self::Unauthenticated,
		}
	}
}

/// Session with a guaranteed user, produced by the authentication check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedSession {
	/// Signed-in user.
	pub user: SessionUser,
	/// Session expiry instant.
	pub expires_at: OffsetDateTime,
}

/// Session with a guaranteed user and identity, handed to protected procedures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedSession {
	/// Stable identity used for rate limiting and data ownership.
	pub user_id: UserId,
	/// Signed-in user.
	pub user: SessionUser,
	/// Session expiry instant.
	pub expires_at: OffsetDateTime,
}
impl VerifiedSession {
	/// Provider that created the active session.
	pub fn active_provider(&self) -> &ProviderId {
		&self.user.provider
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn user() -> SessionUser {
		SessionUser::new(
			UserId::new("user-1").expect("User fixture should be valid."),
			ProviderId::new("discord").expect("Provider fixture should be valid."),
		)
	}

	#[test]
	fn status_folding_collapses_missing_payloads() {
		let session = Session::new(user(), macros::datetime!(2030-01-01 00:00 UTC));

		assert_eq!(
			SessionState::from_status(SessionStatus::Loading, Some(session.clone())),
			SessionState::Unresolved
		);
		assert_eq!(
			SessionState::from_status(SessionStatus::Authenticated, Some(session.clone())),
			SessionState::Authenticated(session.clone())
		);
		assert_eq!(
			SessionState::from_status(SessionStatus::Authenticated, None),
			SessionState::Unauthenticated
		);
		assert_eq!(
			SessionState::from_status(SessionStatus::Unauthenticated, Some(session)),
			SessionState::Unauthenticated
		);
	}

	#[test]
	fn expiry_is_inclusive() {
		let expires = macros::datetime!(2030-01-01 00:00 UTC);
		let session = Session::new(user(), expires);

		assert!(!session.is_expired_at(expires - Duration::seconds(1)));
		assert!(session.is_expired_at(expires));
	}

	#[test]
	fn session_payload_deserializes_with_defaults() {
		let payload = r#"{
			"user": { "id": "user-9", "provider": "github", "image": "https://cdn.example.com/a.png" },
			"expires_at": "2030-01-01T00:00:00Z"
		}"#;
		let session: Session =
			serde_json::from_str(payload).expect("Session payload should deserialize.");
		let user = session.user.expect("Payload carries a user.");

		assert!(!user.blacklisted);
		assert_eq!(user.id.as_deref(), Some("user-9"));
		assert_eq!(
			user.image.as_ref().map(Url::as_str),
			Some("https://cdn.example.com/a.png")
		);
	}
}
