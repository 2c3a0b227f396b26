//! Linked account records binding a user to one external identity provider.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, ProviderId, UserId},
};

/// One external identity bound to a user.
///
/// A user holds at most one account per provider, compared with [`ProviderId::matches`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
	/// Record identifier.
	pub id: AccountId,
	/// Owning user.
	pub user_id: UserId,
	/// Identity provider.
	pub provider: ProviderId,
	/// Account identifier on the provider side.
	pub provider_account_id: String,
	/// Instant the link was created.
	#[serde(with = "time::serde::rfc3339")]
	pub linked_at: OffsetDateTime,
}
impl LinkedAccount {
	/// Creates a record with a generated identifier linked now.
	pub fn new(
		user_id: UserId,
		provider: ProviderId,
		provider_account_id: impl Into<String>,
	) -> Self {
		Self {
			id: AccountId::generate(),
			user_id,
			provider,
			provider_account_id: provider_account_id.into(),
			linked_at: OffsetDateTime::now_utc(),
		}
	}

	/// Overrides the record identifier.
	pub fn with_id(mut self, id: AccountId) -> Self {
		self.id = id;

		self
	}

	/// Overrides the link timestamp.
	pub fn with_linked_at(mut self, instant: OffsetDateTime) -> Self {
		self.linked_at = instant;

		self
	}

	/// Returns true when the record belongs to `user_id`.
	pub fn is_owned_by(&self, user_id: &UserId) -> bool {
		&self.user_id == user_id
	}

	/// Returns true when the record shares `user_id` and a matching provider with `other`.
	pub fn conflicts_with(&self, other: &LinkedAccount) -> bool {
		self.user_id == other.user_id && self.provider.matches(&other.provider)
	}
}
