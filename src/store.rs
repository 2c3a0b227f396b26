//! Storage contracts and built-in store implementations for linked account records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AccountId, LinkedAccount, ProviderId, UserId},
};

/// Boxed future returned by [`AccountStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by linked account stores.
///
/// Implementations must evaluate the uniqueness check in [`insert`](Self::insert) and the
/// ownership/provider checks in [`remove`](Self::remove) atomically with the mutation.
pub trait AccountStore
where
	Self: Send + Sync,
{
	/// Inserts `account` unless the user already has an account for the same provider.
	fn insert(&self, account: LinkedAccount) -> StoreFuture<'_, InsertOutcome>;

	/// Lists every account owned by `user_id`, ordered by link time then identifier.
	fn list<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Vec<LinkedAccount>>;

	/// Fetches one account by identifier.
	fn fetch<'a>(&'a self, account_id: &'a AccountId) -> StoreFuture<'a, Option<LinkedAccount>>;

	/// Removes the account if `user_id` owns it and its provider does not match
	/// `retained_provider`.
	fn remove<'a>(
		&'a self,
		user_id: &'a UserId,
		account_id: &'a AccountId,
		retained_provider: &'a ProviderId,
	) -> StoreFuture<'a, RemoveOutcome>;
}

/// Result of an [`AccountStore::insert`] attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertOutcome {
	/// The account was stored.
	Inserted,
	/// The user already has an account for the provider; nothing changed.
	Duplicate(LinkedAccount),
}

/// Result of an [`AccountStore::remove`] attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoveOutcome {
	/// The account was removed and is returned.
	Removed(LinkedAccount),
	/// No account with that identifier is owned by the user.
	Missing,
	/// The account's provider must stay linked; nothing changed.
	Protected,
}

/// Error type produced by [`AccountStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Account rows keyed by identifier, shared by the built-in backends.
#[derive(Clone, Debug, Default)]
pub(crate) struct AccountTable(HashMap<AccountId, LinkedAccount>);
impl AccountTable {
	pub(crate) fn from_rows(rows: impl IntoIterator<Item = LinkedAccount>) -> Self {
		Self(rows.into_iter().map(|account| (account.id.clone(), account)).collect())
	}

	pub(crate) fn rows(&self) -> Vec<&LinkedAccount> {
		let mut rows: Vec<_> = self.0.values().collect();

		rows.sort_by(|a, b| a.linked_at.cmp(&b.linked_at).then_with(|| a.id.cmp(&b.id)));

		rows
	}

	pub(crate) fn insert(&mut self, account: LinkedAccount) -> InsertOutcome {
		if let Some(existing) = self.0.values().find(|existing| existing.conflicts_with(&account))
		{
			return InsertOutcome::Duplicate(existing.clone());
		}

		self.0.insert(account.id.clone(), account);

		InsertOutcome::Inserted
	}

	pub(crate) fn list(&self, user_id: &UserId) -> Vec<LinkedAccount> {
		self.rows().into_iter().filter(|account| account.is_owned_by(user_id)).cloned().collect()
	}

	pub(crate) fn fetch(&self, account_id: &AccountId) -> Option<LinkedAccount> {
		self.0.get(account_id).cloned()
	}

	pub(crate) fn remove(
		&mut self,
		user_id: &UserId,
		account_id: &AccountId,
		retained_provider: &ProviderId,
	) -> RemoveOutcome {
		let Some(account) = self.0.get(account_id) else {
			return RemoveOutcome::Missing;
		};

		if !account.is_owned_by(user_id) {
			return RemoveOutcome::Missing;
		}
		if account.provider.matches(retained_provider) {
			return RemoveOutcome::Protected;
		}

		self.0.remove(account_id).map_or(RemoveOutcome::Missing, RemoveOutcome::Removed)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	fn account(id: &str, user: &str, provider: &str) -> LinkedAccount {
		LinkedAccount::new(
			UserId::new(user).expect("User fixture should be valid."),
			ProviderId::new(provider).expect("Provider fixture should be valid."),
			format!("{provider}-{user}"),
		)
		.with_id(AccountId::new(id).expect("Account fixture should be valid."))
	}

	#[test]
	fn store_error_converts_into_gate_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let gate_error: Error = store_error.clone().into();

		assert!(matches!(gate_error, Error::Storage(_)));
		assert!(gate_error.to_string().contains("database unreachable"));

		let source = StdError::source(&gate_error)
			.expect("Gate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn table_rejects_second_account_for_provider_ignoring_case() {
		let mut table = AccountTable::default();
		let first = account("acc-1", "user-1", "discord");

		assert_eq!(table.insert(first.clone()), InsertOutcome::Inserted);
		assert_eq!(
			table.insert(account("acc-2", "user-1", "Discord")),
			InsertOutcome::Duplicate(first)
		);
		assert_eq!(table.insert(account("acc-3", "user-2", "discord")), InsertOutcome::Inserted);
	}

	#[test]
	fn table_remove_checks_owner_then_provider() {
		let user = UserId::new("user-1").expect("User fixture should be valid.");
		let stranger = UserId::new("user-2").expect("User fixture should be valid.");
		let active = ProviderId::new("discord").expect("Provider fixture should be valid.");
		let primary = account("acc-1", "user-1", "discord");
		let secondary = account("acc-2", "user-1", "github");
		let mut table = AccountTable::from_rows([primary.clone(), secondary.clone()]);

		assert_eq!(table.remove(&stranger, &secondary.id, &active), RemoveOutcome::Missing);
		assert_eq!(table.remove(&user, &primary.id, &active), RemoveOutcome::Protected);
		assert_eq!(
			table.remove(&user, &secondary.id, &active),
			RemoveOutcome::Removed(secondary.clone())
		);
		assert_eq!(table.remove(&user, &secondary.id, &active), RemoveOutcome::Missing);
		assert_eq!(table.list(&user), vec![primary]);
	}

	#[test]
	fn remove_outcome_can_be_serialized() {
		let payload = serde_json::to_string(&RemoveOutcome::Protected)
			.expect("RemoveOutcome should serialize to JSON.");

		assert_eq!(payload, "\"Protected\"");
	}
}
