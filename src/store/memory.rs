//! Thread-safe in-memory [`AccountStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, LinkedAccount, ProviderId, UserId},
	store::{AccountStore, AccountTable, InsertOutcome, RemoveOutcome, StoreFuture},
};

type StoreMap = Arc<RwLock<AccountTable>>;

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Seeds a store with existing rows. Rows later in the iterator lose provider conflicts.
	pub fn with_accounts(accounts: impl IntoIterator<Item = LinkedAccount>) -> Self {
		let mut table = AccountTable::default();

		for account in accounts {
			table.insert(account);
		}

		Self(Arc::new(RwLock::new(table)))
	}

	/// Total number of stored accounts across all users.
	pub fn len(&self) -> usize {
		self.0.read().rows().len()
	}

	/// Returns true when no account is stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl AccountStore for MemoryStore {
	fn insert(&self, account: LinkedAccount) -> StoreFuture<'_, InsertOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().insert(account)) })
	}

	fn list<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Vec<LinkedAccount>> {
		let map = self.0.clone();
		let user_id = user_id.to_owned();

		Box::pin(async move { Ok(map.read().list(&user_id)) })
	}

	fn fetch<'a>(&'a self, account_id: &'a AccountId) -> StoreFuture<'a, Option<LinkedAccount>> {
		let map = self.0.clone();
		let account_id = account_id.to_owned();

		Box::pin(async move { Ok(map.read().fetch(&account_id)) })
	}

	fn remove<'a>(
		&'a self,
		user_id: &'a UserId,
		account_id: &'a AccountId,
		retained_provider: &'a ProviderId,
	) -> StoreFuture<'a, RemoveOutcome> {
		let map = self.0.clone();
		let user_id = user_id.to_owned();
		let account_id = account_id.to_owned();
		let retained_provider = retained_provider.to_owned();

		Box::pin(async move { Ok(map.write().remove(&user_id, &account_id, &retained_provider)) })
	}
}
