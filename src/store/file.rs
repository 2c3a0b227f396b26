//! Simple file-backed [`AccountStore`] for lightweight deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{AccountId, LinkedAccount, ProviderId, UserId},
	store::{AccountStore, AccountTable, InsertOutcome, RemoveOutcome, StoreError, StoreFuture},
};

/// Persists linked accounts to a JSON file after each mutation.
///
/// Mutations are applied to a staged copy of the table and only become visible once the snapshot
/// has been written, so a failed write leaves memory and disk in agreement.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<AccountTable>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot =
			if path.exists() { Self::load_snapshot(&path)? } else { AccountTable::default() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<AccountTable, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(AccountTable::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let rows: Vec<LinkedAccount> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(AccountTable::from_rows(rows))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &AccountTable) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(&contents.rows()).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl AccountStore for FileStore {
	fn insert(&self, account: LinkedAccount) -> StoreFuture<'_, InsertOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let mut staged = guard.clone();
			let outcome = staged.insert(account);

			if matches!(outcome, InsertOutcome::Inserted) {
				self.persist_locked(&staged)?;

				*guard = staged;
			}

			Ok(outcome)
		})
	}

	fn list<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, Vec<LinkedAccount>> {
		Box::pin(async move { Ok(self.inner.read().list(user_id)) })
	}

	fn fetch<'a>(&'a self, account_id: &'a AccountId) -> StoreFuture<'a, Option<LinkedAccount>> {
		Box::pin(async move { Ok(self.inner.read().fetch(account_id)) })
	}

	fn remove<'a>(
		&'a self,
		user_id: &'a UserId,
		account_id: &'a AccountId,
		retained_provider: &'a ProviderId,
	) -> StoreFuture<'a, RemoveOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let mut staged = guard.clone();
			let outcome = staged.remove(user_id, account_id, retained_provider);

			if matches!(outcome, RemoveOutcome::Removed(_)) {
				self.persist_locked(&staged)?;

				*guard = staged;
			}

			Ok(outcome)
		})
	}
}
