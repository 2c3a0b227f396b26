//! Linked account procedures served behind the [`Gate`](crate::gate::Gate).
//!
//! Every operation takes a [`ProtectedContext`], so it can only run after the caller passed the
//! authentication, blacklist, and rate limit checks. Ownership and the active-provider rule are
//! enforced here and in the store, not left to the UI.

pub mod cache;

pub use cache::LinkedAccountCache;

// self
use crate::{
	_prelude::*,
	auth::{AccountId, LinkedAccount, ProviderId},
	error::InvalidOperation,
	gate::ProtectedContext,
	store::{AccountStore, InsertOutcome, RemoveOutcome},
};

/// Input for [`AccountService::unlink_account`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkAccountRequest {
	/// Account record to remove.
	pub account_id: AccountId,
}

/// Input for [`AccountService::link_account`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAccountRequest {
	/// Provider that authenticated the new identity.
	pub provider: ProviderId,
	/// Account identifier on the provider side.
	pub provider_account_id: String,
}

/// Account-management procedures backed by an [`AccountStore`].
#[derive(Clone)]
pub struct AccountService {
	store: Arc<dyn AccountStore>,
	cache: LinkedAccountCache,
}
impl AccountService {
	/// Creates a service with an empty list cache.
	pub fn new(store: Arc<dyn AccountStore>) -> Self {
		Self { store, cache: LinkedAccountCache::default() }
	}

	/// Cached linked account lists, keyed by user.
	pub fn cache(&self) -> &LinkedAccountCache {
		&self.cache
	}

	/// Lists the caller's linked accounts, ordered by link time.
	pub async fn list_linked_accounts(
		&self,
		context: &ProtectedContext,
	) -> Result<Arc<[LinkedAccount]>> {
		let user_id = context.user_id();

		self.cache
			.get_or_load(user_id, || async {
				self.store.list(user_id).await.map_err(Error::from)
			})
			.await
	}

	/// Links a new provider identity to the caller.
	///
	/// Fails with [`InvalidOperation::AlreadyLinked`] when the caller already has an account for
	/// the provider.
	pub async fn link_account(
		&self,
		context: &ProtectedContext,
		request: LinkAccountRequest,
	) -> Result<LinkedAccount> {
		let user_id = context.user_id();
		let account =
			LinkedAccount::new(user_id.clone(), request.provider, request.provider_account_id);
		let outcome = self.store.insert(account.clone()).await?;

		match outcome {
			InsertOutcome::Inserted => {
				self.cache.invalidate(user_id);

				Ok(account)
			},
			InsertOutcome::Duplicate(existing) =>
				Err(InvalidOperation::AlreadyLinked { provider: existing.provider.into() }.into()),
		}
	}

	/// Unlinks one of the caller's accounts.
	///
	/// Fails with [`InvalidOperation::AccountNotFound`] when the account is missing or owned by
	/// someone else, and with [`InvalidOperation::ActiveProvider`] when it backs the caller's
	/// active session. The linked account set is unchanged on failure.
	pub async fn unlink_account(
		&self,
		context: &ProtectedContext,
		request: UnlinkAccountRequest,
	) -> Result<()> {
		let user_id = context.user_id();
		let active_provider = context.session.active_provider();
		let outcome = self.store.remove(user_id, &request.account_id, active_provider).await?;

		match outcome {
			RemoveOutcome::Removed(_) => {
				self.cache.invalidate(user_id);

				Ok(())
			},
			RemoveOutcome::Missing => Err(InvalidOperation::AccountNotFound {
				account_id: request.account_id.into(),
			}
			.into()),
			RemoveOutcome::Protected =>
				Err(InvalidOperation::ActiveProvider { provider: active_provider.to_string() }
					.into()),
		}
	}
}
impl Debug for AccountService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccountService").field("cache", &self.cache).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{test_session, test_user},
		auth::{SessionUser, UserId, VerifiedSession},
		limiter::RateLimitResult,
		store::MemoryStore,
	};

	fn context(user: SessionUser) -> ProtectedContext {
		let session = test_session(user);
		let user = session.user.expect("Fixture session carries a user.");
		let now = OffsetDateTime::now_utc();

		ProtectedContext {
			session: VerifiedSession {
				user_id: user.id.clone().expect("Fixture user carries an identity."),
				user,
				expires_at: session.expires_at,
			},
			rate_limit: RateLimitResult::admitted(10, 9, now + Duration::seconds(10)),
			admitted_at: now,
		}
	}

	fn provider(name: &str) -> ProviderId {
		ProviderId::new(name).expect("Provider fixture should be valid.")
	}

	#[tokio::test]
	async fn link_rejects_second_account_for_provider() {
		let service = AccountService::new(Arc::new(MemoryStore::default()));
		let ctx = context(test_user("user-1", "discord"));
		let request =
			LinkAccountRequest { provider: provider("github"), provider_account_id: "gh-1".into() };

		service.link_account(&ctx, request.clone()).await.expect("First link should succeed.");

		let err = service
			.link_account(&ctx, LinkAccountRequest { provider: provider("GitHub"), ..request })
			.await
			.expect_err("Second link for the same provider should fail.");

		match err {
			Error::InvalidOperation(InvalidOperation::AlreadyLinked { provider }) =>
				assert_eq!(provider, "github"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn link_invalidates_the_cached_list() {
		let service = AccountService::new(Arc::new(MemoryStore::default()));
		let ctx = context(test_user("user-1", "discord"));

		let empty = service.list_linked_accounts(&ctx).await.expect("Listing should succeed.");

		assert!(empty.is_empty());

		let linked = service
			.link_account(
				&ctx,
				LinkAccountRequest { provider: provider("twitch"), provider_account_id: "tw-1".into() },
			)
			.await
			.expect("Link should succeed.");
		let listed = service.list_linked_accounts(&ctx).await.expect("Listing should succeed.");

		assert_eq!(listed.to_vec(), vec![linked]);
	}

	#[tokio::test]
	async fn unlinking_a_foreign_account_looks_like_a_missing_one() {
		let foreign = LinkedAccount::new(
			UserId::new("user-2").expect("User fixture should be valid."),
			provider("github"),
			"gh-2",
		);
		let store = Arc::new(MemoryStore::with_accounts([foreign.clone()]));
		let service = AccountService::new(store.clone());
		let ctx = context(test_user("user-1", "discord"));
		let err = service
			.unlink_account(&ctx, UnlinkAccountRequest { account_id: foreign.id.clone() })
			.await
			.expect_err("Foreign accounts must not be unlinked.");

		assert!(matches!(
			err,
			Error::InvalidOperation(InvalidOperation::AccountNotFound { .. })
		));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn unlink_request_uses_camel_case() {
		let request: UnlinkAccountRequest = serde_json::from_str(r#"{ "accountId": "acc-1" }"#)
			.expect("Unlink payload should deserialize.");

		assert_eq!(request.account_id.as_ref(), "acc-1");
	}
}
