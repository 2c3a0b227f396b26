//! Demonstrates persisting linked accounts with the JSON file store and reading them back after a
//! restart.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use time::{Duration, OffsetDateTime};
// self
use account_gate::{
	accounts::{AccountService, LinkAccountRequest},
	auth::{ProviderId, Session, SessionState, SessionUser, UserId},
	gate::Gate,
	limiter::{FixedWindowLimiter, RateLimitPolicy},
	resolver::MemorySessionResolver,
	store::FileStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let path = env::temp_dir().join("account_gate_demo").join("accounts.json");
	let policy = RateLimitPolicy::new(20, Duration::minutes(1))?;
	let gate = Gate::new(
		Arc::new(MemorySessionResolver::default()),
		Arc::new(FixedWindowLimiter::new(policy)),
	);
	let user = SessionUser::new(UserId::new("user-file")?, ProviderId::new("github")?);
	let state = SessionState::Authenticated(Session::new(
		user,
		OffsetDateTime::now_utc() + Duration::minutes(30),
	));
	let context = gate.admit(state.clone()).await?;

	{
		let accounts = AccountService::new(Arc::new(FileStore::open(&path)?));
		let request = LinkAccountRequest {
			provider: ProviderId::new("twitch")?,
			provider_account_id: "twitch-42".into(),
		};

		match accounts.link_account(&context, request).await {
			Ok(account) => println!("Linked {} as {}.", account.provider, account.id),
			Err(e) => println!("Link skipped: {e}"),
		}
	}

	let reopened = FileStore::open(&path)?;
	let accounts = AccountService::new(Arc::new(reopened.clone()));
	let context = gate.admit(state).await?;

	for account in accounts.list_linked_accounts(&context).await?.iter() {
		println!(
			"{} -> {} (linked {})",
			account.provider, account.provider_account_id, account.linked_at
		);
	}

	println!("Snapshot lives at {}.", reopened.path().display());

	Ok(())
}
