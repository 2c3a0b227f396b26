//! Demonstrates guarding account procedures with the gate, an in-memory session resolver, and the
//! sliding-window limiter built from configuration.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use time::{Duration, OffsetDateTime};
// self
use account_gate::{
	accounts::{AccountService, LinkAccountRequest, UnlinkAccountRequest},
	auth::{ProviderId, Session, SessionToken, SessionUser, UserId},
	gate::{Gate, GateConfig},
	resolver::MemorySessionResolver,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = GateConfig::from_json(
		r#"{ "limiter_timeout_ms": 500, "rate_limit": { "max_requests": 4, "window_secs": 60 } }"#,
	)?;
	let resolver = Arc::new(MemorySessionResolver::default());
	let gate = Gate::new(resolver.clone(), config.build_limiter()?).with_config(config)?;
	let accounts = AccountService::new(Arc::new(MemoryStore::default()));
	let token = SessionToken::new("demo-session");
	let user = SessionUser::new(UserId::new("user-demo")?, ProviderId::new("discord")?)
		.with_name("Demo User");
	let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);

	resolver.issue(token.clone(), Session::new(user, expires_at));

	let context = gate.admit_token(Some(&token)).await?;
	let discord = accounts
		.link_account(
			&context,
			LinkAccountRequest {
				provider: ProviderId::new("discord")?,
				provider_account_id: "discord-1234".into(),
			},
		)
		.await?;
	let github = accounts
		.link_account(
			&context,
			LinkAccountRequest {
				provider: ProviderId::new("github")?,
				provider_account_id: "github-5678".into(),
			},
		)
		.await?;

	println!("Linked {} and {}.", discord.provider, github.provider);

	let context = gate.admit_token(Some(&token)).await?;

	match accounts
		.unlink_account(&context, UnlinkAccountRequest { account_id: discord.id.clone() })
		.await
	{
		Ok(()) => println!("Unexpectedly unlinked the active provider."),
		Err(e) => println!("Refused to unlink the active provider: {e} ({}).", e.code()),
	}

	accounts.unlink_account(&context, UnlinkAccountRequest { account_id: github.id }).await?;

	let context = gate.admit_token(Some(&token)).await?;
	let remaining = accounts.list_linked_accounts(&context).await?;

	println!("{} account(s) remain linked.", remaining.len());

	match gate.admit_token(Some(&token)).await {
		Ok(_) => println!("Budget still available."),
		Err(e) => println!("Gate rejected the call: {e} ({}).", e.code()),
	}
	match gate.admit_token(None).await {
		Ok(_) => println!("Anonymous caller was admitted?"),
		Err(e) => println!("Anonymous caller rejected with {}.", e.code()),
	}

	println!(
		"admitted={} unauthorized={} throttled={}",
		gate.metrics().admitted(),
		gate.metrics().unauthorized(),
		gate.metrics().throttled()
	);

	Ok(())
}
