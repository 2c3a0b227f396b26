//! Per-user cache of linked account lists with single-flight fills.

// self
use crate::{
	_prelude::*,
	auth::{LinkedAccount, UserId},
};

#[derive(Debug, Default)]
struct CacheState {
	lists: HashMap<UserId, Arc<[LinkedAccount]>>,
	// Bumped on every invalidation so fills that started earlier do not repopulate stale rows.
	generation: u64,
}

/// Caches each user's linked account list until a mutation invalidates it.
///
/// A fill guard lives only while a fill for that user is in flight or queued.
#[derive(Clone, Debug, Default)]
pub struct LinkedAccountCache {
	state: Arc<RwLock<CacheState>>,
	fill_guards: Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>,
}
impl LinkedAccountCache {
	/// Returns the cached list for `user_id`, if present.
	pub fn get(&self, user_id: &UserId) -> Option<Arc<[LinkedAccount]>> {
		self.state.read().lists.get(user_id).cloned()
	}

	/// Returns the cached list or loads it with `load`, letting only one concurrent caller per
	/// user run the loader.
	pub async fn get_or_load<F, Fut>(
		&self,
		user_id: &UserId,
		load: F,
	) -> Result<Arc<[LinkedAccount]>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Vec<LinkedAccount>>>,
	{
		if let Some(hit) = self.get(user_id) {
			return Ok(hit);
		}

		let guard = self.fill_guard(user_id);
		let result = self.fill(user_id, &guard, load).await;

		self.release_fill_guard(user_id, guard);

		result
	}

	/// Drops the cached list for `user_id`.
	pub fn invalidate(&self, user_id: &UserId) {
		let mut state = self.state.write();

		state.lists.remove(user_id);
		state.generation += 1;
	}

	async fn fill<F, Fut>(
		&self,
		user_id: &UserId,
		guard: &AsyncMutex<()>,
		load: F,
	) -> Result<Arc<[LinkedAccount]>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Vec<LinkedAccount>>>,
	{
		let _singleflight = guard.lock().await;

		if let Some(hit) = self.get(user_id) {
			return Ok(hit);
		}

		let generation = self.state.read().generation;
		let rows: Arc<[LinkedAccount]> = load().await?.into();
		let mut state = self.state.write();

		if state.generation == generation {
			state.lists.insert(user_id.clone(), rows.clone());
		}

		Ok(rows)
	}

	fn fill_guard(&self, user_id: &UserId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.fill_guards.lock();

		guards.entry(user_id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	fn release_fill_guard(&self, user_id: &UserId, guard: Arc<AsyncMutex<()>>) {
		let mut guards = self.fill_guards.lock();

		// The map and `guard` hold the only references once no other caller waits on it.
		if guards.get(user_id).is_some_and(|held| Arc::ptr_eq(held, &guard))
			&& Arc::strong_count(&guard) == 2
		{
			guards.remove(user_id);
		}
	}
}
