//! Thread-safe in-memory [`PersistenceAdapter`] for tests, demos, and short-lived processes.

// self
use crate::{
	_prelude::*,
	store::{PersistenceAdapter, SessionRecord, StoreError, StoreFuture, StoreKey},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, SessionRecord>>>;

/// Storage backend that keeps records in-process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_now(map: StoreMap, key: StoreKey) -> Option<SessionRecord> {
		map.read().get(&key).cloned()
	}

	fn set_now(map: StoreMap, key: StoreKey, record: SessionRecord) -> Result<(), StoreError> {
		map.write().insert(key, record);

		Ok(())
	}

	fn erase_now(map: StoreMap, key: StoreKey) -> Result<(), StoreError> {
		map.write().remove(&key);

		Ok(())
	}
}
impl PersistenceAdapter for MemoryStore {
	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<SessionRecord>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}

	fn set<'a>(&'a self, key: &'a StoreKey, record: SessionRecord) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::set_now(map, key, record) })
	}

	fn erase<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::erase_now(map, key) })
	}
}
