use std::{
	collections::HashSet,
	sync::{Mutex, MutexGuard},
};

/// Entity types whose mapping has already been pushed by this process.
#[derive(Debug, Default)]
pub struct MappingCache {
	updated: Mutex<HashSet<String>>,
}
impl MappingCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, entity: &str) -> bool {
		self.lock().contains(entity)
	}

	/// Returns `false` when the entity was already recorded.
	pub fn insert(&self, entity: &str) -> bool {
		self.lock().insert(entity.to_string())
	}

	pub fn clear(&self) {
		self.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
		self.updated.lock().unwrap_or_else(|err| err.into_inner())
	}
}
