//! In-memory implementation of KeyValueStore for testing and development

use crate::core::entity::Entity;
use crate::core::error::{Result, StorageError};
use crate::core::store::KeyValueStore;
use crate::query::paging::{PagingPredicate, PagingResult};
use crate::query::predicate::Predicate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory map of entities keyed by id
///
/// Cloning yields another handle on the same map. Uses RwLock for
/// thread-safe access; predicates are evaluated locally on every entry.
pub struct InMemoryMap<T: Entity> {
    name: String,
    entries: Arc<RwLock<HashMap<T::Id, T>>>,
}

impl<T: Entity> Clone for InMemoryMap<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            entries: self.entries.clone(),
        }
    }
}

impl<T: Entity> InMemoryMap<T> {
    /// Create an empty map
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create an empty map named after the entity key space
    pub fn for_entity() -> Self {
        Self::new(T::key_space())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<T::Id, T>>> {
        self.entries.read().map_err(|e| {
            StorageError::LockPoisoned {
                map: self.name.clone(),
                message: format!("Failed to acquire read lock: {}", e),
            }
            .into()
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<T::Id, T>>> {
        self.entries.write().map_err(|e| {
            StorageError::LockPoisoned {
                map: self.name.clone(),
                message: format!("Failed to acquire write lock: {}", e),
            }
            .into()
        })
    }
}

impl<T: Entity> KeyValueStore<T> for InMemoryMap<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &T::Id) -> Result<Option<T>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn put(&self, key: T::Id, value: T) -> Result<Option<T>> {
        Ok(self.write()?.insert(key, value))
    }

    fn remove(&self, key: &T::Id) -> Result<Option<T>> {
        Ok(self.write()?.remove(key))
    }

    fn contains_key(&self, key: &T::Id) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    fn size(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    fn values(&self) -> Result<Vec<T>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn values_matching(&self, predicate: &Predicate) -> Result<Vec<T>> {
        Ok(self
            .read()?
            .values()
            .filter(|value| predicate.apply(*value))
            .cloned()
            .collect())
    }

    fn keys_matching(&self, predicate: &Predicate) -> Result<Vec<T::Id>> {
        Ok(self
            .read()?
            .iter()
            .filter(|(_, value)| predicate.apply(*value))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn count_matching(&self, predicate: &Predicate) -> Result<usize> {
        Ok(self
            .read()?
            .values()
            .filter(|value| predicate.apply(*value))
            .count())
    }

    fn values_page(&self, paging: &PagingPredicate) -> Result<PagingResult<T>> {
        let candidates: Vec<T> = {
            let entries = self.read()?;
            entries
                .values()
                .filter(|value| paging.accepts(*value))
                .cloned()
                .collect()
        };
        Ok(paging.select(candidates))
    }
}
