//! Execution of bound queries against a key-value store

use std::sync::Arc;

use crate::core::entity::Entity;
use crate::core::error::Result;
use crate::core::store::KeyValueStore;
use crate::query::creator::{KeyValueQuery, QueryCriteria};
use crate::query::paging::PagingResult;

/// Runs [`KeyValueQuery`]s on one store
pub struct QueryEngine<T: Entity> {
    store: Arc<dyn KeyValueStore<T>>,
}

impl<T: Entity> Clone for QueryEngine<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T: Entity> QueryEngine<T> {
    pub fn new(store: Arc<dyn KeyValueStore<T>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore<T>> {
        &self.store
    }

    /// Fetch the matching entries.
    ///
    /// A paged query loads exactly one page; `has_next` tells whether the
    /// store holds more matches past it.
    pub fn find(&self, query: &KeyValueQuery) -> Result<PagingResult<T>> {
        match query.criteria() {
            QueryCriteria::Paged(paging) => {
                tracing::debug!(
                    map = self.store.name(),
                    page = paging.page(),
                    page_size = paging.page_size(),
                    sorted = paging.comparator().is_some(),
                    "executing paged query"
                );
                self.store.values_page(paging)
            }
            QueryCriteria::Simple(predicate) => {
                tracing::debug!(map = self.store.name(), "executing filtered query");
                Ok(PagingResult {
                    values: self.store.values_matching(predicate)?,
                    page: 0,
                    has_next: false,
                })
            }
            QueryCriteria::NoCriteria => {
                tracing::debug!(map = self.store.name(), "executing full scan");
                Ok(PagingResult {
                    values: self.store.values()?,
                    page: 0,
                    has_next: false,
                })
            }
        }
    }

    pub fn execute(&self, query: &KeyValueQuery) -> Result<Vec<T>> {
        Ok(self.find(query)?.values)
    }

    /// Number of matching entries, ignoring any row window
    pub fn count(&self, query: &KeyValueQuery) -> Result<usize> {
        match query.predicate() {
            Some(predicate) => self.store.count_matching(predicate),
            None => self.store.size(),
        }
    }

    /// Remove the matching entries one by one, returning them
    pub fn delete(&self, query: &KeyValueQuery) -> Result<Vec<T>> {
        let matches = self.execute(query)?;
        let mut deleted = Vec::with_capacity(matches.len());
        for entity in matches {
            if let Some(removed) = self.store.remove(&entity.id())? {
                deleted.push(removed);
            }
        }
        tracing::debug!(map = self.store.name(), deleted = deleted.len(), "deleted matching entries");
        Ok(deleted)
    }
}
