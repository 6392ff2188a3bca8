//! Key-value repositories: CRUD plus declared query methods

pub mod factory;

pub use factory::RepositoryFactory;

use crate::core::entity::Entity;
use crate::core::error::{QueryError, Result};
use crate::core::store::KeyValueStore;
use crate::query::creator::KeyValueQuery;
use crate::query::dispatcher::{CompiledQuery, QueryLookupStrategy};
use crate::query::engine::QueryEngine;
use crate::query::method::{Argument, QueryMethod};
use crate::query::result::{Page, PageRequest, QueryResult};
use crate::query::sort::Sort;
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// One declared method and its compiled query, published on first success
struct QuerySlot {
    method: QueryMethod,
    compiled: OnceLock<Arc<CompiledQuery>>,
}

/// Repository over one key-value store
///
/// Query methods are compiled on first use and cached for the lifetime of
/// the repository. The repository is safe to share between threads.
pub struct KeyValueRepository<T: Entity> {
    engine: QueryEngine<T>,
    strategy: QueryLookupStrategy,
    methods: IndexMap<String, QuerySlot>,
}

impl<T: Entity> fmt::Debug for KeyValueRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueRepository")
            .field("store", &self.store().name())
            .field("strategy", &self.strategy)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: Entity> KeyValueRepository<T> {
    pub(crate) fn new(
        store: Arc<dyn KeyValueStore<T>>,
        strategy: QueryLookupStrategy,
        methods: Vec<QueryMethod>,
    ) -> Self {
        let methods = methods
            .into_iter()
            .map(|method| {
                (
                    method.name.clone(),
                    QuerySlot {
                        method,
                        compiled: OnceLock::new(),
                    },
                )
            })
            .collect();
        Self {
            engine: QueryEngine::new(store),
            strategy,
            methods,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn KeyValueStore<T>> {
        self.engine.store()
    }

    /// Names of the declared query methods, in declaration order
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Store an entity under its id, replacing any previous value
    pub fn save(&self, entity: T) -> Result<T> {
        self.store().put(entity.id(), entity.clone())?;
        Ok(entity)
    }

    pub fn save_all(&self, entities: Vec<T>) -> Result<Vec<T>> {
        entities.into_iter().map(|e| self.save(e)).collect()
    }

    pub fn find_by_id(&self, id: &T::Id) -> Result<Option<T>> {
        self.store().get(id)
    }

    pub fn exists_by_id(&self, id: &T::Id) -> Result<bool> {
        self.store().contains_key(id)
    }

    pub fn find_all(&self) -> Result<Vec<T>> {
        self.store().values()
    }

    /// Entities for the given ids; missing ids are skipped
    pub fn find_all_by_ids(&self, ids: &[T::Id]) -> Result<Vec<T>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = self.store().get(id)? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    pub fn find_all_sorted(&self, sort: &Sort) -> Result<Vec<T>> {
        let query = KeyValueQuery::new(None, sort, None, None)?;
        self.engine.execute(&query)
    }

    pub fn find_all_paged(&self, request: &PageRequest) -> Result<Page<T>> {
        let query = KeyValueQuery::new(None, &request.sort, Some(request.offset()), Some(request.size))?;
        let total = self.engine.count(&query)?;
        Ok(Page::new(self.engine.execute(&query)?, request, total))
    }

    pub fn count(&self) -> Result<usize> {
        self.store().size()
    }

    pub fn delete_by_id(&self, id: &T::Id) -> Result<()> {
        self.store().remove(id)?;
        Ok(())
    }

    pub fn delete(&self, entity: &T) -> Result<()> {
        self.delete_by_id(&entity.id())
    }

    pub fn delete_all_by_ids(&self, ids: &[T::Id]) -> Result<()> {
        ids.iter().try_for_each(|id| self.delete_by_id(id))
    }

    pub fn delete_all(&self) -> Result<()> {
        self.store().clear()
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Invoke a declared query method
    pub fn execute(&self, method_name: &str, args: Vec<Argument>) -> Result<QueryResult<T>> {
        self.compiled(method_name)?.execute(&self.engine, args)
    }

    /// The compiled query of a declared method, compiling it on first use.
    ///
    /// Compilation runs outside any lock; when two callers race, both
    /// compile and the first result is kept. Failures are not cached, so a
    /// broken method fails the same way on every call.
    pub fn compiled(&self, method_name: &str) -> Result<Arc<CompiledQuery>> {
        let slot = self.methods.get(method_name).ok_or_else(|| QueryError::UnknownMethod {
            entity: T::entity_name().to_string(),
            method: method_name.to_string(),
        })?;

        if let Some(compiled) = slot.compiled.get() {
            return Ok(compiled.clone());
        }
        let compiled = Arc::new(CompiledQuery::compile::<T>(&slot.method, self.strategy)?);
        Ok(slot.compiled.get_or_init(|| compiled).clone())
    }

    /// Compile every declared method
    pub fn validate_queries(&self) -> Result<()> {
        for name in self.methods.keys() {
            self.compiled(name)?;
        }
        Ok(())
    }
}
