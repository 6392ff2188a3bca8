//! RepositoryFactory for building repositories from configuration

use super::KeyValueRepository;
use crate::config::{RepositoriesConfig, RepositoryDefinition};
use crate::core::entity::{Entity, require_id_property};
use crate::core::error::{ConfigError, Result};
use crate::core::store::KeyValueStore;
use std::sync::Arc;

/// Builds [`KeyValueRepository`]s from repository definitions
///
/// The store each repository runs against is passed in explicitly.
///
/// # Example
///
/// ```ignore
/// let factory = RepositoryFactory::new()
///     .with_config(RepositoriesConfig::from_yaml_file("repositories.yaml")?);
///
/// let people = factory.create::<Person>(Arc::new(InMemoryMap::new("people")))?;
/// let result = people.execute("findByLastname", vec![Argument::value("Matthews")])?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RepositoryFactory {
    configs: Vec<RepositoriesConfig>,
}

impl RepositoryFactory {
    /// Create a factory without any repository definitions
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration; later configurations override earlier ones
    pub fn with_config(mut self, config: RepositoriesConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// The merged configuration of this factory
    pub fn config(&self) -> RepositoriesConfig {
        RepositoriesConfig::merge(self.configs.clone())
    }

    /// Create the repository configured for `T`
    pub fn create<T: Entity>(&self, store: Arc<dyn KeyValueStore<T>>) -> Result<KeyValueRepository<T>> {
        let config = self.config();
        let definition = config.find_repository(T::entity_name()).ok_or_else(|| {
            ConfigError::MissingRepository {
                entity: T::entity_name().to_string(),
            }
        })?;
        Self::create_from_definition(definition, store)
    }

    /// Create a repository for `T` from an explicit definition
    ///
    /// Fails when `T` declares no identity property, when the definition
    /// names another entity, or when the store is not the definition's map.
    /// With `validate_queries_on_startup` set, every declared method is
    /// compiled here so invalid definitions surface immediately.
    pub fn create_from_definition<T: Entity>(
        definition: &RepositoryDefinition,
        store: Arc<dyn KeyValueStore<T>>,
    ) -> Result<KeyValueRepository<T>> {
        require_id_property::<T>()?;
        definition.validate()?;

        if definition.entity != T::entity_name() {
            return Err(ConfigError::InvalidValue {
                field: "entity".to_string(),
                message: format!(
                    "definition for '{}' cannot back a repository of '{}'",
                    definition.entity,
                    T::entity_name()
                ),
            }
            .into());
        }

        let key_space = definition.key_space.as_deref().unwrap_or(T::key_space());
        if store.name() != key_space {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.key_space", definition.entity),
                message: format!("expected map '{}', got '{}'", key_space, store.name()),
            }
            .into());
        }

        let repository = KeyValueRepository::new(
            store,
            definition.query_lookup_strategy,
            definition.methods.clone(),
        );
        if definition.validate_queries_on_startup {
            repository.validate_queries()?;
        }

        tracing::debug!(
            entity = T::entity_name(),
            key_space,
            methods = definition.methods.len(),
            "created repository"
        );
        Ok(repository)
    }

    /// Create a CRUD-only repository for `T` on its default key space
    pub fn create_default<T: Entity>(store: Arc<dyn KeyValueStore<T>>) -> Result<KeyValueRepository<T>> {
        Self::create_from_definition(&RepositoryDefinition::new(T::entity_name()), store)
    }
}
