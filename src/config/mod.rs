//! Configuration loading and management

use crate::core::error::{ConfigError, Result};
use crate::query::dispatcher::QueryLookupStrategy;
use crate::query::method::QueryMethod;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Repository declaration for one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDefinition {
    /// Entity name (e.g., "person")
    pub entity: String,

    /// Map the entities live in; defaults to the entity's own key space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_space: Option<String>,

    #[serde(default)]
    pub query_lookup_strategy: QueryLookupStrategy,

    /// Compile every query method when the repository is created
    #[serde(default)]
    pub validate_queries_on_startup: bool,

    /// Declared query methods
    #[serde(default)]
    pub methods: Vec<QueryMethod>,
}

impl RepositoryDefinition {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            key_space: None,
            query_lookup_strategy: QueryLookupStrategy::default(),
            validate_queries_on_startup: false,
            methods: Vec::new(),
        }
    }

    pub fn with_key_space(mut self, key_space: impl Into<String>) -> Self {
        self.key_space = Some(key_space.into());
        self
    }

    pub fn with_lookup_strategy(mut self, strategy: QueryLookupStrategy) -> Self {
        self.query_lookup_strategy = strategy;
        self
    }

    pub fn validate_on_startup(mut self) -> Self {
        self.validate_queries_on_startup = true;
        self
    }

    /// Declare a query method
    pub fn method(mut self, method: QueryMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn find_method(&self, name: &str) -> Option<&QueryMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Check names: non-empty entity, unique non-empty method names
    pub fn validate(&self) -> Result<()> {
        if self.entity.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "entity".to_string(),
                message: "entity name must not be empty".to_string(),
            }
            .into());
        }
        let mut seen = std::collections::HashSet::new();
        for method in &self.methods {
            if method.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.methods", self.entity),
                    message: "method name must not be empty".to_string(),
                }
                .into());
            }
            if !seen.insert(method.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.methods", self.entity),
                    message: format!("method '{}' is declared twice", method.name),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Complete configuration for the repositories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoriesConfig {
    #[serde(default)]
    pub repositories: Vec<RepositoryDefinition>,
}

impl RepositoriesConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.repositories.iter().try_for_each(RepositoryDefinition::validate)
    }

    /// Find the repository declared for an entity
    pub fn find_repository(&self, entity: &str) -> Option<&RepositoryDefinition> {
        self.repositories.iter().find(|r| r.entity == entity)
    }

    /// Merge several configurations into one
    ///
    /// Repositories are matched by entity name. For a repeated entity the
    /// later definition's settings win, and methods are merged by name with
    /// later declarations replacing earlier ones.
    pub fn merge(configs: Vec<RepositoriesConfig>) -> Self {
        let mut merged: IndexMap<String, RepositoryDefinition> = IndexMap::new();

        for config in configs {
            for definition in config.repositories {
                match merged.get_mut(&definition.entity) {
                    Some(existing) => {
                        let mut methods: IndexMap<String, QueryMethod> = existing
                            .methods
                            .drain(..)
                            .map(|m| (m.name.clone(), m))
                            .collect();
                        for method in definition.methods {
                            methods.insert(method.name.clone(), method);
                        }
                        existing.methods = methods.into_values().collect();
                        if definition.key_space.is_some() {
                            existing.key_space = definition.key_space;
                        }
                        existing.query_lookup_strategy = definition.query_lookup_strategy;
                        existing.validate_queries_on_startup = definition.validate_queries_on_startup;
                    }
                    None => {
                        merged.insert(definition.entity.clone(), definition);
                    }
                }
            }
        }

        Self {
            repositories: merged.into_values().collect(),
        }
    }
}
