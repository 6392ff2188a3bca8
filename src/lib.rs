//! # hazel-data
//!
//! Derived-query repositories over key-value maps.
//!
//! ## Features
//!
//! - **Derived Queries**: `findByFirstnameAndAgeGreaterThan` is parsed once and
//!   compiled into native predicates
//! - **Declared Queries**: SQL-predicate strings with `%s` placeholders
//! - **Sorting & Paging**: `OrderBy`, dynamic sorts, pages and slices, run
//!   through the store's paging predicate
//! - **Configuration-Based**: Declare repositories and their methods in YAML
//! - **Pluggable Stores**: Anything implementing [`KeyValueStore`](core::KeyValueStore);
//!   an in-memory map ships with the crate
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hazel_data::prelude::*;
//!
//! impl_entity!(
//!     Person,
//!     "person",
//!     key_space: "people",
//!     id: u64,
//!     {
//!         firstname: String,
//!         lastname: String,
//!         age: i64,
//!     }
//! );
//!
//! let definition = RepositoryDefinition::new("person")
//!     .method(QueryMethod::new("findByLastnameOrderByAgeDesc").param("lastname"))
//!     .method(
//!         QueryMethod::new("countByAgeGreaterThan")
//!             .param("age")
//!             .returns(ReturnType::Count),
//!     );
//!
//! let people = RepositoryFactory::create_from_definition::<Person>(
//!     &definition,
//!     Arc::new(InMemoryMap::new("people")),
//! )?;
//!
//! people.save(Person::new(1, "Dave".into(), "Matthews".into(), 47))?;
//!
//! let matthews = people
//!     .execute("findByLastnameOrderByAgeDesc", vec![Argument::value("Matthews")])?
//!     .into_list()?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod query;
pub mod repository;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        entity::Entity,
        error::{ConfigError, EntityError, QueryError, RepositoryError, Result, StorageError},
        field::FieldValue,
        store::KeyValueStore,
    };

    // === Macros ===
    pub use crate::impl_entity;

    // === Queries ===
    pub use crate::query::{
        Argument, Direction, Order, Page, PageRequest, PagingPredicate, Predicate, Predicates,
        QueryLookupStrategy, QueryMethod, QueryResult, ResultStream, ReturnType, Slice, Sort,
    };

    // === Repositories ===
    pub use crate::repository::{KeyValueRepository, RepositoryFactory};

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryMap;

    // === Config ===
    pub use crate::config::{RepositoriesConfig, RepositoryDefinition};

    // === External dependencies ===
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
}
