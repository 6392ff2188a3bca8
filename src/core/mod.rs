//! Core module containing the entity, value, store and error types

pub mod entity;
pub mod error;
pub mod field;
pub mod store;

pub use entity::{Entity, require_id_property};
pub use error::{ConfigError, EntityError, QueryError, RepositoryError, Result, StorageError};
pub use field::FieldValue;
pub use store::KeyValueStore;
