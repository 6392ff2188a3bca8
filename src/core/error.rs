//! Typed error handling for repository and query operations
//!
//! Errors are grouped by category so callers (and tests) can match on the
//! precise failure instead of inspecting messages.
//!
//! # Error Categories
//!
//! - [`QueryError`]: derived/string query compilation and execution failures
//! - [`EntityError`]: entity metadata failures
//! - [`ConfigError`]: configuration parsing and validation
//! - [`StorageError`]: failures raised by the underlying key-value store
//!
//! # Example
//!
//! ```rust,ignore
//! match repository.execute("countDistinctLastnameByFirstname", args) {
//!     Err(RepositoryError::Query(QueryError::UnsupportedReturnType { .. })) => {}
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// The main error type of the crate
///
/// Each variant wraps a more specific error type for that category.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Query compilation or execution errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Entity-related errors
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RepositoryError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RepositoryError::Query(e) => e.error_code(),
            RepositoryError::Entity(e) => e.error_code(),
            RepositoryError::Config(_) => "CONFIG_ERROR",
            RepositoryError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// True when the error was raised while compiling a query definition
    pub fn is_invalid_query(&self) -> bool {
        matches!(
            self,
            RepositoryError::Query(QueryError::InvalidQueryDefinition { .. })
        )
    }

    /// True for the sort options the native comparator cannot honor
    pub fn is_unsupported_sort(&self) -> bool {
        matches!(self, RepositoryError::Query(QueryError::UnsupportedSort { .. }))
    }

    /// True for `Distinct` queries and delete queries with unusable return types
    pub fn is_unsupported_return_type(&self) -> bool {
        matches!(
            self,
            RepositoryError::Query(QueryError::UnsupportedReturnType { .. })
        )
    }
}

// =============================================================================
// Query Errors
// =============================================================================

/// Errors related to query definitions and their execution
#[derive(Debug, Error)]
pub enum QueryError {
    /// Method name (or query string) does not parse under the supported grammar
    #[error("Invalid query definition '{method}': {message}")]
    InvalidQueryDefinition { method: String, message: String },

    /// Sort order uses an option the native comparator cannot honor
    #[error("Unsupported sort on '{property}': {message}")]
    UnsupportedSort { property: String, message: String },

    /// Declared return shape cannot be produced for this query
    #[error("Unsupported return type for '{method}': {message}")]
    UnsupportedReturnType { method: String, message: String },

    /// Runtime arguments do not line up with the declared parameters
    #[error("Argument mismatch for '{method}': {message}")]
    ArgumentMismatch { method: String, message: String },

    /// No query method with this name was registered on the repository
    #[error("Unknown query method '{method}' on repository for '{entity}'")]
    UnknownMethod { entity: String, method: String },

    /// LIKE pattern could not be translated into a matcher
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A result was requested in a different shape than the query produced
    #[error("Expected a {expected} result but the query produced {actual}")]
    ResultShapeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl QueryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::InvalidQueryDefinition { .. } => "INVALID_QUERY_DEFINITION",
            QueryError::UnsupportedSort { .. } => "UNSUPPORTED_SORT",
            QueryError::UnsupportedReturnType { .. } => "UNSUPPORTED_RETURN_TYPE",
            QueryError::ArgumentMismatch { .. } => "ARGUMENT_MISMATCH",
            QueryError::UnknownMethod { .. } => "UNKNOWN_QUERY_METHOD",
            QueryError::InvalidPattern { .. } => "INVALID_PATTERN",
            QueryError::ResultShapeMismatch { .. } => "RESULT_SHAPE_MISMATCH",
        }
    }

    /// Shorthand for building an [`QueryError::InvalidQueryDefinition`]
    pub fn invalid(method: impl Into<String>, message: impl Into<String>) -> Self {
        QueryError::InvalidQueryDefinition {
            method: method.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity metadata
#[derive(Debug, Error)]
pub enum EntityError {
    /// Entity type declares no identity property
    #[error("No identity property declared on '{entity}'")]
    MissingIdProperty { entity: String },
}

impl EntityError {
    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::MissingIdProperty { .. } => "MISSING_ID_PROPERTY",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    /// Invalid configuration value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// No repository definition for the entity
    #[error("No repository configured for entity '{entity}'")]
    MissingRepository { entity: String },

    /// Failed to read configuration file
    #[error("Failed to read config file '{path}': {message}")]
    FileReadError { path: String, message: String },
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by the key-value store
///
/// These are passed through unmodified by the query layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A lock guarding the map was poisoned by a panicking writer
    #[error("Map '{map}' lock poisoned: {message}")]
    LockPoisoned { map: String, message: String },

    /// Store is not available
    #[error("Store '{map}' is unavailable")]
    Unavailable { map: String },
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_yaml::Error> for RepositoryError {
    fn from(err: serde_yaml::Error) -> Self {
        RepositoryError::Config(ConfigError::ParseError {
            message: err.to_string(),
        })
    }
}
