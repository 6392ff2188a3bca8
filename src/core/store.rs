//! Store trait for the key-value map the repositories run against

use crate::core::entity::Entity;
use crate::core::error::Result;
use crate::query::paging::{PagingPredicate, PagingResult};
use crate::query::predicate::Predicate;

/// A distributed-map handle holding entities of one type, keyed by their id.
///
/// The query layer treats the store as opaque: it only builds native
/// [`Predicate`]s and [`PagingPredicate`]s and hands them over. Consistency,
/// timeouts and transport failures are the store's business and are passed
/// through unmodified.
///
/// Implementations must be safe to share between threads; the query layer
/// adds no locking of its own.
pub trait KeyValueStore<T: Entity>: Send + Sync {
    /// Name of the map (the key space)
    fn name(&self) -> &str;

    /// Get the value stored under `key`
    fn get(&self, key: &T::Id) -> Result<Option<T>>;

    /// Store `value` under `key`, returning the previous value
    fn put(&self, key: T::Id, value: T) -> Result<Option<T>>;

    /// Remove the value stored under `key`, returning it
    fn remove(&self, key: &T::Id) -> Result<Option<T>>;

    /// Check whether a value is stored under `key`
    fn contains_key(&self, key: &T::Id) -> Result<bool>;

    /// Number of entries in the map
    fn size(&self) -> Result<usize>;

    /// Remove every entry
    fn clear(&self) -> Result<()>;

    /// All values, in no particular order
    fn values(&self) -> Result<Vec<T>>;

    /// Values matching a native predicate, in no particular order
    fn values_matching(&self, predicate: &Predicate) -> Result<Vec<T>>;

    /// Keys whose values match a native predicate
    fn keys_matching(&self, predicate: &Predicate) -> Result<Vec<T::Id>>;

    /// Number of entries matching a native predicate
    fn count_matching(&self, predicate: &Predicate) -> Result<usize> {
        Ok(self.keys_matching(predicate)?.len())
    }

    /// The page of values selected by a paging predicate, ordered by its comparator
    fn values_page(&self, paging: &PagingPredicate) -> Result<PagingResult<T>>;
}
