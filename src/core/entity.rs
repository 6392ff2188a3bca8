//! Entity trait defining the metadata the query layer needs from a stored type

use crate::core::error::{EntityError, Result};
use crate::core::field::FieldValue;
use std::fmt::Debug;
use std::hash::Hash;

/// Base trait for every type stored in a key-value map.
///
/// This is the explicit capability interface the query layer works through:
/// property existence checks, identity lookup and per-instance value
/// extraction by dotted path. Nothing is resolved by reflection at query time.
///
/// Most types implement it through [`impl_entity!`](crate::impl_entity).
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Type of the identity key
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// The entity type name (e.g., "person")
    fn entity_name() -> &'static str;

    /// Name of the map the entities live in. Defaults to the entity name.
    fn key_space() -> &'static str {
        Self::entity_name()
    }

    /// Name of the identity property, `None` if the type declares none
    fn id_property() -> Option<&'static str>;

    /// Readable property paths, nested ones dotted (e.g., "address.city")
    fn properties() -> &'static [&'static str];

    /// Check whether a dotted property path is readable on this type
    fn has_property(path: &str) -> bool {
        Self::properties().contains(&path)
    }

    /// Get the identity key of this instance
    fn id(&self) -> Self::Id;

    /// Get the value of a property by dotted path.
    ///
    /// Returns `None` when the path does not resolve on this instance.
    fn field_value(&self, path: &str) -> Option<FieldValue>;
}

/// Resolve the identity property of `T`, failing if the type declares none
pub fn require_id_property<T: Entity>() -> Result<&'static str> {
    T::id_property().ok_or_else(|| {
        EntityError::MissingIdProperty {
            entity: T::entity_name().to_string(),
        }
        .into()
    })
}
