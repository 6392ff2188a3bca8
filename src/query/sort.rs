//! Sort specifications and the comparators built from them
//!
//! [`SortResolver::resolve`] turns a requested [`Sort`] into an
//! [`EntryComparator`] the store can order a paging predicate with. Options
//! the native comparator cannot honor fail fast with
//! `QueryError::UnsupportedSort` instead of being ignored.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::core::entity::Entity;
use crate::core::error::{QueryError, Result};
use crate::core::field::FieldValue;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn is_ascending(self) -> bool {
        self == Direction::Asc
    }

    /// Apply this direction to a natural ordering
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// How null values are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullHandling {
    /// Whatever the store does natively
    #[default]
    Native,
    NullsFirst,
    NullsLast,
}

/// One property of a sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub null_handling: NullHandling,
}

impl Order {
    pub fn new(property: impl Into<String>, direction: Direction) -> Self {
        Self {
            property: property.into(),
            direction,
            ignore_case: false,
            null_handling: NullHandling::Native,
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, Direction::Asc)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, Direction::Desc)
    }

    /// Request case-insensitive ordering
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn with_null_handling(mut self, null_handling: NullHandling) -> Self {
        self.null_handling = null_handling;
        self
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        write!(f, "{}: {}", self.property, direction)
    }
}

/// An ordered list of [`Order`]s: primary first, then tie-breakers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    /// A sort without any order
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Sort by the given properties, all in the same direction
    pub fn by_properties(direction: Direction, properties: &[&str]) -> Self {
        Self {
            orders: properties
                .iter()
                .map(|p| Order::new(*p, direction))
                .collect(),
        }
    }

    /// Append the orders of `other` as further tie-breakers
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Order> {
        self.orders.iter()
    }
}

// ============================================================================
// Comparators
// ============================================================================

/// Compares two entities on one top-level property.
///
/// Absent or null values sort before present ones in both directions, and
/// two of them compare equal. Values that are not mutually ordered (different
/// kinds, or a path that does not resolve on the instance) compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyComparator {
    attribute: String,
    direction: Direction,
}

impl PropertyComparator {
    pub fn new(attribute: impl Into<String>, direction: Direction) -> Self {
        Self {
            attribute: attribute.into(),
            direction,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn compare<T: Entity>(&self, a: &T, b: &T) -> Ordering {
        let (Some(left), Some(right)) = (
            a.field_value(&self.attribute),
            b.field_value(&self.attribute),
        ) else {
            tracing::trace!(
                attribute = %self.attribute,
                entity = T::entity_name(),
                "sort attribute does not resolve, treating values as equal"
            );
            return Ordering::Equal;
        };

        match (left, right) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Null, _) => Ordering::Less,
            (_, FieldValue::Null) => Ordering::Greater,
            (left, right) => match left.compare(&right) {
                Some(ordering) => self.direction.apply(ordering),
                None => {
                    tracing::trace!(
                        attribute = %self.attribute,
                        left = left.kind(),
                        right = right.kind(),
                        "sort values are not comparable, treating them as equal"
                    );
                    Ordering::Equal
                }
            },
        }
    }
}

/// A composite comparator applying property comparators in declared order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryComparator {
    comparators: Vec<PropertyComparator>,
}

impl EntryComparator {
    pub fn new(comparators: Vec<PropertyComparator>) -> Self {
        Self { comparators }
    }

    /// Append a tie-breaking comparator
    pub fn then_comparing(mut self, comparator: PropertyComparator) -> Self {
        self.comparators.push(comparator);
        self
    }

    pub fn comparators(&self) -> &[PropertyComparator] {
        &self.comparators
    }

    pub fn compare<T: Entity>(&self, a: &T, b: &T) -> Ordering {
        self.comparators
            .iter()
            .map(|c| c.compare(a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    /// Stable sort of `values` by this comparator.
    ///
    /// Merge-based, so it never relies on the comparator being a total order.
    pub fn sort<T: Entity>(&self, values: Vec<T>) -> Vec<T> {
        merge_sort(values, &|a: &T, b: &T| self.compare(a, b))
    }
}

fn merge_sort<T, F>(mut values: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if values.len() <= 1 {
        return values;
    }
    let right = values.split_off(values.len() / 2);
    let left = merge_sort(values, compare);
    let right = merge_sort(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged
}

/// Turns sort specifications into comparators
pub struct SortResolver;

impl SortResolver {
    /// Resolve a sort into a comparator.
    ///
    /// Returns `Ok(None)` for a missing or unsorted specification. Fails with
    /// `UnsupportedSort` on nested properties, ignore-case ordering, or any
    /// null handling other than [`NullHandling::Native`].
    pub fn resolve(sort: Option<&Sort>) -> Result<Option<EntryComparator>> {
        let Some(sort) = sort.filter(|s| s.is_sorted()) else {
            return Ok(None);
        };

        let mut comparator = EntryComparator::default();
        for order in sort.iter() {
            if order.property.contains('.') {
                return Err(unsupported(order, "embedded properties are not supported"));
            }
            if order.ignore_case {
                return Err(unsupported(order, "ignore case is not supported"));
            }
            if order.null_handling != NullHandling::Native {
                return Err(unsupported(order, "null handling is not supported"));
            }
            comparator =
                comparator.then_comparing(PropertyComparator::new(&order.property, order.direction));
        }
        Ok(Some(comparator))
    }
}

fn unsupported(order: &Order, message: &str) -> crate::core::error::RepositoryError {
    QueryError::UnsupportedSort {
        property: order.property.clone(),
        message: format!("{} ({})", message, order),
    }
    .into()
}
