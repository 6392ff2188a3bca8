//! Paging predicate for page-by-page query results.
//!
//! A `PagingPredicate` wraps an optional filter and an optional comparator
//! with a page size and a page cursor. The store returns only the entries of
//! the current page, ordered by the comparator.
//!
//! # Example
//!
//! ```ignore
//! use hazel_data::query::{PagingPredicate, Predicates};
//!
//! let mut paging = PagingPredicate::new(10)
//!     .with_predicate(Predicates::greater_than("age", 18));
//!
//! let first = store.values_page(&paging)?;
//! paging.next_page();
//! let second = store.values_page(&paging)?;
//! ```

use std::fmt;

use crate::core::entity::Entity;
use crate::query::predicate::Predicate;
use crate::query::sort::EntryComparator;

/// A predicate that selects one page of the matching entries
#[derive(Clone, PartialEq)]
pub struct PagingPredicate {
    inner: Option<Predicate>,
    comparator: Option<EntryComparator>,
    page_size: usize,
    page: usize,
}

impl fmt::Debug for PagingPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagingPredicate")
            .field("inner", &self.inner)
            .field("page_size", &self.page_size)
            .field("page", &self.page)
            .field("has_comparator", &self.comparator.is_some())
            .finish()
    }
}

impl PagingPredicate {
    /// Creates a paging predicate positioned on page 0.
    ///
    /// A page size of 0 is raised to 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            inner: None,
            comparator: None,
            page_size: page_size.max(1),
            page: 0,
        }
    }

    /// A single page holding every entry, used to obtain ordered results
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Sets the filter applied before paging
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.inner = Some(predicate);
        self
    }

    /// Sets the comparator ordering the entries before paging
    pub fn with_comparator(mut self, comparator: EntryComparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.inner.as_ref()
    }

    pub fn comparator(&self) -> Option<&EntryComparator> {
        self.comparator.as_ref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current page number (0-based)
    pub fn page(&self) -> usize {
        self.page
    }

    /// Moves the cursor to the next page
    pub fn next_page(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    /// Moves the cursor to the previous page; stays on page 0
    pub fn previous_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Jumps to `page`
    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Returns to page 0
    pub fn reset(&mut self) {
        self.page = 0;
    }

    /// Index of the first entry of the current page
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    /// Whether `entity` passes the inner filter
    pub fn accepts<T: Entity>(&self, entity: &T) -> bool {
        self.inner.as_ref().is_none_or(|p| p.apply(entity))
    }

    /// Select the current page out of a full set of candidate values.
    ///
    /// Filters, orders, then cuts the page. `has_next` reports whether at
    /// least one matching entry lies past the end of the page. Stores that
    /// evaluate predicates locally use this directly.
    pub fn select<T: Entity>(&self, values: Vec<T>) -> PagingResult<T> {
        let matching: Vec<T> = values.into_iter().filter(|v| self.accepts(v)).collect();
        let ordered = match &self.comparator {
            Some(comparator) => comparator.sort(matching),
            None => matching,
        };

        let offset = self.offset();
        let has_next = ordered.len() > offset.saturating_add(self.page_size);
        let values = ordered
            .into_iter()
            .skip(offset)
            .take(self.page_size)
            .collect();

        PagingResult {
            values,
            page: self.page,
            has_next,
        }
    }
}

/// One page returned by the store for a paging predicate
#[derive(Debug, Clone, PartialEq)]
pub struct PagingResult<T> {
    pub values: Vec<T>,
    /// Page the values belong to
    pub page: usize,
    /// Whether another non-empty page follows
    pub has_next: bool,
}

impl<T> PagingResult<T> {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
