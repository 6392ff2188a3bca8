//! Native predicates from parsed derived queries
//!
//! [`QueryCreator`] walks a [`PartTree`] and turns each part plus its bound
//! values into a [`Predicate`], combining parts with AND inside an OR-group and
//! OR-groups with OR, left to right. The result is a [`KeyValueQuery`]: the
//! criteria, the comparator, and the row window the engine executes.

use crate::core::error::{QueryError, Result};
use crate::core::field::FieldValue;
use crate::query::paging::PagingPredicate;
use crate::query::part::{Part, PartType};
use crate::query::predicate::{Predicate, Predicates};
use crate::query::result::PageRequest;
use crate::query::sort::{EntryComparator, Sort, SortResolver};
use crate::query::tree::PartTree;

/// What the engine hands to the store
#[derive(Debug, Clone, PartialEq)]
pub enum QueryCriteria {
    /// Every entry matches
    NoCriteria,
    /// A filter evaluated over the whole map
    Simple(Predicate),
    /// A page cursor, with or without a filter
    Paged(PagingPredicate),
}

impl QueryCriteria {
    /// The filter, if any, without the paging window
    pub fn predicate(&self) -> Option<&Predicate> {
        match self {
            QueryCriteria::NoCriteria => None,
            QueryCriteria::Simple(predicate) => Some(predicate),
            QueryCriteria::Paged(paging) => paging.predicate(),
        }
    }
}

/// A fully bound query ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueQuery {
    criteria: QueryCriteria,
    comparator: Option<EntryComparator>,
    offset: Option<usize>,
    rows: Option<usize>,
}

impl KeyValueQuery {
    /// Build a query from an optional filter, an ordering and a row window.
    ///
    /// Resolves `sort` into a comparator (failing with `UnsupportedSort`) and
    /// decides the criteria variant. With `rows` set, the criteria is a paging
    /// predicate advanced `offset / rows` pages. Without rows but with an
    /// ordering, it is a single unbounded page so that the store applies the
    /// comparator.
    pub fn new(
        predicate: Option<Predicate>,
        sort: &Sort,
        offset: Option<usize>,
        rows: Option<usize>,
    ) -> Result<Self> {
        let comparator = SortResolver::resolve(Some(sort))?;

        let criteria = match (rows, &comparator) {
            (Some(rows), _) => {
                let mut paging = PagingPredicate::new(rows);
                if let Some(predicate) = predicate {
                    paging = paging.with_predicate(predicate);
                }
                if let Some(comparator) = &comparator {
                    paging = paging.with_comparator(comparator.clone());
                }
                for _ in 0..offset.unwrap_or(0) / paging.page_size() {
                    paging.next_page();
                }
                QueryCriteria::Paged(paging)
            }
            (None, Some(comparator)) => {
                tracing::debug!("no row limit on a sorted query, ordering through a single unbounded page");
                let mut paging = PagingPredicate::unbounded().with_comparator(comparator.clone());
                if let Some(predicate) = predicate {
                    paging = paging.with_predicate(predicate);
                }
                QueryCriteria::Paged(paging)
            }
            (None, None) => match predicate {
                Some(predicate) => QueryCriteria::Simple(predicate),
                None => QueryCriteria::NoCriteria,
            },
        };

        Ok(Self {
            criteria,
            comparator,
            offset,
            rows,
        })
    }

    /// Match every entry, in no particular order
    pub fn all() -> Self {
        Self {
            criteria: QueryCriteria::NoCriteria,
            comparator: None,
            offset: None,
            rows: None,
        }
    }

    pub fn criteria(&self) -> &QueryCriteria {
        &self.criteria
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.criteria.predicate()
    }

    pub fn comparator(&self) -> Option<&EntryComparator> {
        self.comparator.as_ref()
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn rows(&self) -> Option<usize> {
        self.rows
    }
}

/// Builds [`KeyValueQuery`]s out of a parsed method name
#[derive(Debug, Clone, Copy)]
pub struct QueryCreator<'a> {
    tree: &'a PartTree,
}

impl<'a> QueryCreator<'a> {
    pub fn new(tree: &'a PartTree) -> Self {
        Self { tree }
    }

    /// Reject parts without a native predicate
    pub fn check_supported(method: &str, part: &Part) -> Result<()> {
        if !part.part_type().is_supported() {
            return Err(QueryError::invalid(
                method,
                format!("unsupported keyword {} on '{}'", part.part_type(), part.property()),
            )
            .into());
        }
        if part.ignore_case() && part.part_type().is_ordering() {
            return Err(QueryError::invalid(
                method,
                format!("ignore case is not supported for {}", part),
            )
            .into());
        }
        Ok(())
    }

    /// Build the criteria from `values` (already in part order).
    ///
    /// A `pageable` overrides `First<N>` for the row count and supplies the
    /// offset. A sorted `pageable` wins over a dynamic `sort`, which in turn
    /// wins over the static `OrderBy`.
    pub fn create(
        &self,
        values: Vec<FieldValue>,
        sort: Option<&Sort>,
        pageable: Option<&PageRequest>,
    ) -> Result<KeyValueQuery> {
        let method = self.tree.source();
        let mut values = values.into_iter();

        let mut criteria: Option<Predicate> = None;
        for group in self.tree.or_parts() {
            let mut and_criteria: Option<Predicate> = None;
            for part in group.parts() {
                let predicate = Self::build_part(method, part, &mut values)?;
                and_criteria = Some(match and_criteria {
                    Some(base) => Predicates::and(vec![base, predicate]),
                    None => predicate,
                });
            }
            if let Some(and_criteria) = and_criteria {
                criteria = Some(match criteria {
                    Some(base) => Predicates::or(vec![base, and_criteria]),
                    None => and_criteria,
                });
            }
        }

        let remaining = values.count();
        if remaining > 0 {
            return Err(QueryError::ArgumentMismatch {
                method: method.to_string(),
                message: format!("{} argument(s) not consumed by the query", remaining),
            }
            .into());
        }

        let sort = pageable
            .map(|p| &p.sort)
            .filter(|s| s.is_sorted())
            .or(sort.filter(|s| s.is_sorted()))
            .unwrap_or(self.tree.sort());

        let (offset, rows) = match pageable {
            Some(page) => (Some(page.offset()), Some(page.size)),
            None => (None, self.tree.max_results()),
        };

        if let Some(criteria) = &criteria {
            tracing::trace!(method, criteria = %criteria, "bound query criteria");
        }
        KeyValueQuery::new(criteria, sort, offset, rows)
    }

    /// Native predicate for one part, consuming its arguments from `values`
    pub fn build_part(
        method: &str,
        part: &Part,
        values: &mut impl Iterator<Item = FieldValue>,
    ) -> Result<Predicate> {
        Self::check_supported(method, part)?;

        let property = part.property();
        let mut next_value = || {
            values.next().ok_or_else(|| QueryError::ArgumentMismatch {
                method: method.to_string(),
                message: format!("no argument left for '{}'", part),
            })
        };

        let predicate = match part.part_type() {
            PartType::True => Predicates::equal(property, true),
            PartType::False => Predicates::equal(property, false),
            PartType::IsNull => Predicates::is_null(property),
            PartType::IsNotNull => Predicates::is_not_null(property),
            PartType::Equal => equality(property, next_value()?, part.ignore_case())?,
            PartType::NotEqual => {
                let value = next_value()?;
                if part.ignore_case() {
                    Predicates::not(equality(property, value, true)?)
                } else {
                    Predicates::not_equal(property, value)
                }
            }
            PartType::GreaterThan => Predicates::greater_than(property, next_value()?),
            PartType::GreaterThanEqual => Predicates::greater_equal(property, next_value()?),
            PartType::LessThan => Predicates::less_than(property, next_value()?),
            PartType::LessThanEqual => Predicates::less_equal(property, next_value()?),
            PartType::Like => {
                let value = next_value()?;
                let Some(expression) = value.as_string() else {
                    return Err(QueryError::ArgumentMismatch {
                        method: method.to_string(),
                        message: format!("'{}' expects a text pattern, got {}", part, value.kind()),
                    }
                    .into());
                };
                if part.ignore_case() {
                    Predicates::ilike(property, expression)?
                } else {
                    Predicates::like(property, expression)?
                }
            }
            other => {
                return Err(QueryError::invalid(method, format!("unsupported keyword {}", other)).into());
            }
        };
        Ok(predicate)
    }
}

/// Equality, case-insensitive for text when requested.
///
/// Case-insensitive equality runs as an `ilike` whose wildcard characters
/// are escaped, so the value is matched literally.
fn equality(property: &str, value: FieldValue, ignore_case: bool) -> Result<Predicate> {
    match value.as_string() {
        Some(text) if ignore_case => Predicates::ilike(property, escape_like(text)),
        _ => Ok(Predicates::equal(property, value)),
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
