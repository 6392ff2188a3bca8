//! Query translation: method names and declared queries into native predicates
//!
//! The pipeline runs leaf to root:
//!
//! - [`tree`] parses a method name into a [`PartTree`] of [`Part`]s
//! - [`creator`] turns parts and bound values into a native [`Predicate`]
//! - [`sort`] resolves a [`Sort`] into an [`EntryComparator`]
//! - [`binder`] reorders named arguments into part order
//! - [`engine`] runs the bound query against a store, paging through
//!   [`PagingPredicate`]s
//! - [`dispatcher`] compiles each repository method once and routes every
//!   invocation by subject and return type

pub mod binder;
pub mod creator;
pub mod dispatcher;
pub mod engine;
pub mod method;
pub mod paging;
pub mod part;
pub mod predicate;
pub mod result;
pub mod sort;
pub mod string_query;
pub mod tree;

pub use binder::ParameterRearrangement;
pub use creator::{KeyValueQuery, QueryCreator, QueryCriteria};
pub use dispatcher::{CompiledQuery, PartTreeQuery, QueryDefinition, QueryLookupStrategy};
pub use engine::QueryEngine;
pub use method::{Argument, Parameter, ParameterKind, QueryMethod, ReturnType};
pub use paging::{PagingPredicate, PagingResult};
pub use part::{Part, PartType};
pub use predicate::{LikePattern, Predicate, Predicates};
pub use result::{Page, PageRequest, QueryResult, ResultStream, Slice};
pub use sort::{Direction, EntryComparator, NullHandling, Order, PropertyComparator, Sort, SortResolver};
pub use string_query::StringQuery;
pub use tree::{PartTree, Subject, SubjectKind};
