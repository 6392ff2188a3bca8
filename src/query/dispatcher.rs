//! Compilation and dispatch of repository query methods
//!
//! A [`CompiledQuery`] is built once per declared method. It holds either a
//! derived query (parsed method name plus argument permutation) or a declared
//! string query, decided by the [`QueryLookupStrategy`]. Each invocation binds
//! its arguments, builds a fresh [`KeyValueQuery`] and routes it to the
//! [`QueryEngine`] according to the query's subject and the method's
//! declared [`ReturnType`].

use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::error::{QueryError, Result};
use crate::query::binder::ParameterRearrangement;
use crate::query::creator::{KeyValueQuery, QueryCreator};
use crate::query::engine::QueryEngine;
use crate::query::method::{Argument, BoundArguments, ParameterKind, QueryMethod, ReturnType};
use crate::query::result::{Page, PageRequest, QueryResult, ResultStream, Slice};
use crate::query::sort::Sort;
use crate::query::string_query::StringQuery;
use crate::query::tree::PartTree;

/// Where the query of a method comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryLookupStrategy {
    /// Always derive the query from the method name
    Create,
    /// Always use the declared query string
    UseDeclaredQuery,
    /// Use the declared query string when there is one, else derive
    #[default]
    CreateIfNotFound,
}

/// What an invocation does with the matching entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Find,
    Count,
    Exists,
    Delete,
}

/// A query derived from the method name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTreeQuery {
    tree: PartTree,
    rearrangement: ParameterRearrangement,
}

impl PartTreeQuery {
    /// Parse the method name and check it against `T` and the declared parameters
    pub fn compile<T: Entity>(method: &QueryMethod) -> Result<Self> {
        let tree = PartTree::parse(&method.name)?;
        tree.validate_properties::<T>()?;

        let declared = method.value_parameters().count();
        if declared != tree.number_of_arguments() {
            return Err(QueryError::invalid(
                &method.name,
                format!(
                    "the query binds {} argument(s) but the method declares {} value parameter(s)",
                    tree.number_of_arguments(),
                    declared
                ),
            )
            .into());
        }

        let rearrangement = ParameterRearrangement::compute(method, &tree);
        Ok(Self {
            tree,
            rearrangement,
        })
    }

    pub fn tree(&self) -> &PartTree {
        &self.tree
    }

    pub fn rearrangement(&self) -> &ParameterRearrangement {
        &self.rearrangement
    }

    fn action(&self) -> Action {
        if self.tree.is_delete() {
            Action::Delete
        } else if self.tree.is_count() {
            Action::Count
        } else if self.tree.is_exists() {
            Action::Exists
        } else {
            Action::Find
        }
    }
}

/// The query behind one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryDefinition {
    Derived(PartTreeQuery),
    Declared(StringQuery),
}

/// A compiled repository query method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    method: QueryMethod,
    definition: QueryDefinition,
}

impl CompiledQuery {
    /// Compile `method` for entity type `T`.
    ///
    /// Fails with `InvalidQueryDefinition` when the method name does not
    /// parse, uses an unsupported keyword, names a property `T` does not
    /// have, or disagrees with its declared parameters.
    pub fn compile<T: Entity>(method: &QueryMethod, strategy: QueryLookupStrategy) -> Result<Self> {
        check_parameter_kinds(method)?;

        let definition = match (strategy, &method.query) {
            (QueryLookupStrategy::Create, _) | (QueryLookupStrategy::CreateIfNotFound, None) => {
                QueryDefinition::Derived(PartTreeQuery::compile::<T>(method)?)
            }
            (_, Some(query)) => QueryDefinition::Declared(StringQuery::new(
                &method.name,
                query,
                method.value_parameters().count(),
            )?),
            (QueryLookupStrategy::UseDeclaredQuery, None) => {
                return Err(QueryError::invalid(&method.name, "no declared query").into());
            }
        };

        tracing::debug!(
            entity = T::entity_name(),
            method = %method.name,
            declared = matches!(definition, QueryDefinition::Declared(_)),
            "compiled query method"
        );
        Ok(Self {
            method: method.clone(),
            definition,
        })
    }

    pub fn method(&self) -> &QueryMethod {
        &self.method
    }

    pub fn definition(&self) -> &QueryDefinition {
        &self.definition
    }

    /// Run one invocation.
    ///
    /// Unsupported shapes (DISTINCT, a delete returning something other
    /// than a count or a collection) fail before the store is touched.
    pub fn execute<T: Entity>(&self, engine: &QueryEngine<T>, args: Vec<Argument>) -> Result<QueryResult<T>> {
        let action = self.action();
        self.check_return_type(action)?;

        let bound = BoundArguments::bind(&self.method, args).map_err(|message| QueryError::ArgumentMismatch {
            method: self.method.name.clone(),
            message,
        })?;

        let query = match &self.definition {
            QueryDefinition::Derived(derived) => {
                let values = if derived.rearrangement.is_required() {
                    derived.rearrangement.rearrange(bound.values)
                } else {
                    bound.values
                };
                QueryCreator::new(&derived.tree).create(values, bound.sort.as_ref(), bound.pageable.as_ref())?
            }
            QueryDefinition::Declared(declared) => {
                let predicate = declared.bind(&bound.values)?;
                let sort = bound
                    .pageable
                    .as_ref()
                    .map(|p| &p.sort)
                    .filter(|s| s.is_sorted())
                    .or(bound.sort.as_ref())
                    .cloned()
                    .unwrap_or_else(Sort::unsorted);
                let (offset, rows) = match &bound.pageable {
                    Some(page) => (Some(page.offset()), Some(page.size)),
                    None => (None, None),
                };
                KeyValueQuery::new(Some(predicate), &sort, offset, rows)?
            }
        };

        tracing::debug!(
            method = %self.method.name,
            action = ?action,
            returns = ?self.method.returns,
            "dispatching query"
        );
        self.dispatch(engine, action, &query, bound.pageable.as_ref())
    }

    fn action(&self) -> Action {
        match &self.definition {
            QueryDefinition::Derived(derived) => derived.action(),
            QueryDefinition::Declared(_) => match self.method.returns {
                ReturnType::Count => Action::Count,
                ReturnType::Boolean => Action::Exists,
                _ => Action::Find,
            },
        }
    }

    fn check_return_type(&self, action: Action) -> Result<()> {
        let unsupported = |message: String| -> Result<()> {
            Err(QueryError::UnsupportedReturnType {
                method: self.method.name.clone(),
                message,
            }
            .into())
        };

        let distinct = match &self.definition {
            QueryDefinition::Derived(derived) => derived.tree.is_distinct(),
            QueryDefinition::Declared(_) => false,
        };
        if distinct {
            return unsupported(
                "DISTINCT is not supported, stored entries always carry a unique key".to_string(),
            );
        }

        let returns = self.method.returns;
        let supported = match action {
            Action::Delete => returns == ReturnType::Count || returns.is_collection(),
            Action::Count => returns == ReturnType::Count,
            Action::Exists => returns == ReturnType::Boolean,
            Action::Find => !matches!(returns, ReturnType::Count | ReturnType::Boolean),
        };
        if !supported {
            return unsupported(format!("{:?} query cannot return {:?}", action, returns));
        }
        Ok(())
    }

    fn dispatch<T: Entity>(
        &self,
        engine: &QueryEngine<T>,
        action: Action,
        query: &KeyValueQuery,
        pageable: Option<&PageRequest>,
    ) -> Result<QueryResult<T>> {
        let returns = self.method.returns;
        let stream = |values: Vec<T>| ResultStream::new(engine.store().name(), values);

        let result = match action {
            Action::Delete => {
                let deleted = engine.delete(query)?;
                match returns {
                    ReturnType::Count => QueryResult::Count(deleted.len()),
                    ReturnType::Stream => QueryResult::Stream(stream(deleted)),
                    _ => QueryResult::List(deleted),
                }
            }
            Action::Count => QueryResult::Count(engine.count(query)?),
            Action::Exists => QueryResult::Exists(engine.count(query)? > 0),
            Action::Find => match (returns, pageable) {
                (ReturnType::Page, Some(request)) => {
                    let total = engine.count(query)?;
                    QueryResult::Page(Page::new(engine.execute(query)?, request, total))
                }
                (ReturnType::Page, None) => QueryResult::Page(Page::unpaged(engine.execute(query)?)),
                (ReturnType::Slice, Some(request)) => {
                    let found = engine.find(query)?;
                    QueryResult::Slice(Slice {
                        content: found.values,
                        number: request.page,
                        size: request.size,
                        has_next: found.has_next,
                    })
                }
                (ReturnType::Slice, None) => {
                    let content = engine.execute(query)?;
                    QueryResult::Slice(Slice {
                        number: 0,
                        size: content.len(),
                        has_next: false,
                        content,
                    })
                }
                (ReturnType::Single, _) => QueryResult::Single(engine.execute(query)?.into_iter().next()),
                (ReturnType::Stream, _) => QueryResult::Stream(stream(engine.execute(query)?)),
                _ => QueryResult::List(engine.execute(query)?),
            },
        };
        Ok(result)
    }
}

fn check_parameter_kinds(method: &QueryMethod) -> Result<()> {
    for kind in [ParameterKind::Sort, ParameterKind::Pageable] {
        let count = method.parameters.iter().filter(|p| p.kind == kind).count();
        if count > 1 {
            return Err(QueryError::invalid(
                &method.name,
                format!("at most one {:?} parameter is allowed, found {}", kind, count),
            )
            .into());
        }
    }
    Ok(())
}
