//! Declared shape of a repository query method

use serde::{Deserialize, Serialize};

use crate::core::field::FieldValue;
use crate::query::result::PageRequest;
use crate::query::sort::Sort;

/// Kind of a declared method parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// A value bound into the query criteria
    #[default]
    Value,
    /// A dynamic sort
    Sort,
    /// A page request
    Pageable,
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Parameter {
    /// Binding name, when the parameter is named
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: ParameterKind::Value,
        }
    }

    pub fn positional() -> Self {
        Self::default()
    }

    pub fn sort() -> Self {
        Self {
            name: None,
            kind: ParameterKind::Sort,
        }
    }

    pub fn pageable() -> Self {
        Self {
            name: None,
            kind: ParameterKind::Pageable,
        }
    }

    pub fn is_value(&self) -> bool {
        self.kind == ParameterKind::Value
    }
}

/// Declared return shape of a query method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    /// Zero or one entity
    Single,
    #[default]
    List,
    /// Single-pass lazy sequence
    Stream,
    Page,
    Slice,
    Count,
    Boolean,
}

impl ReturnType {
    pub fn is_collection(self) -> bool {
        matches!(self, ReturnType::List | ReturnType::Stream)
    }
}

/// A repository query method: name, parameters, return shape and optional
/// declared query string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMethod {
    pub name: String,

    #[serde(default)]
    pub parameters: Vec<Parameter>,

    #[serde(default)]
    pub returns: ReturnType,

    /// Declared query in SQL-predicate syntax with `%s` placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl QueryMethod {
    /// A method returning a list, without parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            returns: ReturnType::List,
            query: None,
        }
    }

    /// Add a named value parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter::named(name));
        self
    }

    /// Add `count` unnamed value parameters
    pub fn positional_params(mut self, count: usize) -> Self {
        self.parameters
            .extend(std::iter::repeat_n(Parameter::positional(), count));
        self
    }

    pub fn sort_param(mut self) -> Self {
        self.parameters.push(Parameter::sort());
        self
    }

    pub fn pageable_param(mut self) -> Self {
        self.parameters.push(Parameter::pageable());
        self
    }

    pub fn returns(mut self, returns: ReturnType) -> Self {
        self.returns = returns;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Value parameters in declaration order
    pub fn value_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_value())
    }
}

/// Runtime argument of a query method invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(FieldValue),
    Sort(Sort),
    Pageable(PageRequest),
}

impl Argument {
    pub fn value(value: impl Into<FieldValue>) -> Self {
        Argument::Value(value.into())
    }

    pub fn kind(&self) -> ParameterKind {
        match self {
            Argument::Value(_) => ParameterKind::Value,
            Argument::Sort(_) => ParameterKind::Sort,
            Argument::Pageable(_) => ParameterKind::Pageable,
        }
    }
}

impl From<FieldValue> for Argument {
    fn from(value: FieldValue) -> Self {
        Argument::Value(value)
    }
}

impl From<Sort> for Argument {
    fn from(sort: Sort) -> Self {
        Argument::Sort(sort)
    }
}

impl From<PageRequest> for Argument {
    fn from(page: PageRequest) -> Self {
        Argument::Pageable(page)
    }
}

/// Arguments of one invocation, split by kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    /// Value arguments in declaration order
    pub values: Vec<FieldValue>,
    pub sort: Option<Sort>,
    pub pageable: Option<PageRequest>,
}

impl BoundArguments {
    /// Match `args` against the declared parameters of `method`
    pub fn bind(
        method: &QueryMethod,
        args: Vec<Argument>,
    ) -> std::result::Result<Self, String> {
        if args.len() != method.parameters.len() {
            return Err(format!(
                "expected {} arguments, got {}",
                method.parameters.len(),
                args.len()
            ));
        }

        let mut bound = BoundArguments::default();
        for (position, (parameter, arg)) in method.parameters.iter().zip(args).enumerate() {
            if parameter.kind != arg.kind() {
                return Err(format!(
                    "argument {} is a {:?}, the parameter expects a {:?}",
                    position,
                    arg.kind(),
                    parameter.kind
                ));
            }
            match arg {
                Argument::Value(value) => bound.values.push(value),
                Argument::Sort(sort) => bound.sort = Some(sort),
                Argument::Pageable(page) => bound.pageable = Some(page),
            }
        }
        Ok(bound)
    }
}
