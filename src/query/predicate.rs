//! Native predicates for filtering map entries.
//!
//! A [`Predicate`] is the store-side representation of a filter condition.
//! The derived-query compiler and the string-query parser both produce them;
//! stores evaluate them against entity attributes through
//! [`Entity::field_value`].
//!
//! # Example
//!
//! ```ignore
//! use hazel_data::query::Predicates;
//!
//! let pred = Predicates::and(vec![
//!     Predicates::equal("lastname", "Matthews"),
//!     Predicates::greater_than("age", 18),
//! ]);
//! ```

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use crate::core::entity::Entity;
use crate::core::error::{QueryError, Result};
use crate::core::field::FieldValue;

/// A filter condition over entity attributes
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every entry
    True,
    /// Matches no entry
    False,
    /// Attribute equals value; `Null` matches absent or null attributes
    Equal { attribute: String, value: FieldValue },
    /// Negation of [`Predicate::Equal`]
    NotEqual { attribute: String, value: FieldValue },
    /// Ordered comparison against a value
    GreaterLess {
        attribute: String,
        value: FieldValue,
        equal: bool,
        less: bool,
    },
    /// Inclusive range
    Between {
        attribute: String,
        from: FieldValue,
        to: FieldValue,
    },
    /// Attribute equals any of the values
    In {
        attribute: String,
        values: Vec<FieldValue>,
    },
    /// SQL-style wildcard match on a string attribute
    Like {
        attribute: String,
        pattern: LikePattern,
    },
    /// Logical negation
    Not(Box<Predicate>),
    /// All of the predicates
    And(Vec<Predicate>),
    /// Any of the predicates
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Evaluate this predicate against an entity
    pub fn apply<T: Entity>(&self, entity: &T) -> bool {
        match self {
            Predicate::True => true,
            Predicate::False => false,
            Predicate::Equal { attribute, value } => attribute_of(entity, attribute).matches(value),
            Predicate::NotEqual { attribute, value } => {
                !attribute_of(entity, attribute).matches(value)
            }
            Predicate::GreaterLess {
                attribute,
                value,
                equal,
                less,
            } => match attribute_of(entity, attribute).compare(value) {
                Some(Ordering::Equal) => *equal,
                Some(Ordering::Less) => *less,
                Some(Ordering::Greater) => !*less,
                None => false,
            },
            Predicate::Between {
                attribute,
                from,
                to,
            } => {
                let actual = attribute_of(entity, attribute);
                matches!(
                    actual.compare(from),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(actual.compare(to), Some(Ordering::Less | Ordering::Equal))
            }
            Predicate::In { attribute, values } => {
                let actual = attribute_of(entity, attribute);
                values.iter().any(|v| actual.matches(v))
            }
            Predicate::Like { attribute, pattern } => match attribute_of(entity, attribute) {
                FieldValue::String(s) => pattern.is_match(&s),
                _ => false,
            },
            Predicate::Not(inner) => !inner.apply(entity),
            Predicate::And(predicates) => predicates.iter().all(|p| p.apply(entity)),
            Predicate::Or(predicates) => predicates.iter().any(|p| p.apply(entity)),
        }
    }
}

fn attribute_of<T: Entity>(entity: &T, attribute: &str) -> FieldValue {
    entity.field_value(attribute).unwrap_or(FieldValue::Null)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => write!(f, "TRUE"),
            Predicate::False => write!(f, "FALSE"),
            Predicate::Equal { attribute, value } if value.is_null() => {
                write!(f, "{} IS NULL", attribute)
            }
            Predicate::Equal { attribute, value } => write!(f, "{} = {}", attribute, value),
            Predicate::NotEqual { attribute, value } if value.is_null() => {
                write!(f, "{} IS NOT NULL", attribute)
            }
            Predicate::NotEqual { attribute, value } => write!(f, "{} != {}", attribute, value),
            Predicate::GreaterLess {
                attribute,
                value,
                equal,
                less,
            } => {
                let op = match (less, equal) {
                    (true, true) => "<=",
                    (true, false) => "<",
                    (false, true) => ">=",
                    (false, false) => ">",
                };
                write!(f, "{} {} {}", attribute, op, value)
            }
            Predicate::Between {
                attribute,
                from,
                to,
            } => write!(f, "{} BETWEEN {} AND {}", attribute, from, to),
            Predicate::In { attribute, values } => {
                let list: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{} IN ({})", attribute, list.join(", "))
            }
            Predicate::Like { attribute, pattern } => {
                let op = if pattern.is_case_insensitive() {
                    "ILIKE"
                } else {
                    "LIKE"
                };
                write!(f, "{} {} '{}'", attribute, op, pattern.expression())
            }
            Predicate::Not(inner) => write!(f, "NOT ({})", inner),
            Predicate::And(predicates) => write_joined(f, predicates, " AND "),
            Predicate::Or(predicates) => write_joined(f, predicates, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, predicates: &[Predicate], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, p) in predicates.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", p)?;
    }
    write!(f, ")")
}

// ============================================================================
// LIKE patterns
// ============================================================================

/// A compiled SQL-style wildcard pattern.
///
/// `%` matches any sequence of characters, `_` exactly one character and a
/// backslash makes the following character literal. A trailing backslash
/// matches itself. No other escaping is applied to the caller's expression.
#[derive(Debug, Clone)]
pub struct LikePattern {
    expression: String,
    case_insensitive: bool,
    regex: Regex,
}

impl LikePattern {
    /// Compile a case-sensitive pattern
    pub fn new(expression: impl Into<String>) -> Result<Self> {
        Self::compile(expression.into(), false)
    }

    /// Compile a case-insensitive pattern
    pub fn case_insensitive(expression: impl Into<String>) -> Result<Self> {
        Self::compile(expression.into(), true)
    }

    fn compile(expression: String, case_insensitive: bool) -> Result<Self> {
        let mut source = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });
        let mut chars = expression.chars();
        while let Some(c) = chars.next() {
            match c {
                '%' => source.push_str(".*"),
                '_' => source.push('.'),
                '\\' => match chars.next() {
                    Some(escaped) => source.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4]))),
                    None => source.push_str(&regex::escape("\\")),
                },
                other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| QueryError::InvalidPattern {
            pattern: expression.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            expression,
            case_insensitive,
            regex,
        })
    }

    /// The pattern as written by the caller
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Check whether `value` matches the whole pattern
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression && self.case_insensitive == other.case_insensitive
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Factory for creating predicates
pub struct Predicates;

impl Predicates {
    /// Predicate matching every entry
    pub fn always_true() -> Predicate {
        Predicate::True
    }

    /// Predicate matching no entry
    pub fn always_false() -> Predicate {
        Predicate::False
    }

    pub fn equal(attribute: impl Into<String>, value: impl Into<FieldValue>) -> Predicate {
        Predicate::Equal {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn not_equal(attribute: impl Into<String>, value: impl Into<FieldValue>) -> Predicate {
        Predicate::NotEqual {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn greater_than(attribute: impl Into<String>, value: impl Into<FieldValue>) -> Predicate {
        Self::greater_less(attribute, value, false, false)
    }

    pub fn greater_equal(attribute: impl Into<String>, value: impl Into<FieldValue>) -> Predicate {
        Self::greater_less(attribute, value, true, false)
    }

    pub fn less_than(attribute: impl Into<String>, value: impl Into<FieldValue>) -> Predicate {
        Self::greater_less(attribute, value, false, true)
    }

    pub fn less_equal(attribute: impl Into<String>, value: impl Into<FieldValue>) -> Predicate {
        Self::greater_less(attribute, value, true, true)
    }

    fn greater_less(
        attribute: impl Into<String>,
        value: impl Into<FieldValue>,
        equal: bool,
        less: bool,
    ) -> Predicate {
        Predicate::GreaterLess {
            attribute: attribute.into(),
            value: value.into(),
            equal,
            less,
        }
    }

    pub fn between(
        attribute: impl Into<String>,
        from: impl Into<FieldValue>,
        to: impl Into<FieldValue>,
    ) -> Predicate {
        Predicate::Between {
            attribute: attribute.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn in_list(attribute: impl Into<String>, values: Vec<FieldValue>) -> Predicate {
        Predicate::In {
            attribute: attribute.into(),
            values,
        }
    }

    /// Case-sensitive wildcard match
    pub fn like(attribute: impl Into<String>, expression: impl Into<String>) -> Result<Predicate> {
        Ok(Predicate::Like {
            attribute: attribute.into(),
            pattern: LikePattern::new(expression)?,
        })
    }

    /// Case-insensitive wildcard match
    pub fn ilike(attribute: impl Into<String>, expression: impl Into<String>) -> Result<Predicate> {
        Ok(Predicate::Like {
            attribute: attribute.into(),
            pattern: LikePattern::case_insensitive(expression)?,
        })
    }

    pub fn is_null(attribute: impl Into<String>) -> Predicate {
        Self::equal(attribute, FieldValue::Null)
    }

    pub fn is_not_null(attribute: impl Into<String>) -> Predicate {
        Self::not_equal(attribute, FieldValue::Null)
    }

    pub fn not(predicate: Predicate) -> Predicate {
        Predicate::Not(Box::new(predicate))
    }

    pub fn and(predicates: Vec<Predicate>) -> Predicate {
        Predicate::And(predicates)
    }

    pub fn or(predicates: Vec<Predicate>) -> Predicate {
        Predicate::Or(predicates)
    }
}
