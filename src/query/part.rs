//! Parts of a derived query: one property, one comparison keyword

use serde::Serialize;
use std::fmt;

/// Comparison keyword of a [`Part`].
///
/// The table covers the whole derived-query vocabulary so that every keyword
/// is recognized as a keyword. Only the types for which
/// [`PartType::is_supported`] holds can be compiled into native predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartType {
    IsNotNull,
    IsNull,
    Between,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Before,
    After,
    NotLike,
    Like,
    StartingWith,
    EndingWith,
    IsNotEmpty,
    IsEmpty,
    NotContaining,
    Containing,
    NotIn,
    In,
    Near,
    Within,
    Regex,
    Exists,
    True,
    False,
    NotEqual,
    Equal,
}

/// Keyword lookup order: the first type with a keyword that ends the part wins
const ALL_TYPES: [PartType; 27] = [
    PartType::IsNotNull,
    PartType::IsNull,
    PartType::Between,
    PartType::LessThan,
    PartType::LessThanEqual,
    PartType::GreaterThan,
    PartType::GreaterThanEqual,
    PartType::Before,
    PartType::After,
    PartType::NotLike,
    PartType::Like,
    PartType::StartingWith,
    PartType::EndingWith,
    PartType::IsNotEmpty,
    PartType::IsEmpty,
    PartType::NotContaining,
    PartType::Containing,
    PartType::NotIn,
    PartType::In,
    PartType::Near,
    PartType::Within,
    PartType::Regex,
    PartType::Exists,
    PartType::True,
    PartType::False,
    PartType::NotEqual,
    PartType::Equal,
];

impl PartType {
    /// Keywords that select this type, longest first
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            PartType::IsNotNull => &["IsNotNull", "NotNull"],
            PartType::IsNull => &["IsNull", "Null"],
            PartType::Between => &["IsBetween", "Between"],
            PartType::LessThan => &["IsLessThan", "LessThan"],
            PartType::LessThanEqual => &["IsLessThanEqual", "LessThanEqual"],
            PartType::GreaterThan => &["IsGreaterThan", "GreaterThan"],
            PartType::GreaterThanEqual => &["IsGreaterThanEqual", "GreaterThanEqual"],
            PartType::Before => &["IsBefore", "Before"],
            PartType::After => &["IsAfter", "After"],
            PartType::NotLike => &["IsNotLike", "NotLike"],
            PartType::Like => &["IsLike", "Like"],
            PartType::StartingWith => &["IsStartingWith", "StartingWith", "StartsWith"],
            PartType::EndingWith => &["IsEndingWith", "EndingWith", "EndsWith"],
            PartType::IsNotEmpty => &["IsNotEmpty", "NotEmpty"],
            PartType::IsEmpty => &["IsEmpty", "Empty"],
            PartType::NotContaining => &["IsNotContaining", "NotContaining", "NotContains"],
            PartType::Containing => &["IsContaining", "Containing", "Contains"],
            PartType::NotIn => &["IsNotIn", "NotIn"],
            PartType::In => &["IsIn", "In"],
            PartType::Near => &["IsNear", "Near"],
            PartType::Within => &["IsWithin", "Within"],
            PartType::Regex => &["MatchesRegex", "Matches", "Regex"],
            PartType::Exists => &["Exists"],
            PartType::True => &["IsTrue", "True"],
            PartType::False => &["IsFalse", "False"],
            PartType::NotEqual => &["IsNot", "Not"],
            PartType::Equal => &["Is", "Equals"],
        }
    }

    /// Number of method arguments a part of this type binds
    pub fn number_of_arguments(self) -> usize {
        match self {
            PartType::IsNotNull
            | PartType::IsNull
            | PartType::IsNotEmpty
            | PartType::IsEmpty
            | PartType::Exists
            | PartType::True
            | PartType::False => 0,
            PartType::Between => 2,
            _ => 1,
        }
    }

    /// Whether native predicates exist for this type
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            PartType::Equal
                | PartType::NotEqual
                | PartType::True
                | PartType::False
                | PartType::GreaterThan
                | PartType::GreaterThanEqual
                | PartType::LessThan
                | PartType::LessThanEqual
                | PartType::Like
                | PartType::IsNull
                | PartType::IsNotNull
        )
    }

    /// Whether this type is an ordering comparison
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            PartType::GreaterThan
                | PartType::GreaterThanEqual
                | PartType::LessThan
                | PartType::LessThanEqual
        )
    }

    /// Split a part source into its property text and type.
    ///
    /// Returns the keyword that matched as well, `None` for the implicit
    /// equality of a bare property.
    pub fn detect(source: &str) -> (&str, PartType, Option<&'static str>) {
        for part_type in ALL_TYPES {
            for keyword in part_type.keywords() {
                match source.strip_suffix(keyword) {
                    Some(property) if !property.is_empty() => {
                        return (property, part_type, Some(keyword));
                    }
                    _ => {}
                }
            }
        }
        (source, PartType::Equal, None)
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical keyword, without the "Is" prefix where there is one
        let keywords = self.keywords();
        let keyword = keywords.last().copied().unwrap_or("Equals");
        write!(f, "{}", keyword)
    }
}

/// One parsed filter fragment of a derived query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    property: String,
    part_type: PartType,
    ignore_case: bool,
}

impl Part {
    pub fn new(property: impl Into<String>, part_type: PartType, ignore_case: bool) -> Self {
        Self {
            property: property.into(),
            part_type,
            ignore_case,
        }
    }

    /// Dotted property path
    pub fn property(&self) -> &str {
        &self.property
    }

    /// First segment of the property path
    pub fn segment(&self) -> &str {
        self.property.split('.').next().unwrap_or(&self.property)
    }

    pub fn part_type(&self) -> PartType {
        self.part_type
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn number_of_arguments(&self) -> usize {
        self.part_type.number_of_arguments()
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.property, self.part_type)?;
        if self.ignore_case {
            write!(f, " (ignore case)")?;
        }
        Ok(())
    }
}
