//! Method-name parser for derived queries
//!
//! Grammar:
//!
//! ```text
//! method    := prefix subject? "By" predicate? ("OrderBy" orders)?
//! prefix    := find | read | get | query | search | stream
//!            | count | exists | delete | remove
//! subject   := (any text containing "Distinct" and/or First<N> / Top<N>)
//! predicate := and-group ("Or" and-group)* ("AllIgnoreCase" | "AllIgnoringCase")?
//! and-group := part ("And" part)*
//! part      := property keyword? ("IgnoreCase" | "IgnoringCase")?
//! orders    := (property ("Asc" | "Desc")?)+
//! ```
//!
//! `And`, `Or` and `OrderBy` only split when followed by an upper-case
//! letter. Property text is converted to snake case (`LastName` becomes
//! `last_name`). An underscore is an explicit property boundary: it separates
//! nested path segments (`Address_City` becomes `address.city`) and keyword
//! detection only looks at the text after the last underscore, so a trailing
//! underscore keeps a property whose name ends like a keyword intact
//! (`LastIn_` is the property `last_in`, not an `In` comparison).

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::core::entity::Entity;
use crate::core::error::{QueryError, Result};
use crate::query::part::{Part, PartType};
use crate::query::sort::{Direction, Order, Sort};

/// What a derived query does with the matching entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Find,
    Count,
    Exists,
    Delete,
}

/// Modifiers parsed from the text between the prefix and `By`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub distinct: bool,
    pub max_results: Option<usize>,
}

/// Parts joined by AND
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrPart {
    parts: Vec<Part>,
}

impl OrPart {
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

/// Parsed derived query: subject modifiers, OR-groups of ANDed parts, static sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartTree {
    source: String,
    subject: Subject,
    predicate: Vec<OrPart>,
    sort: Sort,
}

fn prefix_regex() -> &'static Regex {
    static PREFIX_REGEX: OnceLock<Regex> = OnceLock::new();
    PREFIX_REGEX.get_or_init(|| {
        Regex::new(r"^(find|read|get|query|search|stream|count|exists|delete|remove)(\p{Lu}.*?)??By")
            .expect("prefix pattern is valid")
    })
}

fn limit_regex() -> &'static Regex {
    static LIMIT_REGEX: OnceLock<Regex> = OnceLock::new();
    LIMIT_REGEX.get_or_init(|| {
        Regex::new(r"(First|Top)(\d*)(\p{Lu}|$)").expect("limit pattern is valid")
    })
}

impl PartTree {
    /// Parse a derived-query method name
    pub fn parse(method_name: &str) -> Result<Self> {
        let invalid = |message: String| QueryError::invalid(method_name, message);

        let captures = prefix_regex().captures(method_name).ok_or_else(|| {
            invalid("expected a find/count/exists/delete prefix followed by 'By'".to_string())
        })?;
        let prefix = captures.get(1).map_or("", |m| m.as_str());
        let subject_text = captures.get(2).map_or("", |m| m.as_str());
        let remainder = &method_name[captures.get(0).map_or(0, |m| m.end())..];

        let subject = parse_subject(prefix, subject_text).map_err(invalid)?;

        let sections = split_keyword(remainder, "OrderBy");
        if sections.len() > 2 {
            return Err(invalid("'OrderBy' must not be used more than once".to_string()).into());
        }
        let (predicate_text, mut all_ignore_case) = strip_all_ignore_case(sections[0]);
        let sort = match sections.get(1) {
            Some(order_text) => {
                let (order_text, trailing) = strip_all_ignore_case(order_text);
                all_ignore_case |= trailing;
                parse_orders(order_text).map_err(invalid)?
            }
            None => Sort::unsorted(),
        };

        let mut predicate = Vec::new();
        if !predicate_text.is_empty() {
            for or_text in split_keyword(predicate_text, "Or") {
                let mut parts = Vec::new();
                for part_text in split_keyword(or_text, "And") {
                    parts.push(parse_part(part_text, all_ignore_case).map_err(invalid)?);
                }
                predicate.push(OrPart { parts });
            }
        }

        Ok(Self {
            source: method_name.to_string(),
            subject,
            predicate,
            sort,
        })
    }

    /// The method name this tree was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn is_count(&self) -> bool {
        self.subject.kind == SubjectKind::Count
    }

    pub fn is_exists(&self) -> bool {
        self.subject.kind == SubjectKind::Exists
    }

    pub fn is_delete(&self) -> bool {
        self.subject.kind == SubjectKind::Delete
    }

    pub fn is_distinct(&self) -> bool {
        self.subject.distinct
    }

    /// Row limit from `First<N>` / `Top<N>`
    pub fn max_results(&self) -> Option<usize> {
        self.subject.max_results
    }

    pub fn is_limiting(&self) -> bool {
        self.subject.max_results.is_some()
    }

    /// OR-groups in method-name order
    pub fn or_parts(&self) -> &[OrPart] {
        &self.predicate
    }

    /// All parts in method-name order
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.predicate.iter().flat_map(|group| group.parts.iter())
    }

    /// Static sort from `OrderBy`
    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Number of method arguments the parts bind
    pub fn number_of_arguments(&self) -> usize {
        self.parts().map(Part::number_of_arguments).sum()
    }

    /// Check every part and sort property against the entity's readable properties
    pub fn validate_properties<T: Entity>(&self) -> Result<()> {
        let properties = self
            .parts()
            .map(Part::property)
            .chain(self.sort.iter().map(|o| o.property.as_str()));
        for property in properties {
            if !T::has_property(property) {
                return Err(QueryError::invalid(
                    &self.source,
                    format!("No property '{}' found on '{}'", property, T::entity_name()),
                )
                .into());
            }
        }
        Ok(())
    }
}

fn parse_subject(prefix: &str, text: &str) -> std::result::Result<Subject, String> {
    let kind = match prefix {
        "count" => SubjectKind::Count,
        "exists" => SubjectKind::Exists,
        "delete" | "remove" => SubjectKind::Delete,
        _ => SubjectKind::Find,
    };
    let distinct = text.contains("Distinct");

    let max_results = match limit_regex().captures(text) {
        Some(_) if kind != SubjectKind::Find => {
            return Err(format!("'First'/'Top' cannot be combined with '{}'", prefix));
        }
        Some(captures) => {
            let digits = captures.get(2).map_or("", |m| m.as_str());
            let limit = if digits.is_empty() {
                1
            } else {
                digits
                    .parse::<usize>()
                    .map_err(|e| format!("invalid result limit '{}': {}", digits, e))?
            };
            if limit == 0 {
                return Err("result limit must be greater than zero".to_string());
            }
            Some(limit)
        }
        None => None,
    };

    Ok(Subject {
        kind,
        distinct,
        max_results,
    })
}

fn strip_all_ignore_case(text: &str) -> (&str, bool) {
    for suffix in ["AllIgnoreCase", "AllIgnoringCase"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            return (stripped, true);
        }
    }
    (text, false)
}

fn parse_part(text: &str, all_ignore_case: bool) -> std::result::Result<Part, String> {
    if text.is_empty() {
        return Err("empty predicate part".to_string());
    }

    let (text, ignore_case) = ["IgnoreCase", "IgnoringCase"]
        .iter()
        .find_map(|suffix| text.strip_suffix(suffix).map(|t| (t, true)))
        .unwrap_or((text, false));

    let (head, tail) = match text.rfind('_') {
        Some(index) => (Some(&text[..index]), &text[index + 1..]),
        None => (None, text),
    };

    let (property_text, part_type, keyword) = match head {
        // Trailing underscore: no keyword, the whole head is the property
        Some(head) if tail.is_empty() => (head.to_string(), PartType::Equal, None),
        Some(head) => match exact_keyword(tail) {
            Some((part_type, keyword)) => (head.to_string(), part_type, Some(keyword)),
            None => {
                let (property, part_type, keyword) = PartType::detect(tail);
                (format!("{}_{}", head, property), part_type, keyword)
            }
        },
        None => {
            let (property, part_type, keyword) = PartType::detect(tail);
            (property.to_string(), part_type, keyword)
        }
    };

    if !part_type.is_supported() {
        return Err(format!(
            "keyword '{}' ({}) is not supported",
            keyword.unwrap_or_default(),
            part_type
        ));
    }
    if ignore_case && part_type.is_ordering() {
        return Err(format!("ignore case is not supported for {}", part_type));
    }

    let property = property_path(&property_text)?;
    // AllIgnoreCase only applies where case folding is defined
    let ignore_case = ignore_case || (all_ignore_case && !part_type.is_ordering());
    Ok(Part::new(property, part_type, ignore_case))
}

fn exact_keyword(text: &str) -> Option<(PartType, &'static str)> {
    let prefixed = format!("X{}", text);
    let (property, part_type, keyword) = PartType::detect(&prefixed);
    match keyword {
        Some(keyword) if property == "X" => Some((part_type, keyword)),
        _ => None,
    }
}

fn parse_orders(text: &str) -> std::result::Result<Sort, String> {
    if text.is_empty() {
        return Err("'OrderBy' requires at least one property".to_string());
    }

    let mut orders = Vec::new();
    let mut start = 0;
    for (index, c) in text.char_indices().skip(1) {
        let before = &text[start..index];
        if c.is_uppercase() && (before.ends_with("Asc") || before.ends_with("Desc")) {
            orders.push(parse_order(before)?);
            start = index;
        }
    }
    orders.push(parse_order(&text[start..])?);
    Ok(Sort::by(orders))
}

fn parse_order(text: &str) -> std::result::Result<Order, String> {
    let (property, direction) = if let Some(p) = text.strip_suffix("Desc") {
        (p, Direction::Desc)
    } else if let Some(p) = text.strip_suffix("Asc") {
        (p, Direction::Asc)
    } else {
        (text, Direction::Asc)
    };
    Ok(Order::new(property_path(property)?, direction))
}

/// `Address_ZipCode` -> `address.zip_code`
fn property_path(text: &str) -> std::result::Result<String, String> {
    let mut segments = Vec::new();
    for segment in text.split('_') {
        if segment.is_empty() || !segment.chars().all(char::is_alphanumeric) {
            return Err(format!("invalid property reference '{}'", text));
        }
        segments.push(to_snake_case(segment));
    }
    Ok(segments.join("."))
}

fn to_snake_case(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::with_capacity(segment.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Split `source` at every `keyword` that is followed by an upper-case letter
fn split_keyword<'a>(source: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut search = 0;
    while let Some(found) = source[search..].find(keyword) {
        let at = search + found;
        let after = at + keyword.len();
        let followed_by_upper = source[after..].chars().next().is_some_and(char::is_uppercase);
        if followed_by_upper {
            pieces.push(&source[start..at]);
            start = after;
        }
        search = after;
    }
    pieces.push(&source[start..]);
    pieces
}
