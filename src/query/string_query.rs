//! Declared queries in SQL-predicate syntax
//!
//! A declared query is a condition such as
//! `firstname = %s AND (age >= %s OR lastname LIKE 'M%%')`. Each `%s` is a
//! positional placeholder; the argument bound to it keeps its own
//! [`FieldValue`] type and is never rendered back to text. Inside a quoted
//! literal `%%` is a single `%`.
//!
//! Supported syntax: `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`, `[NOT] LIKE`,
//! `ILIKE`, `IS [NOT] NULL`, `[NOT] BETWEEN a AND b`, `[NOT] IN (a, b, ..)`,
//! `NOT`, `AND`, `OR` and parentheses. Literals are single-quoted strings
//! (`''` escapes a quote), numbers, `true`, `false` and `null`. Keywords are
//! case-insensitive.

use crate::core::error::{QueryError, Result};
use crate::core::field::FieldValue;
use crate::query::predicate::{Predicate, Predicates};

/// A declared query bound to one repository method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringQuery {
    method: String,
    template: String,
    placeholders: usize,
}

impl StringQuery {
    /// Check the template once: the placeholder count must match the
    /// number of value parameters
    pub fn new(method: impl Into<String>, template: impl Into<String>, parameters: usize) -> Result<Self> {
        let method = method.into();
        let template = template.into();
        let placeholders = tokenize(&method, &template)?
            .iter()
            .filter(|token| matches!(token, Token::Placeholder(_)))
            .count();
        if placeholders != parameters {
            return Err(QueryError::invalid(
                &method,
                format!(
                    "query has {} placeholder(s) but the method declares {} value parameter(s)",
                    placeholders, parameters
                ),
            )
            .into());
        }
        let query = Self {
            method,
            template,
            placeholders,
        };
        // Surface syntax errors at compile time; null keeps every value
        // position valid
        query.bind(&vec![FieldValue::Null; placeholders])?;
        Ok(query)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of `%s` placeholders
    pub fn placeholders(&self) -> usize {
        self.placeholders
    }

    /// Parse the template with `values` substituted into its placeholders
    pub fn bind(&self, values: &[FieldValue]) -> Result<Predicate> {
        if values.len() != self.placeholders {
            let message = if values.len() < self.placeholders {
                "more placeholders than arguments"
            } else {
                "more arguments than placeholders"
            };
            return Err(QueryError::ArgumentMismatch {
                method: self.method.clone(),
                message: message.to_string(),
            }
            .into());
        }
        tracing::trace!(method = %self.method, query = %self.template, ?values, "binding declared query");
        Parser::new(&self.method, &self.template, values)?.parse()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(FieldValue),
    Op(&'static str),
    /// Position of a `%s` in the argument list
    Placeholder(usize),
    LParen,
    RParen,
    Comma,
}

fn tokenize(method: &str, text: &str) -> Result<Vec<Token>> {
    let invalid = |message: String| QueryError::invalid(method, message);
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut placeholders = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '%' if chars.get(i + 1) == Some(&'s') => {
                tokens.push(Token::Placeholder(placeholders));
                placeholders += 1;
                i += 2;
            }
            '\'' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            value.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some('%') if chars.get(i + 1) == Some(&'%') => {
                            value.push('%');
                            i += 2;
                        }
                        Some(c) => {
                            value.push(*c);
                            i += 1;
                        }
                        None => return Err(invalid("unterminated string literal".to_string()).into()),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '=' => {
                tokens.push(Token::Op("="));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op("!="));
                i += 2;
            }
            '<' => {
                let (op, len) = match chars.get(i + 1) {
                    Some('=') => ("<=", 2),
                    Some('>') => ("!=", 2),
                    _ => ("<", 1),
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            '>' => {
                let (op, len) = match chars.get(i + 1) {
                    Some('=') => (">=", 2),
                    _ => (">", 1),
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = if text.contains('.') {
                    text.parse::<f64>().map(FieldValue::Float).map_err(|e| e.to_string())
                } else {
                    text.parse::<i64>().map(FieldValue::Integer).map_err(|e| e.to_string())
                }
                .map_err(|e| invalid(format!("invalid number '{}': {}", text, e)))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(invalid(format!("unexpected character '{}'", other)).into());
            }
        }
    }
    Ok(tokens)
}

/// Recursive-descent parser: OR binds loosest, then AND, then NOT
struct Parser<'a> {
    method: &'a str,
    tokens: Vec<Token>,
    values: &'a [FieldValue],
    position: usize,
}

impl<'a> Parser<'a> {
    fn new(method: &'a str, text: &str, values: &'a [FieldValue]) -> Result<Self> {
        Ok(Self {
            method,
            tokens: tokenize(method, text)?,
            values,
            position: 0,
        })
    }

    fn parse(mut self) -> Result<Predicate> {
        if self.tokens.is_empty() {
            return Err(self.error("empty query"));
        }
        let predicate = self.or()?;
        match self.peek() {
            None => Ok(predicate),
            Some(token) => Err(self.error(&format!("unexpected {:?}", token))),
        }
    }

    fn error(&self, message: &str) -> crate::core::error::RepositoryError {
        QueryError::invalid(self.method, message).into()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", keyword)))
        }
    }

    fn argument(&self, index: usize) -> Result<FieldValue> {
        self.values.get(index).cloned().ok_or_else(|| {
            QueryError::ArgumentMismatch {
                method: self.method.to_string(),
                message: format!("no argument for placeholder {}", index + 1),
            }
            .into()
        })
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            other => Err(self.error(&format!("expected {:?}, found {:?}", expected, other))),
        }
    }

    fn or(&mut self) -> Result<Predicate> {
        let mut operands = vec![self.and()?];
        while self.eat_keyword("or") {
            operands.push(self.and()?);
        }
        Ok(collapse(operands, Predicates::or))
    }

    fn and(&mut self) -> Result<Predicate> {
        let mut operands = vec![self.not()?];
        while self.eat_keyword("and") {
            operands.push(self.not()?);
        }
        Ok(collapse(operands, Predicates::and))
    }

    fn not(&mut self) -> Result<Predicate> {
        if self.eat_keyword("not") {
            return Ok(Predicates::not(self.not()?));
        }
        if self.peek() == Some(&Token::LParen) {
            self.position += 1;
            let inner = self.or()?;
            self.expect(Token::RParen)?;
            return Ok(inner);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Predicate> {
        let attribute = match self.advance() {
            Some(Token::Ident(name)) => name,
            other => return Err(self.error(&format!("expected an attribute, found {:?}", other))),
        };

        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(if negated {
                Predicates::is_not_null(attribute)
            } else {
                Predicates::is_null(attribute)
            });
        }

        let negated = self.eat_keyword("not");
        if self.eat_keyword("like") {
            let pattern = self.pattern()?;
            let like = Predicates::like(attribute, pattern)?;
            return Ok(negate(like, negated));
        }
        if self.eat_keyword("ilike") {
            let pattern = self.pattern()?;
            let like = Predicates::ilike(attribute, pattern)?;
            return Ok(negate(like, negated));
        }
        if self.eat_keyword("between") {
            let from = self.value()?;
            self.expect_keyword("and")?;
            let to = self.value()?;
            return Ok(negate(Predicates::between(attribute, from, to), negated));
        }
        if self.eat_keyword("in") {
            self.expect(Token::LParen)?;
            let mut values = vec![self.value()?];
            while self.peek() == Some(&Token::Comma) {
                self.position += 1;
                values.push(self.value()?);
            }
            self.expect(Token::RParen)?;
            return Ok(negate(Predicates::in_list(attribute, values), negated));
        }
        if negated {
            return Err(self.error("expected LIKE, ILIKE, BETWEEN or IN after NOT"));
        }

        let op = match self.advance() {
            Some(Token::Op(op)) => op,
            other => return Err(self.error(&format!("expected an operator, found {:?}", other))),
        };
        let value = self.value()?;
        Ok(match op {
            "=" => Predicates::equal(attribute, value),
            "!=" => Predicates::not_equal(attribute, value),
            "<" => Predicates::less_than(attribute, value),
            "<=" => Predicates::less_equal(attribute, value),
            ">" => Predicates::greater_than(attribute, value),
            _ => Predicates::greater_equal(attribute, value),
        })
    }

    fn pattern(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::Str(value)) => Ok(value),
            Some(Token::Placeholder(index)) => match self.argument(index)? {
                FieldValue::String(value) => Ok(value),
                // Null only matches the empty string
                FieldValue::Null => Ok(String::new()),
                other => Err(QueryError::ArgumentMismatch {
                    method: self.method.to_string(),
                    message: format!("pattern argument must be a string, got {}", other.kind()),
                }
                .into()),
            },
            other => Err(self.error(&format!("expected a pattern, found {:?}", other))),
        }
    }

    fn value(&mut self) -> Result<FieldValue> {
        match self.advance() {
            Some(Token::Str(value)) => Ok(FieldValue::String(value)),
            Some(Token::Number(number)) => Ok(number),
            Some(Token::Placeholder(index)) => self.argument(index),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("true") => Ok(FieldValue::Boolean(true)),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("false") => Ok(FieldValue::Boolean(false)),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("null") => Ok(FieldValue::Null),
            other => Err(self.error(&format!("expected a literal, found {:?}", other))),
        }
    }
}

fn collapse(mut operands: Vec<Predicate>, combine: fn(Vec<Predicate>) -> Predicate) -> Predicate {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        combine(operands)
    }
}

fn negate(predicate: Predicate, negated: bool) -> Predicate {
    if negated {
        Predicates::not(predicate)
    } else {
        predicate
    }
}
