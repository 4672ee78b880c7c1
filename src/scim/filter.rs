//! SCIM 2.0 Filter Parser
//!
//! Parses SCIM filter expressions (RFC 7644 Section 3.4.2) against a fixed
//! per-resource attribute vocabulary.
//!
//! ## Grammar
//!
//! ```text
//! filter      = logical_or
//! logical_or  = logical_and { "or" logical_and }
//! logical_and = expr { "and" expr }
//! expr        = "(" logical_or ")" | attribute "pr" | attribute OP literal
//! literal     = STRING | DATETIME | "true" | "false"
//! ```
//!
//! Which operators and literals an attribute accepts depends on its
//! [`AttrKind`]: strings take `eq`, `co`, `sw`; dates take `eq`, `gt`, `ge`,
//! `lt`, `le`; booleans, the primary key and the password take `eq` only.
//! Every attribute accepts `pr`.
//!
//! ## Examples
//!
//! ```text
//! userName eq "bob@example.com/123"
//! name.familyName co "ford" and active eq true
//! meta.created gt "2024-01-01T00:00:00Z"
//! (givenName sw "R" or emails pr) and password eq "secret"
//! ```

use std::{collections::HashMap, fmt, sync::LazyLock};

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use super::{
    attr_path::AttrPath,
    error::{ScimError, ScimResult},
    types::{SCHEMA_GROUP, SCHEMA_USER},
};

/// Default maximum length of a filter expression (bytes).
pub const DEFAULT_MAX_FILTER_LENGTH: usize = 4096;

/// Maximum parenthesis nesting depth.
pub const MAX_FILTER_DEPTH: usize = 32;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[Zz]?$").unwrap());

/// Filter vocabulary for Users.
pub static USER_GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| {
    Grammar::new(
        "User",
        SCHEMA_USER,
        &[
            ("userName", ScimAttr::UserName),
            ("externalId", ScimAttr::ExternalId),
            ("name.givenName", ScimAttr::GivenName),
            ("givenName", ScimAttr::GivenName),
            ("name.familyName", ScimAttr::FamilyName),
            ("familyName", ScimAttr::FamilyName),
            ("password", ScimAttr::Password),
            ("id", ScimAttr::Id),
            ("meta.created", ScimAttr::Created),
            ("created", ScimAttr::Created),
            ("emails.value", ScimAttr::Email),
            ("emails", ScimAttr::Email),
            ("active", ScimAttr::Active),
        ],
    )
});

/// Filter vocabulary for Groups.
pub static GROUP_GRAMMAR: LazyLock<Grammar> = LazyLock::new(|| {
    Grammar::new(
        "Group",
        SCHEMA_GROUP,
        &[
            ("displayName", ScimAttr::DisplayName),
            ("name", ScimAttr::DisplayName),
            ("id", ScimAttr::Id),
        ],
    )
});

/// Logical attributes a filter can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScimAttr {
    UserName,
    ExternalId,
    GivenName,
    FamilyName,
    Password,
    Id,
    Created,
    Email,
    Active,
    DisplayName,
}

/// Value domain of an attribute, which fixes its operators and literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    String,
    Date,
    Boolean,
    PrimaryKey,
    Password,
}

impl ScimAttr {
    pub fn kind(self) -> AttrKind {
        match self {
            ScimAttr::UserName
            | ScimAttr::ExternalId
            | ScimAttr::GivenName
            | ScimAttr::FamilyName
            | ScimAttr::Email
            | ScimAttr::DisplayName => AttrKind::String,
            ScimAttr::Password => AttrKind::Password,
            ScimAttr::Id => AttrKind::PrimaryKey,
            ScimAttr::Created => AttrKind::Date,
            ScimAttr::Active => AttrKind::Boolean,
        }
    }

    /// Comparisons on this attribute should run after cheaper predicates.
    pub fn is_expensive(self) -> bool {
        self.kind() == AttrKind::Password
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScimAttr::UserName => "userName",
            ScimAttr::ExternalId => "externalId",
            ScimAttr::GivenName => "name.givenName",
            ScimAttr::FamilyName => "name.familyName",
            ScimAttr::Password => "password",
            ScimAttr::Id => "id",
            ScimAttr::Created => "meta.created",
            ScimAttr::Email => "emails.value",
            ScimAttr::Active => "active",
            ScimAttr::DisplayName => "displayName",
        }
    }
}

impl fmt::Display for ScimAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed SCIM filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Attribute comparison (e.g., `userName eq "john"`)
    Compare {
        attr: ScimAttr,
        op: CompareOp,
        value: FilterValue,
    },
    /// Attribute presence check (e.g., `emails pr`)
    Present { attr: ScimAttr },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    /// Whether any leaf of this expression is expensive to evaluate.
    pub fn is_expensive(&self) -> bool {
        match self {
            Filter::Compare { attr, .. } => attr.is_expensive(),
            Filter::Present { .. } => false,
            Filter::And(l, r) | Filter::Or(l, r) => l.is_expensive() || r.is_expensive(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare { attr, op, value } => write!(f, "{} {} {}", attr, op, value),
            Filter::Present { attr } => write!(f, "{} pr", attr),
            Filter::And(left, right) => write!(f, "({} and {})", left, right),
            Filter::Or(left, right) => write!(f, "({} or {})", left, right),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Co,
    Sw,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(CompareOp::Eq),
            "co" => Some(CompareOp::Co),
            "sw" => Some(CompareOp::Sw),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            _ => None,
        }
    }

    /// Whether the operator is defined for the given attribute kind.
    pub fn applies_to(self, kind: AttrKind) -> bool {
        match kind {
            AttrKind::String => matches!(self, CompareOp::Eq | CompareOp::Co | CompareOp::Sw),
            AttrKind::Date => !matches!(self, CompareOp::Co | CompareOp::Sw),
            AttrKind::Boolean | AttrKind::PrimaryKey | AttrKind::Password => self == CompareOp::Eq,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "eq",
            CompareOp::Co => "co",
            CompareOp::Sw => "sw",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        };
        f.write_str(s)
    }
}

/// Literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    DateTime(DateTime<Utc>),
    Bool(bool),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            FilterValue::DateTime(dt) => write!(f, "\"{}\"", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            FilterValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Filter parsing error.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParseError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for FilterParseError {}

impl From<FilterParseError> for ScimError {
    fn from(err: FilterParseError) -> Self {
        ScimError::invalid_filter(format!("Invalid filter/search query: {}", err))
    }
}

/// Attribute vocabulary of one resource type.
#[derive(Debug)]
pub struct Grammar {
    resource: &'static str,
    schema_uri: &'static str,
    /// Lower-cased `attr` or `attr.sub` -> attribute
    attributes: HashMap<String, ScimAttr>,
}

impl Grammar {
    fn new(
        resource: &'static str,
        schema_uri: &'static str,
        aliases: &[(&str, ScimAttr)],
    ) -> Self {
        let attributes = aliases
            .iter()
            .map(|(alias, attr)| (alias.to_ascii_lowercase(), *attr))
            .collect();
        Self {
            resource,
            schema_uri,
            attributes,
        }
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// Look up an attribute name, with or without this resource's schema URN.
    pub fn resolve(&self, name: &str) -> Option<ScimAttr> {
        let path = AttrPath::parse(name).ok()?;
        if path.is_complex() {
            return None;
        }
        let segment = path.first_path();
        if !segment.in_schema(self.schema_uri) {
            return None;
        }
        let key = match &segment.sub_attr {
            Some(sub) => format!("{}.{}", segment.attr, sub),
            None => segment.attr.clone(),
        };
        self.attributes.get(&key.to_ascii_lowercase()).copied()
    }

    /// Parse a filter, rejecting input longer than `max_length` bytes.
    pub fn parse(&self, input: &str, max_length: usize) -> ScimResult<Filter> {
        Ok(self.parse_inner(input, max_length)?)
    }

    fn parse_inner(&self, input: &str, max_length: usize) -> Result<Filter, FilterParseError> {
        if input.len() > max_length {
            return Err(FilterParseError {
                message: format!(
                    "Filter exceeds maximum length ({} bytes, max {})",
                    input.len(),
                    max_length
                ),
                position: 0,
            });
        }

        let mut parser = Parser::new(self, input);
        let filter = parser.parse_or_expr()?;

        parser.skip_whitespace();
        if parser.position < parser.input.len() {
            return Err(FilterParseError {
                message: format!("Unexpected input: '{}'", &parser.input[parser.position..]),
                position: parser.position,
            });
        }

        Ok(filter)
    }
}

/// Parse a User filter with the default length limit.
pub fn parse_user_filter(input: &str) -> ScimResult<Filter> {
    USER_GRAMMAR.parse(input, DEFAULT_MAX_FILTER_LENGTH)
}

/// Parse a Group filter with the default length limit.
pub fn parse_group_filter(input: &str) -> ScimResult<Filter> {
    GROUP_GRAMMAR.parse(input, DEFAULT_MAX_FILTER_LENGTH)
}

// =============================================================================
// Parser Implementation
// =============================================================================

struct Parser<'a> {
    grammar: &'a Grammar,
    input: &'a str,
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(grammar: &'a Grammar, input: &'a str) -> Self {
        Self {
            grammar,
            input,
            position: 0,
            depth: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> FilterParseError {
        FilterParseError {
            message: message.into(),
            position: self.position,
        }
    }

    fn enter_scope(&mut self) -> Result<(), FilterParseError> {
        self.depth += 1;
        if self.depth > MAX_FILTER_DEPTH {
            return Err(self.error(format!(
                "Filter exceeds maximum nesting depth ({})",
                MAX_FILTER_DEPTH
            )));
        }
        Ok(())
    }

    fn exit_scope(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // logical_or = logical_and { "or" logical_and }
    fn parse_or_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_and_expr()?;

        while self.try_keyword("or") {
            let right = self.parse_and_expr()?;
            left = Filter::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    // logical_and = expr { "and" expr }
    fn parse_and_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_expr()?;

        while self.try_keyword("and") {
            let right = self.parse_expr()?;
            left = Filter::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    // expr = "(" logical_or ")" | attrExpr
    fn parse_expr(&mut self) -> Result<Filter, FilterParseError> {
        self.skip_whitespace();

        if self.try_char('(') {
            self.enter_scope()?;
            let inner = self.parse_or_expr()?;
            self.exit_scope();
            self.skip_whitespace();
            if !self.try_char(')') {
                return Err(self.error("Expected ')' to close grouped expression"));
            }
            return Ok(inner);
        }

        self.parse_attr_expr()
    }

    // attrExpr = attribute "pr" | attribute OP literal
    fn parse_attr_expr(&mut self) -> Result<Filter, FilterParseError> {
        let attr = self.parse_attribute()?;

        if self.try_keyword("pr") {
            return Ok(Filter::Present { attr });
        }

        let op = self.parse_compare_op()?;
        if !op.applies_to(attr.kind()) {
            return Err(FilterParseError {
                message: format!("Operator '{}' is not supported for '{}'", op, attr),
                position: self.position,
            });
        }

        self.skip_whitespace();
        let value = self.parse_literal(attr)?;

        Ok(Filter::Compare { attr, op, value })
    }

    fn parse_attribute(&mut self) -> Result<ScimAttr, FilterParseError> {
        self.skip_whitespace();

        let start = self.position;
        if !self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            return Err(self.error("Expected attribute name"));
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '_' | '-'))
        {
            self.advance();
        }

        let name = &self.input[start..self.position];
        self.grammar.resolve(name).ok_or_else(|| FilterParseError {
            message: format!("Unknown {} attribute '{}'", self.grammar.resource, name),
            position: start,
        })
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp, FilterParseError> {
        self.skip_whitespace();

        let start = self.position;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }

        let op_str = &self.input[start..self.position];
        CompareOp::from_str(op_str).ok_or_else(|| FilterParseError {
            message: format!("Unknown operator: '{}'", op_str),
            position: start,
        })
    }

    fn parse_literal(&mut self, attr: ScimAttr) -> Result<FilterValue, FilterParseError> {
        match attr.kind() {
            AttrKind::Boolean => {
                if self.try_keyword("true") {
                    Ok(FilterValue::Bool(true))
                } else if self.try_keyword("false") {
                    Ok(FilterValue::Bool(false))
                } else {
                    Err(self.error(format!("Expected true or false for '{}'", attr)))
                }
            }
            AttrKind::Date => {
                let start = self.position;
                let raw = self.parse_string()?;
                parse_datetime(&raw).ok_or_else(|| FilterParseError {
                    message: format!("Invalid date-time literal \"{}\"", raw),
                    position: start,
                })
            }
            AttrKind::String | AttrKind::PrimaryKey | AttrKind::Password => {
                Ok(FilterValue::String(self.parse_string()?))
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, FilterParseError> {
        if !self.try_char('"') {
            return Err(self.error("Expected '\"' to start string"));
        }

        let mut value = String::new();

        loop {
            match self.peek() {
                None => return Err(self.error("Unterminated string")),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some(c @ ('"' | '\\')) => {
                            value.push(c);
                            self.advance();
                        }
                        _ => return Err(self.error("Invalid escape sequence")),
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(value)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn try_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();

        let remaining = &self.input[self.position..];
        let Some(head) = remaining.get(..keyword.len()) else {
            return false;
        };

        if head.eq_ignore_ascii_case(keyword) {
            // Not a prefix of a longer identifier
            let after = remaining[keyword.len()..].chars().next();
            if after.is_none_or(|c| !c.is_ascii_alphanumeric()) {
                self.position += keyword.len();
                return true;
            }
        }

        false
    }
}

fn parse_datetime(raw: &str) -> Option<FilterValue> {
    if !DATE_RE.is_match(raw) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(&raw[..19], "%Y-%m-%dT%H:%M:%S").ok()?;
    Some(FilterValue::DateTime(naive.and_utc()))
}

// =============================================================================
// Tests
// =============================================================================
