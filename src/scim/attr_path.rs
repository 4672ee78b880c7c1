//! SCIM Attribute Path Resolution
//!
//! Resolves the `path` of a PATCH operation (RFC 7644 Section 3.5.2) into an
//! ordered list of `(attribute, sub_attribute, schema_uri)` segments.
//!
//! Simple and namespaced paths resolve to a single segment:
//!
//! ```text
//! userName                                   -> (userName, None, None)
//! name.familyName                            -> (name, familyName, None)
//! urn:...:enterprise:2.0:User:department     -> (department, None, urn:...:enterprise:2.0:User)
//! ```
//!
//! A bracketed value filter yields the filter's own attribute(s) followed by
//! the target, all sharing the top-level attribute:
//!
//! ```text
//! addresses[type eq "work"].country -> (addresses, type, None), (addresses, country, None)
//! members[value eq "6784"]          -> (members, value, None), (members, None, None)
//! ```

use std::{fmt, sync::LazyLock};

use regex::Regex;

use super::error::{ScimError, ScimResult};

/// Attribute token: optional schema URN prefix, attribute, optional sub-attribute.
static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<uri>[a-zA-Z]+:[a-zA-Z0-9:\._-]+):)?(?P<attr>[a-zA-Z][a-zA-Z0-9_-]*)(?:\.(?P<subattr>[a-zA-Z][a-zA-Z0-9_-]*))?",
    )
    .unwrap()
});

static SUB_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.([a-zA-Z][a-zA-Z0-9_-]*)$").unwrap());

/// Words inside a value filter that are operators or literals, not attributes.
const FILTER_KEYWORDS: &[&str] = &[
    "and", "or", "not", "eq", "ne", "co", "sw", "ew", "gt", "ge", "lt", "le", "pr", "true",
    "false", "null",
];

/// One resolved `(attribute, sub_attribute, schema_uri)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttrPathSegment {
    pub attr: String,
    pub sub_attr: Option<String>,
    pub uri: Option<String>,
}

impl AttrPathSegment {
    pub fn new(attr: &str, sub_attr: Option<&str>, uri: Option<&str>) -> Self {
        Self {
            attr: attr.to_string(),
            sub_attr: sub_attr.map(str::to_string),
            uri: uri.map(str::to_string),
        }
    }

    /// Case-insensitive comparison against an attribute / sub-attribute pair.
    ///
    /// The schema URI is not compared; callers check it separately when it matters.
    pub fn matches(&self, attr: &str, sub_attr: Option<&str>) -> bool {
        if !self.attr.eq_ignore_ascii_case(attr) {
            return false;
        }
        match (self.sub_attr.as_deref(), sub_attr) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }

    /// True when the segment has no URI or carries the given schema URI.
    pub fn in_schema(&self, schema_uri: &str) -> bool {
        self.uri
            .as_deref()
            .is_none_or(|uri| uri.eq_ignore_ascii_case(schema_uri))
    }
}

impl fmt::Display for AttrPathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(uri) = &self.uri {
            write!(f, "{}:", uri)?;
        }
        write!(f, "{}", self.attr)?;
        if let Some(sub) = &self.sub_attr {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

/// A resolved attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPath {
    raw: String,
    segments: Vec<AttrPathSegment>,
    complex: bool,
}

impl AttrPath {
    /// Resolve a path string.
    pub fn parse(path: &str) -> ScimResult<Self> {
        let trimmed = path.trim();
        let caps = PATH_RE
            .captures(trimmed)
            .ok_or_else(|| ScimError::bad_request("No attribute path found in request"))?;

        let head_len = caps.get(0).map_or(0, |m| m.end());
        let uri = caps.name("uri").map(|m| m.as_str());
        let attr = caps.name("attr").map_or("", |m| m.as_str());
        let sub_attr = caps.name("subattr").map(|m| m.as_str());
        let rest = &trimmed[head_len..];

        if rest.is_empty() {
            return Ok(Self {
                raw: trimmed.to_string(),
                segments: vec![AttrPathSegment::new(attr, sub_attr, uri)],
                complex: false,
            });
        }

        if !rest.starts_with('[') || sub_attr.is_some() {
            return Err(invalid_path(path));
        }

        let close = find_closing_bracket(rest).ok_or_else(|| invalid_path(path))?;
        let filter_attrs = scan_filter_attributes(&rest[1..close]).ok_or_else(|| invalid_path(path))?;
        if filter_attrs.is_empty() {
            return Err(invalid_path(path));
        }

        let mut segments: Vec<AttrPathSegment> = filter_attrs
            .iter()
            .map(|inner| AttrPathSegment::new(attr, Some(inner), uri))
            .collect();

        let after = &rest[close + 1..];
        let target = if after.is_empty() {
            AttrPathSegment::new(attr, None, uri)
        } else {
            let sub = SUB_ATTR_RE
                .captures(after)
                .and_then(|c| c.get(1))
                .ok_or_else(|| invalid_path(path))?;
            AttrPathSegment::new(attr, Some(sub.as_str()), uri)
        };
        segments.push(target);

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
            complex: true,
        })
    }

    /// The first segment; for complex paths this is the filter segment.
    pub fn first_path(&self) -> &AttrPathSegment {
        &self.segments[0]
    }

    /// Whether the path carried a bracketed value filter.
    pub fn is_complex(&self) -> bool {
        self.complex
    }

    pub fn segments(&self) -> &[AttrPathSegment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn invalid_path(path: &str) -> ScimError {
    ScimError::bad_request(format!("Invalid attribute path \"{}\"", path))
}

/// Index of the `]` closing the `[` at position 0, skipping quoted strings.
fn find_closing_bracket(s: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => return None,
            ']' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Attribute names referenced by a value filter, in order of appearance.
///
/// Returns `None` on an unterminated string literal.
fn scan_filter_attributes(filter: &str) -> Option<Vec<String>> {
    let chars: Vec<char> = filter.chars().collect();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == '(' || c == ')' {
            i += 1;
        } else if c == '"' {
            i += 1;
            let mut escaped = false;
            loop {
                let ch = *chars.get(i)?;
                i += 1;
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    break;
                }
            }
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '(' | ')' | '"')
            {
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            if !c.is_ascii_alphabetic() || FILTER_KEYWORDS.contains(&token.to_ascii_lowercase().as_str())
            {
                continue;
            }
            if let Some(attr) = PATH_RE.captures(&token).and_then(|caps| caps.name("attr")) {
                attrs.push(attr.as_str().to_string());
            }
        }
    }

    Some(attrs)
}
