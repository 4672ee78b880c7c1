//! SCIM Filter to SQL Translation
//!
//! Compiles a parsed [`Filter`] into a parameterized SQLite query over a
//! [`QuerySource`] (base table, joins and attribute-to-column map). Literals
//! are always bound through numbered placeholders (`?1`, `?2`, ...), so
//! parameter order is independent of where a fragment lands in the SQL text.
//!
//! ## Fragment shapes
//!
//! | filter                 | SQL                                         |
//! |------------------------|---------------------------------------------|
//! | string `eq`            | `UPPER(col) = UPPER(?n)`                    |
//! | string `co` / `sw`     | `col LIKE ?n ESCAPE '\'` (`%v%` / `v%`)     |
//! | date `eq gt ge lt le`  | `col = ?n`, `col > ?n`, ...                 |
//! | boolean / id `eq`      | `col = ?n`                                  |
//! | password `eq`          | digest comparison, see below                |
//! | string `pr`            | `(col IS NOT NULL AND col != '')`           |
//! | other `pr`             | `col IS NOT NULL`                           |
//!
//! `or` compiles to a union of the key sets matched by each side. `and`
//! compiles to `(l AND r)` unless one side is a password comparison; then the
//! cheap side is evaluated first in a CTE and the password digest is only
//! compared for the rows it kept.
//!
//! A comparison of `id` against something that is not an integer can never
//! match. That is propagated through `and`/`or`, and a filter that can never
//! match compiles to [`CompiledQuery::Empty`] so callers skip the database.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{
    error::{ScimError, ScimResult},
    filter::{AttrKind, CompareOp, Filter, FilterValue, ScimAttr},
    password::{HASHED_PASSWORD_LEN, hash_password},
};

/// Alias of the base table in every generated query.
pub const TABLE_ALIAS: &str = "a";

/// Name of the CTE used by unions and password reordering.
const CTE_NAME: &str = "matched";

/// SQL bind value types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

/// Table, joins and column map a filter is compiled against.
#[derive(Debug, Clone)]
pub struct QuerySource {
    table: String,
    joins: String,
    columns: HashMap<ScimAttr, String>,
}

impl QuerySource {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            joins: String::new(),
            columns: HashMap::new(),
        }
    }

    /// Map an attribute to a column expression, e.g. `a.username`.
    pub fn column(mut self, attr: ScimAttr, column: impl Into<String>) -> Self {
        self.columns.insert(attr, column.into());
        self
    }

    /// Extra `JOIN` clauses appended after the base table.
    pub fn joins(mut self, joins: impl Into<String>) -> Self {
        self.joins = joins.into();
        self
    }

    /// Users table
    pub fn users() -> Self {
        Self::new("users")
            .column(ScimAttr::Id, "a.id")
            .column(ScimAttr::UserName, "a.username")
            .column(ScimAttr::ExternalId, "a.external_id")
            .column(ScimAttr::GivenName, "a.first_name")
            .column(ScimAttr::FamilyName, "a.last_name")
            .column(ScimAttr::Email, "a.email")
            .column(ScimAttr::Password, "a.password")
            .column(ScimAttr::Active, "a.is_active")
            .column(ScimAttr::Created, "a.date_joined")
    }

    /// Groups table
    pub fn groups() -> Self {
        Self::new("user_groups")
            .column(ScimAttr::Id, "a.id")
            .column(ScimAttr::DisplayName, "a.name")
    }

    fn from_clause(&self) -> String {
        if self.joins.is_empty() {
            format!("{} {}", self.table, TABLE_ALIAS)
        } else {
            format!("{} {} {}", self.table, TABLE_ALIAS, self.joins)
        }
    }

    fn lookup(&self, attr: ScimAttr) -> ScimResult<&str> {
        self.columns.get(&attr).map(String::as_str).ok_or_else(|| {
            ScimError::invalid_filter(format!(
                "Invalid filter/search query: attribute '{}' cannot be searched",
                attr
            ))
        })
    }
}

/// Result of compiling a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledQuery {
    Select(SelectQuery),
    /// The filter cannot match any record
    Empty,
}

/// An executable `SELECT` with its ordered bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// `SELECT DISTINCT a.* ... ORDER BY a.id ASC`
    pub sql: String,
    /// Bind values; `params[i]` binds placeholder `?{i+1}`
    pub params: Vec<SqlValue>,
    from_clause: String,
    where_clause: String,
}

impl SelectQuery {
    /// Query counting every matching row.
    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM (SELECT DISTINCT {}.id FROM {} WHERE {})",
            TABLE_ALIAS, self.from_clause, self.where_clause
        )
    }

    /// The query restricted to one page, with the limit and offset bound last.
    pub fn paged(&self, limit: i64, offset: i64) -> (String, Vec<SqlValue>) {
        let limit_idx = self.params.len() + 1;
        let sql = format!(
            "{} LIMIT ?{} OFFSET ?{}",
            self.sql,
            limit_idx,
            limit_idx + 1
        );
        let mut params = self.params.clone();
        params.push(SqlValue::Integer(limit));
        params.push(SqlValue::Integer(offset));
        (sql, params)
    }

    pub fn where_clause(&self) -> &str {
        &self.where_clause
    }
}

/// Compile a filter against a query source.
pub fn compile(filter: &Filter, source: &QuerySource) -> ScimResult<CompiledQuery> {
    let mut ctx = TranslationContext::new(source);
    let fragment = ctx.translate(filter)?;

    let Fragment::Sql(where_clause) = fragment else {
        return Ok(CompiledQuery::Empty);
    };

    let from_clause = source.from_clause();
    let sql = format!(
        "SELECT DISTINCT {alias}.* FROM {from} WHERE {where_clause} ORDER BY {alias}.id ASC",
        alias = TABLE_ALIAS,
        from = from_clause,
    );

    Ok(CompiledQuery::Select(SelectQuery {
        sql,
        params: ctx.params,
        from_clause,
        where_clause,
    }))
}

/// Compiled predicate, or a marker for one that never matches.
#[derive(Debug, Clone, PartialEq)]
enum Fragment {
    Sql(String),
    Never,
}

struct TranslationContext<'a> {
    source: &'a QuerySource,
    params: Vec<SqlValue>,
}

impl<'a> TranslationContext<'a> {
    fn new(source: &'a QuerySource) -> Self {
        Self {
            source,
            params: Vec::new(),
        }
    }

    /// Bind a value and return its numbered placeholder.
    fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    fn translate(&mut self, filter: &Filter) -> ScimResult<Fragment> {
        match filter {
            Filter::Compare { attr, op, value } => self.translate_compare(*attr, *op, value),
            Filter::Present { attr } => self.translate_present(*attr),
            Filter::And(left, right) => self.translate_and(left, right),
            Filter::Or(left, right) => self.translate_or(left, right),
        }
    }

    fn translate_compare(
        &mut self,
        attr: ScimAttr,
        op: CompareOp,
        value: &FilterValue,
    ) -> ScimResult<Fragment> {
        let col = self.source.lookup(attr)?.to_string();

        let sql = match (attr.kind(), value) {
            (AttrKind::String, FilterValue::String(s)) => match op {
                CompareOp::Eq => {
                    let p = self.bind(SqlValue::Text(s.clone()));
                    format!("UPPER({}) = UPPER({})", col, p)
                }
                CompareOp::Co => {
                    let p = self.bind(SqlValue::Text(format!("%{}%", escape_like_pattern(s))));
                    format!("{} LIKE {} ESCAPE '\\'", col, p)
                }
                CompareOp::Sw => {
                    let p = self.bind(SqlValue::Text(format!("{}%", escape_like_pattern(s))));
                    format!("{} LIKE {} ESCAPE '\\'", col, p)
                }
                _ => return Err(unsupported(attr, op)),
            },
            (AttrKind::Date, FilterValue::DateTime(dt)) => {
                let sql_op = match op {
                    CompareOp::Eq => "=",
                    CompareOp::Gt => ">",
                    CompareOp::Ge => ">=",
                    CompareOp::Lt => "<",
                    CompareOp::Le => "<=",
                    CompareOp::Co | CompareOp::Sw => return Err(unsupported(attr, op)),
                };
                let p = self.bind(SqlValue::DateTime(*dt));
                format!("{} {} {}", col, sql_op, p)
            }
            (AttrKind::Boolean, FilterValue::Bool(b)) if op == CompareOp::Eq => {
                let p = self.bind(SqlValue::Bool(*b));
                format!("{} = {}", col, p)
            }
            (AttrKind::PrimaryKey, FilterValue::String(s)) if op == CompareOp::Eq => {
                let Ok(id) = s.trim().parse::<i64>() else {
                    return Ok(Fragment::Never);
                };
                let p = self.bind(SqlValue::Integer(id));
                format!("{} = {}", col, p)
            }
            (AttrKind::Password, FilterValue::String(s)) if op == CompareOp::Eq => {
                self.password_fragment(&col, s)
            }
            _ => return Err(unsupported(attr, op)),
        };

        Ok(Fragment::Sql(sql))
    }

    /// Digest comparison; the length check lets SQLite skip rows without a
    /// usable stored password.
    fn password_fragment(&mut self, col: &str, cleartext: &str) -> String {
        let p = self.bind(SqlValue::Text(hash_password(cleartext)));
        format!(
            "(LENGTH({col}) = {len} AND {col} = {p})",
            col = col,
            len = HASHED_PASSWORD_LEN,
            p = p
        )
    }

    fn translate_present(&mut self, attr: ScimAttr) -> ScimResult<Fragment> {
        let col = self.source.lookup(attr)?;
        let sql = match attr.kind() {
            AttrKind::String | AttrKind::Password => {
                format!("({} IS NOT NULL AND {} != '')", col, col)
            }
            AttrKind::Date | AttrKind::Boolean | AttrKind::PrimaryKey => {
                format!("{} IS NOT NULL", col)
            }
        };
        Ok(Fragment::Sql(sql))
    }

    fn translate_or(&mut self, left: &Filter, right: &Filter) -> ScimResult<Fragment> {
        let left = self.translate(left)?;
        let right = self.translate(right)?;

        let (left, right) = match (left, right) {
            (Fragment::Never, other) | (other, Fragment::Never) => return Ok(other),
            (Fragment::Sql(l), Fragment::Sql(r)) => (l, r),
        };

        let from = self.source.from_clause();
        Ok(Fragment::Sql(format!(
            "{a}.id IN (WITH {cte} AS (SELECT DISTINCT {a}.id FROM {from} WHERE {l} \
             UNION SELECT DISTINCT {a}.id FROM {from} WHERE {r}) SELECT DISTINCT id FROM {cte})",
            a = TABLE_ALIAS,
            cte = CTE_NAME,
            from = from,
            l = left,
            r = right,
        )))
    }

    fn translate_and(&mut self, left: &Filter, right: &Filter) -> ScimResult<Fragment> {
        match (password_leaf(left), password_leaf(right)) {
            (Some(password), None) => return self.translate_reordered_and(right, password),
            (None, Some(password)) => return self.translate_reordered_and(left, password),
            _ => {}
        }

        let left = self.translate(left)?;
        let right = self.translate(right)?;
        match (left, right) {
            (Fragment::Sql(l), Fragment::Sql(r)) => Ok(Fragment::Sql(format!("({} AND {})", l, r))),
            _ => Ok(Fragment::Never),
        }
    }

    /// `cheap AND password eq "..."`: filter on the cheap side first, then
    /// compare digests only over the surviving rows.
    fn translate_reordered_and(&mut self, cheap: &Filter, password: &str) -> ScimResult<Fragment> {
        let Fragment::Sql(cheap) = self.translate(cheap)? else {
            return Ok(Fragment::Never);
        };

        let col = self.source.lookup(ScimAttr::Password)?;
        let bare = col.rsplit('.').next().unwrap_or(col).to_string();
        let from = self.source.from_clause();
        let expensive = self.password_fragment(&format!("{}.{}", CTE_NAME, bare), password);

        Ok(Fragment::Sql(format!(
            "{a}.id IN (WITH {cte} AS (SELECT DISTINCT {a}.id, {a}.{bare} FROM {from} WHERE {cheap}) \
             SELECT DISTINCT {cte}.id FROM {cte} WHERE {expensive})",
            a = TABLE_ALIAS,
            cte = CTE_NAME,
            bare = bare,
            from = from,
            cheap = cheap,
            expensive = expensive,
        )))
    }
}

/// The literal of a `password eq "..."` leaf.
fn password_leaf(filter: &Filter) -> Option<&str> {
    match filter {
        Filter::Compare {
            attr: ScimAttr::Password,
            op: CompareOp::Eq,
            value: FilterValue::String(s),
        } => Some(s),
        _ => None,
    }
}

fn unsupported(attr: ScimAttr, op: CompareOp) -> ScimError {
    ScimError::invalid_filter(format!(
        "Invalid filter/search query: operator '{}' is not supported for '{}'",
        op, attr
    ))
}

/// Escape special characters in LIKE patterns.
/// Escapes: %, _, and \
fn escape_like_pattern(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scim::filter::{parse_group_filter, parse_user_filter};

    fn compile_user(filter: &str) -> CompiledQuery {
        compile(&parse_user_filter(filter).unwrap(), &QuerySource::users()).unwrap()
    }

    fn select_user(filter: &str) -> SelectQuery {
        match compile_user(filter) {
            CompiledQuery::Select(q) => q,
            CompiledQuery::Empty => panic!("expected a query for {filter}"),
        }
    }

    #[test]
    fn test_simple_equality() {
        let q = select_user(r#"userName eq "bjensen""#);
        assert_eq!(
            q.sql,
            "SELECT DISTINCT a.* FROM users a WHERE UPPER(a.username) = UPPER(?1) ORDER BY a.id ASC"
        );
        assert_eq!(q.params, vec![SqlValue::Text("bjensen".into())]);
    }

    #[test]
    fn test_contains_and_starts_with() {
        let q = select_user(r#"name.familyName co "50%_off""#);
        assert_eq!(q.where_clause(), "a.last_name LIKE ?1 ESCAPE '\\'");
        assert_eq!(q.params, vec![SqlValue::Text("%50\\%\\_off%".into())]);

        let q = select_user(r#"emails sw "bob""#);
        assert_eq!(q.where_clause(), "a.email LIKE ?1 ESCAPE '\\'");
        assert_eq!(q.params, vec![SqlValue::Text("bob%".into())]);
    }

    #[test]
    fn test_injection_stays_in_params() {
        let hostile = "x'; DROP TABLE users; --";
        let q = select_user(&format!(r#"userName eq "{}" or externalId co "{}""#, hostile, hostile));
        assert!(!q.sql.contains("DROP"));
        assert!(!q.sql.contains("--"));
        assert!(!q.sql.contains("x'"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn test_date_operators() {
        let q = select_user(r#"meta.created ge "2024-01-01T00:00:00Z" and created lt "2025-01-01T00:00:00Z""#);
        assert_eq!(
            q.where_clause(),
            "(a.date_joined >= ?1 AND a.date_joined < ?2)"
        );
        assert!(matches!(q.params[0], SqlValue::DateTime(_)));
    }

    #[test]
    fn test_boolean_and_presence() {
        let q = select_user("active eq false");
        assert_eq!(q.where_clause(), "a.is_active = ?1");
        assert_eq!(q.params, vec![SqlValue::Bool(false)]);

        assert_eq!(select_user("active pr").where_clause(), "a.is_active IS NOT NULL");
        assert_eq!(
            select_user("externalId pr").where_clause(),
            "(a.external_id IS NOT NULL AND a.external_id != '')"
        );
        assert!(select_user("active pr").params.is_empty());
    }

    #[test]
    fn test_primary_key() {
        let q = select_user(r#"id eq "42""#);
        assert_eq!(q.where_clause(), "a.id = ?1");
        assert_eq!(q.params, vec![SqlValue::Integer(42)]);
    }

    #[test]
    fn test_non_integer_id_never_matches() {
        assert_eq!(compile_user(r#"id eq "abc""#), CompiledQuery::Empty);
        assert_eq!(
            compile_user(r#"id eq "abc" and userName eq "a""#),
            CompiledQuery::Empty
        );

        let q = select_user(r#"id eq "abc" or userName eq "a""#);
        assert_eq!(q.where_clause(), "UPPER(a.username) = UPPER(?1)");
        assert_eq!(q.params, vec![SqlValue::Text("a".into())]);
    }

    #[test]
    fn test_or_is_key_set_union() {
        let q = select_user(r#"userName eq "a" or userName eq "b""#);
        assert_eq!(
            q.where_clause(),
            "a.id IN (WITH matched AS (SELECT DISTINCT a.id FROM users a WHERE UPPER(a.username) = UPPER(?1) \
             UNION SELECT DISTINCT a.id FROM users a WHERE UPPER(a.username) = UPPER(?2)) \
             SELECT DISTINCT id FROM matched)"
        );
        assert_eq!(
            q.params,
            vec![SqlValue::Text("a".into()), SqlValue::Text("b".into())]
        );
    }

    #[test]
    fn test_password_alone() {
        let q = select_user(r#"password eq "secret""#);
        assert_eq!(
            q.where_clause(),
            "(LENGTH(a.password) = 71 AND a.password = ?1)"
        );
        assert_eq!(q.params, vec![SqlValue::Text(hash_password("secret"))]);
    }

    #[test]
    fn test_password_and_is_reordered() {
        for filter in [
            r#"password eq "secret" and userName eq "bob""#,
            r#"userName eq "bob" and password eq "secret""#,
        ] {
            let q = select_user(filter);
            assert_eq!(
                q.where_clause(),
                "a.id IN (WITH matched AS (SELECT DISTINCT a.id, a.password FROM users a \
                 WHERE UPPER(a.username) = UPPER(?1)) SELECT DISTINCT matched.id FROM matched \
                 WHERE (LENGTH(matched.password) = 71 AND matched.password = ?2))"
            );
            assert_eq!(q.params[0], SqlValue::Text("bob".into()));
            assert_eq!(q.params[1], SqlValue::Text(hash_password("secret")));
        }
    }

    #[test]
    fn test_joins_are_repeated_in_subqueries() {
        let source = QuerySource::users().joins("LEFT JOIN group_members gm ON gm.user_id = a.id");
        let filter = parse_user_filter(r#"userName eq "a" or userName eq "b""#).unwrap();
        let CompiledQuery::Select(q) = compile(&filter, &source).unwrap() else {
            panic!("expected a query");
        };
        assert!(q.sql.starts_with(
            "SELECT DISTINCT a.* FROM users a LEFT JOIN group_members gm ON gm.user_id = a.id WHERE"
        ));
        assert_eq!(q.sql.matches("LEFT JOIN group_members").count(), 3);
    }

    #[test]
    fn test_unmapped_attribute_is_bad_request() {
        let source = QuerySource::new("users").column(ScimAttr::UserName, "a.username");
        let filter = parse_user_filter(r#"externalId eq "x""#).unwrap();
        let err = compile(&filter, &source).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_group_display_name() {
        let filter = parse_group_filter(r#"displayName eq "Admins""#).unwrap();
        let CompiledQuery::Select(q) = compile(&filter, &QuerySource::groups()).unwrap() else {
            panic!("expected a query");
        };
        assert_eq!(
            q.sql,
            "SELECT DISTINCT a.* FROM user_groups a WHERE UPPER(a.name) = UPPER(?1) ORDER BY a.id ASC"
        );
    }

    #[test]
    fn test_count_and_paged_forms() {
        let q = select_user(r#"userName sw "a""#);
        assert_eq!(
            q.count_sql(),
            "SELECT COUNT(*) FROM (SELECT DISTINCT a.id FROM users a WHERE a.username LIKE ?1 ESCAPE '\\')"
        );

        let (sql, params) = q.paged(2, 4);
        assert!(sql.ends_with("ORDER BY a.id ASC LIMIT ?2 OFFSET ?3"));
        assert_eq!(params[1..], [SqlValue::Integer(2), SqlValue::Integer(4)]);
    }

    #[test]
    fn test_escape_like_pattern() {
        assert_eq!(escape_like_pattern("100%"), "100\\%");
        assert_eq!(escape_like_pattern("a_b"), "a\\_b");
        assert_eq!(escape_like_pattern("c:\\path"), "c:\\\\path");
        assert_eq!(escape_like_pattern("plain"), "plain");
    }
}
