use sqlx::{
    Executor, Row, Sqlite,
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
};

use crate::{
    db::error::{DbError, DbResult},
    models::{Group, User, UserFields},
    scim::SqlValue,
};

/// Columns selected for a user row.
pub const USER_COLUMNS: &str =
    "id, username, external_id, first_name, last_name, email, password, is_active, date_joined";

pub const GROUP_COLUMNS: &str = "id, name, external_id";

/// Bind compiled filter values in placeholder order.
pub fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Integer(n) => query.bind(*n),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::DateTime(dt) => query.bind(*dt),
        };
    }
    query
}

pub fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        external_id: row.get("external_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        password: row.get("password"),
        is_active: row.get("is_active"),
        date_joined: row.get("date_joined"),
    }
}

pub fn group_from_row(row: &SqliteRow) -> Group {
    Group {
        id: row.get("id"),
        name: row.get("name"),
        external_id: row.get("external_id"),
    }
}

/// Overwrite the writable columns of one user.
///
/// Shared by the repository and the PATCH transaction so both report the
/// same conflicts.
pub async fn write_user<'e, E>(executor: E, id: i64, fields: &UserFields) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET username = ?1, external_id = ?2, first_name = ?3, last_name = ?4,
            email = ?5, password = ?6, is_active = ?7
        WHERE id = ?8
        "#,
    )
    .bind(&fields.username)
    .bind(&fields.external_id)
    .bind(&fields.first_name)
    .bind(&fields.last_name)
    .bind(&fields.email)
    .bind(&fields.password)
    .bind(fields.is_active)
    .bind(id)
    .execute(executor)
    .await
    .map_err(|e| DbError::from_write(e, || username_conflict(&fields.username)))?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Overwrite the name and external id of one group.
pub async fn write_group<'e, E>(
    executor: E,
    id: i64,
    name: &str,
    external_id: &str,
) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE user_groups SET name = ?1, external_id = ?2 WHERE id = ?3")
        .bind(name)
        .bind(external_id)
        .bind(id)
        .execute(executor)
        .await
        .map_err(|e| DbError::from_write(e, || group_name_conflict(name)))?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

pub fn username_conflict(username: &str) -> String {
    format!("User with userName '{}' already exists", username)
}

pub fn group_name_conflict(name: &str) -> String {
    format!("Group with displayName '{}' already exists", name)
}
