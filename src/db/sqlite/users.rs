use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::{Row, SqlitePool};

use super::{
    SqlitePatchTransaction,
    common::{
        USER_COLUMNS, bind_values, group_from_row, user_from_row, username_conflict, write_user,
    },
};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{Page, UserRepo},
    },
    models::{Group, User, UserFields},
    scim::{PatchTransaction, SelectQuery},
};

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn create(&self, input: UserFields) -> DbResult<User> {
        // Whole seconds, so stored text compares consistently with filter literals
        let now = Utc::now().trunc_subsecs(0);

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, external_id, first_name, last_name, email, password, is_active, date_joined)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&input.username)
        .bind(&input.external_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.password)
        .bind(input.is_active)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_write(e, || username_conflict(&input.username)))?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: input.username,
            external_id: input.external_id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            password: input.password,
            is_active: input.is_active,
            date_joined: now,
        })
    }

    async fn get(&self, id: i64) -> DbResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn update(&self, id: i64, input: UserFields) -> DbResult<User> {
        write_user(&self.pool, id, &input).await?;
        self.get(id).await?.ok_or(DbError::NotFound)
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> DbResult<Page<User>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?
            .get(0);

        let rows = sqlx::query(&format!(
            "SELECT {} FROM users ORDER BY id ASC LIMIT ?1 OFFSET ?2",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.iter().map(user_from_row).collect(),
            total.max(0) as u64,
        ))
    }

    async fn search(&self, query: &SelectQuery, limit: i64, offset: i64) -> DbResult<Page<User>> {
        let count_sql = query.count_sql();
        let total: i64 = bind_values(sqlx::query(&count_sql), &query.params)
            .fetch_one(&self.pool)
            .await?
            .get(0);

        let (sql, params) = query.paged(limit, offset);
        tracing::debug!(sql = %sql, params = params.len(), "Searching users");
        let rows = bind_values(sqlx::query(&sql), &params)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(
            rows.iter().map(user_from_row).collect(),
            total.max(0) as u64,
        ))
    }

    async fn groups_of(&self, user_id: i64) -> DbResult<Vec<Group>> {
        let rows = sqlx::query(
            r#"
            SELECT g.id, g.name, g.external_id
            FROM user_groups g
            INNER JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = ?1
            ORDER BY g.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn begin_patch(&self) -> DbResult<Box<dyn PatchTransaction>> {
        Ok(Box::new(SqlitePatchTransaction::begin(&self.pool).await?))
    }
}
