use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{
    SqlitePatchTransaction,
    common::{
        GROUP_COLUMNS, bind_values, group_from_row, group_name_conflict, user_from_row,
        write_group,
    },
};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{GroupRepo, Page},
    },
    models::{Group, GroupFields, User},
    scim::{PatchTransaction, SelectQuery},
};

pub struct SqliteGroupRepo {
    pool: SqlitePool,
}

impl SqliteGroupRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepo for SqliteGroupRepo {
    async fn create(&self, input: GroupFields) -> DbResult<Group> {
        let result = sqlx::query("INSERT INTO user_groups (name, external_id) VALUES (?1, ?2)")
            .bind(&input.name)
            .bind(&input.external_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from_write(e, || group_name_conflict(&input.name)))?;

        Ok(Group {
            id: result.last_insert_rowid(),
            name: input.name,
            external_id: input.external_id,
        })
    }

    async fn get(&self, id: i64) -> DbResult<Option<Group>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_groups WHERE id = ?1",
            GROUP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(group_from_row))
    }

    async fn update(&self, id: i64, input: GroupFields) -> DbResult<Group> {
        write_group(&self.pool, id, &input.name, &input.external_id).await?;
        Ok(Group {
            id,
            name: input.name,
            external_id: input.external_id,
        })
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM user_groups WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> DbResult<Page<Group>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) FROM user_groups")
            .fetch_one(&self.pool)
            .await?
            .get(0);

        let rows = sqlx::query(&format!(
            "SELECT {} FROM user_groups ORDER BY id ASC LIMIT ?1 OFFSET ?2",
            GROUP_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.iter().map(group_from_row).collect(),
            total.max(0) as u64,
        ))
    }

    async fn search(
        &self,
        query: &SelectQuery,
        limit: i64,
        offset: i64,
    ) -> DbResult<Page<Group>> {
        let count_sql = query.count_sql();
        let total: i64 = bind_values(sqlx::query(&count_sql), &query.params)
            .fetch_one(&self.pool)
            .await?
            .get(0);

        let (sql, params) = query.paged(limit, offset);
        tracing::debug!(sql = %sql, params = params.len(), "Searching groups");
        let rows = bind_values(sqlx::query(&sql), &params)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(
            rows.iter().map(group_from_row).collect(),
            total.max(0) as u64,
        ))
    }

    async fn members(&self, group_id: i64) -> DbResult<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.username, u.external_id, u.first_name, u.last_name,
                   u.email, u.password, u.is_active, u.date_joined
            FROM users u
            INNER JOIN group_members m ON m.user_id = u.id
            WHERE m.group_id = ?1
            ORDER BY u.id ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn member_ids(&self, group_id: i64) -> DbResult<BTreeSet<i64>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT user_id FROM group_members WHERE group_id = ?1")
                .bind(group_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().collect())
    }

    async fn begin_patch(&self) -> DbResult<Box<dyn PatchTransaction>> {
        Ok(Box::new(SqlitePatchTransaction::begin(&self.pool).await?))
    }
}
