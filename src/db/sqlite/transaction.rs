use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::common::{
    GROUP_COLUMNS, USER_COLUMNS, group_from_row, user_from_row, write_group, write_user,
};
use crate::{
    db::error::{DbError, DbResult},
    models::{GroupWithMembers, User},
    scim::PatchTransaction,
};

/// PATCH transaction over one SQLite transaction.
///
/// Dropping it without calling `commit` rolls back.
pub struct SqlitePatchTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqlitePatchTransaction {
    pub fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    /// Open a transaction that holds the write lock from its first statement.
    ///
    /// SQLite has no `SELECT ... FOR UPDATE`; `BEGIN IMMEDIATE` makes a second
    /// PATCH wait until this one commits before it reads its snapshot.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(Self::new(tx))
    }
}

#[async_trait]
impl PatchTransaction for SqlitePatchTransaction {
    async fn load_user(&mut self, id: i64) -> DbResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn load_group(&mut self, id: i64) -> DbResult<Option<GroupWithMembers>> {
        let Some(row) = sqlx::query(&format!(
            "SELECT {} FROM user_groups WHERE id = ?1",
            GROUP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        else {
            return Ok(None);
        };

        let members: Vec<i64> =
            sqlx::query_scalar("SELECT user_id FROM group_members WHERE group_id = ?1")
                .bind(id)
                .fetch_all(&mut *self.tx)
                .await?;

        Ok(Some(GroupWithMembers {
            group: group_from_row(&row),
            members: members.into_iter().collect(),
        }))
    }

    async fn existing_user_ids(&mut self, ids: &[i64]) -> DbResult<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=ids.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id FROM users WHERE id IN ({}) ORDER BY id ASC",
            placeholders
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        Ok(query.fetch_all(&mut *self.tx).await?)
    }

    async fn save_user(&mut self, user: &User) -> DbResult<()> {
        write_user(&mut *self.tx, user.id, &user.fields()).await
    }

    async fn save_group(&mut self, group: &GroupWithMembers) -> DbResult<()> {
        let id = group.group.id;
        write_group(
            &mut *self.tx,
            id,
            &group.group.name,
            &group.group.external_id,
        )
        .await?;

        sqlx::query("DELETE FROM group_members WHERE group_id = ?1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        for user_id in &group.members {
            sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)")
                .bind(id)
                .bind(*user_id)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                        DbError::Conflict(format!("User {} does not exist", user_id))
                    }
                    _ => DbError::from(e),
                })?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let Self { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        let Self { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
