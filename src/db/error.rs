use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DbError {
    /// Map a unique-constraint violation to [`DbError::Conflict`].
    pub fn from_write(err: sqlx::Error, conflict: impl FnOnce() -> String) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(conflict())
            }
            other => DbError::from(other),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
