use async_trait::async_trait;

use super::Page;
use crate::{
    db::error::DbResult,
    models::{Group, User, UserFields},
    scim::{PatchTransaction, SelectQuery},
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, input: UserFields) -> DbResult<User>;
    async fn get(&self, id: i64) -> DbResult<Option<User>>;
    /// Overwrite the writable attributes. `NotFound` if the user is gone.
    async fn update(&self, id: i64, input: UserFields) -> DbResult<User>;
    /// `NotFound` if the user does not exist.
    async fn delete(&self, id: i64) -> DbResult<()>;

    /// All users in id order.
    async fn list(&self, limit: i64, offset: i64) -> DbResult<Page<User>>;
    /// Users matching a compiled filter, in id order.
    async fn search(&self, query: &SelectQuery, limit: i64, offset: i64) -> DbResult<Page<User>>;

    /// Groups the user belongs to, in id order.
    async fn groups_of(&self, user_id: i64) -> DbResult<Vec<Group>>;

    /// Open a transaction for applying a PATCH request.
    async fn begin_patch(&self) -> DbResult<Box<dyn PatchTransaction>>;
}
