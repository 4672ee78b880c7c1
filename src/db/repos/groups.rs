use std::collections::BTreeSet;

use async_trait::async_trait;

use super::Page;
use crate::{
    db::error::DbResult,
    models::{Group, GroupFields, User},
    scim::{PatchTransaction, SelectQuery},
};

#[async_trait]
pub trait GroupRepo: Send + Sync {
    async fn create(&self, input: GroupFields) -> DbResult<Group>;
    async fn get(&self, id: i64) -> DbResult<Option<Group>>;
    async fn update(&self, id: i64, input: GroupFields) -> DbResult<Group>;
    async fn delete(&self, id: i64) -> DbResult<()>;

    async fn list(&self, limit: i64, offset: i64) -> DbResult<Page<Group>>;
    async fn search(&self, query: &SelectQuery, limit: i64, offset: i64)
    -> DbResult<Page<Group>>;

    /// Member users, in id order.
    async fn members(&self, group_id: i64) -> DbResult<Vec<User>>;
    async fn member_ids(&self, group_id: i64) -> DbResult<BTreeSet<i64>>;

    async fn begin_patch(&self) -> DbResult<Box<dyn PatchTransaction>>;
}
