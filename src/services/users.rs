use std::sync::{Arc, LazyLock};

use serde_json::{Map, Value};

use super::{ServiceSettings, non_blank, not_found_as};
use crate::{
    db::{DbPool, Page},
    models::{User, UserFields},
    scim::{
        CompiledQuery, Pagination, PatchOperation, QuerySource, ScimError, ScimListParams,
        ScimListResponse, ScimResult, ScimUser, USER_GRAMMAR, UserAdapter, adapters,
        handle_operations, user_to_scim,
    },
};

static USER_SOURCE: LazyLock<QuerySource> = LazyLock::new(QuerySource::users);

/// Service layer for the `/Users` resource
#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    settings: Arc<ServiceSettings>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, settings: Arc<ServiceSettings>) -> Self {
        Self { db, settings }
    }

    /// List users, filtered when the request carries a filter.
    pub async fn list(&self, params: &ScimListParams) -> ScimResult<ScimListResponse<ScimUser>> {
        let page = Pagination::from_params(params, self.settings.default_count)?;
        match non_blank(params.filter.as_deref()) {
            Some(filter) => self.search(filter, page).await,
            None => {
                let result = self.db.users().list(page.limit(), page.offset()).await?;
                self.list_response(result, page).await
            }
        }
    }

    /// Run a filter expression and return one page of matches.
    pub async fn search(
        &self,
        filter: &str,
        page: Pagination,
    ) -> ScimResult<ScimListResponse<ScimUser>> {
        let query = match self.settings.compile(&USER_GRAMMAR, &USER_SOURCE, filter)? {
            CompiledQuery::Select(query) => query,
            CompiledQuery::Empty => return Ok(ScimListResponse::empty(page)),
        };

        let result = self
            .db
            .users()
            .search(&query, page.limit(), page.offset())
            .await?;
        self.list_response(result, page).await
    }

    pub async fn get(&self, id: i64) -> ScimResult<ScimUser> {
        let user = self.load(id).await?;
        self.to_scim(&user).await
    }

    pub async fn create(&self, body: &Map<String, Value>) -> ScimResult<ScimUser> {
        let fields = adapters::user_fields_from_body(body, UserFields::default())?;
        let user = self.db.users().create(fields).await?;
        tracing::info!(user_id = user.id, username = %user.username, "SCIM user created");
        self.to_scim(&user).await
    }

    /// Full replace. `emails`, `password` and `active` keep their stored
    /// values when the body omits them.
    pub async fn replace(&self, id: i64, body: &Map<String, Value>) -> ScimResult<ScimUser> {
        let existing = self.load(id).await?;
        let fields = adapters::user_fields_from_body(body, existing.fields())?;
        let user = self
            .db
            .users()
            .update(id, fields)
            .await
            .map_err(not_found_as(id))?;
        tracing::info!(user_id = id, "SCIM user replaced");
        self.to_scim(&user).await
    }

    pub async fn patch(&self, id: i64, operations: &[PatchOperation]) -> ScimResult<ScimUser> {
        let mut tx = self.db.users().begin_patch().await?;
        let Some(user) = tx.load_user(id).await? else {
            tx.rollback().await?;
            return Err(ScimError::not_found(id));
        };
        let mut adapter = UserAdapter::new(user);
        handle_operations(&mut adapter, tx, operations).await?;
        tracing::info!(user_id = id, operations = operations.len(), "SCIM user patched");
        self.to_scim(&adapter.user).await
    }

    pub async fn delete(&self, id: i64) -> ScimResult<()> {
        self.db
            .users()
            .delete(id)
            .await
            .map_err(not_found_as(id))?;
        tracing::info!(user_id = id, "SCIM user deleted");
        Ok(())
    }

    async fn load(&self, id: i64) -> ScimResult<User> {
        self.db
            .users()
            .get(id)
            .await?
            .ok_or_else(|| ScimError::not_found(id))
    }

    async fn to_scim(&self, user: &User) -> ScimResult<ScimUser> {
        let groups = self.db.users().groups_of(user.id).await?;
        Ok(user_to_scim(user, &groups, &self.settings.locations))
    }

    async fn list_response(
        &self,
        result: Page<User>,
        page: Pagination,
    ) -> ScimResult<ScimListResponse<ScimUser>> {
        let mut resources = Vec::with_capacity(result.items.len());
        for user in &result.items {
            resources.push(self.to_scim(user).await?);
        }
        Ok(ScimListResponse::new(resources, result.total, page))
    }
}
