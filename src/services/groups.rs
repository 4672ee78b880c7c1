use std::sync::{Arc, LazyLock};

use serde_json::{Map, Value};

use super::{ServiceSettings, non_blank, not_found_as};
use crate::{
    db::{DbPool, Page},
    models::{Group, GroupWithMembers},
    scim::{
        CompiledQuery, GROUP_GRAMMAR, GroupAdapter, Pagination, PatchOperation, QuerySource,
        ScimError, ScimGroup, ScimListParams, ScimListResponse, ScimResult, adapters,
        group_to_scim, handle_operations,
    },
};

static GROUP_SOURCE: LazyLock<QuerySource> = LazyLock::new(QuerySource::groups);

/// Service layer for the `/Groups` resource
#[derive(Clone)]
pub struct GroupService {
    db: Arc<DbPool>,
    settings: Arc<ServiceSettings>,
}

impl GroupService {
    pub fn new(db: Arc<DbPool>, settings: Arc<ServiceSettings>) -> Self {
        Self { db, settings }
    }

    pub async fn list(&self, params: &ScimListParams) -> ScimResult<ScimListResponse<ScimGroup>> {
        let page = Pagination::from_params(params, self.settings.default_count)?;
        match non_blank(params.filter.as_deref()) {
            Some(filter) => self.search(filter, page).await,
            None => {
                let result = self.db.groups().list(page.limit(), page.offset()).await?;
                self.list_response(result, page).await
            }
        }
    }

    pub async fn search(
        &self,
        filter: &str,
        page: Pagination,
    ) -> ScimResult<ScimListResponse<ScimGroup>> {
        let query = match self.settings.compile(&GROUP_GRAMMAR, &GROUP_SOURCE, filter)? {
            CompiledQuery::Select(query) => query,
            CompiledQuery::Empty => return Ok(ScimListResponse::empty(page)),
        };

        let result = self
            .db
            .groups()
            .search(&query, page.limit(), page.offset())
            .await?;
        self.list_response(result, page).await
    }

    pub async fn get(&self, id: i64) -> ScimResult<ScimGroup> {
        let group = self.load(id).await?;
        self.to_scim(&group).await
    }

    pub async fn create(&self, body: &Map<String, Value>) -> ScimResult<ScimGroup> {
        let fields = adapters::group_fields_from_body(body)?;
        let group = self.db.groups().create(fields).await?;
        tracing::info!(group_id = group.id, name = %group.name, "SCIM group created");
        self.to_scim(&group).await
    }

    pub async fn replace(&self, id: i64, body: &Map<String, Value>) -> ScimResult<ScimGroup> {
        self.load(id).await?;
        let fields = adapters::group_fields_from_body(body)?;
        let group = self
            .db
            .groups()
            .update(id, fields)
            .await
            .map_err(not_found_as(id))?;
        tracing::info!(group_id = id, "SCIM group replaced");
        self.to_scim(&group).await
    }

    pub async fn patch(&self, id: i64, operations: &[PatchOperation]) -> ScimResult<ScimGroup> {
        let mut tx = self.db.groups().begin_patch().await?;
        let Some(GroupWithMembers { group, members }) = tx.load_group(id).await? else {
            tx.rollback().await?;
            return Err(ScimError::not_found(id));
        };
        let mut adapter = GroupAdapter::new(group, members);

        handle_operations(&mut adapter, tx, operations).await?;
        tracing::info!(
            group_id = id,
            operations = operations.len(),
            members = adapter.group.members.len(),
            "SCIM group patched"
        );
        self.to_scim(&adapter.group.group).await
    }

    pub async fn delete(&self, id: i64) -> ScimResult<()> {
        self.db
            .groups()
            .delete(id)
            .await
            .map_err(not_found_as(id))?;
        tracing::info!(group_id = id, "SCIM group deleted");
        Ok(())
    }

    async fn load(&self, id: i64) -> ScimResult<Group> {
        self.db
            .groups()
            .get(id)
            .await?
            .ok_or_else(|| ScimError::not_found(id))
    }

    async fn to_scim(&self, group: &Group) -> ScimResult<ScimGroup> {
        let members = self.db.groups().members(group.id).await?;
        Ok(group_to_scim(group, &members, &self.settings.locations))
    }

    async fn list_response(
        &self,
        result: Page<Group>,
        page: Pagination,
    ) -> ScimResult<ScimListResponse<ScimGroup>> {
        let mut resources = Vec::with_capacity(result.items.len());
        for group in &result.items {
            resources.push(self.to_scim(group).await?);
        }
        Ok(ScimListResponse::new(resources, result.total, page))
    }
}
