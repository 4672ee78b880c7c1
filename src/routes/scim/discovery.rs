//! SCIM 2.0 discovery endpoints (RFC 7644 Section 4).
//!
//! - ServiceProviderConfig: advertised capabilities
//! - ResourceTypes: User and Group
//! - Schemas: core User, enterprise User and core Group

use axum::extract::{Path, State};

use super::common::ScimJson;
use crate::{
    AppState,
    scim::{
        Pagination, ResourceType, ScimError, ScimListResponse, ScimResult, ScimSchema,
        ServiceProviderConfig,
    },
};

/// Wrap a complete, unpaged collection in a ListResponse.
fn full_list<T>(resources: Vec<T>) -> ScimListResponse<T> {
    let count = u32::try_from(resources.len()).unwrap_or(u32::MAX);
    let total = resources.len() as u64;
    ScimListResponse::new(
        resources,
        total,
        Pagination {
            start_index: 1,
            count,
        },
    )
}

/// `GET /scim/v2/ServiceProviderConfig`
#[tracing::instrument(name = "scim.discovery.service_provider_config", skip_all)]
pub async fn service_provider_config(
    State(state): State<AppState>,
) -> ScimJson<ServiceProviderConfig> {
    let settings = state.services.settings();
    ScimJson::ok(ServiceProviderConfig::new(
        settings.locations.root(),
        state.config.scim.documentation_uri.clone(),
        settings.default_count,
    ))
}

/// `GET /scim/v2/ResourceTypes`
#[tracing::instrument(name = "scim.discovery.resource_types", skip_all)]
pub async fn resource_types(
    State(state): State<AppState>,
) -> ScimJson<ScimListResponse<ResourceType>> {
    let root = state.services.settings().locations.root();
    ScimJson::ok(full_list(ResourceType::all(root)))
}

/// `GET /scim/v2/ResourceTypes/{id}`
#[tracing::instrument(name = "scim.discovery.resource_type", skip_all, fields(%id))]
pub async fn resource_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ScimResult<ScimJson<ResourceType>> {
    let root = state.services.settings().locations.root();
    ResourceType::all(root)
        .into_iter()
        .find(|rt| rt.id == id)
        .map(ScimJson::ok)
        .ok_or_else(|| ScimError::not_found(&id))
}

/// `GET /scim/v2/Schemas`
#[tracing::instrument(name = "scim.discovery.schemas", skip_all)]
pub async fn schemas(State(state): State<AppState>) -> ScimJson<ScimListResponse<ScimSchema>> {
    let root = state.services.settings().locations.root();
    ScimJson::ok(full_list(ScimSchema::all(root)))
}

/// `GET /scim/v2/Schemas/{id}`
///
/// The id is a schema URI; the path extractor percent-decodes it, so
/// `urn%3Aietf%3A...` and the raw URN both resolve.
#[tracing::instrument(name = "scim.discovery.schema", skip_all, fields(%id))]
pub async fn schema(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ScimResult<ScimJson<ScimSchema>> {
    let root = state.services.settings().locations.root();
    ScimSchema::all(root)
        .into_iter()
        .find(|schema| schema.id == id)
        .map(ScimJson::ok)
        .ok_or_else(|| ScimError::not_found(&id))
}
