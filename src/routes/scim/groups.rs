//! SCIM 2.0 Group endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::common::{ScimJson, parse_id, patch_operations, required_object, search_filter};
use crate::{
    AppState,
    scim::{Pagination, ScimGroup, ScimListParams, ScimListResponse, ScimResult},
};

type GroupResponse = ScimResult<ScimJson<ScimGroup>>;

/// List groups, optionally filtered.
///
/// `GET /scim/v2/Groups?filter=...&startIndex=1&count=50`
#[tracing::instrument(
    name = "scim.groups.list",
    skip_all,
    fields(filter = params.filter.as_deref().unwrap_or_default())
)]
pub async fn list_groups(
    State(state): State<AppState>,
    Query(params): Query<ScimListParams>,
) -> ScimResult<ScimJson<ScimListResponse<ScimGroup>>> {
    let response = state.services.groups.list(&params).await?;
    Ok(ScimJson::ok(response))
}

/// Search groups with a filter carried in a SearchRequest body.
///
/// `POST /scim/v2/Groups/.search`
#[tracing::instrument(name = "scim.groups.search", skip_all)]
pub async fn search_groups(
    State(state): State<AppState>,
    Query(params): Query<ScimListParams>,
    body: Bytes,
) -> ScimResult<ScimJson<ScimListResponse<ScimGroup>>> {
    let filter = search_filter(&body, params.filter.as_deref())?;
    let page = Pagination::from_params(&params, state.services.settings().default_count)?;
    let response = state.services.groups.search(&filter, page).await?;
    let location = state.services.settings().locations.endpoint("Groups/.search");
    Ok(ScimJson::ok(response).with_location(location))
}

/// Create a group.
///
/// `POST /scim/v2/Groups`
#[tracing::instrument(name = "scim.groups.create", skip_all)]
pub async fn create_group(State(state): State<AppState>, body: Bytes) -> GroupResponse {
    let body = required_object(&body, "POST")?;
    let group = state.services.groups.create(&body).await?;
    let location = group.meta.location.clone();
    let response = ScimJson::created(group);
    Ok(match location {
        Some(location) => response.with_location(location),
        None => response,
    })
}

/// Get a group by id.
///
/// `GET /scim/v2/Groups/{id}`
#[tracing::instrument(name = "scim.groups.get", skip_all, fields(%id))]
pub async fn get_group(State(state): State<AppState>, Path(id): Path<String>) -> GroupResponse {
    let id = parse_id(&id)?;
    let group = state.services.groups.get(id).await?;
    let location = state.services.settings().locations.group(id);
    Ok(ScimJson::ok(group).with_location(location))
}

/// Replace a group's attributes.
///
/// `PUT /scim/v2/Groups/{id}`
#[tracing::instrument(name = "scim.groups.replace", skip_all, fields(%id))]
pub async fn replace_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> GroupResponse {
    let id = parse_id(&id)?;
    let body = required_object(&body, "PUT")?;
    let group = state.services.groups.replace(id, &body).await?;
    Ok(ScimJson::ok(group))
}

/// Apply PATCH operations to a group, membership changes included.
///
/// `PATCH /scim/v2/Groups/{id}`
#[tracing::instrument(name = "scim.groups.patch", skip_all, fields(%id))]
pub async fn patch_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> GroupResponse {
    let id = parse_id(&id)?;
    let operations = patch_operations(&body)?;
    let group = state.services.groups.patch(id, &operations).await?;
    Ok(ScimJson::ok(group))
}

/// Delete a group.
///
/// `DELETE /scim/v2/Groups/{id}`
#[tracing::instrument(name = "scim.groups.delete", skip_all, fields(%id))]
pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ScimResult<StatusCode> {
    let id = parse_id(&id)?;
    state.services.groups.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
