//! SCIM 2.0 User endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::common::{ScimJson, parse_id, patch_operations, required_object, search_filter};
use crate::{
    AppState,
    scim::{Pagination, ScimListParams, ScimListResponse, ScimResult, ScimUser},
};

type UserResponse = ScimResult<ScimJson<ScimUser>>;

/// List users, optionally filtered.
///
/// `GET /scim/v2/Users?filter=...&startIndex=1&count=50`
#[tracing::instrument(
    name = "scim.users.list",
    skip_all,
    fields(filter = params.filter.as_deref().unwrap_or_default())
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ScimListParams>,
) -> ScimResult<ScimJson<ScimListResponse<ScimUser>>> {
    let response = state.services.users.list(&params).await?;
    Ok(ScimJson::ok(response))
}

/// Search users with a filter carried in a SearchRequest body.
///
/// `POST /scim/v2/Users/.search`
#[tracing::instrument(name = "scim.users.search", skip_all)]
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<ScimListParams>,
    body: Bytes,
) -> ScimResult<ScimJson<ScimListResponse<ScimUser>>> {
    let filter = search_filter(&body, params.filter.as_deref())?;
    let page = Pagination::from_params(&params, state.services.settings().default_count)?;
    let response = state.services.users.search(&filter, page).await?;
    let location = state.services.settings().locations.endpoint("Users/.search");
    Ok(ScimJson::ok(response).with_location(location))
}

/// Create a user.
///
/// `POST /scim/v2/Users`
#[tracing::instrument(name = "scim.users.create", skip_all)]
pub async fn create_user(State(state): State<AppState>, body: Bytes) -> UserResponse {
    let body = required_object(&body, "POST")?;
    let user = state.services.users.create(&body).await?;
    let location = user.meta.location.clone();
    let response = ScimJson::created(user);
    Ok(match location {
        Some(location) => response.with_location(location),
        None => response,
    })
}

/// Get a user by id.
///
/// `GET /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.get", skip_all, fields(%id))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> UserResponse {
    let id = parse_id(&id)?;
    let user = state.services.users.get(id).await?;
    let location = state.services.settings().locations.user(id);
    Ok(ScimJson::ok(user).with_location(location))
}

/// Replace a user's attributes.
///
/// `PUT /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.replace", skip_all, fields(%id))]
pub async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> UserResponse {
    let id = parse_id(&id)?;
    let body = required_object(&body, "PUT")?;
    let user = state.services.users.replace(id, &body).await?;
    Ok(ScimJson::ok(user))
}

/// Apply PATCH operations to a user. All operations commit together or not at
/// all.
///
/// `PATCH /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.patch", skip_all, fields(%id))]
pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> UserResponse {
    let id = parse_id(&id)?;
    let operations = patch_operations(&body)?;
    let user = state.services.users.patch(id, &operations).await?;
    Ok(ScimJson::ok(user))
}

/// Delete a user.
///
/// `DELETE /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.delete", skip_all, fields(%id))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ScimResult<StatusCode> {
    let id = parse_id(&id)?;
    state.services.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
