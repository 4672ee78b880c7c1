//! SCIM 2.0 protocol routes (RFC 7643 / RFC 7644).
//!
//! All SCIM endpoints live under `/scim/v2/`:
//!
//! **Discovery:**
//! - `GET /scim/v2/ServiceProviderConfig`
//! - `GET /scim/v2/ResourceTypes`, `GET /scim/v2/ResourceTypes/{id}`
//! - `GET /scim/v2/Schemas`, `GET /scim/v2/Schemas/{id}`
//!
//! **Resources:**
//! - `GET/POST /scim/v2/Users`, `POST /scim/v2/Users/.search`
//! - `GET/PUT/PATCH/DELETE /scim/v2/Users/{id}`
//! - `GET/POST /scim/v2/Groups`, `POST /scim/v2/Groups/.search`
//! - `GET/PUT/PATCH/DELETE /scim/v2/Groups/{id}`

mod common;
pub mod discovery;
pub mod groups;
pub mod middleware;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

/// Build the SCIM routes, nested by the caller under `/scim`.
///
/// Every route requires bearer authentication. Body logging wraps the
/// authentication layer so rejected requests are logged too.
pub fn scim_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/v2", scim_v2_routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::body_logging_middleware,
        ))
}

fn scim_v2_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Discovery endpoints
        .route(
            "/ServiceProviderConfig",
            get(discovery::service_provider_config),
        )
        .route("/ResourceTypes", get(discovery::resource_types))
        .route("/ResourceTypes/{id}", get(discovery::resource_type))
        .route("/Schemas", get(discovery::schemas))
        .route("/Schemas/{id}", get(discovery::schema))
        // User resource endpoints
        .route("/Users", get(users::list_users).post(users::create_user))
        .route("/Users/.search", post(users::search_users))
        .route(
            "/Users/{id}",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        )
        // Group resource endpoints
        .route("/Groups", get(groups::list_groups).post(groups::create_group))
        .route("/Groups/.search", post(groups::search_groups))
        .route(
            "/Groups/{id}",
            get(groups::get_group)
                .put(groups::replace_group)
                .patch(groups::patch_group)
                .delete(groups::delete_group),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::scim_auth_middleware,
        ))
}
