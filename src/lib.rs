//! SCIM 2.0 provider for user and group provisioning, backed by SQLite.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod models;
pub mod observability;
pub mod routes;
pub mod scim;
pub mod services;

use config::Config;
use db::DbPool;
use routes::scim::middleware::BearerAuth;
use services::{ServiceSettings, Services};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<DbPool>,
    pub services: Services,
    /// Bearer token verifier for the SCIM routes
    pub auth: Arc<BearerAuth>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<DbPool>) -> Self {
        let services = Services::new(db.clone(), ServiceSettings::from_config(&config.scim));
        let auth = Arc::new(BearerAuth::from_config(&config.scim));
        Self {
            config: Arc::new(config),
            db,
            services,
            auth,
        }
    }
}

/// Assemble the HTTP application: health probes plus the SCIM routes under
/// `/scim`.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .nest("/scim", routes::scim_routes(state.clone()))
        // Layers run bottom-up: the request id is assigned before tracing
        // starts and copied onto the response afterwards.
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
