//! Resource services between the HTTP handlers and the repositories.
//!
//! Services parse and compile filters, page results, translate records to
//! their SCIM representation and drive the PATCH engine.

mod groups;
mod users;

use std::sync::Arc;

pub use groups::GroupService;
pub use users::UserService;

use crate::{
    config::ScimConfig,
    db::{DbError, DbPool},
    scim::{CompiledQuery, Grammar, Locations, QuerySource, ScimError, ScimResult},
};

/// Settings shared by the resource services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub locations: Locations,
    /// Page size when a request carries no `count`
    pub default_count: u32,
    pub max_filter_length: usize,
}

impl ServiceSettings {
    pub fn from_config(config: &ScimConfig) -> Self {
        Self {
            locations: Locations::new(&config.base_location),
            default_count: config.default_count,
            max_filter_length: config.max_filter_length,
        }
    }

    /// Parse and compile a filter expression for one resource type.
    fn compile(
        &self,
        grammar: &Grammar,
        source: &QuerySource,
        filter: &str,
    ) -> ScimResult<CompiledQuery> {
        let parsed = grammar.parse(filter, self.max_filter_length)?;
        let compiled = crate::scim::compile(&parsed, source)?;
        if matches!(compiled, CompiledQuery::Empty) {
            tracing::debug!(resource = grammar.resource(), filter, "Filter can never match");
        }
        Ok(compiled)
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub groups: GroupService,
    settings: Arc<ServiceSettings>,
}

impl Services {
    pub fn new(db: Arc<DbPool>, settings: ServiceSettings) -> Self {
        let settings = Arc::new(settings);
        Self {
            users: UserService::new(db.clone(), settings.clone()),
            groups: GroupService::new(db, settings.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }
}

/// Treat a blank `filter` query value as no filter.
fn non_blank(filter: Option<&str>) -> Option<&str> {
    filter.filter(|f| !f.trim().is_empty())
}

/// Report a missing record under the id the client asked for.
fn not_found_as(id: i64) -> impl FnOnce(DbError) -> ScimError {
    move |err| match err {
        DbError::NotFound => ScimError::not_found(id),
        other => other.into(),
    }
}
