//! SCIM 2.0 protocol core
//!
//! Everything between the HTTP layer and the store: attribute paths, the
//! filter language and its SQL compiler, the PATCH engine and the
//! resource adapters that map stored records to SCIM JSON.
//!
//! ## RFC References
//!
//! - RFC 7643: SCIM Core Schema
//! - RFC 7644: SCIM Protocol
//!
//! ## Module Structure
//!
//! - [`attr_path`]: attribute path parsing (`urn:...:attr[filter].sub`)
//! - [`filter`]: filter grammar and parser
//! - [`filter_to_sql`]: filter to parameterized SQLite query
//! - [`patch`]: PATCH operation engine
//! - [`adapters`]: record <-> SCIM translation and PATCH adapters
//! - [`types`]: wire types and discovery documents
//! - [`error`]: SCIM error taxonomy and error responses

pub mod adapters;
pub mod attr_path;
pub mod error;
pub mod filter;
pub mod filter_to_sql;
pub mod password;
pub mod patch;
pub mod types;

pub use adapters::{GroupAdapter, Locations, UserAdapter, group_to_scim, user_to_scim};
pub use attr_path::{AttrPath, AttrPathSegment};
pub use error::*;
pub use filter::{
    CompareOp, Filter, FilterValue, GROUP_GRAMMAR, Grammar, ScimAttr, USER_GRAMMAR,
    parse_group_filter, parse_user_filter,
};
pub use filter_to_sql::{CompiledQuery, QuerySource, SelectQuery, SqlValue, compile};
pub use patch::{PatchAdapter, PatchOpCode, PatchTransaction, handle_operations};
pub use types::*;
