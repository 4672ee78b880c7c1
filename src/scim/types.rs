//! SCIM 2.0 Resource and Protocol Types
//!
//! Wire representations of the User and Group resources and the protocol
//! messages (ListResponse, SearchRequest, PatchOp, discovery documents) per
//! RFC 7643/7644.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ScimError, ScimResult};

/// Content type of every SCIM response
pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";

// =============================================================================
// Schema URIs
// =============================================================================

pub const SCHEMA_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const SCHEMA_GROUP: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const SCHEMA_ENTERPRISE_USER: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
pub const SCHEMA_LIST_RESPONSE: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";
pub const SCHEMA_SEARCH_REQUEST: &str = "urn:ietf:params:scim:api:messages:2.0:SearchRequest";
pub const SCHEMA_ERROR: &str = "urn:ietf:params:scim:api:messages:2.0:Error";
pub const SCHEMA_PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";
pub const SCHEMA_SERVICE_PROVIDER_CONFIG: &str =
    "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig";
pub const SCHEMA_RESOURCE_TYPE: &str = "urn:ietf:params:scim:schemas:core:2.0:ResourceType";
pub const SCHEMA_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Schema";

// =============================================================================
// Resource Metadata
// =============================================================================

/// Resource metadata common to all SCIM resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimMeta {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ScimMeta {
    pub fn new(resource_type: &str, location: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            created: None,
            last_modified: None,
            location: Some(location.into()),
        }
    }

    /// Set creation and modification timestamps
    pub fn with_timestamps(mut self, created: DateTime<Utc>, last_modified: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self.last_modified = Some(last_modified);
        self
    }
}

// =============================================================================
// Resources
// =============================================================================

/// SCIM User resource as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    pub schemas: Vec<String>,
    pub id: String,
    pub external_id: String,
    pub user_name: String,
    pub name: ScimName,
    pub display_name: String,
    pub emails: Vec<ScimEmail>,
    pub active: bool,
    pub groups: Vec<ScimResourceRef>,
    pub meta: ScimMeta,
}

/// User's name components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
    pub given_name: String,
    pub family_name: String,
    pub formatted: String,
}

/// Email address entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScimEmail {
    pub value: String,
    pub primary: bool,
}

/// Reference from one resource to another (group membership, members)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScimResourceRef {
    pub value: String,

    #[serde(rename = "$ref")]
    pub ref_uri: String,

    pub display: String,
}

/// SCIM Group resource as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
    pub schemas: Vec<String>,
    pub id: String,
    pub external_id: String,
    pub display_name: String,
    pub members: Vec<ScimResourceRef>,
    pub meta: ScimMeta,
}

// =============================================================================
// Protocol Types (RFC 7644)
// =============================================================================

/// SCIM list response for paginated collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListResponse<T> {
    pub schemas: Vec<String>,

    /// Number of records matching the query, across all pages
    pub total_results: u64,

    /// Requested page size
    pub items_per_page: u32,

    /// 1-based index of the first result in this page
    pub start_index: u32,

    #[serde(rename = "Resources")]
    pub resources: Vec<T>,
}

impl<T> ScimListResponse<T> {
    pub fn new(resources: Vec<T>, total_results: u64, page: Pagination) -> Self {
        Self {
            schemas: vec![SCHEMA_LIST_RESPONSE.to_string()],
            total_results,
            items_per_page: page.count,
            start_index: page.start_index,
            resources,
        }
    }

    /// Response for a query that cannot match anything
    pub fn empty(page: Pagination) -> Self {
        Self::new(Vec::new(), 0, page)
    }
}

/// Query parameters for list operations.
///
/// Kept as strings so malformed numbers surface as SCIM errors rather than
/// extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListParams {
    #[serde(default)]
    pub filter: Option<String>,

    #[serde(default)]
    pub start_index: Option<String>,

    #[serde(default)]
    pub count: Option<String>,
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based start index
    pub start_index: u32,
    pub count: u32,
}

impl Pagination {
    /// Parse `startIndex` / `count` query values, falling back to defaults.
    ///
    /// `default_count` is also the `filter.maxResults` advertised by the
    /// ServiceProviderConfig, so larger counts are capped at it.
    pub fn from_params(params: &ScimListParams, default_count: u32) -> ScimResult<Self> {
        let start_index = match params.start_index.as_deref() {
            Some(raw) => parse_page_value(raw)?,
            None => 1,
        };
        if start_index < 1 {
            return Err(ScimError::bad_request("Invalid startIndex (must be >= 1)"));
        }

        let count = match params.count.as_deref() {
            Some(raw) => parse_page_value(raw)?,
            None => i64::from(default_count),
        };
        let count = u32::try_from(count).map_err(|_| {
            ScimError::bad_request(format!("Invalid pagination values: count {}", count))
        })?;
        let count = count.min(default_count);

        Ok(Self {
            start_index: u32::try_from(start_index).map_err(|_| {
                ScimError::bad_request(format!(
                    "Invalid pagination values: startIndex {}",
                    start_index
                ))
            })?,
            count,
        })
    }

    /// Zero-based row offset
    pub fn offset(&self) -> i64 {
        i64::from(self.start_index) - 1
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.count)
    }
}

fn parse_page_value(raw: &str) -> ScimResult<i64> {
    raw.trim().parse::<i64>().map_err(|e| {
        ScimError::bad_request(format!("Invalid pagination values: {} ({:?})", e, raw))
    })
}

/// Body of `POST /{Resource}/.search`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,

    #[serde(default)]
    pub filter: Option<String>,
}

/// Body of a PATCH request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,

    #[serde(rename = "Operations", default)]
    pub operations: Option<Vec<PatchOperation>>,
}

/// One `{op, path, value}` entry of a PATCH request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default)]
    pub value: Value,
}

impl PatchOperation {
    pub fn new(op: &str, path: Option<&str>, value: Value) -> Self {
        Self {
            op: op.to_string(),
            path: path.map(str::to_string),
            value,
        }
    }
}

// =============================================================================
// Discovery Types (RFC 7644 Section 4)
// =============================================================================

/// Service Provider Configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderConfig {
    pub schemas: Vec<String>,

    pub documentation_uri: Option<String>,

    pub patch: FeatureSupport,
    pub bulk: BulkSupport,
    pub filter: FilterSupport,
    pub change_password: FeatureSupport,
    pub sort: FeatureSupport,
    pub etag: FeatureSupport,
    pub authentication_schemes: Vec<AuthenticationScheme>,
    pub meta: ScimMeta,
}

impl ServiceProviderConfig {
    /// Capabilities of this provider: PATCH and password changes are
    /// supported; bulk, sort and ETags are not.
    pub fn new(base_url: &str, documentation_uri: Option<String>, max_results: u32) -> Self {
        Self {
            schemas: vec![SCHEMA_SERVICE_PROVIDER_CONFIG.to_string()],
            documentation_uri,
            patch: FeatureSupport { supported: true },
            bulk: BulkSupport {
                supported: false,
                max_operations: 1000,
                max_payload_size: 1_048_576,
            },
            filter: FilterSupport {
                supported: true,
                max_results,
            },
            change_password: FeatureSupport { supported: true },
            sort: FeatureSupport { supported: false },
            etag: FeatureSupport { supported: false },
            authentication_schemes: vec![AuthenticationScheme::oauth_bearer()],
            meta: ScimMeta::new(
                "ServiceProviderConfig",
                format!("{}/ServiceProviderConfig", base_url),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSupport {
    pub supported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSupport {
    pub supported: bool,
    pub max_operations: u32,
    pub max_payload_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSupport {
    pub supported: bool,
    pub max_results: u32,
}

/// Authentication scheme definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationScheme {
    pub name: String,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_uri: Option<String>,

    #[serde(rename = "type")]
    pub scheme_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl AuthenticationScheme {
    /// OAuth 2.0 Bearer Token scheme
    pub fn oauth_bearer() -> Self {
        Self {
            name: "OAuth Bearer Token".to_string(),
            description: "Authentication scheme using the OAuth Bearer Token Standard"
                .to_string(),
            spec_uri: Some("https://www.rfc-editor.org/info/rfc6750".to_string()),
            scheme_type: "oauthbearertoken".to_string(),
            primary: Some(true),
        }
    }
}

/// Resource type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub schemas: Vec<String>,
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub description: String,
    pub schema: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_extensions: Vec<SchemaExtension>,

    pub meta: ScimMeta,
}

impl ResourceType {
    pub fn user(base_url: &str) -> Self {
        Self {
            schemas: vec![SCHEMA_RESOURCE_TYPE.to_string()],
            id: "User".to_string(),
            name: "User".to_string(),
            endpoint: "/Users".to_string(),
            description: "User Account".to_string(),
            schema: SCHEMA_USER.to_string(),
            schema_extensions: vec![SchemaExtension {
                schema: SCHEMA_ENTERPRISE_USER.to_string(),
                required: false,
            }],
            meta: ScimMeta::new("ResourceType", format!("{}/ResourceTypes/User", base_url)),
        }
    }

    pub fn group(base_url: &str) -> Self {
        Self {
            schemas: vec![SCHEMA_RESOURCE_TYPE.to_string()],
            id: "Group".to_string(),
            name: "Group".to_string(),
            endpoint: "/Groups".to_string(),
            description: "Group".to_string(),
            schema: SCHEMA_GROUP.to_string(),
            schema_extensions: Vec::new(),
            meta: ScimMeta::new("ResourceType", format!("{}/ResourceTypes/Group", base_url)),
        }
    }

    /// All resource types, sorted by id
    pub fn all(base_url: &str) -> Vec<Self> {
        vec![Self::group(base_url), Self::user(base_url)]
    }
}

/// Schema extension reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaExtension {
    pub schema: String,
    pub required: bool,
}

// =============================================================================
// Schema Definition Types (RFC 7643 Section 7)
// =============================================================================

/// SCIM Schema definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimSchema {
    pub schemas: Vec<String>,
    pub id: String,
    pub name: String,
    pub description: String,
    pub attributes: Vec<SchemaAttribute>,
    pub meta: ScimMeta,
}

impl ScimSchema {
    fn new(
        base_url: &str,
        id: &str,
        name: &str,
        description: &str,
        attributes: Vec<SchemaAttribute>,
    ) -> Self {
        Self {
            schemas: vec![SCHEMA_SCHEMA.to_string()],
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            attributes,
            meta: ScimMeta::new("Schema", format!("{}/Schemas/{}", base_url, id)),
        }
    }

    /// Core User schema, limited to the attributes this provider stores
    pub fn user(base_url: &str) -> Self {
        Self::new(
            base_url,
            SCHEMA_USER,
            "User",
            "User Account",
            vec![
                SchemaAttribute::string("userName", "Unique identifier for the User", true)
                    .with_mutability(Mutability::ReadWrite)
                    .with_uniqueness(Uniqueness::Server),
                SchemaAttribute::complex(
                    "name",
                    "The components of the user's real name",
                    vec![
                        SchemaAttribute::string("formatted", "The full name", false)
                            .with_mutability(Mutability::ReadOnly),
                        SchemaAttribute::string("familyName", "The family name", false),
                        SchemaAttribute::string("givenName", "The given name", false),
                    ],
                ),
                SchemaAttribute::string("displayName", "The name of the User", false)
                    .with_mutability(Mutability::ReadOnly),
                SchemaAttribute::string("password", "The User's cleartext password", false)
                    .with_mutability(Mutability::WriteOnly)
                    .with_returned(Returned::Never),
                SchemaAttribute::complex(
                    "emails",
                    "Email addresses for the user",
                    vec![
                        SchemaAttribute::string("value", "Email address", false),
                        SchemaAttribute::boolean("primary", "Primary email flag"),
                    ],
                )
                .multi_valued(),
                SchemaAttribute::boolean("active", "The User's administrative status"),
                SchemaAttribute::complex(
                    "groups",
                    "Groups the user belongs to",
                    vec![
                        SchemaAttribute::string("value", "Group identifier", false)
                            .with_mutability(Mutability::ReadOnly),
                        SchemaAttribute::string("$ref", "Group URI", false)
                            .with_mutability(Mutability::ReadOnly),
                        SchemaAttribute::string("display", "Group display name", false)
                            .with_mutability(Mutability::ReadOnly),
                    ],
                )
                .multi_valued()
                .with_mutability(Mutability::ReadOnly),
                SchemaAttribute::string("externalId", "Identifier from the provisioning client", false),
            ],
        )
    }

    /// Enterprise User extension; advertised but none of its attributes are stored
    pub fn enterprise_user(base_url: &str) -> Self {
        Self::new(
            base_url,
            SCHEMA_ENTERPRISE_USER,
            "EnterpriseUser",
            "Enterprise User",
            vec![
                SchemaAttribute::string("employeeNumber", "Numeric or alphanumeric identifier", false),
                SchemaAttribute::string("department", "Name of a department", false),
                SchemaAttribute::string("organization", "Name of an organization", false),
            ],
        )
    }

    pub fn group(base_url: &str) -> Self {
        Self::new(
            base_url,
            SCHEMA_GROUP,
            "Group",
            "Group",
            vec![
                SchemaAttribute::string("displayName", "A human-readable name for the Group", true)
                    .with_uniqueness(Uniqueness::Server),
                SchemaAttribute::complex(
                    "members",
                    "A list of members of the Group",
                    vec![
                        SchemaAttribute::string("value", "Member identifier", false)
                            .with_mutability(Mutability::Immutable),
                        SchemaAttribute::string("$ref", "Member URI", false)
                            .with_mutability(Mutability::Immutable),
                        SchemaAttribute::string("display", "Member display name", false)
                            .with_mutability(Mutability::ReadOnly),
                    ],
                )
                .multi_valued(),
                SchemaAttribute::string("externalId", "Identifier from the provisioning client", false),
            ],
        )
    }

    /// All schemas, sorted by id
    pub fn all(base_url: &str) -> Vec<Self> {
        let mut schemas = vec![
            Self::user(base_url),
            Self::enterprise_user(base_url),
            Self::group(base_url),
        ];
        schemas.sort_by(|a, b| a.id.cmp(&b.id));
        schemas
    }
}

/// SCIM attribute definition within a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAttribute {
    pub name: String,

    #[serde(rename = "type")]
    pub attr_type: AttributeType,

    pub multi_valued: bool,
    pub description: String,
    pub required: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_exact: Option<bool>,

    pub mutability: Mutability,
    pub returned: Returned,
    pub uniqueness: Uniqueness,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<SchemaAttribute>,
}

impl SchemaAttribute {
    fn base(name: &str, attr_type: AttributeType, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            attr_type,
            multi_valued: false,
            description: description.to_string(),
            required,
            case_exact: None,
            mutability: Mutability::ReadWrite,
            returned: Returned::Default,
            uniqueness: Uniqueness::None,
            sub_attributes: Vec::new(),
        }
    }

    pub fn string(name: &str, description: &str, required: bool) -> Self {
        let mut attr = Self::base(name, AttributeType::String, description, required);
        attr.case_exact = Some(false);
        attr
    }

    pub fn boolean(name: &str, description: &str) -> Self {
        Self::base(name, AttributeType::Boolean, description, false)
    }

    pub fn complex(name: &str, description: &str, sub_attributes: Vec<SchemaAttribute>) -> Self {
        let mut attr = Self::base(name, AttributeType::Complex, description, false);
        attr.sub_attributes = sub_attributes;
        attr
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn with_mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    pub fn with_returned(mut self, returned: Returned) -> Self {
        self.returned = returned;
        self
    }

    pub fn with_uniqueness(mut self, uniqueness: Uniqueness) -> Self {
        self.uniqueness = uniqueness;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Boolean,
    DateTime,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    ReadOnly,
    ReadWrite,
    Immutable,
    WriteOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Returned {
    Always,
    Never,
    Default,
    Request,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Uniqueness {
    None,
    Server,
    Global,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start: Option<&str>, count: Option<&str>) -> ScimListParams {
        ScimListParams {
            filter: None,
            start_index: start.map(str::to_string),
            count: count.map(str::to_string),
        }
    }

    #[test]
    fn test_pagination_defaults() {
        let page = Pagination::from_params(&params(None, None), 50).unwrap();
        assert_eq!(page, Pagination { start_index: 1, count: 50 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_pagination_explicit() {
        let page = Pagination::from_params(&params(Some("3"), Some("2")), 50).unwrap();
        assert_eq!(page.offset(), 2);
        assert_eq!(page.limit(), 2);
    }

    #[test]
    fn test_pagination_rejects_start_index_below_one() {
        let err = Pagination::from_params(&params(Some("0"), None), 50).unwrap_err();
        assert_eq!(err.to_string(), "Invalid startIndex (must be >= 1)");
    }

    #[test]
    fn test_pagination_rejects_garbage() {
        let err = Pagination::from_params(&params(Some("one"), None), 50).unwrap_err();
        assert!(err.to_string().starts_with("Invalid pagination values"));

        let err = Pagination::from_params(&params(None, Some("-5")), 50).unwrap_err();
        assert!(err.to_string().starts_with("Invalid pagination values"));
    }

    #[test]
    fn test_count_capped_at_max_results() {
        let page = Pagination::from_params(&params(None, Some("500")), 50).unwrap();
        assert_eq!(page.count, 50);
        assert_eq!(page.limit(), 50);

        let page = Pagination::from_params(&params(None, Some("0")), 50).unwrap();
        assert_eq!(page.count, 0);
    }

    #[test]
    fn test_list_response_shape() {
        let page = Pagination {
            start_index: 1,
            count: 50,
        };
        let response = ScimListResponse::new(vec!["a", "b"], 2, page);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["schemas"][0], SCHEMA_LIST_RESPONSE);
        assert_eq!(json["totalResults"], 2);
        assert_eq!(json["itemsPerPage"], 50);
        assert_eq!(json["startIndex"], 1);
        assert_eq!(json["Resources"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_patch_request_deserialization() {
        let body = serde_json::json!({
            "schemas": [SCHEMA_PATCH_OP],
            "Operations": [
                {"op": "replace", "path": "active", "value": false},
                {"op": "Add", "value": {"externalId": "x"}},
                {"op": "remove", "path": "members"}
            ]
        });
        let request: PatchRequest = serde_json::from_value(body).unwrap();
        let ops = request.operations.unwrap();

        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].path.as_deref(), Some("active"));
        assert!(ops[1].path.is_none());
        assert_eq!(ops[2].value, Value::Null);
    }

    #[test]
    fn test_service_provider_config_capabilities() {
        let config = ServiceProviderConfig::new("https://example.com/scim/v2", None, 50);
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["patch"]["supported"], true);
        assert_eq!(json["bulk"]["supported"], false);
        assert_eq!(json["bulk"]["maxOperations"], 1000);
        assert_eq!(json["changePassword"]["supported"], true);
        assert_eq!(json["sort"]["supported"], false);
        assert_eq!(json["etag"]["supported"], false);
        assert_eq!(json["filter"]["maxResults"], 50);
        assert_eq!(
            json["meta"]["location"],
            "https://example.com/scim/v2/ServiceProviderConfig"
        );
    }

    #[test]
    fn test_resource_types_sorted() {
        let types = ResourceType::all("https://example.com/scim/v2");
        let ids: Vec<_> = types.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["Group", "User"]);
        assert_eq!(types[1].endpoint, "/Users");
    }

    #[test]
    fn test_schemas_sorted_and_password_never_returned() {
        let schemas = ScimSchema::all("https://example.com/scim/v2");
        let ids: Vec<_> = schemas.iter().map(|s| s.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        let user = ScimSchema::user("https://example.com/scim/v2");
        let password = user
            .attributes
            .iter()
            .find(|a| a.name == "password")
            .unwrap();
        assert_eq!(password.returned, Returned::Never);
    }
}
