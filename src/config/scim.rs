use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::scim::filter::DEFAULT_MAX_FILTER_LENGTH;

/// SCIM endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScimConfig {
    /// Scheme and host resource locations are built from,
    /// e.g. `https://idp.example.com`. Required.
    pub base_location: String,

    /// Token clients must present as `Authorization: Bearer <token>`. Required.
    pub bearer_token: String,

    /// Page size when a request carries no `count`.
    #[serde(default = "default_count")]
    pub default_count: u32,

    /// Longest accepted filter expression, in bytes.
    #[serde(default = "default_max_filter_length")]
    pub max_filter_length: usize,

    /// Advertised in `/ServiceProviderConfig`.
    #[serde(default)]
    pub documentation_uri: Option<String>,

    /// `WWW-Authenticate` value sent with 401 responses.
    #[serde(default = "default_www_authenticate")]
    pub www_authenticate: String,
}

impl ScimConfig {
    /// Configuration with defaults for everything but the required fields.
    pub fn new(base_location: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            base_location: base_location.into(),
            bearer_token: bearer_token.into(),
            default_count: default_count(),
            max_filter_length: default_max_filter_length(),
            documentation_uri: None,
            www_authenticate: default_www_authenticate(),
        }
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base_location.trim();
        if base.is_empty() {
            return Err(ConfigError::Validation(
                "scim.base_location is required".into(),
            ));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "scim.base_location must start with http:// or https://, got '{}'",
                base
            )));
        }
        if self.bearer_token.is_empty() {
            return Err(ConfigError::Validation(
                "scim.bearer_token is required".into(),
            ));
        }
        if self.default_count == 0 {
            return Err(ConfigError::Validation(
                "scim.default_count must be at least 1".into(),
            ));
        }
        if self.max_filter_length == 0 {
            return Err(ConfigError::Validation(
                "scim.max_filter_length must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_count() -> u32 {
    50
}

fn default_max_filter_length() -> usize {
    DEFAULT_MAX_FILTER_LENGTH
}

fn default_www_authenticate() -> String {
    r#"Bearer realm="scim""#.to_string()
}
