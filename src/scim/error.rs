//! SCIM 2.0 Error Types
//!
//! [`ScimError`] is the error taxonomy used throughout the provider (parser,
//! compiler, patch engine, services). At the HTTP boundary it is rendered as a
//! [`ScimErrorResponse`] per RFC 7644 Section 3.12.

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{SCHEMA_ERROR, SCIM_CONTENT_TYPE};
use crate::db::DbError;

/// Errors raised while serving SCIM requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScimError {
    /// Malformed filter, path, operation or value (400)
    #[error("{detail}")]
    BadRequest {
        detail: String,
        scim_type: Option<ScimErrorType>,
    },

    /// Resource id does not resolve (404)
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness or referential violation at persistence time (409)
    #[error("{0}")]
    Integrity(String),

    /// Unsupported PATCH path or operation (501)
    #[error("{0}")]
    NotImplemented(String),

    /// Missing or invalid credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Anything else (500)
    #[error("{0}")]
    Internal(String),
}

impl ScimError {
    /// Generic bad request without a scimType
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest {
            detail: detail.into(),
            scim_type: None,
        }
    }

    /// Bad request carrying a scimType
    pub fn bad_request_typed(detail: impl Into<String>, scim_type: ScimErrorType) -> Self {
        Self::BadRequest {
            detail: detail.into(),
            scim_type: Some(scim_type),
        }
    }

    /// Filter that cannot be parsed or compiled
    pub fn invalid_filter(detail: impl Into<String>) -> Self {
        Self::bad_request_typed(detail, ScimErrorType::InvalidFilter)
    }

    /// PATCH remove without a target path
    pub fn no_target(detail: impl Into<String>) -> Self {
        Self::bad_request_typed(detail, ScimErrorType::NoTarget)
    }

    /// Resource lookup miss, formatted as `Resource {id} not found`
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("Resource {} not found", id))
    }

    pub fn not_implemented() -> Self {
        Self::NotImplemented("Not Implemented".to_string())
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScimError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ScimError::NotFound(_) => StatusCode::NOT_FOUND,
            ScimError::Integrity(_) => StatusCode::CONFLICT,
            ScimError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ScimError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ScimError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// SCIM error subtype, if any
    pub fn scim_type(&self) -> Option<ScimErrorType> {
        match self {
            ScimError::BadRequest { scim_type, .. } => *scim_type,
            ScimError::Integrity(_) => Some(ScimErrorType::Uniqueness),
            _ => None,
        }
    }

    /// Render the wire representation
    pub fn to_response_body(&self) -> ScimErrorResponse {
        ScimErrorResponse {
            schemas: vec![SCHEMA_ERROR.to_string()],
            detail: self.to_string(),
            status: self.status_code().as_u16(),
            scim_type: self.scim_type(),
        }
    }
}

impl From<DbError> for ScimError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => ScimError::NotFound("Resource not found".to_string()),
            DbError::Conflict(msg) => ScimError::Integrity(msg),
            DbError::Validation(msg) => ScimError::bad_request(msg),
            other => {
                tracing::error!(error = %other, "Unable to complete SCIM call");
                ScimError::Internal("Unable to complete SCIM call".to_string())
            }
        }
    }
}

impl IntoResponse for ScimError {
    fn into_response(self) -> Response {
        if let ScimError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "SCIM request failed with internal error");
        }
        self.to_response_body().into_response()
    }
}

/// SCIM error response body per RFC 7644.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimErrorResponse {
    /// SCIM schema URIs (always contains the Error schema)
    pub schemas: Vec<String>,

    /// Human-readable error detail
    pub detail: String,

    /// HTTP status code
    pub status: u16,

    /// SCIM-specific error type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimErrorType>,
}

impl ScimErrorResponse {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ScimErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match serde_json::to_vec(&self) {
            Ok(body) => (
                status,
                [(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)],
                Body::from(body),
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize SCIM error");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// SCIM error types per RFC 7644 Section 3.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorType {
    /// Filter syntax is invalid or unsupported
    InvalidFilter,

    /// Request body has invalid syntax
    InvalidSyntax,

    /// PATCH remove operation missing required path
    NoTarget,

    /// Uniqueness constraint violated (e.g., duplicate userName)
    Uniqueness,

    /// Attribute value is invalid for its type
    InvalidValue,
}

impl std::fmt::Display for ScimErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScimErrorType::InvalidFilter => write!(f, "invalidFilter"),
            ScimErrorType::InvalidSyntax => write!(f, "invalidSyntax"),
            ScimErrorType::NoTarget => write!(f, "noTarget"),
            ScimErrorType::Uniqueness => write!(f, "uniqueness"),
            ScimErrorType::InvalidValue => write!(f, "invalidValue"),
        }
    }
}

/// Result type for SCIM operations
pub type ScimResult<T> = Result<T, ScimError>;
