//! Response type and request-body helpers shared by the SCIM handlers.

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::scim::{
    PatchOperation, PatchRequest, SCHEMA_SEARCH_REQUEST, SCIM_CONTENT_TYPE, ScimError, ScimResult,
    SearchRequest,
};

/// SCIM JSON response with `application/scim+json` content type, a status
/// code and an optional `Location` header.
pub struct ScimJson<T> {
    body: T,
    status: StatusCode,
    location: Option<String>,
}

impl<T> ScimJson<T> {
    pub fn ok(body: T) -> Self {
        Self {
            body,
            status: StatusCode::OK,
            location: None,
        }
    }

    pub fn created(body: T) -> Self {
        Self {
            body,
            status: StatusCode::CREATED,
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ScimJson<T> {
    fn into_response(self) -> Response {
        let body = match serde_json::to_vec(&self.body) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize SCIM response");
                return ScimError::Internal("Failed to serialize response".to_string())
                    .into_response();
            }
        };

        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)],
            Body::from(body),
        )
            .into_response();

        if let Some(location) = self.location {
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    response.headers_mut().insert(header::LOCATION, value);
                }
                Err(_) => tracing::warn!(%location, "Location is not a valid header value"),
            }
        }
        response
    }
}

/// Resource ids are integers; anything else cannot name a stored resource.
pub fn parse_id(raw: &str) -> ScimResult<i64> {
    raw.parse::<i64>().map_err(|_| ScimError::not_found(raw))
}

/// Decode a request body as a JSON object. An empty body decodes as `{}`.
pub fn json_object(bytes: &Bytes) -> ScimResult<Map<String, Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ScimError::bad_request(
            "Could not decode JSON body: expected a JSON object",
        )),
        Err(e) => Err(ScimError::bad_request(format!(
            "Could not decode JSON body: {}",
            e
        ))),
    }
}

/// Decode the body of a POST or PUT, which must carry attributes.
pub fn required_object(bytes: &Bytes, method: &str) -> ScimResult<Map<String, Value>> {
    let body = json_object(bytes)?;
    if body.is_empty() {
        return Err(ScimError::bad_request(format!(
            "{} call made with empty body",
            method
        )));
    }
    Ok(body)
}

/// Decode a PATCH body into its operations.
pub fn patch_operations(bytes: &Bytes) -> ScimResult<Vec<PatchOperation>> {
    let body = json_object(bytes)?;
    let request: PatchRequest = serde_json::from_value(Value::Object(body))
        .map_err(|e| ScimError::bad_request(format!("Could not decode JSON body: {}", e)))?;
    request
        .operations
        .ok_or_else(|| ScimError::bad_request("PATCH call made without operations array"))
}

/// Filter for a `.search` request: the body's, else the query string's.
pub fn search_filter(bytes: &Bytes, query_filter: Option<&str>) -> ScimResult<String> {
    let body = json_object(bytes)?;
    let request: SearchRequest = serde_json::from_value(Value::Object(body))
        .map_err(|e| ScimError::bad_request(format!("Could not decode JSON body: {}", e)))?;

    if request.schemas != [SCHEMA_SEARCH_REQUEST] {
        return Err(ScimError::bad_request(
            "Invalid schema uri. Must be SearchRequest.",
        ));
    }

    request
        .filter
        .as_deref()
        .or(query_filter)
        .filter(|f| !f.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| ScimError::bad_request("No filter query specified"))
}
