//! Error and diagnostic types for schema coercion.
//!
//! Coercion failures are descriptive: every [`CoercionError`] names the
//! facet that failed, carries a snapshot of the triggering request, and
//! lists the structural violations the validator reported, so a rejected
//! exchange can be debugged from the error value alone. All diagnostic
//! types serialize cleanly, letting servers embed them in 4xx/5xx bodies.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::handler::HandlerRequest;
use crate::runtime_config::RuntimeConfig;

/// Which part of the HTTP exchange a walker (or an error) applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Facet {
    /// Path parameters extracted from the request URI
    UriArgs,
    /// Decoded query string parameters
    QueryParams,
    /// The request body
    Body,
    /// The response body
    Response,
}

impl Facet {
    /// Stable lowercase tag used in cache keys, logs and error output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::UriArgs => "uri-args",
            Facet::QueryParams => "query-params",
            Facet::Body => "body",
            Facet::Response => "response",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned copy of the request details embedded in coercion errors.
///
/// Captured at failure time so the error stays self-contained after the
/// request has moved on. `COAX_SNAPSHOT_BODY=off` drops the body from
/// captures when payloads are large or must not reach logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSnapshot {
    /// Request path
    pub uri: String,
    /// Raw query string, if the request carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_string: Option<String>,
    /// Request body, captured only when enabled in [`RuntimeConfig`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestSnapshot {
    /// Snapshot `request`, honoring the global body-capture setting.
    #[must_use]
    pub fn capture(request: &HandlerRequest) -> Self {
        Self::capture_with(request, RuntimeConfig::global().snapshot_body)
    }

    /// Snapshot `request` with an explicit body-capture choice.
    #[must_use]
    pub fn capture_with(request: &HandlerRequest, include_body: bool) -> Self {
        Self {
            uri: request.uri.clone(),
            query_string: request.query_string.clone(),
            body: if include_body {
                request.body.clone()
            } else {
                None
            },
        }
    }
}

impl fmt::Display for RequestSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)?;
        if let Some(query) = &self.query_string {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

/// A single structural violation reported by the schema validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaViolation {
    /// JSON Pointer into the coerced value where validation failed
    pub instance_path: String,
    /// JSON Pointer into the schema that rejected the value
    pub schema_path: String,
    /// Human-readable description of the failure
    pub message: String,
}

impl SchemaViolation {
    /// Build an owned violation from a `jsonschema` validation error.
    #[must_use]
    pub fn from_validation(error: &jsonschema::ValidationError<'_>) -> Self {
        Self {
            instance_path: error.instance_path().to_string(),
            schema_path: error.schema_path().to_string(),
            message: error.to_string(),
        }
    }
}

/// Runtime failure while coercing a request or response.
///
/// Coercion itself never fails; these errors come from validating the
/// coerced value (`Schema`) or from a handler exiting through a status
/// nobody declared (`UndeclaredStatus`).
#[derive(Debug, Error)]
pub enum CoercionError {
    /// The coerced value still failed structural validation.
    #[error("{facet} failed schema validation for {request}: {} violation(s)", .violations.len())]
    Schema {
        /// Facet the walker was compiled for
        facet: Facet,
        /// Snapshot of the triggering request
        request: RequestSnapshot,
        /// Violations reported by the validator, capped by `COAX_MAX_VIOLATIONS`
        violations: Vec<SchemaViolation>,
    },
    /// The handler returned a status with no declared response schema.
    #[error("no response schema declared for status {status} on {request} (declared: {declared:?})")]
    UndeclaredStatus {
        /// Status the handler returned
        status: u16,
        /// Statuses the handler descriptor declares, sorted
        declared: Vec<u16>,
        /// Snapshot of the triggering request
        request: RequestSnapshot,
    },
}

impl CoercionError {
    /// The facet the error applies to.
    #[must_use]
    pub fn facet(&self) -> Facet {
        match self {
            CoercionError::Schema { facet, .. } => *facet,
            CoercionError::UndeclaredStatus { .. } => Facet::Response,
        }
    }

    /// Snapshot of the request that triggered the error.
    #[must_use]
    pub fn request(&self) -> &RequestSnapshot {
        match self {
            CoercionError::Schema { request, .. }
            | CoercionError::UndeclaredStatus { request, .. } => request,
        }
    }
}

/// Failure while compiling walkers at wiring time.
///
/// Raised when a handler is wrapped, never while serving a request: a
/// handler with an uncompilable schema fails loudly at startup.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A request-facet schema could not be compiled.
    #[error("invalid {facet} schema: {detail}")]
    InvalidSchema {
        /// Facet the schema was declared for
        facet: Facet,
        /// Compiler diagnostic
        detail: String,
    },
    /// A response schema for a specific status could not be compiled.
    #[error("invalid response schema for status {status}: {detail}")]
    InvalidResponseSchema {
        /// Declared status code
        status: u16,
        /// Compiler diagnostic
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_facet_tags() {
        assert_eq!(Facet::UriArgs.as_str(), "uri-args");
        assert_eq!(Facet::QueryParams.as_str(), "query-params");
        assert_eq!(Facet::Body.as_str(), "body");
        assert_eq!(Facet::Response.as_str(), "response");
        assert_eq!(Facet::UriArgs.to_string(), "uri-args");
        assert_eq!(serde_json::to_value(Facet::QueryParams).unwrap(), json!("query-params"));
    }

    #[test]
    fn test_snapshot_display_includes_query_string() {
        let req = HandlerRequest::get("/pets?limit=5");
        let snap = RequestSnapshot::capture_with(&req, false);
        assert_eq!(snap.to_string(), "/pets?limit=5");
    }

    #[test]
    fn test_snapshot_body_follows_capture_flag() {
        let req = HandlerRequest::new(Method::POST, "/pets").with_body(json!({"name": "rex"}));
        let without = RequestSnapshot::capture_with(&req, false);
        assert_eq!(without.body, None);
        let with = RequestSnapshot::capture_with(&req, true);
        assert_eq!(with.body, Some(json!({"name": "rex"})));
    }

    #[test]
    fn test_violation_paths_come_from_the_validator() {
        let schema = json!({
            "type": "object",
            "properties": {"limit": {"type": "integer"}}
        });
        let validator = jsonschema::validator_for(&schema).unwrap();
        let instance = json!({"limit": "abc"});
        let error = validator.iter_errors(&instance).next().unwrap();

        let violation = SchemaViolation::from_validation(&error);
        assert_eq!(violation.instance_path, "/limit");
        assert!(
            violation.schema_path.ends_with("/type"),
            "unexpected schema path: {}",
            violation.schema_path
        );
        assert!(violation.message.contains("integer"));
    }

    #[test]
    fn test_undeclared_status_message() {
        let req = HandlerRequest::get("/pets");
        let err = CoercionError::UndeclaredStatus {
            status: 404,
            declared: vec![200, 500],
            request: RequestSnapshot::capture_with(&req, false),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"), "message should name the status: {msg}");
        assert!(msg.contains("200"), "message should list declared statuses: {msg}");
        assert_eq!(err.facet(), Facet::Response);
    }
}
