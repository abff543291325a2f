//! Handler request/response model.
//!
//! Handlers are plain functions from [`HandlerRequest`] to
//! [`HandlerResponse`]. A request carries its JSON-bearing parts as three
//! facets (uri args, query params, body), each an optional
//! `serde_json::Value`, so the coercion walkers can rewrite them in place
//! without knowing anything about the transport that produced them.

use anyhow::Result;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::spec::HandlerSpec;

/// Boxed handler function: the unit the coercion middleware wraps.
///
/// Handlers return `anyhow::Result` so business logic can bubble any error
/// up to the server layer with `?`.
pub type HandlerFn = Arc<dyn Fn(HandlerRequest) -> Result<HandlerResponse> + Send + Sync>;

/// A JSON request as seen by handlers.
///
/// The three facets start out exactly as the transport produced them:
/// uri args and query params as objects of strings, the body as parsed
/// JSON. Coercion rewrites them toward their declared schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerRequest {
    /// HTTP method
    pub method: Method,
    /// Request path, without the query string
    pub uri: String,
    /// Raw query string, if the request carried one
    pub query_string: Option<String>,
    /// Path parameters extracted by the router
    pub uri_args: Option<Value>,
    /// Decoded query parameters (string-valued until coerced)
    pub query_params: Option<Value>,
    /// Parsed JSON request body
    pub body: Option<Value>,
}

impl HandlerRequest {
    /// Build a request from a method and URI, splitting off the query
    /// string and pre-parsing it into string-valued `query_params`.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        let raw = uri.into();
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (raw, None),
        };
        let query_params = query.as_deref().map(parse_query_params);
        Self {
            method,
            uri: path,
            query_string: query,
            uri_args: None,
            query_params,
            body: None,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Shorthand for a POST request carrying a JSON body.
    pub fn post(uri: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, uri).with_body(body)
    }

    /// Set the uri-args facet.
    #[must_use]
    pub fn with_uri_args(mut self, uri_args: Value) -> Self {
        self.uri_args = Some(uri_args);
        self
    }

    /// Set the query-params facet, replacing anything parsed from the URI.
    #[must_use]
    pub fn with_query_params(mut self, query_params: Value) -> Self {
        self.query_params = Some(query_params);
        self
    }

    /// Set the body facet.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Decode a query string into a JSON object of string values.
///
/// Duplicate keys keep the last occurrence. Values stay strings here;
/// typed conversion is the coercion walker's job.
#[must_use]
pub fn parse_query_params(query: &str) -> Value {
    let params: serde_json::Map<String, Value> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect();
    Value::Object(params)
}

/// A JSON response produced by a handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code; `None` means the transport default of 200
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// JSON response body
    pub body: Value,
}

impl HandlerResponse {
    /// Response with an explicit status code.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status: Some(status),
            body,
        }
    }

    /// Response that leaves the status to the transport default (200).
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: None, body }
    }

    /// Effective status code, defaulting to 200 when unset.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.unwrap_or(200)
    }
}

/// A handler function paired with the [`HandlerSpec`] describing its
/// declared inputs and outputs.
///
/// Middleware wraps the function but passes `info` through untouched, so
/// outer layers can keep introspecting a route after coercion is attached.
#[derive(Clone)]
pub struct AnnotatedHandler {
    /// The callable handler
    pub handler: HandlerFn,
    /// Declared request/response schemas
    pub info: HandlerSpec,
}

impl fmt::Debug for AnnotatedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotatedHandler")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl AnnotatedHandler {
    /// Annotate a plain function or closure with its descriptor.
    pub fn new<F>(handler: F, info: HandlerSpec) -> Self
    where
        F: Fn(HandlerRequest) -> Result<HandlerResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            info,
        }
    }

    /// Invoke the underlying handler.
    pub fn call(&self, request: HandlerRequest) -> Result<HandlerResponse> {
        (self.handler)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_splits_query_string() {
        let req = HandlerRequest::get("/pets?limit=5&tag=small");
        assert_eq!(req.uri, "/pets");
        assert_eq!(req.query_string.as_deref(), Some("limit=5&tag=small"));
        assert_eq!(
            req.query_params,
            Some(json!({"limit": "5", "tag": "small"}))
        );
    }

    #[test]
    fn test_new_without_query_string() {
        let req = HandlerRequest::get("/pets");
        assert_eq!(req.uri, "/pets");
        assert_eq!(req.query_string, None);
        assert_eq!(req.query_params, None);
    }

    #[test]
    fn test_parse_query_params_decodes_percent_escapes() {
        let params = parse_query_params("name=fluffy%20the%20cat&kind=a%2Bb");
        assert_eq!(params, json!({"name": "fluffy the cat", "kind": "a+b"}));
    }

    #[test]
    fn test_parse_query_params_last_key_wins() {
        let params = parse_query_params("x=1&x=2");
        assert_eq!(params, json!({"x": "2"}));
    }

    #[test]
    fn test_response_status_code_defaults_to_200() {
        assert_eq!(HandlerResponse::ok(json!(null)).status_code(), 200);
        assert_eq!(HandlerResponse::json(404, json!(null)).status_code(), 404);
    }
}
