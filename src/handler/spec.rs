//! Handler descriptors: the declared schemas coercion is wired from.

use serde_json::Value;
use std::collections::HashMap;

/// Request-side schemas, one per facet.
///
/// `None` means the facet is neither coerced nor validated and reaches the
/// handler exactly as it arrived.
#[derive(Debug, Clone, Default)]
pub struct RequestSchemas {
    /// Schema for path parameters
    pub uri_args: Option<Value>,
    /// Schema for decoded query parameters
    pub query_params: Option<Value>,
    /// Schema for the JSON request body
    pub body: Option<Value>,
}

/// Everything the coercion middleware needs to know about one handler.
///
/// Built fluently:
///
/// ```rust
/// use coax::handler::HandlerSpec;
/// use serde_json::json;
///
/// let info = HandlerSpec::new()
///     .query_params(json!({
///         "type": "object",
///         "properties": { "limit": { "type": "integer" } }
///     }))
///     .response(200, json!({ "type": "object" }))
///     .response(404, json!({
///         "type": "object",
///         "properties": { "error": { "type": "string" } }
///     }));
///
/// assert_eq!(info.declared_statuses(), vec![200, 404]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HandlerSpec {
    /// Per-facet request schemas
    pub request: RequestSchemas,
    /// Response body schema per declared status code. A returned status
    /// missing from this map is an error, not a passthrough.
    pub responses: HashMap<u16, Value>,
}

impl HandlerSpec {
    /// Empty descriptor: nothing coerced, no statuses declared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a schema for the uri-args facet.
    #[must_use]
    pub fn uri_args(mut self, schema: Value) -> Self {
        self.request.uri_args = Some(schema);
        self
    }

    /// Declare a schema for the query-params facet.
    #[must_use]
    pub fn query_params(mut self, schema: Value) -> Self {
        self.request.query_params = Some(schema);
        self
    }

    /// Declare a schema for the request body.
    #[must_use]
    pub fn body(mut self, schema: Value) -> Self {
        self.request.body = Some(schema);
        self
    }

    /// Declare the response body schema for one status code.
    #[must_use]
    pub fn response(mut self, status: u16, schema: Value) -> Self {
        self.responses.insert(status, schema);
        self
    }

    /// Declared response statuses, sorted ascending.
    #[must_use]
    pub fn declared_statuses(&self) -> Vec<u16> {
        let mut statuses: Vec<u16> = self.responses.keys().copied().collect();
        statuses.sort_unstable();
        statuses
    }
}
