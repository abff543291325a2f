//! # Coercing Walker
//!
//! A [`Walker`] binds one JSON Schema to one matcher chain and turns the
//! pair into a reusable transformer: coerce a value toward the schema,
//! then validate the result.
//!
//! ## Compile once, walk many
//!
//! Compilation resolves the matcher chain against every node of the
//! schema exactly once, producing a tree of [`CompiledNode`]s that pairs
//! each node's resolved coercer with the shape used to descend into its
//! children. Walks after that are pure rule application plus validation;
//! no matching work is left on the hot path. The structural validator is
//! compiled at the same time, so an uncompilable schema fails here, not
//! per request.
//!
//! ## Coerce, then validate
//!
//! Coercion is best effort and never fails: nodes no rule claimed and
//! values no coercer could convert pass through unchanged. The compiled
//! validator then judges the coerced output, and any surviving
//! violations surface as a single [`CoercionError::Schema`] carrying the
//! facet, a request snapshot and per-violation paths.
//!
//! ## Request context
//!
//! Each walk builds a [`WalkContext`] holding a borrow of the triggering
//! request and threads it by reference through the recursive descent.
//! The context lives on the caller's stack for exactly one walk, so
//! concurrent walks over the same shared walker can never observe each
//! other's requests.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error};

use super::error::{BuildError, CoercionError, Facet, RequestSnapshot, SchemaViolation};
use super::matcher::{MatcherChain, NodeCoercer};
use crate::handler::HandlerRequest;
use crate::runtime_config::RuntimeConfig;

/// Per-call frame carrying the request a walk was triggered by.
///
/// Built on entry to [`Walker::walk`] and passed by reference through the
/// descent. Never stored beyond the call.
struct WalkContext<'req> {
    request: &'req HandlerRequest,
}

/// One schema node: its resolved coercer plus the shape used to descend
/// into child values.
struct CompiledNode {
    coercer: NodeCoercer,
    shape: NodeShape,
}

/// Structural role of a schema node, precomputed at compile time.
enum NodeShape {
    /// Leaf: nothing to descend into
    Scalar,
    /// Object: compiled per-property children plus an optional
    /// `additionalProperties` child applied to unknown keys
    Object {
        properties: HashMap<String, CompiledNode>,
        additional: Option<Box<CompiledNode>>,
    },
    /// Array: a compiled `items` child applied to every element
    Array { items: Option<Box<CompiledNode>> },
}

impl CompiledNode {
    fn compile(schema: &Value, chain: &MatcherChain) -> Self {
        Self {
            coercer: chain.resolve(schema),
            shape: NodeShape::from_schema(schema, chain),
        }
    }

    /// Number of schema nodes in this subtree, root included.
    fn node_count(&self) -> usize {
        1 + match &self.shape {
            NodeShape::Scalar => 0,
            NodeShape::Object {
                properties,
                additional,
            } => {
                properties.values().map(CompiledNode::node_count).sum::<usize>()
                    + additional.as_ref().map_or(0, |node| node.node_count())
            }
            NodeShape::Array { items } => items.as_ref().map_or(0, |node| node.node_count()),
        }
    }

    /// Apply this node's coercer, then descend per the node's shape.
    ///
    /// A value whose runtime shape disagrees with the schema (a string
    /// where an object was declared, say) stops the descent and is left
    /// for the validator to describe.
    fn apply(&self, ctx: &WalkContext<'_>, value: Value) -> Value {
        let value = self.coercer.apply(ctx.request, value);
        match &self.shape {
            NodeShape::Scalar => value,
            NodeShape::Object {
                properties,
                additional,
            } => match value {
                Value::Object(map) => {
                    let mut coerced = serde_json::Map::with_capacity(map.len());
                    for (key, child) in map {
                        let child = if let Some(node) = properties.get(&key) {
                            node.apply(ctx, child)
                        } else if let Some(node) = additional {
                            node.apply(ctx, child)
                        } else {
                            child
                        };
                        coerced.insert(key, child);
                    }
                    Value::Object(coerced)
                }
                other => other,
            },
            NodeShape::Array { items } => match (value, items) {
                (Value::Array(elements), Some(node)) => Value::Array(
                    elements
                        .into_iter()
                        .map(|element| node.apply(ctx, element))
                        .collect(),
                ),
                (other, _) => other,
            },
        }
    }
}

impl NodeShape {
    fn from_schema(schema: &Value, chain: &MatcherChain) -> Self {
        match schema.get("type").and_then(Value::as_str) {
            Some("object") => Self::object(schema, chain),
            Some("array") => Self::array(schema, chain),
            Some(_) => NodeShape::Scalar,
            // No plain `type`: infer the shape from structural keywords.
            None if schema.get("properties").is_some()
                || schema.get("additionalProperties").is_some() =>
            {
                Self::object(schema, chain)
            }
            None if schema.get("items").is_some() => Self::array(schema, chain),
            None => NodeShape::Scalar,
        }
    }

    fn object(schema: &Value, chain: &MatcherChain) -> Self {
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, child)| (name.clone(), CompiledNode::compile(child, chain)))
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();
        // Boolean `additionalProperties` constrains validation but carries
        // no child schema to coerce against.
        let additional = schema
            .get("additionalProperties")
            .filter(|extra| extra.is_object())
            .map(|extra| Box::new(CompiledNode::compile(extra, chain)));
        NodeShape::Object {
            properties,
            additional,
        }
    }

    fn array(schema: &Value, chain: &MatcherChain) -> Self {
        // Tuple-form `items` (an array of schemas) is validated but not
        // coerced per position.
        let items = schema
            .get("items")
            .filter(|items| items.is_object())
            .map(|items| Box::new(CompiledNode::compile(items, chain)));
        NodeShape::Array { items }
    }
}

/// A compiled, reusable coercion-and-validation pass for one schema.
///
/// Immutable once compiled; share freely across threads behind an `Arc`.
pub struct Walker {
    facet: Facet,
    root: CompiledNode,
    validator: jsonschema::Validator,
    node_count: usize,
}

impl fmt::Debug for Walker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Walker")
            .field("facet", &self.facet)
            .field("node_count", &self.node_count)
            .finish_non_exhaustive()
    }
}

impl Walker {
    /// Compile `schema` under `chain` for the given facet.
    ///
    /// Rule resolution happens here, once per schema node, along with
    /// validator compilation. An uncompilable schema is a
    /// [`BuildError::InvalidSchema`].
    pub fn compile(facet: Facet, schema: &Value, chain: &MatcherChain) -> Result<Self, BuildError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| BuildError::InvalidSchema {
                facet,
                detail: e.to_string(),
            })?;
        let root = CompiledNode::compile(schema, chain);
        let node_count = root.node_count();
        debug!(facet = %facet, nodes = node_count, "Compiled coercion walker");
        Ok(Self {
            facet,
            root,
            validator,
            node_count,
        })
    }

    /// The facet this walker was compiled for.
    #[must_use]
    pub fn facet(&self) -> Facet {
        self.facet
    }

    /// Number of schema nodes the walker was compiled over.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Coerce `value` toward the schema, then validate the result.
    ///
    /// On success the coerced value is returned. On validation failure
    /// the error carries the facet, a snapshot of `request` and the
    /// violations, capped by `COAX_MAX_VIOLATIONS`.
    pub fn walk(&self, request: &HandlerRequest, value: Value) -> Result<Value, CoercionError> {
        let ctx = WalkContext { request };
        let coerced = self.root.apply(&ctx, value);

        let violations: Vec<SchemaViolation> = self
            .validator
            .iter_errors(&coerced)
            .take(RuntimeConfig::global().max_violations)
            .map(|e| SchemaViolation::from_validation(&e))
            .collect();

        if violations.is_empty() {
            Ok(coerced)
        } else {
            error!(
                facet = %self.facet,
                uri = %request.uri,
                violations = violations.len(),
                "Coerced value failed schema validation"
            );
            Err(CoercionError::Schema {
                facet: self.facet,
                request: RequestSnapshot::capture(request),
                violations,
            })
        }
    }

    /// Validate `value` as-is, without coercing.
    ///
    /// Cheap shape probe for callers that only want a verdict.
    #[must_use]
    pub fn is_valid(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::matcher::NoContext;
    use serde_json::json;
    use std::sync::Arc;

    fn params_chain() -> MatcherChain {
        MatcherChain::params(Arc::new(NoContext))
    }

    #[test]
    fn test_compile_counts_nodes() {
        let schema = json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        });
        let walker = Walker::compile(Facet::Body, &schema, &params_chain()).unwrap();
        // root + id + tags + items
        assert_eq!(walker.node_count(), 4);
        assert_eq!(walker.facet(), Facet::Body);
    }

    #[test]
    fn test_compile_rejects_invalid_schema() {
        let schema = json!({"type": "not-a-type"});
        let err = Walker::compile(Facet::Body, &schema, &params_chain()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidSchema { facet: Facet::Body, .. }));
    }

    #[test]
    fn test_walk_coerces_nested_properties() {
        let schema = json!({
            "type": "object",
            "properties": {
                "page": {"type": "integer"},
                "filter": {
                    "type": "object",
                    "properties": {"active": {"type": "boolean"}}
                }
            }
        });
        let walker = Walker::compile(Facet::QueryParams, &schema, &params_chain()).unwrap();
        let req = HandlerRequest::get("/things");
        let coerced = walker
            .walk(&req, json!({"page": "2", "filter": {"active": "true"}}))
            .unwrap();
        assert_eq!(coerced, json!({"page": 2, "filter": {"active": true}}));
    }

    #[test]
    fn test_walk_descends_into_array_items() {
        let schema = json!({
            "type": "array",
            "items": {"type": "integer"}
        });
        let walker = Walker::compile(Facet::QueryParams, &schema, &params_chain()).unwrap();
        let req = HandlerRequest::get("/things");
        // Comma-split to strings by the array node, then each element
        // coerced by the items node.
        let coerced = walker.walk(&req, json!("1,2,3")).unwrap();
        assert_eq!(coerced, json!([1, 2, 3]));
    }

    #[test]
    fn test_walk_applies_additional_properties_schema() {
        let schema = json!({
            "type": "object",
            "additionalProperties": {"type": "integer"}
        });
        let walker = Walker::compile(Facet::QueryParams, &schema, &params_chain()).unwrap();
        let req = HandlerRequest::get("/counters");
        let coerced = walker.walk(&req, json!({"a": "1", "b": "2"})).unwrap();
        assert_eq!(coerced, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_walk_reports_violations_with_paths() {
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}},
            "required": ["id"]
        });
        let walker = Walker::compile(Facet::Body, &schema, &params_chain()).unwrap();
        let req = HandlerRequest::get("/things");
        let err = walker.walk(&req, json!({"id": "abc"})).unwrap_err();
        match err {
            CoercionError::Schema {
                facet, violations, ..
            } => {
                assert_eq!(facet, Facet::Body);
                assert!(!violations.is_empty());
                assert_eq!(violations[0].instance_path, "/id");
            }
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[test]
    fn test_shape_mismatch_left_to_validator() {
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}}
        });
        let walker = Walker::compile(Facet::Body, &schema, &params_chain()).unwrap();
        let req = HandlerRequest::get("/things");
        // A bare string where an object was declared: no coercion applies
        // and the validator produces the diagnostic.
        let err = walker.walk(&req, json!("not an object")).unwrap_err();
        assert!(matches!(err, CoercionError::Schema { .. }));
    }

    #[test]
    fn test_is_valid_probe() {
        let schema = json!({"type": "integer"});
        let walker = Walker::compile(Facet::Body, &schema, &params_chain()).unwrap();
        assert!(walker.is_valid(&json!(3)));
        assert!(!walker.is_valid(&json!("3")));
    }
}
