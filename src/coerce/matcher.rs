//! Rule matching: how schema nodes acquire their coercion behavior.
//!
//! A [`MatcherChain`] is an ordered rule list consulted once per schema
//! node when a walker is compiled. The first rule that claims a node
//! wins and later rules are never consulted for it. The chain always
//! starts with a request-aware [`ContextRule`], so callers can override
//! any generic behavior, and ends with the generic rules for the facet
//! kind.
//!
//! Because resolution happens at compile time, a rule's verdict for a
//! node is fixed for the lifetime of the walker. Rules must therefore
//! decide from the schema node alone; anything request-dependent belongs
//! inside the coercer the rule returns, which sees the request on every
//! call.

use serde_json::Value;
use std::sync::Arc;

use super::rules::{JsonRule, StringRule};
use crate::handler::HandlerRequest;

/// Coercion function applied to a single value.
///
/// Coercers are total: a value that cannot be converted comes back
/// unchanged for the structural validator to describe.
pub type ValueCoercer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Coercion function that also sees the request being processed.
pub type RequestCoercer = Arc<dyn Fn(&HandlerRequest, Value) -> Value + Send + Sync>;

/// A generic coercion rule.
///
/// Given a schema node, either claim it by returning a coercer or
/// decline with `None`. Declining is not an error; it hands the node to
/// the next rule in the chain.
pub trait CoercionRule: Send + Sync {
    /// Return a coercer for `schema`, or `None` to decline the node.
    fn coercer(&self, schema: &Value) -> Option<ValueCoercer>;
}

/// A request-aware coercion rule, consulted before any generic rule.
pub trait ContextRule: Send + Sync {
    /// Return a request-aware coercer for `schema`, or `None` to decline.
    fn coercer(&self, schema: &Value) -> Option<RequestCoercer>;
}

impl<F> CoercionRule for F
where
    F: Fn(&Value) -> Option<ValueCoercer> + Send + Sync,
{
    fn coercer(&self, schema: &Value) -> Option<ValueCoercer> {
        self(schema)
    }
}

impl<F> ContextRule for F
where
    F: Fn(&Value) -> Option<RequestCoercer> + Send + Sync,
{
    fn coercer(&self, schema: &Value) -> Option<RequestCoercer> {
        self(schema)
    }
}

/// Context rule that never claims a node.
///
/// The default when a caller has no request-aware coercions to add.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl ContextRule for NoContext {
    fn coercer(&self, _schema: &Value) -> Option<RequestCoercer> {
        None
    }
}

/// Resolved coercion behavior for one schema node.
///
/// Produced by [`MatcherChain::resolve`] at compile time and applied on
/// every walk, so matching cost is paid once per schema node rather than
/// once per request.
#[derive(Clone)]
pub enum NodeCoercer {
    /// No rule claimed the node; values pass through untouched
    PassThrough,
    /// A generic rule claimed the node
    Plain(ValueCoercer),
    /// The context rule claimed the node and wants to see the request
    WithRequest(RequestCoercer),
}

impl NodeCoercer {
    /// Apply the resolved coercer to `value` in the context of `request`.
    #[must_use]
    pub fn apply(&self, request: &HandlerRequest, value: Value) -> Value {
        match self {
            NodeCoercer::PassThrough => value,
            NodeCoercer::Plain(f) => f(value),
            NodeCoercer::WithRequest(f) => f(request, value),
        }
    }

    /// Whether the node was left untouched by every rule.
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        matches!(self, NodeCoercer::PassThrough)
    }
}

/// Ordered rule set used to compile walkers.
///
/// Resolution order is fixed: the context rule first, then each generic
/// rule in the order given. First match wins.
#[derive(Clone)]
pub struct MatcherChain {
    context: Arc<dyn ContextRule>,
    generic: Vec<Arc<dyn CoercionRule>>,
}

impl MatcherChain {
    /// Build a chain from a context rule and generic rules.
    #[must_use]
    pub fn new(context: Arc<dyn ContextRule>, generic: Vec<Arc<dyn CoercionRule>>) -> Self {
        Self { context, generic }
    }

    /// Standard chain for the string-keyed parameter facets (uri args
    /// and query params): the caller's context rule, then [`StringRule`].
    #[must_use]
    pub fn params(context: Arc<dyn ContextRule>) -> Self {
        Self::new(context, vec![Arc::new(StringRule)])
    }

    /// Standard chain for JSON body facets: the caller's context rule,
    /// then [`JsonRule`].
    #[must_use]
    pub fn body(context: Arc<dyn ContextRule>) -> Self {
        Self::new(context, vec![Arc::new(JsonRule)])
    }

    /// Resolve the chain against one schema node.
    #[must_use]
    pub fn resolve(&self, schema: &Value) -> NodeCoercer {
        if let Some(coercer) = self.context.coercer(schema) {
            return NodeCoercer::WithRequest(coercer);
        }
        for rule in &self.generic {
            if let Some(coercer) = rule.coercer(schema) {
                return NodeCoercer::Plain(coercer);
            }
        }
        NodeCoercer::PassThrough
    }
}
