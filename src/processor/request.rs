//! Request-side coercion: one walker per declared request facet.

use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::coerce::{BuildError, CoercionError, ContextRule, Facet, MatcherChain, Walker};
use crate::handler::{HandlerRequest, HandlerSpec};
use crate::walker_cache::WalkerCache;

/// Coerces and validates the three request facets against the schemas a
/// handler declared.
///
/// Facets are independent: every walker reads the request exactly as it
/// arrived, so a context rule consulted while walking the body sees the
/// original query params, never coerced ones. Facets with no declared
/// schema pass through untouched.
#[derive(Debug)]
pub struct RequestProcessor {
    uri_args: Option<Arc<Walker>>,
    query_params: Option<Arc<Walker>>,
    body: Option<Arc<Walker>>,
}

impl RequestProcessor {
    /// Compile a walker for every facet `info` declares a schema for.
    ///
    /// Uri args and query params use the string parameter chain, the body
    /// uses the JSON chain; `context` heads all three. Compiles fresh,
    /// without a cache.
    pub fn new(info: &HandlerSpec, context: &Arc<dyn ContextRule>) -> Result<Self, BuildError> {
        Self::with_cache(info, context, &WalkerCache::new(false))
    }

    /// Compile walkers, reusing `cache` for already-compiled schemas.
    ///
    /// Cache keys do not include the matcher chain, so a shared cache must
    /// always be fed the same `context` rule.
    pub fn with_cache(
        info: &HandlerSpec,
        context: &Arc<dyn ContextRule>,
        cache: &WalkerCache,
    ) -> Result<Self, BuildError> {
        let params_chain = MatcherChain::params(Arc::clone(context));
        let body_chain = MatcherChain::body(Arc::clone(context));

        let uri_args = info
            .request
            .uri_args
            .as_ref()
            .map(|schema| cache.get_or_compile(Facet::UriArgs, schema, &params_chain))
            .transpose()?;
        let query_params = info
            .request
            .query_params
            .as_ref()
            .map(|schema| cache.get_or_compile(Facet::QueryParams, schema, &params_chain))
            .transpose()?;
        let body = info
            .request
            .body
            .as_ref()
            .map(|schema| cache.get_or_compile(Facet::Body, schema, &body_chain))
            .transpose()?;

        info!(
            uri_args = uri_args.is_some(),
            query_params = query_params.is_some(),
            body = body.is_some(),
            "Compiled request processor"
        );
        Ok(Self {
            uri_args,
            query_params,
            body,
        })
    }

    /// Coerce `request` facet by facet against the original request.
    ///
    /// A declared facet that is absent walks as JSON null, so schemas that
    /// tolerate absence must allow null; a null result keeps the facet
    /// absent. The first failing facet aborts in declaration order:
    /// uri args, query params, body.
    pub fn coerce(&self, request: HandlerRequest) -> Result<HandlerRequest, CoercionError> {
        // All three walks borrow the incoming request, so the context each
        // rule sees is the uncoerced original.
        let uri_args = Self::walk_facet(&self.uri_args, &request, &request.uri_args)?;
        let query_params = Self::walk_facet(&self.query_params, &request, &request.query_params)?;
        let body = Self::walk_facet(&self.body, &request, &request.body)?;

        let mut request = request;
        if let Some(coerced) = uri_args {
            request.uri_args = coerced;
        }
        if let Some(coerced) = query_params {
            request.query_params = coerced;
        }
        if let Some(coerced) = body {
            request.body = coerced;
        }
        Ok(request)
    }

    /// Walk one facet. Outer `None` means no walker is bound and the facet
    /// should be left exactly as it is.
    fn walk_facet(
        walker: &Option<Arc<Walker>>,
        request: &HandlerRequest,
        value: &Option<Value>,
    ) -> Result<Option<Option<Value>>, CoercionError> {
        let Some(walker) = walker else {
            return Ok(None);
        };
        let coerced = walker.walk(request, value.clone().unwrap_or(Value::Null))?;
        Ok(Some(match coerced {
            Value::Null => None,
            value => Some(value),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::NoContext;
    use serde_json::json;

    fn no_context() -> Arc<dyn ContextRule> {
        Arc::new(NoContext)
    }

    #[test]
    fn test_undeclared_facets_pass_through() {
        let info = HandlerSpec::new().query_params(json!({
            "type": "object",
            "properties": {"limit": {"type": "integer"}}
        }));
        let processor = RequestProcessor::new(&info, &no_context()).unwrap();

        let request = HandlerRequest::get("/pets?limit=5")
            .with_uri_args(json!({"id": "123"}))
            .with_body(json!({"count": "9"}));
        let coerced = processor.coerce(request).unwrap();

        // Declared facet coerced, undeclared ones byte-identical.
        assert_eq!(coerced.query_params, Some(json!({"limit": 5})));
        assert_eq!(coerced.uri_args, Some(json!({"id": "123"})));
        assert_eq!(coerced.body, Some(json!({"count": "9"})));
    }

    #[test]
    fn test_absent_declared_facet_walks_null() {
        // Schema that tolerates absence.
        let info = HandlerSpec::new().body(json!({"type": ["object", "null"]}));
        let processor = RequestProcessor::new(&info, &no_context()).unwrap();

        let coerced = processor.coerce(HandlerRequest::get("/pets")).unwrap();
        assert_eq!(coerced.body, None);

        // Schema that requires an object rejects the absent facet.
        let strict = HandlerSpec::new().body(json!({"type": "object"}));
        let processor = RequestProcessor::new(&strict, &no_context()).unwrap();
        let err = processor.coerce(HandlerRequest::get("/pets")).unwrap_err();
        assert_eq!(err.facet(), Facet::Body);
    }

    #[test]
    fn test_invalid_schema_fails_at_build() {
        let info = HandlerSpec::new().uri_args(json!({"type": "bogus"}));
        let err = RequestProcessor::new(&info, &no_context()).unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvalidSchema {
                facet: Facet::UriArgs,
                ..
            }
        ));
    }
}
