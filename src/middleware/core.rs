//! Coercion middleware: wrap a handler so its inputs and outputs are
//! coerced and validated against the schemas it declared.

use std::sync::Arc;

use crate::coerce::{BuildError, ContextRule, NoContext};
use crate::handler::{AnnotatedHandler, HandlerFn};
use crate::processor::{RequestProcessor, ResponseProcessor};
use crate::walker_cache::WalkerCache;

/// Wrap `inner` so every call coerces the request on the way in and the
/// response on the way out.
///
/// The wrapped handler:
/// 1. coerces and validates the request facets against `inner.info`,
/// 2. invokes the inner handler with the coerced request,
/// 3. coerces and validates the response body against the schema for its
///    status, with the coerced request as context.
///
/// `inner.info` passes through to the returned handler unchanged, and
/// wrapping an already wrapped handler stacks a second pass rather than
/// replacing the first. Walkers are compiled here, before the handler
/// serves anything; an invalid schema fails the wrap, never a request.
///
/// Coercion failures surface as
/// [`CoercionError`](crate::coerce::CoercionError) through the handler's
/// `anyhow::Error`, alongside whatever the inner handler itself returns.
pub fn coerce_handler(
    inner: AnnotatedHandler,
    input: Arc<dyn ContextRule>,
    output: Arc<dyn ContextRule>,
) -> Result<AnnotatedHandler, BuildError> {
    wrap_with(inner, &input, &output, &WalkerCache::new(false))
}

fn wrap_with(
    inner: AnnotatedHandler,
    input: &Arc<dyn ContextRule>,
    output: &Arc<dyn ContextRule>,
    cache: &WalkerCache,
) -> Result<AnnotatedHandler, BuildError> {
    let request_processor = RequestProcessor::with_cache(&inner.info, input, cache)?;
    let response_processor = ResponseProcessor::with_cache(&inner.info, output, cache)?;

    let info = inner.info.clone();
    let handler = inner.handler;
    let wrapped: HandlerFn = Arc::new(move |request| {
        let request = request_processor.coerce(request)?;
        let response = handler(request.clone())?;
        let response = response_processor.coerce(&request, response)?;
        Ok(response)
    });

    Ok(AnnotatedHandler {
        handler: wrapped,
        info,
    })
}

/// Factory for coercion middleware sharing one rule set and one walker
/// cache across many handlers.
///
/// Configuration is fluent, in the spirit of the rest of the crate:
///
/// ```rust
/// use coax::handler::{AnnotatedHandler, HandlerRequest, HandlerResponse, HandlerSpec};
/// use coax::middleware::Coercion;
/// use serde_json::json;
///
/// let info = HandlerSpec::new()
///     .uri_args(json!({
///         "type": "object",
///         "properties": { "id": { "type": "integer" } }
///     }))
///     .response(200, json!({ "type": "object" }));
///
/// let handler = AnnotatedHandler::new(
///     |req: HandlerRequest| Ok(HandlerResponse::json(200, json!({ "args": req.uri_args }))),
///     info,
/// );
///
/// let coercion = Coercion::new();
/// let wrapped = coercion.wrap(handler)?;
///
/// let request = HandlerRequest::get("/pets/7").with_uri_args(json!({ "id": "7" }));
/// let response = wrapped.call(request)?;
/// assert_eq!(response.body, json!({ "args": { "id": 7 } }));
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Clone)]
pub struct Coercion {
    input: Arc<dyn ContextRule>,
    output: Arc<dyn ContextRule>,
    cache: WalkerCache,
}

impl Coercion {
    /// Factory with no request-aware rules and a cache configured from the
    /// environment (`COAX_WALKER_CACHE`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: Arc::new(NoContext),
            output: Arc::new(NoContext),
            cache: WalkerCache::from_env(),
        }
    }

    /// Set the context rule heading every request-facet chain.
    #[must_use]
    pub fn with_input_rule(mut self, rule: Arc<dyn ContextRule>) -> Self {
        self.input = rule;
        self
    }

    /// Set the context rule heading every response chain.
    #[must_use]
    pub fn with_output_rule(mut self, rule: Arc<dyn ContextRule>) -> Self {
        self.output = rule;
        self
    }

    /// Use an explicit walker cache instead of the environment-configured
    /// one. Handy in tests and when several factories should share walkers.
    #[must_use]
    pub fn with_cache(mut self, cache: WalkerCache) -> Self {
        self.cache = cache;
        self
    }

    /// The cache walkers are compiled into.
    #[must_use]
    pub fn cache(&self) -> &WalkerCache {
        &self.cache
    }

    /// Wrap one handler. See [`coerce_handler`] for the wrapped behavior;
    /// unlike the free function, walkers compile through this factory's
    /// shared cache.
    pub fn wrap(&self, inner: AnnotatedHandler) -> Result<AnnotatedHandler, BuildError> {
        wrap_with(inner, &self.input, &self.output, &self.cache)
    }
}

impl Default for Coercion {
    fn default() -> Self {
        Self::new()
    }
}
