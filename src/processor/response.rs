//! Response-side coercion: one walker per declared status code.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::coerce::{
    BuildError, CoercionError, ContextRule, Facet, MatcherChain, RequestSnapshot, Walker,
};
use crate::handler::{HandlerRequest, HandlerResponse, HandlerSpec};
use crate::walker_cache::WalkerCache;

/// Coerces and validates response bodies against per-status schemas.
///
/// The walker is selected by the status the handler actually returned
/// (200 when unset). A status with no declared schema is an error, never
/// a passthrough: an empty `responses` map therefore rejects every
/// response, and callers who want statuses waved through declare them
/// with an accept-anything schema (`true`).
#[derive(Debug)]
pub struct ResponseProcessor {
    walkers: HashMap<u16, Arc<Walker>>,
}

impl ResponseProcessor {
    /// Compile a walker for every status in `info.responses`, fresh.
    pub fn new(info: &HandlerSpec, context: &Arc<dyn ContextRule>) -> Result<Self, BuildError> {
        Self::with_cache(info, context, &WalkerCache::new(false))
    }

    /// Compile walkers, reusing `cache` for already-compiled schemas.
    pub fn with_cache(
        info: &HandlerSpec,
        context: &Arc<dyn ContextRule>,
        cache: &WalkerCache,
    ) -> Result<Self, BuildError> {
        let chain = MatcherChain::body(Arc::clone(context));
        let mut walkers = HashMap::with_capacity(info.responses.len());
        for (status, schema) in &info.responses {
            let walker = cache
                .get_or_compile(Facet::Response, schema, &chain)
                .map_err(|err| match err {
                    BuildError::InvalidSchema { detail, .. } => BuildError::InvalidResponseSchema {
                        status: *status,
                        detail,
                    },
                    other => other,
                })?;
            walkers.insert(*status, walker);
        }
        info!(statuses = walkers.len(), "Compiled response processor");
        Ok(Self { walkers })
    }

    /// Statuses this processor can handle, sorted ascending.
    #[must_use]
    pub fn declared_statuses(&self) -> Vec<u16> {
        let mut statuses: Vec<u16> = self.walkers.keys().copied().collect();
        statuses.sort_unstable();
        statuses
    }

    /// Coerce `response` against the schema declared for its status.
    ///
    /// `request` is the request the handler was invoked with (coerced, in
    /// the middleware path) and is what response-side context rules see.
    /// The response's status field is preserved as returned; only the
    /// lookup defaults to 200.
    pub fn coerce(
        &self,
        request: &HandlerRequest,
        response: HandlerResponse,
    ) -> Result<HandlerResponse, CoercionError> {
        let status = response.status_code();
        let Some(walker) = self.walkers.get(&status) else {
            let declared = self.declared_statuses();
            error!(
                status = status,
                declared = ?declared,
                uri = %request.uri,
                "Response status has no declared schema"
            );
            return Err(CoercionError::UndeclaredStatus {
                status,
                declared,
                request: RequestSnapshot::capture(request),
            });
        };
        let body = walker.walk(request, response.body)?;
        Ok(HandlerResponse { body, ..response })
    }
}
