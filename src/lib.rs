//! # coax
//!
//! **coax** is a schema-driven coercion and validation layer for JSON HTTP handlers,
//! built around [JSON Schema](https://json-schema.org/) and `serde_json`.
//!
//! ## Overview
//!
//! HTTP inputs arrive mistyped: path and query parameters are strings, JSON bodies carry
//! `3.0` where an integer was meant. coax wraps a handler so that, per the schemas the
//! handler declared, inputs are generously coerced toward their expected types and then
//! strictly validated, and outputs are held to the schema declared for their status code.
//! Handlers see clean, typed JSON; clients get descriptive errors instead of silent
//! mis-parses.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`handler`]** - request/response model and the handler descriptor ([`handler::HandlerSpec`])
//! - **[`coerce`]** - matcher chains, coercion rules and the compiled walker
//! - **[`processor`]** - request-side and response-side walker bundles
//! - **[`middleware`]** - the wrapping layer ([`middleware::coerce_handler`], [`middleware::Coercion`])
//! - **[`walker_cache`]** - thread-safe cache of compiled walkers
//! - **[`runtime_config`]** - environment variable configuration
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Server
//!     participant ReqProc as RequestProcessor
//!     participant Walker as Walker (per facet)
//!     participant Handler
//!     participant RespProc as ResponseProcessor
//!
//!     Server->>ReqProc: HandlerRequest
//!     ReqProc->>Walker: walk(uri_args)
//!     ReqProc->>Walker: walk(query_params)
//!     ReqProc->>Walker: walk(body)
//!     Walker->>Walker: apply resolved coercers
//!     Walker->>Walker: validate coerced value
//!
//!     alt Validation Failed
//!         Walker-->>Server: CoercionError::Schema<br/>(facet, snapshot, violations)
//!     end
//!
//!     ReqProc->>Handler: coerced HandlerRequest
//!     Handler-->>RespProc: HandlerResponse
//!     RespProc->>RespProc: select walker by status
//!
//!     alt Status Not Declared
//!         RespProc-->>Server: CoercionError::UndeclaredStatus
//!     end
//!
//!     RespProc->>Walker: walk(response body)
//!     RespProc-->>Server: coerced HandlerResponse
//! ```
//!
//! ### Key Architectural Patterns
//!
//! 1. **Coerce, then validate**: rules repair what they can; the structural validator is
//!    the only judge and produces the diagnostics
//! 2. **First-match-wins matcher chain**: a request-aware context rule is consulted before
//!    the generic rules, so callers can override any built-in behavior per schema node
//! 3. **Compile once, walk many**: rule resolution happens once per schema node at wrap
//!    time; the request hot path only applies resolved coercers
//! 4. **Call-scoped context**: each walk threads a borrow of the triggering request
//!    through the descent, so shared walkers never leak state between concurrent calls
//! 5. **Loud response contracts**: a status without a declared schema is an error, not a
//!    passthrough
//!
//! ## Quick Start
//!
//! ```rust
//! use coax::handler::{AnnotatedHandler, HandlerRequest, HandlerResponse, HandlerSpec};
//! use coax::middleware::Coercion;
//! use serde_json::json;
//!
//! // Declare what the handler accepts and returns.
//! let info = HandlerSpec::new()
//!     .query_params(json!({
//!         "type": "object",
//!         "properties": { "limit": { "type": "integer" } }
//!     }))
//!     .response(200, json!({
//!         "type": "object",
//!         "properties": { "limit": { "type": "integer" } }
//!     }));
//!
//! // A handler that trusts its inputs are already typed.
//! let handler = AnnotatedHandler::new(
//!     |req: HandlerRequest| {
//!         let limit = req
//!             .query_params
//!             .as_ref()
//!             .and_then(|params| params.get("limit"))
//!             .and_then(|limit| limit.as_i64())
//!             .unwrap_or(10);
//!         Ok(HandlerResponse::json(200, json!({ "limit": limit })))
//!     },
//!     info,
//! );
//!
//! let wrapped = Coercion::new().wrap(handler)?;
//!
//! // "5" arrives as a string and reaches the handler as the integer 5.
//! let response = wrapped.call(HandlerRequest::get("/pets?limit=5"))?;
//! assert_eq!(response.body, json!({ "limit": 5 }));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Runtime Considerations
//!
//! coax is transport-agnostic and synchronous: walkers are plain `Send + Sync` values,
//! so the same wrapped handler can serve from threads, coroutines or an async executor's
//! blocking pool. Behavior is tunable via environment variables (`COAX_WALKER_CACHE`,
//! `COAX_MAX_VIOLATIONS`, `COAX_SNAPSHOT_BODY`); see [`runtime_config`].

pub mod coerce;
pub mod handler;
pub mod middleware;
pub mod processor;
pub mod runtime_config;
pub mod walker_cache;

pub use coerce::{
    BuildError, CoercionError, CoercionRule, ContextRule, Facet, JsonRule, MatcherChain,
    NoContext, NodeCoercer, RequestCoercer, RequestSnapshot, SchemaViolation, StringRule,
    ValueCoercer, Walker,
};
pub use handler::{
    parse_query_params, AnnotatedHandler, HandlerFn, HandlerRequest, HandlerResponse, HandlerSpec,
    RequestSchemas,
};
pub use middleware::{coerce_handler, Coercion};
pub use processor::{RequestProcessor, ResponseProcessor};
pub use runtime_config::RuntimeConfig;
pub use walker_cache::WalkerCache;
