//! # Coercion Module
//!
//! Schema-driven value coercion: matcher chains decide how each schema
//! node rewrites values, walkers apply those decisions and validate the
//! result.
//!
//! ## Overview
//!
//! - [`MatcherChain`] - first-match-wins rule resolution per schema node
//! - [`CoercionRule`] / [`ContextRule`] - the rule traits (generic and
//!   request-aware)
//! - [`StringRule`] / [`JsonRule`] - the built-in generic rules
//! - [`Walker`] - a compiled schema + chain pair: coerce, then validate
//! - [`CoercionError`] / [`BuildError`] - runtime and wiring-time failures
//!
//! Most callers never touch this module directly; the
//! [`middleware`](crate::middleware) layer compiles walkers from a
//! [`HandlerSpec`](crate::handler::HandlerSpec) and applies them around
//! the handler.

mod error;
mod matcher;
mod rules;
mod walker;

pub use error::{BuildError, CoercionError, Facet, RequestSnapshot, SchemaViolation};
pub use matcher::{
    CoercionRule, ContextRule, MatcherChain, NoContext, NodeCoercer, RequestCoercer, ValueCoercer,
};
pub use rules::{JsonRule, StringRule};
pub use walker::Walker;
