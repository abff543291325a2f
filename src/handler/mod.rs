mod core;
mod spec;

pub use core::{parse_query_params, AnnotatedHandler, HandlerFn, HandlerRequest, HandlerResponse};
pub use spec::{HandlerSpec, RequestSchemas};
