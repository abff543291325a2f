mod core;

pub use core::{coerce_handler, Coercion};
