//! Structured text emission from classified procedure graphs.

mod emitter;

pub use emitter::*;
