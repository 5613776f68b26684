//! Control-flow structuring passes.
//!
//! The passes run in a fixed order over one [`vgen_ir::ProcedureGraph`]:
//! graph building, level assignment, branch classification, quote folding
//! (which re-triggers leveling and classification when it rewrites
//! anything), and switch grouping. Each pass is a pure function producing
//! a fresh result map threaded into the next pass; nothing mutates the
//! graph after the builder.

mod builder;
mod classify;
mod fold;
mod levels;
mod switch;

pub use builder::*;
pub use classify::*;
pub use fold::*;
pub use levels::*;
pub use switch::*;
