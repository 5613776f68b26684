//! Representation shared by the RTL structuring passes.
//!
//! This crate provides the data model only: front-end instructions, the
//! statement sum type, basic blocks, and the per-procedure block arena.
//! The structuring passes themselves live in `vgen-cfg`, text emission in
//! `vgen-emit`.

mod block;
mod error;
mod graph;
mod instr;
mod stmt;

pub use block::*;
pub use error::*;
pub use graph::*;
pub use instr::*;
pub use stmt::*;
