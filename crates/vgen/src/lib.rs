//! RTL control-flow structuring and code generation.
//!
//! Given a loop-free update procedure as a flow graph of instructions,
//! [`structure`] reconstructs equivalent structured control flow (nested
//! conditionals, folded ternaries, case statements) and renders it as
//! Verilog-style text ready to embed in a clocked-update or
//! continuous-assignment wrapper. [`structure_all`] runs many independent
//! procedures in parallel.

mod pipeline;

pub use pipeline::{structure, structure_all};
pub use vgen_ir::{AssignKind, Instr, MatchPos, Relation, Result, Stmt, StructureError};
