//! Front-end instruction representation.

use crate::stmt::Stmt;

/// One instruction of the front-end flow graph: an index, the indices of
/// its successors, and an optional attached statement.
///
/// Successor counts encode control flow: 0 terminal, 1 fallthrough, 2
/// conditional (or membership test), N+1 switch.
#[derive(Clone, Debug)]
pub struct Instr {
    /// Instruction index. Index 0 is the procedure entry.
    pub index: usize,
    /// Successor instruction indices.
    pub succs: Vec<usize>,
    /// Attached statement, if any.
    pub stmt: Option<Stmt>,
}

impl Instr {
    /// Create an instruction without a statement.
    #[must_use]
    pub const fn new(index: usize, succs: Vec<usize>) -> Self {
        Self {
            index,
            succs,
            stmt: None,
        }
    }

    /// Create an instruction carrying a statement.
    #[must_use]
    pub const fn with_stmt(index: usize, succs: Vec<usize>, stmt: Stmt) -> Self {
        Self {
            index,
            succs,
            stmt: Some(stmt),
        }
    }

    /// Whether this instruction ends the procedure.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.succs.is_empty()
    }
}
