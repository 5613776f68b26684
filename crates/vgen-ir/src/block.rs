//! Basic block representation.

use crate::stmt::{AssignKind, Stmt};

/// Block identifier: the index of the block's first instruction.
pub type BlockId = usize;

/// Basic block: a merged straight-line instruction run.
///
/// Statements are ordered as they execute: leading assignments followed by
/// an optional terminal branch. Successor order is significant: for a
/// conditional, index 0 fills the `if` arm and index 1 the `else` arm; for
/// a switch, index 0 is the default arm.
#[derive(Clone, Debug)]
pub struct Block {
    /// Block id (first instruction's index).
    pub id: BlockId,
    /// Indices of the merged instructions, in order.
    pub instrs: Vec<usize>,
    /// Statements carried by the merged instructions, in order.
    pub stmts: Vec<Stmt>,
    /// Successor block ids.
    pub succs: Vec<BlockId>,
}

impl Block {
    /// Create an empty block.
    #[must_use]
    pub const fn new(id: BlockId) -> Self {
        Self {
            id,
            instrs: Vec::new(),
            stmts: Vec::new(),
            succs: Vec::new(),
        }
    }

    /// Terminal branch statement, if the block ends in one.
    #[must_use]
    pub fn terminator(&self) -> Option<&Stmt> {
        self.stmts.last().filter(|s| s.is_branch())
    }

    /// Whether the block ends in a multi-way decision.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.terminator().is_some() && self.succs.len() > 1
    }

    /// The sole successor of a fallthrough block.
    #[must_use]
    pub fn single_succ(&self) -> Option<BlockId> {
        match self.succs.as_slice() {
            [s] => Some(*s),
            _ => None,
        }
    }

    /// Leading assignment and its statement index, if the block starts
    /// with one.
    #[must_use]
    pub fn leading_assign(&self) -> Option<(usize, AssignKind, &str, &str)> {
        let (kind, target, value) = self.stmts.first()?.as_assign()?;
        Some((0, kind, target, value))
    }

    /// The assignment of a pure single-assignment block.
    #[must_use]
    pub fn sole_assign(&self) -> Option<(AssignKind, &str, &str)> {
        match self.stmts.as_slice() {
            [stmt] => stmt.as_assign(),
            _ => None,
        }
    }
}
