//! Structuring error types.

use thiserror::Error;

/// Errors raised while structuring one procedure.
///
/// Variants fall into three classes: malformed front-end input (detected
/// before or during the offending pass), classification failures on a graph
/// whose arms never reconverge, and internal invariant violations that
/// indicate a defect in the engine itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("instruction {instr} lists unknown successor {succ}")]
    UnknownSuccessor { instr: usize, succ: usize },

    #[error("conditional at instruction {instr} has {actual} successors, expected 2")]
    CondArity { instr: usize, actual: usize },

    #[error("switch at instruction {instr} has {actual} successors for {labels} labels")]
    SwitchArity {
        instr: usize,
        actual: usize,
        labels: usize,
    },

    #[error("fold arm at block {block} carries statements beyond its value assignment")]
    SideEffectArm { block: usize },

    #[error("quoted block {block} is missing its folded ternary structure")]
    IncompleteFold { block: usize },

    #[error("arms of conditional block {block} never converge")]
    NoConvergence { block: usize },

    #[error("switch block {block} has only a default arm")]
    DegenerateSwitch { block: usize },

    #[error("quote folding did not converge after {iterations} iterations")]
    NonTerminatingFold { iterations: usize },

    #[error("block {child} nested under block {parent} without a deeper level")]
    ChildLevel { child: usize, parent: usize },
}

impl StructureError {
    /// Whether this error reports malformed front-end input rather than a
    /// classification failure or an internal defect.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::UnknownSuccessor { .. }
                | Self::CondArity { .. }
                | Self::SwitchArity { .. }
                | Self::SideEffectArm { .. }
        )
    }

    /// Whether this error indicates a defect in the engine itself.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::IncompleteFold { .. }
                | Self::NonTerminatingFold { .. }
                | Self::ChildLevel { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StructureError>;
