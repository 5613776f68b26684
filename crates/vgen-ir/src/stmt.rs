//! Statement representation.

/// Assignment flavor: blocking `=` or non-blocking `<=`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignKind {
    Blocking,
    NonBlocking,
}

impl AssignKind {
    /// Assignment operator token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Blocking => "=",
            Self::NonBlocking => "<=",
        }
    }
}

/// Comparison relation of a conditional.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Relation {
    /// Comparison operator token.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Relation that holds exactly when `self` does not.
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Ge => Self::Lt,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
        }
    }
}

/// Position of a membership test within a front-end match chain.
///
/// The front end lowers a source-level case statement into a chain of
/// membership tests: one `Top` head whose fallthrough successors are
/// `Middle` tests over the same key. The graph builder folds such chains
/// back into a single [`Stmt::Switch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPos {
    Top,
    Middle,
}

/// Statement kinds attached to instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// Value assignment to a signal or register.
    Assign {
        kind: AssignKind,
        target: String,
        value: String,
    },
    /// Two-way branch condition. Successor 0 fills the `if` arm,
    /// successor 1 the `else` arm.
    Cond {
        rel: Relation,
        left: String,
        right: String,
    },
    /// Multi-way branch. Successor 0 is the default arm; `labels[i]`
    /// guards successor `i + 1`.
    Switch { key: String, labels: Vec<String> },
    /// Membership test: `key` against a label set. Successor 0 is the
    /// no-match arm, successor 1 the match arm.
    Match {
        key: String,
        labels: Vec<String>,
        pos: MatchPos,
    },
}

impl Stmt {
    /// Create a blocking assignment.
    pub fn assign(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Assign {
            kind: AssignKind::Blocking,
            target: target.into(),
            value: value.into(),
        }
    }

    /// Create a non-blocking assignment.
    pub fn set(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Assign {
            kind: AssignKind::NonBlocking,
            target: target.into(),
            value: value.into(),
        }
    }

    /// Create a branch condition.
    pub fn cond(rel: Relation, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::Cond {
            rel,
            left: left.into(),
            right: right.into(),
        }
    }

    /// Create a multi-way branch.
    pub fn switch(key: impl Into<String>, labels: Vec<String>) -> Self {
        Self::Switch {
            key: key.into(),
            labels,
        }
    }

    /// Create a membership test.
    pub fn matches(key: impl Into<String>, labels: Vec<String>, pos: MatchPos) -> Self {
        Self::Match {
            key: key.into(),
            labels,
            pos,
        }
    }

    /// Whether this statement terminates a block with a branch.
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        matches!(
            self,
            Self::Cond { .. } | Self::Switch { .. } | Self::Match { .. }
        )
    }

    /// Assignment fields, if this is an assignment.
    #[must_use]
    pub fn as_assign(&self) -> Option<(AssignKind, &str, &str)> {
        match self {
            Self::Assign {
                kind,
                target,
                value,
            } => Some((*kind, target, value)),
            _ => None,
        }
    }
}
