//! Quote folding: collapsing single-assignment decision diamonds into
//! ternary expressions, to fixed point.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use vgen_ir::{AssignKind, Block, BlockId, ProcedureGraph, Result, Stmt, StructureError};

use crate::classify::Classes;

/// Quote state of a block after folding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QuoteState {
    /// Not part of any folded diamond.
    #[default]
    Normal,
    /// Outermost folded diamond; renders as a single assignment of a
    /// ternary expression.
    Top,
    /// Folded diamond nested inside another; renders as a nested ternary.
    Middle,
    /// Arm of a folded diamond; its assignment's value becomes one side of
    /// the ternary.
    Expr,
}

/// Assignment data carried by a folded diamond.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoldedAssign {
    /// Target of the absorbed continuation assignment.
    pub target: String,
    /// Assignment flavor of the absorbed assignment.
    pub kind: AssignKind,
    /// Temp variable the diamond's arms produce.
    pub temp: String,
}

/// Quote-folding result: per-block quote state, carried assignments,
/// continuations of folded diamonds, and the absorbed statements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Quotes {
    states: FxHashMap<BlockId, QuoteState>,
    folds: FxHashMap<BlockId, FoldedAssign>,
    continuations: FxHashMap<BlockId, BlockId>,
    /// Join block -> statement index absorbed into a ternary.
    absorbed: FxHashMap<BlockId, usize>,
}

impl Quotes {
    /// Quote state of a block.
    #[must_use]
    pub fn state(&self, id: BlockId) -> QuoteState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    /// Carried assignment of a folded diamond.
    #[must_use]
    pub fn fold(&self, id: BlockId) -> Option<&FoldedAssign> {
        self.folds.get(&id)
    }

    /// Continuation of a folded top diamond.
    #[must_use]
    pub fn continuation(&self, id: BlockId) -> Option<BlockId> {
        self.continuations.get(&id).copied()
    }

    /// Statement index absorbed from a join block, if any.
    #[must_use]
    pub fn absorbed_stmt(&self, id: BlockId) -> Option<usize> {
        self.absorbed.get(&id).copied()
    }

    /// Whether any diamond was folded.
    #[must_use]
    pub fn any(&self) -> bool {
        !self.states.is_empty()
    }

    /// Successors as seen by leveling and classification: a folded top
    /// diamond flows straight to its continuation, and quoted arms carry
    /// no flow of their own.
    #[must_use]
    pub fn flow_succs(&self, block: &Block) -> Vec<BlockId> {
        match self.state(block.id) {
            QuoteState::Normal => block.succs.clone(),
            QuoteState::Top => self.continuation(block.id).map_or_else(Vec::new, |c| vec![c]),
            QuoteState::Middle | QuoteState::Expr => Vec::new(),
        }
    }

    /// Whether a block still branches in the flow view.
    #[must_use]
    pub fn is_flow_branch(&self, block: &Block) -> bool {
        self.state(block.id) == QuoteState::Normal && block.is_branch()
    }
}

/// Shape of a diamond arm as a value producer.
enum ArmShape {
    /// Pure single-assignment block falling into the join.
    Pure { temp: String },
    /// Already-folded diamond continuing at the join.
    Folded { temp: String },
    /// Falls into the join and ends in an assignment, but carries extra
    /// statements.
    Impure { temp: String },
    /// Not a value producer for this join.
    Other,
}

/// Collapse single-assignment decision diamonds into ternary expressions,
/// iterating to fixed point.
///
/// A diamond folds when both arms produce the same temp variable, both
/// continue at the diamond's sibling, the sibling's leading assignment
/// reads exactly that temp, and the temp is read nowhere else. An inner
/// folded diamond fed to an outer one is demoted from top to middle,
/// which is how arbitrarily nested ternaries arise.
///
/// A join can turn out, at the fixed point, to still be fed by a producer
/// outside the folded tree (a third block writing the temp on its own path
/// into the join). Such a join cannot absorb its assignment; the folds
/// feeding it are rolled back and the diamonds render as if/else.
///
/// # Errors
/// [`StructureError::SideEffectArm`] when an arm of a folding diamond
/// carries statements beyond its value assignment;
/// [`StructureError::NonTerminatingFold`] when the iteration bound is
/// exceeded (an engine defect, never retried).
pub fn fold_quotes(graph: &ProcedureGraph, classes: &Classes) -> Result<Quotes> {
    let bound = graph.len() + 1;
    let mut barred: FxHashSet<BlockId> = FxHashSet::default();

    loop {
        let mut quotes = Quotes::default();
        let mut iterations = 0;
        loop {
            iterations += 1;
            if iterations > bound {
                return Err(StructureError::NonTerminatingFold { iterations });
            }

            let mut changed = false;
            for id in graph.ids() {
                if !classes.contains(id) || quotes.state(id) != QuoteState::Normal {
                    continue;
                }
                if try_fold(graph, classes, &mut quotes, &barred, id)? {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let invalid = invalid_joins(graph, &quotes);
        if invalid.is_empty() {
            if quotes.any() {
                debug!(
                    folded = quotes.continuations.len(),
                    iterations, "folded decision diamonds into ternaries"
                );
            }
            return Ok(quotes);
        }
        // Every barred join stays unfolded on the next round; the set only
        // grows, so the rollback loop terminates.
        debug!(
            joins = invalid.len(),
            "rolled back folds into joins with outside producers"
        );
        barred.extend(invalid);
    }
}

/// Attempt to fold the diamond rooted at `id`. Returns whether a rewrite
/// happened.
fn try_fold(
    graph: &ProcedureGraph,
    classes: &Classes,
    quotes: &mut Quotes,
    barred: &FxHashSet<BlockId>,
    id: BlockId,
) -> Result<bool> {
    let block = graph.block(id);
    if !matches!(block.terminator(), Some(Stmt::Cond { .. })) || block.succs.len() != 2 {
        return Ok(false);
    }
    let Some(join) = classes.sibling(id) else {
        return Ok(false);
    };
    if barred.contains(&join) {
        return Ok(false);
    }

    let shapes = [
        arm_shape(graph, quotes, block.succs[0], join),
        arm_shape(graph, quotes, block.succs[1], join),
    ];

    // The diamond only matters when its continuation reads a temp that the
    // arms produce.
    let carried = if quotes.absorbed_stmt(join).is_some() {
        // Promotion: the join's assignment was already absorbed by an
        // inner diamond; inherit its carried data.
        inherited_fold(&shapes, quotes, block)
    } else {
        fresh_fold(graph, &shapes, block, join)?
    };
    let Some(fold) = carried else {
        return Ok(false);
    };

    for (&arm, shape) in block.succs.iter().zip(&shapes) {
        match shape {
            ArmShape::Pure { .. } => {
                quotes.states.insert(arm, QuoteState::Expr);
            }
            ArmShape::Folded { .. } => {
                quotes.states.insert(arm, QuoteState::Middle);
                quotes.continuations.remove(&arm);
            }
            ArmShape::Impure { .. } | ArmShape::Other => {}
        }
    }
    quotes.states.insert(id, QuoteState::Top);
    quotes.continuations.insert(id, join);
    if quotes.absorbed_stmt(join).is_none() {
        quotes.absorbed.insert(join, 0);
    }
    quotes.folds.insert(id, fold);
    trace!(block = id, join, "folded diamond");
    Ok(true)
}

/// Fold data for a diamond whose join assignment is still in place.
fn fresh_fold(
    graph: &ProcedureGraph,
    shapes: &[ArmShape; 2],
    block: &Block,
    join: BlockId,
) -> Result<Option<FoldedAssign>> {
    let Some((_, kind, target, value)) = graph.block(join).leading_assign() else {
        return Ok(None);
    };
    if !is_ident(value) {
        return Ok(None);
    }
    let temp = value;

    let produced = [arm_temp(&shapes[0]), arm_temp(&shapes[1])];
    if produced.iter().any(|t| *t != Some(temp)) {
        // Flag a side-effecting arm only when the other arm qualifies.
        for (shape, &arm) in shapes.iter().zip(&block.succs) {
            if matches!(shape, ArmShape::Impure { temp: t } if t == temp)
                && produced.iter().flatten().any(|t| *t == temp)
            {
                return Err(StructureError::SideEffectArm { block: arm });
            }
        }
        return Ok(None);
    }
    if read_outside(graph, temp, join) {
        return Ok(None);
    }

    Ok(Some(FoldedAssign {
        target: target.to_string(),
        kind,
        temp: temp.to_string(),
    }))
}

/// Fold data inherited from an inner folded arm (promotion).
fn inherited_fold(shapes: &[ArmShape; 2], quotes: &Quotes, block: &Block) -> Option<FoldedAssign> {
    let inner = block
        .succs
        .iter()
        .zip(shapes)
        .find_map(|(&arm, shape)| match shape {
            ArmShape::Folded { .. } => quotes.fold(arm).cloned(),
            _ => None,
        })?;

    let temp = inner.temp.as_str();
    let matches = shapes.iter().all(|s| arm_temp(s) == Some(temp));
    matches.then_some(inner)
}

/// Temp variable an arm produces, if any.
fn arm_temp(shape: &ArmShape) -> Option<&str> {
    match shape {
        ArmShape::Pure { temp } | ArmShape::Folded { temp } => Some(temp),
        ArmShape::Impure { .. } | ArmShape::Other => None,
    }
}

/// Classify an arm of a candidate diamond with respect to its join.
fn arm_shape(graph: &ProcedureGraph, quotes: &Quotes, arm: BlockId, join: BlockId) -> ArmShape {
    match quotes.state(arm) {
        QuoteState::Top => {
            if quotes.continuation(arm) == Some(join) {
                quotes.fold(arm).map_or(ArmShape::Other, |f| ArmShape::Folded {
                    temp: f.temp.clone(),
                })
            } else {
                ArmShape::Other
            }
        }
        QuoteState::Middle | QuoteState::Expr => ArmShape::Other,
        QuoteState::Normal => {
            let block = graph.block(arm);
            if block.single_succ() != Some(join) {
                return ArmShape::Other;
            }
            if let Some((_, target, _)) = block.sole_assign() {
                return ArmShape::Pure {
                    temp: target.to_string(),
                };
            }
            match block.stmts.last().and_then(Stmt::as_assign) {
                Some((_, target, _)) if block.stmts.len() > 1 => ArmShape::Impure {
                    temp: target.to_string(),
                },
                _ => ArmShape::Other,
            }
        }
    }
}

/// Whether `temp` is read by any statement other than the join's leading
/// assignment.
fn read_outside(graph: &ProcedureGraph, temp: &str, join: BlockId) -> bool {
    for id in graph.ids() {
        for (index, stmt) in graph.block(id).stmts.iter().enumerate() {
            if id == join && index == 0 {
                continue;
            }
            let read = match stmt {
                Stmt::Assign { value, .. } => contains_token(value, temp),
                Stmt::Cond { left, right, .. } => {
                    contains_token(left, temp) || contains_token(right, temp)
                }
                Stmt::Switch { key, .. } | Stmt::Match { key, .. } => contains_token(key, temp),
            };
            if read {
                return true;
            }
        }
    }
    false
}

/// Absorbed joins still fed by a predecessor outside the folded tree; a
/// path through such a predecessor needs the absorbed assignment, so the
/// folds into the join must be undone.
fn invalid_joins(graph: &ProcedureGraph, quotes: &Quotes) -> Vec<BlockId> {
    quotes
        .absorbed
        .keys()
        .copied()
        .filter(|&join| {
            graph
                .ids()
                .any(|id| graph.block(id).succs.contains(&join) && quotes.state(id) != QuoteState::Expr)
        })
        .collect()
}

/// Whether `s` is a bare identifier.
fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `needle` occurs in `hay` as a whole identifier token.
fn contains_token(hay: &str, needle: &str) -> bool {
    let ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut start = 0;
    while let Some(pos) = hay[start..].find(needle) {
        let at = start + pos;
        let before_ok = at == 0 || !hay[..at].chars().next_back().is_some_and(ident);
        let after = at + needle.len();
        let after_ok = after >= hay.len() || !hay[after..].chars().next().is_some_and(ident);
        if before_ok && after_ok {
            return true;
        }
        start = at + 1;
    }
    false
}
