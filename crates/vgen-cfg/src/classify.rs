//! Branch classification: child / sibling / return per block.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use vgen_ir::{BlockId, ProcedureGraph, Result, StructureError};

use crate::fold::Quotes;
use crate::levels::Levels;

/// Classification of one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    /// Nested content of a branch arm; rendered inside the arm.
    Child,
    /// Join point; rendered once after its dominating branch.
    Sibling,
    /// Procedure exit; never continues.
    Return,
}

/// Classification result: class per block, continuation per block, and the
/// levels adjusted so every sibling sits at its dominating parent's level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classes {
    classes: FxHashMap<BlockId, Class>,
    siblings: FxHashMap<BlockId, BlockId>,
    /// Levels with sibling forcing applied.
    pub levels: Levels,
}

impl Classes {
    /// Class of a block, if flow-reachable.
    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<Class> {
        self.classes.get(&id).copied()
    }

    /// Continuation of a block: the single successor of a fallthrough, the
    /// join of a branch, or the continuation of a folded diamond.
    #[must_use]
    pub fn sibling(&self, id: BlockId) -> Option<BlockId> {
        self.siblings.get(&id).copied()
    }

    /// Whether a block was classified (i.e. is flow-reachable).
    #[must_use]
    pub fn contains(&self, id: BlockId) -> bool {
        self.classes.contains_key(&id)
    }
}

/// Classify every flow-reachable block and force join levels.
///
/// A block with no flow successors is a return; the unique shallowest
/// block reachable from every arm of a branch is that branch's sibling,
/// forced down to its parent's level (and re-relaxed through its
/// continuation chain); everything else is a child.
///
/// # Errors
/// Returns [`StructureError::NoConvergence`] when a branch's arms share no
/// continuation, or share no unique shallowest one.
pub fn classify(graph: &ProcedureGraph, quotes: &Quotes, levels: Levels) -> Result<Classes> {
    let mut levels = levels;
    let mut classes = FxHashMap::default();
    let mut siblings = FxHashMap::default();
    let mut joins = FxHashSet::default();

    let reachable: Vec<BlockId> = graph.ids().filter(|&id| levels.contains(id)).collect();
    let mut reach = ReachSets::default();

    for &id in &reachable {
        let block = graph.block(id);
        if let Some(cont) = quotes.continuation(id) {
            siblings.insert(id, cont);
        } else if quotes.is_flow_branch(block) {
            let join = find_join(graph, quotes, &mut reach, id)?;
            siblings.insert(id, join);
            joins.insert(join);
        } else if let Some(succ) = block.single_succ() {
            siblings.insert(id, succ);
        }
    }

    // Force every join down to the minimum of its parents' levels,
    // re-relaxing through its continuation chain until stable.
    let branch_parents: Vec<BlockId> = reachable
        .iter()
        .copied()
        .filter(|&id| quotes.is_flow_branch(graph.block(id)))
        .collect();
    let mut changed = true;
    while changed {
        changed = false;
        for &parent in &branch_parents {
            let Some(&join) = siblings.get(&parent) else {
                continue;
            };
            let target = levels.level(parent);
            if levels.get(join).is_none_or(|l| l > target) {
                levels.relax(graph, quotes, join, target);
                changed = true;
            }
        }
    }

    for &id in &reachable {
        let block = graph.block(id);
        let class = if joins.contains(&id) {
            Class::Sibling
        } else if quotes.flow_succs(block).is_empty() {
            Class::Return
        } else {
            Class::Child
        };
        classes.insert(id, class);
    }

    debug!(
        blocks = reachable.len(),
        joins = joins.len(),
        "classified blocks"
    );
    Ok(Classes {
        classes,
        siblings,
        levels,
    })
}

/// Memoized forward-reachability sets over the loop-free flow graph.
#[derive(Default)]
struct ReachSets {
    sets: FxHashMap<BlockId, FxHashSet<BlockId>>,
}

impl ReachSets {
    /// Blocks reachable from `id`, including `id` itself.
    fn get(&mut self, graph: &ProcedureGraph, quotes: &Quotes, id: BlockId) -> &FxHashSet<BlockId> {
        if !self.sets.contains_key(&id) {
            let mut set = FxHashSet::default();
            set.insert(id);
            for succ in quotes.flow_succs(graph.block(id)) {
                set.extend(self.get(graph, quotes, succ).iter().copied());
            }
            self.sets.insert(id, set);
        }
        &self.sets[&id]
    }
}

/// The unique shallowest block reachable from every arm of a branch.
fn find_join(
    graph: &ProcedureGraph,
    quotes: &Quotes,
    reach: &mut ReachSets,
    id: BlockId,
) -> Result<BlockId> {
    let arms = quotes.flow_succs(graph.block(id));

    let mut common: Option<FxHashSet<BlockId>> = None;
    for &arm in &arms {
        let set = reach.get(graph, quotes, arm).clone();
        common = Some(match common {
            None => set,
            Some(prev) => prev.intersection(&set).copied().collect(),
        });
    }
    let common = common.unwrap_or_default();
    if common.is_empty() {
        return Err(StructureError::NoConvergence { block: id });
    }

    // The join is the candidate that reaches every other candidate; since
    // all candidates lie on every path out of the branch, it is the one
    // with the largest reach set.
    let mut join = None;
    let mut best = 0;
    let mut sorted: Vec<BlockId> = common.iter().copied().collect();
    sorted.sort_unstable();
    for &candidate in &sorted {
        let size = reach.get(graph, quotes, candidate).len();
        if size > best {
            best = size;
            join = Some(candidate);
        }
    }
    let join = join.ok_or(StructureError::NoConvergence { block: id })?;

    let join_reach = reach.get(graph, quotes, join);
    if !common.iter().all(|c| join_reach.contains(c)) {
        return Err(StructureError::NoConvergence { block: id });
    }
    trace!(block = id, join, "found branch join");
    Ok(join)
}
