//! Level assignment: nesting depth per block by worklist relaxation.

use rustc_hash::FxHashMap;
use tracing::trace;

use vgen_ir::{BlockId, ProcedureGraph, ROOT};

use crate::fold::Quotes;

/// Nesting level per flow-reachable block.
///
/// A block's level is the minimum depth over all reaching paths: a
/// fallthrough block passes its level through, a branching block assigns
/// level + 1 to every arm, and a revisit at a lower level overwrites and
/// re-propagates. The map's domain doubles as the flow-reachable set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Levels {
    map: FxHashMap<BlockId, u32>,
}

impl Levels {
    /// Level of a block, if flow-reachable.
    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<u32> {
        self.map.get(&id).copied()
    }

    /// Level of a block known to be reachable.
    ///
    /// # Panics
    /// Panics if the block was never leveled; classification only visits
    /// leveled blocks, so this fires only on an engine defect.
    #[must_use]
    pub fn level(&self, id: BlockId) -> u32 {
        self.map[&id]
    }

    /// Whether a block is flow-reachable.
    #[must_use]
    pub fn contains(&self, id: BlockId) -> bool {
        self.map.contains_key(&id)
    }

    /// Number of leveled blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no block was leveled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Relax from a seed: record the level if lower than anything seen and
    /// push it through fallthroughs (same level) and branches (level + 1).
    pub(crate) fn relax(&mut self, graph: &ProcedureGraph, quotes: &Quotes, seed: BlockId, level: u32) {
        let mut worklist = vec![(seed, level)];
        while let Some((id, at)) = worklist.pop() {
            match self.map.get(&id) {
                Some(&recorded) if recorded <= at => continue,
                _ => {}
            }
            self.map.insert(id, at);

            let block = graph.block(id);
            let child_level = if quotes.is_flow_branch(block) { at + 1 } else { at };
            for succ in quotes.flow_succs(block) {
                worklist.push((succ, child_level));
            }
        }
    }
}

/// Assign nesting levels from the root, honoring the quote view: folded
/// diamonds flow straight to their continuation and quoted arms carry no
/// flow of their own.
#[must_use]
pub fn assign_levels(graph: &ProcedureGraph, quotes: &Quotes) -> Levels {
    let mut levels = Levels::default();
    if graph.get(ROOT).is_some() {
        levels.relax(graph, quotes, ROOT, 0);
    }
    trace!(leveled = levels.len(), "assigned block levels");
    levels
}
