//! Per-procedure block arena.

use rustc_hash::FxHashMap;

use crate::block::{Block, BlockId};

/// All blocks of one procedure, keyed by block id.
///
/// Built once by the graph builder, read by every later pass, then
/// discarded. Children are stored as ids rather than references, so join
/// points introduce no ownership cycles.
#[derive(Clone, Debug, Default)]
pub struct ProcedureGraph {
    blocks: FxHashMap<BlockId, Block>,
    order: Vec<BlockId>,
}

/// Entry block id: the block holding instruction 0.
pub const ROOT: BlockId = 0;

impl ProcedureGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block. Ids are unique by construction (one block per
    /// leader instruction); a duplicate insert replaces the old block.
    pub fn insert(&mut self, block: Block) {
        if !self.blocks.contains_key(&block.id) {
            self.order.push(block.id);
        }
        self.blocks.insert(block.id, block);
    }

    /// Look up a block.
    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    /// Look up a block known to exist.
    ///
    /// # Panics
    /// Panics if `id` was never inserted; the builder validates every
    /// successor edge, so this only fires on an engine defect.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[&id]
    }

    /// Block ids in insertion (ascending leader) order.
    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.order.iter().copied()
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the graph has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
