//! Switch grouping: merging multi-way branch arms into case clusters.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use vgen_ir::{BlockId, ProcedureGraph, Result, Stmt, StructureError};

use crate::classify::Classes;

/// One rendered case cluster: the labels sharing a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseGroup {
    /// Labels guarding this cluster, in input order. Kept even for the
    /// default cluster, whose keyed labels are absorbed by `default:`.
    pub labels: Vec<String>,
    /// Body block.
    pub body: BlockId,
    /// Whether this cluster renders as `default:` (always last).
    pub is_default: bool,
}

/// Grouping result per switch block.
///
/// An empty group list means the switch degenerated (every arm targets the
/// shared continuation) and renders nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Groups {
    map: FxHashMap<BlockId, Vec<CaseGroup>>,
}

impl Groups {
    /// Case clusters of a switch block, keyed clusters first, default
    /// last.
    #[must_use]
    pub fn get(&self, id: BlockId) -> Option<&[CaseGroup]> {
        self.map.get(&id).map(Vec::as_slice)
    }
}

/// Group every reachable switch block's arms by target identity.
///
/// Arms sharing a target share one label list. The cluster targeting the
/// default arm's block is promoted to print last as `default:`, unless
/// that block is the switch's own continuation, in which case no default
/// is printed and the continuation runs after the case statement. When
/// every arm targets the continuation the grouping degenerates to nothing.
///
/// # Errors
/// [`StructureError::DegenerateSwitch`] for a switch with no keyed arms.
pub fn group_switches(graph: &ProcedureGraph, classes: &Classes) -> Result<Groups> {
    let mut groups = Groups::default();

    for id in graph.ids() {
        if !classes.contains(id) {
            continue;
        }
        let block = graph.block(id);
        let Some(Stmt::Switch { labels, .. }) = block.terminator() else {
            continue;
        };
        if labels.is_empty() {
            return Err(StructureError::DegenerateSwitch { block: id });
        }

        let default_target = block.succs[0];
        let sibling = classes.sibling(id);

        let mut clusters: Vec<CaseGroup> = Vec::new();
        for (label, &target) in labels.iter().zip(&block.succs[1..]) {
            if let Some(cluster) = clusters.iter_mut().find(|c| c.body == target) {
                cluster.labels.push(label.clone());
            } else {
                clusters.push(CaseGroup {
                    labels: vec![label.clone()],
                    body: target,
                    is_default: target == default_target,
                });
            }
        }

        let degenerate = sibling.is_some_and(|s| {
            default_target == s && clusters.iter().all(|c| c.body == s)
        });
        if degenerate {
            trace!(block = id, "switch degenerated to its continuation");
            groups.map.insert(id, Vec::new());
            continue;
        }

        if sibling == Some(default_target) {
            // Default arm is the shared continuation; no default printed.
        } else if let Some(pos) = clusters.iter().position(|c| c.body == default_target) {
            let cluster = clusters.remove(pos);
            clusters.push(cluster);
        } else {
            clusters.push(CaseGroup {
                labels: Vec::new(),
                body: default_target,
                is_default: true,
            });
        }

        trace!(block = id, clusters = clusters.len(), "grouped switch arms");
        groups.map.insert(id, clusters);
    }

    debug!(switches = groups.map.len(), "grouped switch blocks");
    Ok(groups)
}
