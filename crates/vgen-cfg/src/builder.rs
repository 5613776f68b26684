//! Graph builder: merges the front-end instruction graph into basic blocks.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use vgen_ir::{Block, Instr, MatchPos, ProcedureGraph, Result, Stmt, StructureError};

/// Build a block-granularity [`ProcedureGraph`] from the front-end
/// instruction graph.
///
/// Block starts are instruction 0, any instruction with more than one
/// predecessor, and any target of a branching instruction. Straight-line
/// runs are absorbed into a single block and edges re-targeted to block
/// granularity. Match chains lowered from source-level case statements are
/// folded back into a single switch before blocks form.
///
/// # Errors
/// Returns a malformed-graph error on an unknown successor index or a
/// statement whose successor arity does not fit; no later pass runs.
pub fn build_graph(instrs: &[Instr]) -> Result<ProcedureGraph> {
    let mut map: FxHashMap<usize, Instr> = instrs.iter().map(|i| (i.index, i.clone())).collect();

    validate(&map)?;
    fold_match_chains(&mut map);

    let mut graph = ProcedureGraph::new();
    if !map.contains_key(&0) {
        return Ok(graph);
    }

    let leaders = find_leaders(&map);
    let mut sorted: Vec<usize> = leaders.iter().copied().collect();
    sorted.sort_unstable();

    for &start in &sorted {
        let mut block = Block::new(start);
        let mut cur = start;
        loop {
            let instr = &map[&cur];
            block.instrs.push(cur);
            if let Some(stmt) = &instr.stmt {
                block.stmts.push(stmt.clone());
            }
            match instr.succs.as_slice() {
                [next] if !leaders.contains(next) => cur = *next,
                succs => {
                    block.succs = succs.to_vec();
                    break;
                }
            }
        }
        graph.insert(block);
    }

    debug!(
        instructions = map.len(),
        blocks = graph.len(),
        "merged instruction graph into blocks"
    );
    Ok(graph)
}

/// Check successor indices and statement/successor arity.
fn validate(map: &FxHashMap<usize, Instr>) -> Result<()> {
    for instr in map.values() {
        for &succ in &instr.succs {
            if !map.contains_key(&succ) {
                return Err(StructureError::UnknownSuccessor {
                    instr: instr.index,
                    succ,
                });
            }
        }
        match &instr.stmt {
            Some(Stmt::Cond { .. } | Stmt::Match { .. }) => {
                if instr.succs.len() != 2 {
                    return Err(StructureError::CondArity {
                        instr: instr.index,
                        actual: instr.succs.len(),
                    });
                }
            }
            Some(Stmt::Switch { labels, .. }) => {
                if instr.succs.len() != labels.len() + 1 {
                    return Err(StructureError::SwitchArity {
                        instr: instr.index,
                        actual: instr.succs.len(),
                        labels: labels.len(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Fold top/middle match chains into single switch instructions.
///
/// A `Top` membership test whose no-match successor chain consists of
/// `Middle` tests over the same key becomes one `Switch`: successor 0 is
/// the final no-match target (the default), and each chain label guards
/// its arm. Middles with more than one predecessor break the chain and
/// stay behind as standalone membership tests.
fn fold_match_chains(map: &mut FxHashMap<usize, Instr>) {
    let preds = pred_counts(map);

    let heads: Vec<usize> = map
        .values()
        .filter(|i| matches!(&i.stmt, Some(Stmt::Match { pos: MatchPos::Top, .. })))
        .map(|i| i.index)
        .collect();

    for head in heads {
        let Some(Stmt::Match { key, labels, .. }) = map[&head].stmt.clone() else {
            continue;
        };
        let mut arms: Vec<(Vec<String>, usize)> = vec![(labels, map[&head].succs[1])];
        let mut removed = Vec::new();
        let mut next = map[&head].succs[0];

        loop {
            let candidate = &map[&next];
            let Some(Stmt::Match {
                key: mid_key,
                labels: mid_labels,
                pos: MatchPos::Middle,
            }) = &candidate.stmt
            else {
                break;
            };
            if *mid_key != key || preds.get(&next).copied().unwrap_or(0) != 1 {
                break;
            }
            arms.push((mid_labels.clone(), candidate.succs[1]));
            removed.push(next);
            next = candidate.succs[0];
        }

        if removed.is_empty() {
            continue;
        }

        let mut flat_labels = Vec::new();
        let mut succs = vec![next];
        for (arm_labels, body) in arms {
            for label in arm_labels {
                flat_labels.push(label);
                succs.push(body);
            }
        }
        debug!(head, arms = succs.len() - 1, "folded match chain into switch");

        let folded = map.get_mut(&head).expect("chain head exists");
        folded.stmt = Some(Stmt::switch(key, flat_labels));
        folded.succs = succs;
        for index in removed {
            map.remove(&index);
        }
    }
}

/// Count predecessors per instruction.
fn pred_counts(map: &FxHashMap<usize, Instr>) -> FxHashMap<usize, usize> {
    let mut preds: FxHashMap<usize, usize> = FxHashMap::default();
    for instr in map.values() {
        for &succ in &instr.succs {
            *preds.entry(succ).or_default() += 1;
        }
    }
    preds
}

/// Find block-start instructions.
fn find_leaders(map: &FxHashMap<usize, Instr>) -> FxHashSet<usize> {
    let mut leaders = FxHashSet::default();
    leaders.insert(0);

    for (&index, &count) in &pred_counts(map) {
        if count > 1 {
            leaders.insert(index);
        }
    }
    for instr in map.values() {
        if instr.succs.len() > 1 {
            leaders.extend(instr.succs.iter().copied());
        }
    }
    leaders
}
