//! Structuring pipeline - instructions → blocks → classified graph → text.

use rayon::prelude::*;
use tracing::debug;

use vgen_cfg::{Quotes, assign_levels, build_graph, classify, fold_quotes, group_switches};
use vgen_emit::render;
use vgen_ir::{Instr, Result};

/// Structure one procedure's flow graph into Verilog-style text.
///
/// The passes run in a fixed order: graph building, level assignment,
/// branch classification, quote folding, and switch grouping, then one
/// rendering walk. When folding rewrites anything, leveling and
/// classification are re-run over the folded flow view so newly created
/// continuations land at the right level. The call returns either the
/// complete text or a typed error; partial output is never produced.
///
/// `base_indent` prefixes every emitted line, with three further spaces
/// per nesting level.
///
/// # Errors
/// Malformed input (unknown successor, wrong branch arity, a side-effect
/// arm in a folding diamond) and classification failures (non-converging
/// arms, a degenerate switch) abort this procedure only. Internal
/// invariant violations (non-terminating fold, a child not strictly
/// deeper than its parent) are surfaced the same way, never retried.
pub fn structure(instrs: &[Instr], base_indent: &str) -> Result<String> {
    debug!(instructions = instrs.len(), "structuring procedure");

    let graph = build_graph(instrs)?;
    let quotes = Quotes::default();
    let levels = assign_levels(&graph, &quotes);
    let classes = classify(&graph, &quotes, levels)?;

    let quotes = fold_quotes(&graph, &classes)?;
    let classes = if quotes.any() {
        // Folded diamonds changed the flow view; level and classify again.
        let levels = assign_levels(&graph, &quotes);
        classify(&graph, &quotes, levels)?
    } else {
        classes
    };

    let groups = group_switches(&graph, &classes)?;
    render(&graph, &classes, &quotes, &groups, base_indent)
}

/// Structure independent procedures in parallel.
///
/// Procedures share no state, so each is structured on its own worker;
/// results come back in input order, one per procedure, failures included.
#[must_use]
pub fn structure_all(procedures: &[Vec<Instr>], base_indent: &str) -> Vec<Result<String>> {
    procedures
        .par_iter()
        .map(|instrs| structure(instrs, base_indent))
        .collect()
}
