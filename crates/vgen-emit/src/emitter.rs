//! Structured text renderer.
//!
//! Walks the classified, folded graph depth first and emits Verilog-style
//! text: `if (cond) begin … end else begin … end`, folded ternaries
//! `target = (cond) ? (…) : (…);`, and `case (key) … endcase`. Nesting is
//! indented three spaces per level on top of a caller-supplied base, so
//! the result drops into a clocked-update or continuous-assignment
//! wrapper.

use tracing::debug;

use vgen_cfg::{Classes, Groups, QuoteState, Quotes};
use vgen_ir::{Block, BlockId, ProcedureGraph, ROOT, Result, Stmt, StructureError};

const INDENT: &str = "   ";

/// Render the structured text of a classified procedure graph.
///
/// Rendering either produces the complete text or fails; partial output is
/// never returned.
///
/// # Errors
/// [`StructureError::ChildLevel`] when a nested arm does not sit strictly
/// deeper than its parent, [`StructureError::IncompleteFold`] when a
/// quoted diamond lost its expression arms. Both report engine defects
/// surfaced instead of corrupt text.
pub fn render(
    graph: &ProcedureGraph,
    classes: &Classes,
    quotes: &Quotes,
    groups: &Groups,
    base: &str,
) -> Result<String> {
    let mut renderer = Renderer {
        graph,
        classes,
        quotes,
        groups,
        base,
        out: String::with_capacity(256),
    };
    if graph.get(ROOT).is_some() {
        renderer.chain(ROOT, 0)?;
    }
    debug!(bytes = renderer.out.len(), "rendered structured text");
    Ok(renderer.out)
}

struct Renderer<'a> {
    graph: &'a ProcedureGraph,
    classes: &'a Classes,
    quotes: &'a Quotes,
    groups: &'a Groups,
    base: &'a str,
    out: String,
}

impl Renderer<'_> {
    /// Write one indented line.
    fn line(&mut self, depth: u32, text: &str) {
        self.out.push_str(self.base);
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Render a block and everything that runs after it at the same level:
    /// content first, then the continuation chain for as long as it stays
    /// on this level. Deeper continuations belong to an enclosing chain.
    fn chain(&mut self, start: BlockId, depth: u32) -> Result<()> {
        let mut cur = start;
        loop {
            self.content(cur, depth)?;
            let Some(next) = self.classes.sibling(cur) else {
                break;
            };
            if self.classes.levels.get(next) != self.classes.levels.get(cur) {
                break;
            }
            cur = next;
        }
        Ok(())
    }

    /// Render one block's own statements and branch structure.
    fn content(&mut self, id: BlockId, depth: u32) -> Result<()> {
        let block = self.graph.block(id);
        let absorbed = self.quotes.absorbed_stmt(id);
        let body_len = if block.terminator().is_some() {
            block.stmts.len() - 1
        } else {
            block.stmts.len()
        };

        for (index, stmt) in block.stmts[..body_len].iter().enumerate() {
            if absorbed == Some(index) {
                continue;
            }
            if let Some((kind, target, value)) = stmt.as_assign() {
                let op = kind.token();
                self.line(depth, &format!("{target} {op} {value};"));
            }
        }

        if self.quotes.state(id) == QuoteState::Top {
            if let Some(fold) = self.quotes.fold(id) {
                let op = fold.kind.token();
                let target = &fold.target;
                let expr = self.ternary(id)?;
                self.line(depth, &format!("{target} {op} {expr};"));
            }
            return Ok(());
        }

        match block.terminator() {
            Some(Stmt::Cond { .. }) => self.render_if(block, depth),
            Some(Stmt::Switch { .. }) => self.render_case(block, depth),
            Some(Stmt::Match { .. }) => self.render_match(block, depth),
            _ => Ok(()),
        }
    }

    /// Nested ternary expression of a folded diamond.
    fn ternary(&self, id: BlockId) -> Result<String> {
        let block = self.graph.block(id);
        let Some(Stmt::Cond { rel, left, right }) = block.terminator() else {
            return Err(StructureError::IncompleteFold { block: id });
        };
        let rel = rel.token();
        let then = self.arm_expr(block.succs[0])?;
        let other = self.arm_expr(block.succs[1])?;
        Ok(format!("({left} {rel} {right}) ? ({then}) : ({other})"))
    }

    /// Expression text one arm of a folded diamond contributes.
    fn arm_expr(&self, arm: BlockId) -> Result<String> {
        match self.quotes.state(arm) {
            QuoteState::Expr => self
                .graph
                .block(arm)
                .sole_assign()
                .map(|(_, _, value)| value.to_string())
                .ok_or(StructureError::IncompleteFold { block: arm }),
            QuoteState::Middle => self.ternary(arm),
            QuoteState::Normal | QuoteState::Top => {
                Err(StructureError::IncompleteFold { block: arm })
            }
        }
    }

    /// Nested arm: check the nesting invariant, then recurse one level
    /// deeper.
    fn arm(&mut self, child: BlockId, parent: BlockId, depth: u32) -> Result<()> {
        self.check_nested(child, parent)?;
        self.chain(child, depth + 1)
    }

    /// A nested child must sit strictly deeper than its parent.
    fn check_nested(&self, child: BlockId, parent: BlockId) -> Result<()> {
        let levels = &self.classes.levels;
        if levels.get(child).is_none_or(|l| l <= levels.level(parent)) {
            return Err(StructureError::ChildLevel { child, parent });
        }
        Ok(())
    }

    /// Two-way conditional. Successor 0 fills the `if` arm; when it is the
    /// continuation the condition is negated so the other arm fills the
    /// `if` arm and no `else` is printed.
    fn render_if(&mut self, block: &Block, depth: u32) -> Result<()> {
        let Some(Stmt::Cond { rel, left, right }) = block.terminator() else {
            return Ok(());
        };
        let sibling = self.classes.sibling(block.id);
        let (then, other) = (block.succs[0], block.succs[1]);

        match (Some(then) != sibling, Some(other) != sibling) {
            (true, true) => {
                let rel = rel.token();
                self.line(depth, &format!("if ({left} {rel} {right}) begin"));
                self.arm(then, block.id, depth)?;
                self.line(depth, "end");
                self.line(depth, "else begin");
                self.arm(other, block.id, depth)?;
                self.line(depth, "end");
            }
            (true, false) => {
                let rel = rel.token();
                self.line(depth, &format!("if ({left} {rel} {right}) begin"));
                self.arm(then, block.id, depth)?;
                self.line(depth, "end");
            }
            (false, true) => {
                let rel = rel.negated().token();
                self.line(depth, &format!("if ({left} {rel} {right}) begin"));
                self.arm(other, block.id, depth)?;
                self.line(depth, "end");
            }
            (false, false) => {}
        }
        Ok(())
    }

    /// Standalone membership test: a disjunction of equality tests guards
    /// the match arm (successor 1).
    fn render_match(&mut self, block: &Block, depth: u32) -> Result<()> {
        let Some(Stmt::Match { key, labels, .. }) = block.terminator() else {
            return Ok(());
        };
        let test = labels
            .iter()
            .map(|label| format!("{key} == {label}"))
            .collect::<Vec<_>>()
            .join(" || ");
        let sibling = self.classes.sibling(block.id);
        let (miss, hit) = (block.succs[0], block.succs[1]);

        match (Some(hit) != sibling, Some(miss) != sibling) {
            (true, true) => {
                self.line(depth, &format!("if ({test}) begin"));
                self.arm(hit, block.id, depth)?;
                self.line(depth, "end");
                self.line(depth, "else begin");
                self.arm(miss, block.id, depth)?;
                self.line(depth, "end");
            }
            (true, false) => {
                self.line(depth, &format!("if ({test}) begin"));
                self.arm(hit, block.id, depth)?;
                self.line(depth, "end");
            }
            (false, true) => {
                self.line(depth, &format!("if (!({test})) begin"));
                self.arm(miss, block.id, depth)?;
                self.line(depth, "end");
            }
            (false, false) => {}
        }
        Ok(())
    }

    /// Case statement from the grouped arms: keyed clusters in first-label
    /// order, default last, arms targeting the continuation left empty.
    fn render_case(&mut self, block: &Block, depth: u32) -> Result<()> {
        let Some(Stmt::Switch { key, .. }) = block.terminator() else {
            return Ok(());
        };
        let Some(clusters) = self.groups.get(block.id) else {
            return Ok(());
        };
        if clusters.is_empty() {
            return Ok(());
        }
        let sibling = self.classes.sibling(block.id);

        self.line(depth, &format!("case ({key})"));
        for cluster in clusters {
            let label = if cluster.is_default {
                "default".to_string()
            } else {
                cluster.labels.join(", ")
            };
            self.line(depth + 1, &format!("{label}: begin"));
            if Some(cluster.body) != sibling {
                self.check_nested(cluster.body, block.id)?;
                self.chain(cluster.body, depth + 2)?;
            }
            self.line(depth + 1, "end");
        }
        self.line(depth, "endcase");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgen_cfg::{assign_levels, build_graph, classify, fold_quotes, group_switches};
    use vgen_ir::{Instr, MatchPos, Relation};

    fn structure(instrs: &[Instr], base: &str) -> Result<String> {
        let graph = build_graph(instrs)?;
        let quotes = Quotes::default();
        let levels = assign_levels(&graph, &quotes);
        let classes = classify(&graph, &quotes, levels)?;
        let quotes = fold_quotes(&graph, &classes)?;
        let classes = if quotes.any() {
            let levels = assign_levels(&graph, &quotes);
            classify(&graph, &quotes, levels)?
        } else {
            classes
        };
        let groups = group_switches(&graph, &classes)?;
        render(&graph, &classes, &quotes, &groups, base)
    }

    #[test]
    fn test_if_else() {
        // y feeds two readers, so the diamond stays an if/else.
        let instrs = vec![
            Instr::with_stmt(0, vec![2, 1], Stmt::cond(Relation::Eq, "x", "0")),
            Instr::with_stmt(1, vec![3], Stmt::assign("y", "1")),
            Instr::with_stmt(2, vec![3], Stmt::assign("y", "2")),
            Instr::with_stmt(3, vec![4], Stmt::assign("z", "y")),
            Instr::with_stmt(4, vec![], Stmt::assign("w", "y")),
        ];
        let text = structure(&instrs, "").unwrap();
        assert_eq!(
            text,
            "if (x == 0) begin\n   y = 2;\nend\nelse begin\n   y = 1;\nend\nz = y;\nw = y;\n"
        );
    }

    #[test]
    fn test_ternary() {
        let instrs = vec![
            Instr::with_stmt(0, vec![2, 1], Stmt::cond(Relation::Eq, "x", "0")),
            Instr::with_stmt(1, vec![3], Stmt::assign("y", "1")),
            Instr::with_stmt(2, vec![3], Stmt::assign("y", "2")),
            Instr::with_stmt(3, vec![], Stmt::assign("z", "y")),
        ];
        let text = structure(&instrs, "").unwrap();
        assert_eq!(text, "z = (x == 0) ? (2) : (1);\n");
    }

    #[test]
    fn test_nested_ternary() {
        let instrs = vec![
            Instr::with_stmt(0, vec![5, 1], Stmt::cond(Relation::Eq, "a", "0")),
            Instr::with_stmt(1, vec![3, 2], Stmt::cond(Relation::Eq, "b", "0")),
            Instr::with_stmt(2, vec![6], Stmt::assign("y", "2")),
            Instr::with_stmt(3, vec![6], Stmt::assign("y", "3")),
            Instr::with_stmt(5, vec![6], Stmt::assign("y", "5")),
            Instr::with_stmt(6, vec![], Stmt::assign("z", "y")),
        ];
        let text = structure(&instrs, "").unwrap();
        assert_eq!(text, "z = (a == 0) ? (5) : ((b == 0) ? (3) : (2));\n");
    }

    #[test]
    fn test_if_without_else() {
        // The negated condition guards the only populated arm.
        let instrs = vec![
            Instr::with_stmt(0, vec![2, 1], Stmt::cond(Relation::Eq, "x", "0")),
            Instr::with_stmt(1, vec![2], Stmt::assign("y", "1")),
            Instr::with_stmt(2, vec![3], Stmt::assign("z", "y")),
            Instr::with_stmt(3, vec![], Stmt::assign("w", "y")),
        ];
        let text = structure(&instrs, "").unwrap();
        assert_eq!(text, "if (x != 0) begin\n   y = 1;\nend\nz = y;\nw = y;\n");
    }

    #[test]
    fn test_case_with_shared_default() {
        let instrs = vec![
            Instr::with_stmt(
                0,
                vec![2, 1, 1, 2],
                Stmt::switch("k", vec!["0".into(), "1".into(), "2".into()]),
            ),
            Instr::with_stmt(1, vec![3], Stmt::assign("a", "1")),
            Instr::with_stmt(2, vec![3], Stmt::assign("a", "2")),
            Instr::with_stmt(3, vec![], Stmt::assign("out", "a")),
        ];
        let text = structure(&instrs, "").unwrap();
        assert_eq!(
            text,
            "case (k)\n   0, 1: begin\n      a = 1;\n   end\n   default: begin\n      a = 2;\n   end\nendcase\nout = a;\n"
        );
    }

    #[test]
    fn test_membership_test() {
        let instrs = vec![
            Instr::with_stmt(
                0,
                vec![2, 1],
                Stmt::matches("k", vec!["0".into(), "1".into()], MatchPos::Top),
            ),
            Instr::with_stmt(1, vec![3], Stmt::assign("a", "1")),
            Instr::with_stmt(2, vec![3], Stmt::assign("a", "2")),
            Instr::with_stmt(3, vec![], Stmt::assign("out", "a")),
        ];
        let text = structure(&instrs, "").unwrap();
        assert_eq!(
            text,
            "if (k == 0 || k == 1) begin\n   a = 1;\nend\nelse begin\n   a = 2;\nend\nout = a;\n"
        );
    }

    #[test]
    fn test_outside_writer_keeps_if_else() {
        // A third path writes the temp and flows into the diamond's join,
        // so the fold is rolled back and the nested if/else survives.
        let instrs = vec![
            Instr::with_stmt(0, vec![5, 1], Stmt::cond(Relation::Eq, "q", "0")),
            Instr::with_stmt(1, vec![3, 2], Stmt::cond(Relation::Eq, "x", "0")),
            Instr::with_stmt(2, vec![4], Stmt::assign("y", "1")),
            Instr::with_stmt(3, vec![4], Stmt::assign("y", "2")),
            Instr::with_stmt(5, vec![6], Stmt::assign("w", "7")),
            Instr::with_stmt(6, vec![4], Stmt::assign("y", "5")),
            Instr::with_stmt(4, vec![], Stmt::assign("z", "y")),
        ];
        let text = structure(&instrs, "").unwrap();
        assert_eq!(
            text,
            "if (q == 0) begin\n   w = 7;\n   y = 5;\nend\nelse begin\n   if (x == 0) begin\n      y = 2;\n   end\n   else begin\n      y = 1;\n   end\nend\nz = y;\n"
        );
    }

    #[test]
    fn test_join_shared_across_nesting_levels_is_rejected() {
        // Block 3 joins the outer branch but is also an arm of the inner
        // one; it cannot nest strictly deeper, so rendering refuses
        // instead of emitting it twice.
        let instrs = vec![
            Instr::with_stmt(0, vec![1, 2], Stmt::cond(Relation::Eq, "a", "0")),
            Instr::with_stmt(1, vec![3], Stmt::assign("p", "1")),
            Instr::with_stmt(2, vec![3, 4], Stmt::cond(Relation::Eq, "b", "0")),
            Instr::with_stmt(3, vec![5], Stmt::assign("p", "2")),
            Instr::with_stmt(4, vec![5], Stmt::assign("p", "3")),
            Instr::with_stmt(5, vec![6], Stmt::assign("out", "p")),
            Instr::with_stmt(6, vec![], Stmt::assign("flag", "p")),
        ];
        let err = structure(&instrs, "").unwrap_err();
        assert_eq!(err, StructureError::ChildLevel { child: 3, parent: 2 });
        assert!(err.is_internal());
    }

    #[test]
    fn test_base_indent_prefixes_every_line() {
        let instrs = vec![
            Instr::with_stmt(0, vec![2, 1], Stmt::cond(Relation::Eq, "x", "0")),
            Instr::with_stmt(1, vec![3], Stmt::assign("y", "1")),
            Instr::with_stmt(2, vec![3], Stmt::assign("y", "2")),
            Instr::with_stmt(3, vec![4], Stmt::assign("z", "y")),
            Instr::with_stmt(4, vec![], Stmt::assign("w", "y")),
        ];
        let text = structure(&instrs, "      ").unwrap();
        for line in text.lines() {
            assert!(line.starts_with("      "), "unprefixed line: {line:?}");
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let instrs = vec![
            Instr::with_stmt(0, vec![2, 1], Stmt::cond(Relation::Ne, "a", "b")),
            Instr::with_stmt(1, vec![3], Stmt::set("q", "d")),
            Instr::with_stmt(2, vec![3], Stmt::set("q", "0")),
            Instr::with_stmt(3, vec![4], Stmt::assign("z", "q")),
            Instr::with_stmt(4, vec![], Stmt::assign("w", "q")),
        ];
        let first = structure(&instrs, "").unwrap();
        let second = structure(&instrs, "").unwrap();
        assert_eq!(first, second);
        assert!(first.contains("q <= d;"));
    }

    #[test]
    fn test_empty_graph_renders_nothing() {
        let text = structure(&[], "   ").unwrap();
        assert!(text.is_empty());
    }
}
