//! Integration tests for the structuring pipeline.

use vgen::{Instr, MatchPos, Relation, Stmt, StructureError, structure, structure_all};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Diamond over `x == 0` whose arms set `y`; the join assigns `z := y`.
/// With `tail`, the join continues into a second reader of `y`.
fn diamond(tail: bool) -> Vec<Instr> {
    let mut instrs = vec![
        Instr::with_stmt(0, vec![2, 1], Stmt::cond(Relation::Eq, "x", "0")),
        Instr::with_stmt(1, vec![3], Stmt::assign("y", "1")),
        Instr::with_stmt(2, vec![3], Stmt::assign("y", "2")),
    ];
    if tail {
        instrs.push(Instr::with_stmt(3, vec![4], Stmt::assign("z", "y")));
        instrs.push(Instr::with_stmt(4, vec![], Stmt::assign("w", "y")));
    } else {
        instrs.push(Instr::with_stmt(3, vec![], Stmt::assign("z", "y")));
    }
    instrs
}

#[test]
fn test_if_else_structuring() {
    init_tracing();
    let text = structure(&diamond(true), "").unwrap();
    assert_eq!(
        text,
        "if (x == 0) begin\n\
         \x20  y = 2;\n\
         end\n\
         else begin\n\
         \x20  y = 1;\n\
         end\n\
         z = y;\n\
         w = y;\n"
    );
}

#[test]
fn test_ternary_folding() {
    init_tracing();
    // The temp has a single reader, so the whole diamond collapses.
    let text = structure(&diamond(false), "").unwrap();
    assert_eq!(text, "z = (x == 0) ? (2) : (1);\n");
}

#[test]
fn test_case_with_shared_default() {
    init_tracing();
    let instrs = vec![
        Instr::with_stmt(
            0,
            vec![2, 1, 1, 2],
            Stmt::switch("key", vec!["0".into(), "1".into(), "2".into()]),
        ),
        Instr::with_stmt(1, vec![3], Stmt::assign("a", "1")),
        Instr::with_stmt(2, vec![3], Stmt::assign("a", "2")),
        Instr::with_stmt(3, vec![], Stmt::assign("out", "a")),
    ];
    let text = structure(&instrs, "").unwrap();
    assert_eq!(
        text,
        "case (key)\n\
         \x20  0, 1: begin\n\
         \x20     a = 1;\n\
         \x20  end\n\
         \x20  default: begin\n\
         \x20     a = 2;\n\
         \x20  end\n\
         endcase\n\
         out = a;\n"
    );
}

#[test]
fn test_match_chain_becomes_case() {
    init_tracing();
    // The front end lowers a case statement into a membership-test chain;
    // it must come back out as a single case statement.
    let instrs = vec![
        Instr::with_stmt(
            0,
            vec![1, 4],
            Stmt::matches("key", vec!["0".into(), "1".into()], MatchPos::Top),
        ),
        Instr::with_stmt(
            1,
            vec![6, 5],
            Stmt::matches("key", vec!["2".into()], MatchPos::Middle),
        ),
        Instr::with_stmt(4, vec![7], Stmt::assign("a", "1")),
        Instr::with_stmt(5, vec![7], Stmt::assign("a", "2")),
        Instr::with_stmt(6, vec![7], Stmt::assign("a", "3")),
        Instr::with_stmt(7, vec![], Stmt::assign("out", "a")),
    ];
    let text = structure(&instrs, "").unwrap();
    assert!(text.starts_with("case (key)\n"), "got: {text}");
    assert!(text.contains("0, 1: begin"));
    assert!(text.contains("default: begin"));
    assert!(text.ends_with("endcase\nout = a;\n"));
}

#[test]
fn test_malformed_input_produces_no_text() {
    init_tracing();
    let instrs = vec![Instr::new(0, vec![9])];
    let err = structure(&instrs, "").unwrap_err();
    assert_eq!(err, StructureError::UnknownSuccessor { instr: 0, succ: 9 });
    assert!(err.is_malformed());
}

#[test]
fn test_non_blocking_assignments() {
    init_tracing();
    let instrs = vec![
        Instr::with_stmt(0, vec![2, 1], Stmt::cond(Relation::Ne, "rst", "0")),
        Instr::with_stmt(1, vec![3], Stmt::set("q", "d")),
        Instr::with_stmt(2, vec![3], Stmt::set("q", "0")),
        Instr::with_stmt(3, vec![], Stmt::set("valid", "q")),
    ];
    let text = structure(&instrs, "   ").unwrap();
    assert_eq!(text, "   valid <= (rst != 0) ? (0) : (d);\n");
}

#[test]
fn test_structure_is_deterministic() {
    init_tracing();
    let instrs = diamond(true);
    let first = structure(&instrs, "  ").unwrap();
    for _ in 0..10 {
        assert_eq!(structure(&instrs, "  ").unwrap(), first);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    init_tracing();
    let procedures: Vec<Vec<Instr>> = (0..32).map(|i| diamond(i % 2 == 0)).collect();

    let sequential: Vec<_> = procedures
        .iter()
        .map(|instrs| structure(instrs, ""))
        .collect();
    let parallel = structure_all(&procedures, "");
    assert_eq!(parallel, sequential);
}

#[test]
fn test_failures_stay_isolated() {
    init_tracing();
    let procedures = vec![diamond(false), vec![Instr::new(0, vec![9])], diamond(true)];
    let results = structure_all(&procedures, "");
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
}
