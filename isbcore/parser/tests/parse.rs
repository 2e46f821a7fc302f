use isb_ast::{BinOp, Expr, Stmt};
use isb_common::{DiagnosticBag, ErrorCode};
use isb_parser::parse;

fn stmts_only(program: Vec<Stmt>) -> Vec<Stmt> {
    program.into_iter().filter(|s| !matches!(s, Stmt::Line(_))).collect()
}

#[test]
fn assignment_and_expression_statement() {
    let mut bag = DiagnosticBag::new();
    let p = stmts_only(parse("a = 1\na + 2", &mut bag));
    assert!(!bag.has_error());
    assert_eq!(p.len(), 2);
    assert!(matches!(&p[0], Stmt::Assign { name, indices, .. } if name == "a" && indices.is_empty()));
    assert!(matches!(&p[1], Stmt::ExprStmt(Expr::Binary { op: BinOp::Add, .. })));
}

#[test]
fn indexed_assignment_and_read() {
    let mut bag = DiagnosticBag::new();
    let p = stmts_only(parse("a[0][\"x\"] = 5\na[0][\"x\"]", &mut bag));
    assert!(!bag.has_error());
    match &p[0] {
        Stmt::Assign { name, indices, .. } => {
            assert_eq!(name, "a");
            assert_eq!(indices.len(), 2);
        }
        other => panic!("expected indexed assign, got {:?}", other),
    }
    assert!(matches!(&p[1], Stmt::ExprStmt(Expr::Index { name, indices }) if name == "a" && indices.len() == 2));
}

#[test]
fn equals_is_assignment_at_statement_position_and_equality_in_expressions() {
    let mut bag = DiagnosticBag::new();
    let p = stmts_only(parse("If a = 1 Then\nb = 2\nEndIf", &mut bag));
    assert!(!bag.has_error(), "{:?}", bag.iter().collect::<Vec<_>>());
    match &p[0] {
        Stmt::If { arms, else_body } => {
            assert!(else_body.is_none());
            let (cond, body) = &arms[0];
            assert!(matches!(cond, Expr::Binary { op: BinOp::Eq, .. }));
            let body = stmts_only(body.clone());
            assert!(matches!(&body[0], Stmt::Assign { name, .. } if name == "b"));
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn elseif_chain() {
    let src = "If a Then\nx = 1\nElseIf b Then\nx = 2\nElse\nx = 3\nEndIf";
    let mut bag = DiagnosticBag::new();
    let p = stmts_only(parse(src, &mut bag));
    assert!(!bag.has_error());
    match &p[0] {
        Stmt::If { arms, else_body } => {
            assert_eq!(arms.len(), 2);
            assert!(else_body.is_some());
        }
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn precedence_and_associativity() {
    let mut bag = DiagnosticBag::new();
    let p = stmts_only(parse("1 + 2 * 3 < 4 And 5", &mut bag));
    assert!(!bag.has_error());
    // And binds loosest, then the comparison, then + over *
    match &p[0] {
        Stmt::ExprStmt(Expr::Binary { op: BinOp::And, lhs, .. }) => match &**lhs {
            Expr::Binary { op: BinOp::Lt, lhs, .. } => match &**lhs {
                Expr::Binary { op: BinOp::Add, rhs, .. } => {
                    assert!(matches!(&**rhs, Expr::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("expected add, got {:?}", other),
            },
            other => panic!("expected lt, got {:?}", other),
        },
        other => panic!("expected and, got {:?}", other),
    }
}

#[test]
fn loops_subs_labels_and_goto() {
    let src = "Sub Tick\nn = n + 1\nEndSub\nFor i = 1 To 10 Step 2\nTick()\nEndFor\nagain:\nWhile n < 5\nGoTo again\nEndWhile";
    let mut bag = DiagnosticBag::new();
    let p = stmts_only(parse(src, &mut bag));
    assert!(!bag.has_error(), "{:?}", bag.iter().collect::<Vec<_>>());
    assert!(matches!(&p[0], Stmt::Sub { name, .. } if name == "Tick"));
    assert!(matches!(&p[1], Stmt::For { var, step: Some(_), .. } if var == "i"));
    assert!(matches!(&p[2], Stmt::Label(l) if l == "again"));
    match &p[3] {
        Stmt::While { body, .. } => {
            let body = stmts_only(body.clone());
            assert!(matches!(&body[0], Stmt::Goto(t) if t == "again"));
        }
        other => panic!("expected while, got {:?}", other),
    }
}

#[test]
fn incomplete_block_reports_end_of_stream() {
    for src in ["For i = 1 To 3", "If a Then", "While a < 2\nb = 1", "Sub P", "a = 1 +", "a = \"unterminated"] {
        let mut bag = DiagnosticBag::new();
        parse(src, &mut bag);
        assert!(bag.only_end_of_stream(), "{:?} for {:?}", bag.iter().collect::<Vec<_>>(), src);
    }
}

#[test]
fn malformed_statement_recovers_at_next_line() {
    let mut bag = DiagnosticBag::new();
    let p = stmts_only(parse("a = \nb = 2", &mut bag));
    assert_eq!(bag.len(), 1);
    assert_eq!(bag.iter().next().unwrap().code, ErrorCode::UnexpectedToken);
    // parsing resumed at the next statement
    assert!(p.iter().any(|s| matches!(s, Stmt::Assign { name, .. } if name == "b")));
}

#[test]
fn diagnostics_carry_line_and_column() {
    let mut bag = DiagnosticBag::new();
    parse("a = 1\nb = )", &mut bag);
    let d = bag.iter().next().unwrap();
    assert_eq!(d.range.start.line, 1);
    assert_eq!(d.range.start.column, 4);
}
