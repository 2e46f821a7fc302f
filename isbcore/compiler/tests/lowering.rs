use std::collections::HashSet;

use isb_bytecode::{emit_assembly, Op};
use isb_common::{DiagnosticBag, ErrorCode};
use isb_compiler::{lower, LowerOptions, Lowered};
use isb_parser::parse;

fn lower_src(src: &str) -> (Lowered, DiagnosticBag) {
    let mut bag = DiagnosticBag::new();
    let ast = parse(src, &mut bag);
    assert!(!bag.has_error(), "parse failed: {:?}", bag.iter().collect::<Vec<_>>());
    let known_subs = HashSet::new();
    let existing_labels = HashSet::new();
    let opts = LowerOptions {
        base_line: 0,
        label_seq: 0,
        reg_seq: 0,
        known_subs: &known_subs,
        existing_labels: &existing_labels,
    };
    let lowered = lower(&ast, &opts, &mut bag);
    (lowered, bag)
}

fn ops(l: &Lowered) -> Vec<Op> {
    l.instrs.iter().map(|i| i.op).collect()
}

#[test]
fn assignment_lowers_to_store() {
    let (l, bag) = lower_src("X = 1 + 2");
    assert!(!bag.has_error());
    assert_eq!(ops(&l), vec![Op::Push, Op::Push, Op::Add, Op::Store]);
    // memory names are case-insensitive; stored lower-cased
    assert_eq!(l.instrs[3].arg1.as_deref(), Some("x"));
}

#[test]
fn indexed_assignment_pushes_keys_then_value() {
    let (l, bag) = lower_src("a[1][2] = 9");
    assert!(!bag.has_error());
    assert_eq!(ops(&l), vec![Op::Push, Op::Push, Op::Push, Op::StoreArr]);
    let sa = &l.instrs[3];
    assert_eq!(sa.arg1.as_deref(), Some("a"));
    assert_eq!(sa.arg2.as_deref(), Some("2"));
}

#[test]
fn indexed_read_lowers_to_load_arr() {
    let (l, bag) = lower_src("a[\"k\"]");
    assert!(!bag.has_error());
    assert_eq!(ops(&l), vec![Op::PushS, Op::LoadArr]);
}

#[test]
fn if_arms_converge_on_one_post_label() {
    let (l, bag) = lower_src("If a Then\nx = 1\nElseIf b Then\nx = 2\nElse\nx = 3\nEndIf");
    assert!(!bag.has_error());
    let text = emit_assembly(&l.instrs, &l.labels);
    // a single endif label, branched to from every arm
    assert_eq!(text.matches("__endif_0__:").count(), 1);
    assert_eq!(text.matches("br __endif_0__").count(), 2);
    assert_eq!(text.matches("br_if").count(), 2);
}

#[test]
fn while_lowering_shape() {
    let (l, bag) = lower_src("While a < 3\na = a + 1\nEndWhile");
    assert!(!bag.has_error());
    let text = emit_assembly(&l.instrs, &l.labels);
    assert!(text.contains("br_if __while_body_1__ __endwhile_2__"));
    assert!(text.contains("br __while_0__"));
}

#[test]
fn for_literal_step_picks_comparison_sense() {
    let (up, bag) = lower_src("For i = 1 To 5\nEndFor");
    assert!(!bag.has_error());
    assert!(ops(&up).contains(&Op::Le));
    assert!(!ops(&up).contains(&Op::Or));

    let (down, bag) = lower_src("For i = 5 To 1 Step -1\nEndFor");
    assert!(!bag.has_error());
    assert!(ops(&down).contains(&Op::Ge));
    assert!(!ops(&down).contains(&Op::Or));
}

#[test]
fn for_computed_step_emits_dual_sense_check() {
    let (l, bag) = lower_src("For i = 1 To 5 Step d\nEndFor");
    assert!(!bag.has_error());
    let o = ops(&l);
    assert!(o.contains(&Op::Or));
    assert_eq!(o.iter().filter(|&&op| op == Op::And).count(), 2);
}

#[test]
fn for_bookkeeping_uses_hidden_registers() {
    let (l, bag) = lower_src("For i = 1 To 5\nEndFor");
    assert!(!bag.has_error());
    assert_eq!(l.reg_seq, 2);
    let sets: Vec<_> = l.instrs.iter().filter(|i| i.op == Op::Set).collect();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].arg1.as_deref(), Some("0"));
    assert_eq!(sets[1].arg1.as_deref(), Some("1"));
}

#[test]
fn sub_is_skipped_and_callable() {
    let (l, bag) = lower_src("Sub Greet\nx = 1\nEndSub\nGreet()");
    assert!(!bag.has_error());
    let text = emit_assembly(&l.instrs, &l.labels);
    assert!(text.contains("br __endsub_0__"));
    assert!(text.contains("__sub_greet__:"));
    assert!(text.contains("call __sub_greet__"));
    assert!(ops(&l).contains(&Op::Ret));
    assert_eq!(l.subs, vec!["greet".to_string()]);
}

#[test]
fn call_before_definition_resolves_within_fragment() {
    let (l, bag) = lower_src("Greet()\nSub Greet\nEndSub");
    assert!(!bag.has_error(), "{:?}", bag.iter().collect::<Vec<_>>());
    assert_eq!(l.instrs[0].op, Op::Call);
}

#[test]
fn unknown_invocation_is_a_diagnostic() {
    let (_, bag) = lower_src("Frobnicate()");
    assert_eq!(bag.iter().next().unwrap().code, ErrorCode::UnsupportedInvocation);
}

#[test]
fn goto_and_labels_share_one_flat_scope() {
    let (l, bag) = lower_src("GoTo fin\nx = 1\nfin:");
    assert!(!bag.has_error());
    assert_eq!(l.instrs[0].op, Op::Br);
    assert_eq!(l.instrs[0].arg1.as_deref(), Some("fin"));
    assert_eq!(l.labels.get("fin"), Some(&3));
}

#[test]
fn duplicate_user_label_is_an_error() {
    let (_, bag) = lower_src("fin:\nfin:");
    assert_eq!(bag.iter().next().unwrap().code, ErrorCode::DuplicateAssemblyLabel);
}

#[test]
fn lowering_is_deterministic() {
    let src = "If a Then\nFor i = 1 To 3\nx[i] = i\nEndFor\nEndIf";
    let (l1, _) = lower_src(src);
    let (l2, _) = lower_src(src);
    assert_eq!(
        emit_assembly(&l1.instrs, &l1.labels),
        emit_assembly(&l2.instrs, &l2.labels)
    );
}

#[test]
fn fresh_labels_continue_from_seeded_counter() {
    let mut bag = DiagnosticBag::new();
    let ast = parse("While a\nEndWhile", &mut bag);
    let known_subs = HashSet::new();
    let existing_labels = HashSet::new();
    let opts = LowerOptions {
        base_line: 0,
        label_seq: 7,
        reg_seq: 4,
        known_subs: &known_subs,
        existing_labels: &existing_labels,
    };
    let l = lower(&ast, &opts, &mut bag);
    assert!(!bag.has_error());
    assert!(l.labels.contains_key("__while_7__"));
    assert_eq!(l.label_seq, 10);
}
