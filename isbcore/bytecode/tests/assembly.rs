use isb_bytecode::{emit_assembly, parse_assembly, Instr, Op};
use isb_common::{DiagnosticBag, ErrorCode};

// Strip source-line tags so streams from differently laid out text compare.
fn normalize(instrs: &[Instr]) -> Vec<Instr> {
    instrs
        .iter()
        .map(|i| {
            let mut i = i.clone();
            i.line = None;
            i
        })
        .collect()
}

#[test]
fn parses_labels_comments_and_operands() {
    let text = r#"
; a tiny program
start:
    push 3.14
    pushs "he said \"hi\"; really"
    store greeting
    br start
"#;
    let mut bag = DiagnosticBag::new();
    let asm = parse_assembly(text, &mut bag);
    assert!(!bag.has_error(), "{:?}", bag.iter().collect::<Vec<_>>());
    assert_eq!(asm.instrs.len(), 4);
    assert_eq!(asm.labels.get("start"), Some(&0));
    assert_eq!(asm.instrs[0].op, Op::Push);
    assert_eq!(asm.instrs[0].arg1.as_deref(), Some("3.14"));
    assert_eq!(asm.instrs[1].op, Op::PushS);
    assert_eq!(asm.instrs[1].arg1.as_deref(), Some("he said \"hi\"; really"));
    assert_eq!(asm.instrs[2].arg1.as_deref(), Some("greeting"));
}

#[test]
fn roundtrip_is_stable() {
    let text = r#"
top:
    push 120
    push 0.5
    pushs "a\\b"
    store_arr a 2
    load_arr a 2
    set 3
    get 3
    br_if top done
done:
    nop
"#;
    let mut bag = DiagnosticBag::new();
    let first = parse_assembly(text, &mut bag);
    assert!(!bag.has_error(), "{:?}", bag.iter().collect::<Vec<_>>());

    let emitted = emit_assembly(&first.instrs, &first.labels);
    let mut bag2 = DiagnosticBag::new();
    let second = parse_assembly(&emitted, &mut bag2);
    assert!(!bag2.has_error());
    assert_eq!(normalize(&first.instrs), normalize(&second.instrs));
    assert_eq!(first.labels, second.labels);

    // and a second emit is byte-identical
    assert_eq!(emitted, emit_assembly(&second.instrs, &second.labels));
}

#[test]
fn end_label_survives_roundtrip() {
    let text = "br fin\nfin:\n";
    let mut bag = DiagnosticBag::new();
    let asm = parse_assembly(text, &mut bag);
    assert!(!bag.has_error());
    assert_eq!(asm.labels.get("fin"), Some(&1));
    let emitted = emit_assembly(&asm.instrs, &asm.labels);
    let mut bag2 = DiagnosticBag::new();
    let again = parse_assembly(&emitted, &mut bag2);
    assert_eq!(again.labels.get("fin"), Some(&1));
}

#[test]
fn unknown_opcode_is_an_error() {
    let mut bag = DiagnosticBag::new();
    parse_assembly("frobnicate 1", &mut bag);
    let d = bag.iter().next().expect("diagnostic");
    assert_eq!(d.code, ErrorCode::UnknownOpcode);
    assert!(d.message.contains("frobnicate"));
}

#[test]
fn duplicate_label_is_an_error() {
    let mut bag = DiagnosticBag::new();
    parse_assembly("x:\nnop\nx:\n", &mut bag);
    let d = bag.iter().next().expect("diagnostic");
    assert_eq!(d.code, ErrorCode::DuplicateAssemblyLabel);
    assert_eq!(d.message, "Duplicate assembly label, x");
}

#[test]
fn operand_arity_is_checked() {
    let mut bag = DiagnosticBag::new();
    parse_assembly("push", &mut bag);
    assert_eq!(bag.iter().next().unwrap().code, ErrorCode::UnsupportedOperand);

    let mut bag = DiagnosticBag::new();
    parse_assembly("push banana", &mut bag);
    assert_eq!(bag.iter().next().unwrap().code, ErrorCode::UnsupportedOperand);

    let mut bag = DiagnosticBag::new();
    parse_assembly("add 1", &mut bag);
    assert_eq!(bag.iter().next().unwrap().code, ErrorCode::UnsupportedOperand);
}
