//! Instruction stream for the ISB stack machine, plus the textual assembly
//! codec. The text form is authoritative: the lowerer's output re-parses to
//! an equivalent stream.

use isb_common::{DiagnosticBag, ErrorCode, TextRange};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::str::FromStr;

mod value;
pub use value::{canonical_num, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Nop,
    Push, PushS,
    Store, Load, StoreArr, LoadArr,
    Set, Get,
    Br, BrIf, Call, Ret,
    Add, Sub, Mul, Div, Mod,
    Eq, Ne, Lt, Le, Gt, Ge,
    And, Or, Neg, Not,
}

impl Op {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Nop => "nop",
            Op::Push => "push",
            Op::PushS => "pushs",
            Op::Store => "store",
            Op::Load => "load",
            Op::StoreArr => "store_arr",
            Op::LoadArr => "load_arr",
            Op::Set => "set",
            Op::Get => "get",
            Op::Br => "br",
            Op::BrIf => "br_if",
            Op::Call => "call",
            Op::Ret => "ret",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Mod => "mod",
            Op::Eq => "eq",
            Op::Ne => "ne",
            Op::Lt => "lt",
            Op::Le => "le",
            Op::Gt => "gt",
            Op::Ge => "ge",
            Op::And => "and",
            Op::Or => "or",
            Op::Neg => "neg",
            Op::Not => "not",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Op> {
        Some(match s.to_ascii_lowercase().as_str() {
            "nop" => Op::Nop,
            "push" => Op::Push,
            "pushs" => Op::PushS,
            "store" => Op::Store,
            "load" => Op::Load,
            "store_arr" => Op::StoreArr,
            "load_arr" => Op::LoadArr,
            "set" => Op::Set,
            "get" => Op::Get,
            "br" => Op::Br,
            "br_if" => Op::BrIf,
            "call" => Op::Call,
            "ret" => Op::Ret,
            "add" => Op::Add,
            "sub" => Op::Sub,
            "mul" => Op::Mul,
            "div" => Op::Div,
            "mod" => Op::Mod,
            "eq" => Op::Eq,
            "ne" => Op::Ne,
            "lt" => Op::Lt,
            "le" => Op::Le,
            "gt" => Op::Gt,
            "ge" => Op::Ge,
            "and" => Op::And,
            "or" => Op::Or,
            "neg" => Op::Neg,
            "not" => Op::Not,
            _ => return None,
        })
    }
}

/// One record of the linear instruction stream: opcode, up to two string
/// operands, the pre-parsed decimal for numeric operands, and the 0-based
/// source line the instruction came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub op: Op,
    pub arg1: Option<String>,
    pub arg2: Option<String>,
    pub num: Option<Decimal>,
    pub line: Option<u32>,
}

impl Instr {
    pub fn new(op: Op) -> Self {
        Self { op, arg1: None, arg2: None, num: None, line: None }
    }

    pub fn name(op: Op, name: impl Into<String>) -> Self {
        Self { op, arg1: Some(name.into()), arg2: None, num: None, line: None }
    }

    pub fn push(n: Decimal) -> Self {
        Self { op: Op::Push, arg1: Some(canonical_num(&n)), arg2: None, num: Some(n), line: None }
    }

    pub fn pushs(s: impl Into<String>) -> Self {
        Self { op: Op::PushS, arg1: Some(s.into()), arg2: None, num: None, line: None }
    }

    /// `set`/`get` with a register index.
    pub fn reg(op: Op, index: u32) -> Self {
        let d = Decimal::from(index);
        Self { op, arg1: Some(d.to_string()), arg2: None, num: Some(d), line: None }
    }

    /// `store_arr`/`load_arr` with a key count.
    pub fn arr(op: Op, name: impl Into<String>, count: usize) -> Self {
        let d = Decimal::from(count as u64);
        Self { op, arg1: Some(name.into()), arg2: Some(d.to_string()), num: Some(d), line: None }
    }

    pub fn br_if(on_true: impl Into<String>, on_false: impl Into<String>) -> Self {
        Self { op: Op::BrIf, arg1: Some(on_true.into()), arg2: Some(on_false.into()), num: None, line: None }
    }

    pub fn at(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// Parsed assembly: instructions plus labels resolved to local indices.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Assembly {
    pub instrs: Vec<Instr>,
    pub labels: HashMap<String, usize>,
}

enum AsmArg {
    Bare(String),
    Quoted(String),
}

impl AsmArg {
    fn text(&self) -> &str {
        match self {
            AsmArg::Bare(s) | AsmArg::Quoted(s) => s,
        }
    }
}

/// Parse line-oriented assembly text. Blank lines and `;` comments are
/// ignored; `name:` alone on a line defines a label. Errors land in the bag;
/// the partial result is only useful when the bag stays clean.
pub fn parse_assembly(text: &str, bag: &mut DiagnosticBag) -> Assembly {
    let mut asm = Assembly::default();
    for (idx, raw) in text.lines().enumerate() {
        let range = TextRange::at_line(idx as u32);
        let line = strip_comment(raw);
        let line = line.trim();
        if line.is_empty() { continue; }

        if let Some(label) = line.strip_suffix(':') {
            let label = label.trim();
            if label.is_empty() || label.contains(char::is_whitespace) {
                bag.report(ErrorCode::UnexpectedToken, range, format!("malformed label line: {}", raw.trim()));
                continue;
            }
            if asm.labels.contains_key(label) {
                bag.report(
                    ErrorCode::DuplicateAssemblyLabel,
                    range,
                    format!("Duplicate assembly label, {}", label),
                );
                continue;
            }
            asm.labels.insert(label.to_string(), asm.instrs.len());
            continue;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r),
            None => (line, ""),
        };
        let op = match Op::from_mnemonic(word) {
            Some(op) => op,
            None => {
                bag.report(ErrorCode::UnknownOpcode, range, format!("Unknown opcode, {}", word));
                continue;
            }
        };
        let args = match split_operands(rest) {
            Ok(a) => a,
            Err(msg) => {
                bag.report(ErrorCode::UnexpectedToken, range, msg);
                continue;
            }
        };
        if let Some(instr) = build_instr(op, &args, idx as u32, range, bag) {
            asm.instrs.push(instr);
        }
    }
    asm
}

fn build_instr(
    op: Op,
    args: &[AsmArg],
    line: u32,
    range: TextRange,
    bag: &mut DiagnosticBag,
) -> Option<Instr> {
    let argc = |bag: &mut DiagnosticBag, want: usize| -> bool {
        if args.len() == want {
            true
        } else {
            bag.report(
                ErrorCode::UnsupportedOperand,
                range,
                format!("{} expects {} operand(s), got {}", op.mnemonic(), want, args.len()),
            );
            false
        }
    };
    let numeric = |bag: &mut DiagnosticBag, arg: &AsmArg| -> Option<Decimal> {
        match Decimal::from_str(arg.text()) {
            Ok(d) => Some(d),
            Err(_) => {
                bag.report(
                    ErrorCode::UnsupportedOperand,
                    range,
                    format!("{} expects a numeric operand, got '{}'", op.mnemonic(), arg.text()),
                );
                None
            }
        }
    };

    let mut instr = Instr::new(op);
    instr.line = Some(line);
    match op {
        Op::Push | Op::Set | Op::Get => {
            if !argc(bag, 1) { return None; }
            instr.num = Some(numeric(bag, &args[0])?);
            instr.arg1 = Some(args[0].text().to_string());
        }
        Op::PushS => {
            if !argc(bag, 1) { return None; }
            if !matches!(args[0], AsmArg::Quoted(_)) {
                bag.report(
                    ErrorCode::UnsupportedOperand,
                    range,
                    "pushs expects a double-quoted string operand",
                );
                return None;
            }
            instr.arg1 = Some(args[0].text().to_string());
        }
        Op::Store | Op::Load | Op::Br | Op::Call => {
            if !argc(bag, 1) { return None; }
            instr.arg1 = Some(args[0].text().to_string());
        }
        Op::StoreArr | Op::LoadArr => {
            if !argc(bag, 2) { return None; }
            instr.arg1 = Some(args[0].text().to_string());
            instr.num = Some(numeric(bag, &args[1])?);
            instr.arg2 = Some(args[1].text().to_string());
        }
        Op::BrIf => {
            if !argc(bag, 2) { return None; }
            instr.arg1 = Some(args[0].text().to_string());
            instr.arg2 = Some(args[1].text().to_string());
        }
        _ => {
            if !argc(bag, 0) { return None; }
        }
    }
    Some(instr)
}

// Cut a `;` comment, ignoring semicolons inside string operands.
fn strip_comment(line: &str) -> &str {
    let mut in_str = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_str => escaped = true,
            '"' => in_str = !in_str,
            ';' if !in_str => return &line[..i],
            _ => {}
        }
    }
    line
}

fn split_operands(rest: &str) -> Result<Vec<AsmArg>, String> {
    let mut out = Vec::new();
    let mut chars = rest.chars().peekable();
    loop {
        while chars.peek().map_or(false, |c| c.is_whitespace()) { chars.next(); }
        let Some(&c) = chars.peek() else { break };
        if c == '"' {
            chars.next();
            let mut s = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '"' => { closed = true; break; }
                    '\\' => match chars.next() {
                        Some('"') => s.push('"'),
                        Some('\\') => s.push('\\'),
                        Some(other) => s.push(other),
                        None => break,
                    },
                    other => s.push(other),
                }
            }
            if !closed {
                return Err("unterminated string operand".to_string());
            }
            out.push(AsmArg::Quoted(s));
        } else {
            let mut s = String::new();
            while chars.peek().map_or(false, |c| !c.is_whitespace()) {
                s.push(chars.next().unwrap());
            }
            out.push(AsmArg::Bare(s));
        }
    }
    Ok(out)
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Emit the textual form. Labels are printed ahead of the instruction they
/// resolve to, ordered by (index, name) so output is diff-stable.
pub fn emit_assembly(instrs: &[Instr], labels: &HashMap<String, usize>) -> String {
    let mut by_index: Vec<(&String, usize)> = labels.iter().map(|(n, &i)| (n, i)).collect();
    by_index.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    let mut li = 0usize;
    let mut out = String::new();
    for (i, instr) in instrs.iter().enumerate() {
        while li < by_index.len() && by_index[li].1 == i {
            let _ = writeln!(out, "{}:", by_index[li].0);
            li += 1;
        }
        let _ = writeln!(out, "{}", format_instr(instr));
    }
    while li < by_index.len() {
        let _ = writeln!(out, "{}:", by_index[li].0);
        li += 1;
    }
    out
}

fn format_instr(instr: &Instr) -> String {
    let m = instr.op.mnemonic();
    match instr.op {
        Op::PushS => format!("{} {}", m, quote(instr.arg1.as_deref().unwrap_or(""))),
        Op::Push | Op::Set | Op::Get | Op::Store | Op::Load | Op::Br | Op::Call => {
            format!("{} {}", m, instr.arg1.as_deref().unwrap_or(""))
        }
        Op::StoreArr | Op::LoadArr | Op::BrIf => format!(
            "{} {} {}",
            m,
            instr.arg1.as_deref().unwrap_or(""),
            instr.arg2.as_deref().unwrap_or("")
        ),
        _ => m.to_string(),
    }
}
