/*

 ▄▄▄▄    ██▓    ▄▄▄       ▄████▄   ██ ▄█▀ ██▀███   █    ██   ██████  ██░ ██
▓█████▄ ▓██▒   ▒████▄    ▒██▀ ▀█   ██▄█▒ ▓██ ▒ ██▒ ██  ▓██▒▒██    ▒ ▓██░ ██▒
▒██▒ ▄██▒██░   ▒██  ▀█▄  ▒▓█    ▄ ▓███▄░ ▓██ ░▄█ ▒▓██  ▒██░░ ▓██▄   ▒██▀▀██░
▒██░█▀  ▒██░   ░██▄▄▄▄██ ▒▓▓▄ ▄██▒▓██ █▄ ▒██▀▀█▄  ▓▓█  ░██░  ▒   ██▒░▓█ ░██
░▓█  ▀█▓░██████▒▓█   ▓██▒▒ ▓███▀ ░▒██▒ █▄░██▓ ▒██▒▒▒█████▓ ▒██████▒▒░▓█▒░██▓
░▒▓███▀▒░ ▒░▓  ░▒▒   ▓▒█░░ ░▒ ▒  ░▒ ▒▒ ▓▒░ ▒▓ ░▒▓░░▒▓▒ ▒ ▒ ▒ ▒▓▒ ▒ ░ ▒ ░░▒░▒
▒░▒   ░ ░ ░ ▒  ░ ▒   ▒▒ ░  ░  ▒   ░ ░▒ ▒░  ░▒ ░ ▒░░░▒░ ░ ░ ░ ░▒  ░ ░ ▒ ░▒░ ░
 ░    ░   ░ ░    ░   ▒   ░        ░ ░░ ░   ░░   ░  ░░░ ░ ░ ░  ░  ░   ░  ░░ ░
 ░          ░  ░     ░  ░░ ░      ░  ░      ░        ░           ░   ░  ░  ░
      ░                  ░
Copyright (C) 2026, Blackrush LLC, All Rights Reserved
Created by Erik Olson, Tarpon Springs, Florida
For more information, visit BlackrushDrive.com

MIT License

Copyright (c) 2026 Erik Lee Olson for Blackrush, LLC

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.

*/

//! Stack-machine engine: owns the instruction array, value stack, register
//! bank, named memory, label table, and instruction pointer. The public
//! surface never unwinds; failures land in the diagnostic bag and the caller
//! reads `has_error()`.

use std::collections::{HashMap, HashSet};

use isb_bytecode::{Instr, Op, Value};
use isb_common::{Diagnostic, DiagnosticBag, ErrorCode, IsbError, Result, TextRange};
use isb_compiler::{lower, LowerOptions};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

pub mod incremental;

pub struct Engine {
    name: String,
    instrs: Vec<Instr>,
    labels: HashMap<String, usize>,
    stack: Vec<Value>,
    registers: Vec<Value>,
    memory: HashMap<String, Value>,
    ip: usize,
    code_lines: Vec<String>,
    bag: DiagnosticBag,
    // counters survive across fragments so generated labels and hidden
    // registers never collide
    label_seq: u32,
    reg_seq: u32,
    sub_names: HashSet<String>,
}

impl Engine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instrs: Vec::new(),
            labels: HashMap::new(),
            stack: Vec::new(),
            registers: Vec::new(),
            memory: HashMap::new(),
            ip: 0,
            code_lines: Vec::new(),
            bag: DiagnosticBag::new(),
            label_seq: 0,
            reg_seq: 0,
            sub_names: HashSet::new(),
        }
    }

    /// Parse and lower BASIC source. Appends to the instruction stream when
    /// `incremental`, resets the engine first otherwise. A failed compile
    /// appends nothing; returns true when the bag stayed clean.
    pub fn compile(&mut self, source: &str, incremental: bool) -> bool {
        if !incremental {
            self.reset();
        }
        self.bag.clear();

        let mut bag = DiagnosticBag::new();
        let ast = isb_parser::parse(source, &mut bag);
        if bag.has_error() {
            self.bag.absorb(bag);
            return false;
        }
        let existing: HashSet<String> = self.labels.keys().cloned().collect();
        let opts = LowerOptions {
            base_line: self.code_lines.len() as u32,
            label_seq: self.label_seq,
            reg_seq: self.reg_seq,
            known_subs: &self.sub_names,
            existing_labels: &existing,
        };
        let lowered = lower(&ast, &opts, &mut bag);
        if bag.has_error() {
            self.bag.absorb(bag);
            return false;
        }

        let base = self.instrs.len();
        for (label, idx) in lowered.labels {
            self.labels.insert(label, base + idx);
        }
        self.instrs.extend(lowered.instrs);
        self.code_lines.extend(source.lines().map(str::to_string));
        self.label_seq = lowered.label_seq;
        self.reg_seq = lowered.reg_seq;
        self.sub_names.extend(lowered.subs);
        // resume point: the first newly appended instruction
        self.ip = base;
        log::debug!("{}: compiled to {} instructions total", self.name, self.instrs.len());
        true
    }

    /// Load textual assembly, replacing any existing program.
    pub fn parse_assembly(&mut self, text: &str) -> bool {
        self.reset();
        let mut bag = DiagnosticBag::new();
        let asm = isb_bytecode::parse_assembly(text, &mut bag);
        if bag.has_error() {
            self.bag.absorb(bag);
            return false;
        }
        self.instrs = asm.instrs;
        self.labels = asm.labels;
        self.code_lines = text.lines().map(str::to_string).collect();
        true
    }

    /// Execute from the current IP. Returns true on clean termination. On a
    /// runtime error with `stop_on_error`, the IP stays on the offending
    /// instruction.
    pub fn run(&mut self, stop_on_error: bool) -> bool {
        self.bag.clear();
        while self.ip < self.instrs.len() {
            let instr = self.instrs[self.ip].clone();
            match self.exec(&instr) {
                Ok(next) => self.ip = next,
                Err(e) => {
                    let line = instr.line.unwrap_or(0);
                    self.bag.report(e.code, TextRange::at_line(line), e.message);
                    if stop_on_error {
                        return false;
                    }
                    self.ip += 1;
                }
            }
        }
        !self.bag.has_error()
    }

    /// Clear instructions, stack, registers, memory, labels, errors, and IP.
    pub fn reset(&mut self) {
        self.instrs.clear();
        self.labels.clear();
        self.stack.clear();
        self.registers.clear();
        self.memory.clear();
        self.code_lines.clear();
        self.bag.clear();
        self.ip = 0;
        self.label_seq = 0;
        self.reg_seq = 0;
        self.sub_names.clear();
    }

    // --- read-only accessors ---

    pub fn name(&self) -> &str { &self.name }
    pub fn ip(&self) -> usize { self.ip }
    pub fn instruction_count(&self) -> usize { self.instrs.len() }
    pub fn stack_count(&self) -> usize { self.stack.len() }
    pub fn stack_top(&self) -> Option<&Value> { self.stack.last() }
    pub fn stack_pop(&mut self) -> Option<Value> { self.stack.pop() }
    pub fn has_error(&self) -> bool { self.bag.has_error() }
    pub fn diagnostics(&self) -> &DiagnosticBag { &self.bag }
    pub fn error_info(&self) -> Option<&Diagnostic> { self.bag.iter().next() }
    pub fn code_lines(&self) -> &[String] { &self.code_lines }

    pub fn assembly_text(&self) -> String {
        isb_bytecode::emit_assembly(&self.instrs, &self.labels)
    }

    // --- execution ---

    // Execute one instruction; returns the next IP.
    fn exec(&mut self, instr: &Instr) -> Result<usize> {
        let next = self.ip + 1;
        match instr.op {
            Op::Nop => {}
            Op::Push => {
                let d = numeric_operand(instr)?;
                self.stack.push(Value::Num(d));
            }
            Op::PushS => {
                self.stack.push(Value::Str(instr.arg1.clone().unwrap_or_default()));
            }
            Op::Set => {
                let idx = index_operand(instr)?;
                let v = self.pop()?;
                if self.registers.len() <= idx {
                    self.registers.resize(idx + 1, Value::empty());
                }
                self.registers[idx] = v;
            }
            Op::Get => {
                let idx = index_operand(instr)?;
                let v = self.registers.get(idx).cloned().unwrap_or_else(Value::empty);
                self.stack.push(v);
            }
            Op::Store => {
                let name = name_operand(instr)?;
                let v = self.pop()?;
                self.memory.insert(name, v);
            }
            Op::Load => {
                let name = name_operand(instr)?;
                let v = self.memory.get(&name).cloned().unwrap_or_else(Value::empty);
                self.stack.push(v);
            }
            Op::StoreArr => {
                let name = name_operand(instr)?;
                let count = index_operand(instr)?;
                let value = self.pop()?;
                let keys = self.pop_keys(count)?;
                let root = self.memory.entry(name).or_insert_with(Value::empty);
                root.set_path(&keys, value);
            }
            Op::LoadArr => {
                let name = name_operand(instr)?;
                let count = index_operand(instr)?;
                let keys = self.pop_keys(count)?;
                let v = match self.memory.get(&name) {
                    Some(root) => root.get_path(&keys),
                    None => Value::empty(),
                };
                self.stack.push(v);
            }
            Op::Add => self.bin_num(|a, b| a + b)?,
            Op::Sub => self.bin_num(|a, b| a - b)?,
            Op::Mul => self.bin_num(|a, b| a * b)?,
            Op::Div => {
                let (a, b) = self.pop_nums()?;
                if b.is_zero() {
                    return Err(rt(ErrorCode::DivisionByZero, "Division by zero."));
                }
                let r = a
                    .checked_div(b)
                    .ok_or_else(|| rt(ErrorCode::UnsupportedOperand, "numeric overflow in div"))?;
                self.stack.push(Value::Num(r));
            }
            Op::Mod => {
                let (a, b) = self.pop_nums()?;
                if b.is_zero() {
                    return Err(rt(ErrorCode::DivisionByZero, "Division by zero."));
                }
                let r = a
                    .checked_rem(b)
                    .ok_or_else(|| rt(ErrorCode::UnsupportedOperand, "numeric overflow in mod"))?;
                self.stack.push(Value::Num(r));
            }
            Op::Eq => self.bin_cmp(|a, b| a.loose_eq(b))?,
            Op::Ne => self.bin_cmp(|a, b| !a.loose_eq(b))?,
            Op::Lt => self.bin_cmp(|a, b| a.compare(b).is_lt())?,
            Op::Le => self.bin_cmp(|a, b| a.compare(b).is_le())?,
            Op::Gt => self.bin_cmp(|a, b| a.compare(b).is_gt())?,
            Op::Ge => self.bin_cmp(|a, b| a.compare(b).is_ge())?,
            Op::And => self.bin_bool(|a, b| a && b)?,
            Op::Or => self.bin_bool(|a, b| a || b)?,
            Op::Neg => {
                let v = self.pop()?;
                self.stack.push(Value::Num(-v.to_number()));
            }
            Op::Not => {
                let v = self.pop()?;
                self.push_flag(!v.to_bool());
            }
            Op::Br => {
                return self.resolve(instr.arg1.as_deref());
            }
            Op::BrIf => {
                let v = self.pop()?;
                let target = if v.to_bool() { instr.arg1.as_deref() } else { instr.arg2.as_deref() };
                return self.resolve(target);
            }
            Op::Call => {
                let target = self.resolve(instr.arg1.as_deref())?;
                self.stack.push(Value::Num(Decimal::from(next as u64)));
                return Ok(target);
            }
            Op::Ret => {
                let v = self.pop()?;
                let d = v.to_number();
                let target = d
                    .to_usize()
                    .filter(|_| d.fract().is_zero() && !d.is_sign_negative())
                    .filter(|&t| t <= self.instrs.len())
                    .ok_or_else(|| {
                        rt(ErrorCode::UnsupportedOperand, format!("invalid return address, {}", d))
                    })?;
                return Ok(target);
            }
        }
        Ok(next)
    }

    fn pop(&mut self) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| rt(ErrorCode::UnexpectedEmptyStack, "Unexpected empty stack."))
    }

    // Pop `count` keys; the top of the stack is the deepest index.
    fn pop_keys(&mut self, count: usize) -> Result<Vec<String>> {
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(self.pop()?.to_key());
        }
        keys.reverse();
        Ok(keys)
    }

    fn pop_nums(&mut self) -> Result<(Decimal, Decimal)> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a.to_number(), b.to_number()))
    }

    fn bin_num<F: Fn(Decimal, Decimal) -> Decimal>(&mut self, f: F) -> Result<()> {
        let (a, b) = self.pop_nums()?;
        self.stack.push(Value::Num(f(a, b)));
        Ok(())
    }

    fn bin_cmp<F: Fn(&Value, &Value) -> bool>(&mut self, f: F) -> Result<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push_flag(f(&a, &b));
        Ok(())
    }

    fn bin_bool<F: Fn(bool, bool) -> bool>(&mut self, f: F) -> Result<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push_flag(f(a.to_bool(), b.to_bool()));
        Ok(())
    }

    fn push_flag(&mut self, b: bool) {
        self.stack.push(Value::Num(if b { Decimal::ONE } else { Decimal::ZERO }));
    }

    fn resolve(&self, label: Option<&str>) -> Result<usize> {
        let label = label
            .ok_or_else(|| rt(ErrorCode::UnsupportedOperand, "branch without a target label"))?;
        self.labels.get(label).copied().ok_or_else(|| {
            rt(
                ErrorCode::UndefinedAssemblyLabel,
                format!("Undefined assembly label, {}", label),
            )
        })
    }
}

fn rt(code: ErrorCode, message: impl Into<String>) -> IsbError {
    IsbError::new(code, TextRange::default(), message)
}

fn numeric_operand(instr: &Instr) -> Result<Decimal> {
    instr.num.ok_or_else(|| {
        rt(
            ErrorCode::UnsupportedOperand,
            format!("{} requires a numeric operand", instr.op.mnemonic()),
        )
    })
}

// Memory names are case-insensitive; assembly may carry any casing.
fn name_operand(instr: &Instr) -> Result<String> {
    instr
        .arg1
        .as_deref()
        .map(|s| s.to_ascii_lowercase())
        .ok_or_else(|| {
            rt(
                ErrorCode::UnsupportedOperand,
                format!("{} requires a name operand", instr.op.mnemonic()),
            )
        })
}

// Register index or key count: a small non-negative integer.
fn index_operand(instr: &Instr) -> Result<usize> {
    let d = numeric_operand(instr)?;
    d.to_usize()
        .filter(|_| d.fract().is_zero() && !d.is_sign_negative())
        .ok_or_else(|| {
            rt(
                ErrorCode::UnsupportedOperand,
                format!("{} requires a non-negative integer operand, got {}", instr.op.mnemonic(), d),
            )
        })
}
