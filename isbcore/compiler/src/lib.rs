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

//! AST → labelled instruction lowering.
//!
//! Label and register counters come in through `LowerOptions` and go back out
//! in `Lowered`, so successive incremental fragments never collide and the
//! emitted assembly is diff-stable.

use std::collections::{HashMap, HashSet};

use isb_ast::{BinOp, Expr, Program, Stmt};
use isb_bytecode::{Instr, Op};
use isb_common::{DiagnosticBag, ErrorCode, TextRange};
use rust_decimal::Decimal;

pub mod service;

pub struct LowerOptions<'a> {
    /// 0-based line offset of this fragment inside the engine's accumulated
    /// code lines; instruction line tags are absolute.
    pub base_line: u32,
    /// Next fresh-label suffix; monotonically increasing across fragments.
    pub label_seq: u32,
    /// Next hidden register index for loop bookkeeping.
    pub reg_seq: u32,
    /// Lower-cased sub names defined by earlier fragments.
    pub known_subs: &'a HashSet<String>,
    /// Labels already present in the engine; redefining one is an error.
    pub existing_labels: &'a HashSet<String>,
}

pub struct Lowered {
    pub instrs: Vec<Instr>,
    /// Fragment-relative label indices; the engine offsets them on append.
    pub labels: HashMap<String, usize>,
    pub label_seq: u32,
    pub reg_seq: u32,
    /// Lower-cased sub names this fragment defined.
    pub subs: Vec<String>,
}

pub fn lower(program: &Program, opts: &LowerOptions, bag: &mut DiagnosticBag) -> Lowered {
    let mut subs: HashSet<String> = opts.known_subs.clone();
    collect_subs(program, &mut subs);

    let mut l = Lowerer {
        out: Vec::new(),
        labels: HashMap::new(),
        existing_labels: opts.existing_labels,
        known_subs: subs,
        new_subs: Vec::new(),
        label_seq: opts.label_seq,
        reg_seq: opts.reg_seq,
        base_line: opts.base_line,
        abs_line: opts.base_line,
        rel_line: 0,
        bag,
    };
    l.stmts(program);
    log::debug!("lowered fragment into {} instructions, {} labels", l.out.len(), l.labels.len());
    Lowered {
        instrs: l.out,
        labels: l.labels,
        label_seq: l.label_seq,
        reg_seq: l.reg_seq,
        subs: l.new_subs,
    }
}

fn collect_subs(stmts: &[Stmt], into: &mut HashSet<String>) {
    for s in stmts {
        match s {
            Stmt::Sub { name, body } => {
                into.insert(name.to_ascii_lowercase());
                collect_subs(body, into);
            }
            Stmt::If { arms, else_body } => {
                for (_, b) in arms { collect_subs(b, into); }
                if let Some(b) = else_body { collect_subs(b, into); }
            }
            Stmt::For { body, .. } | Stmt::While { body, .. } => collect_subs(body, into),
            _ => {}
        }
    }
}

fn sub_label(name: &str) -> String {
    format!("__sub_{}__", name.to_ascii_lowercase())
}

struct Lowerer<'a> {
    out: Vec<Instr>,
    labels: HashMap<String, usize>,
    existing_labels: &'a HashSet<String>,
    known_subs: HashSet<String>,
    new_subs: Vec<String>,
    label_seq: u32,
    reg_seq: u32,
    base_line: u32,
    abs_line: u32,
    rel_line: u32,
    bag: &'a mut DiagnosticBag,
}

impl<'a> Lowerer<'a> {
    fn emit(&mut self, instr: Instr) {
        self.out.push(instr.at(self.abs_line));
    }

    fn fresh(&mut self, stem: &str) -> String {
        let l = format!("__{}_{}__", stem, self.label_seq);
        self.label_seq += 1;
        l
    }

    fn alloc_reg(&mut self) -> u32 {
        let r = self.reg_seq;
        self.reg_seq += 1;
        r
    }

    fn define(&mut self, label: String) {
        if self.labels.contains_key(&label) || self.existing_labels.contains(&label) {
            self.bag.report(
                ErrorCode::DuplicateAssemblyLabel,
                TextRange::at_line(self.rel_line),
                format!("Duplicate assembly label, {}", label),
            );
            return;
        }
        self.labels.insert(label, self.out.len());
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for s in stmts {
            self.stmt(s);
        }
    }

    fn stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::Line(n) => {
                self.rel_line = *n;
                self.abs_line = self.base_line + *n;
            }
            Stmt::Assign { name, indices, value } => {
                if indices.is_empty() {
                    self.expr(value);
                    self.emit(Instr::name(Op::Store, name.to_ascii_lowercase()));
                } else {
                    for k in indices {
                        self.expr(k);
                    }
                    self.expr(value);
                    self.emit(Instr::arr(Op::StoreArr, name.to_ascii_lowercase(), indices.len()));
                }
            }
            Stmt::If { arms, else_body } => {
                let l_end = self.fresh("endif");
                for (cond, body) in arms {
                    let l_then = self.fresh("then");
                    let l_else = self.fresh("else");
                    self.expr(cond);
                    self.emit(Instr::br_if(l_then.clone(), l_else.clone()));
                    self.define(l_then);
                    self.stmts(body);
                    self.emit(Instr::name(Op::Br, l_end.clone()));
                    self.define(l_else);
                }
                if let Some(body) = else_body {
                    self.stmts(body);
                }
                self.define(l_end);
            }
            Stmt::For { var, start, end, step, body } => self.lower_for(var, start, end, step, body),
            Stmt::While { cond, body } => {
                let l_top = self.fresh("while");
                let l_body = self.fresh("while_body");
                let l_done = self.fresh("endwhile");
                self.define(l_top.clone());
                self.expr(cond);
                self.emit(Instr::br_if(l_body.clone(), l_done.clone()));
                self.define(l_body);
                self.stmts(body);
                self.emit(Instr::name(Op::Br, l_top));
                self.define(l_done);
            }
            Stmt::Sub { name, body } => {
                let l_skip = self.fresh("endsub");
                self.emit(Instr::name(Op::Br, l_skip.clone()));
                self.define(sub_label(name));
                self.new_subs.push(name.to_ascii_lowercase());
                self.stmts(body);
                self.emit(Instr::new(Op::Ret));
                self.define(l_skip);
            }
            Stmt::Goto(target) => {
                self.emit(Instr::name(Op::Br, target.to_ascii_lowercase()));
            }
            Stmt::Label(name) => {
                self.define(name.to_ascii_lowercase());
            }
            Stmt::ExprStmt(e) => {
                // A bare `name()` is a sub invocation; anything else leaves
                // its value on the stack for the caller to inspect.
                if let Expr::Call { name, args } = e {
                    if self.known_subs.contains(&name.to_ascii_lowercase()) {
                        if !args.is_empty() {
                            self.bag.report(
                                ErrorCode::UnsupportedInvocation,
                                TextRange::at_line(self.rel_line),
                                format!("sub {} takes no arguments", name),
                            );
                            return;
                        }
                        self.emit(Instr::name(Op::Call, sub_label(name)));
                        return;
                    }
                }
                self.expr(e);
            }
        }
    }

    // FOR lowering. End and step are snapshotted into hidden registers up
    // front; a literal step fixes the comparison sense at compile time, a
    // computed step gets the dual-sense check.
    fn lower_for(&mut self, var: &str, start: &Expr, end: &Expr, step: &Option<Expr>, body: &[Stmt]) {
        let var = var.to_ascii_lowercase();
        let r_end = self.alloc_reg();
        let r_step = self.alloc_reg();

        self.expr(end);
        self.emit(Instr::reg(Op::Set, r_end));
        match step {
            Some(e) => self.expr(e),
            None => self.emit(Instr::push(Decimal::ONE)),
        }
        self.emit(Instr::reg(Op::Set, r_step));
        self.expr(start);
        self.emit(Instr::name(Op::Store, var.clone()));

        let l_top = self.fresh("for");
        let l_body = self.fresh("for_body");
        let l_done = self.fresh("endfor");
        self.define(l_top.clone());

        match literal_step(step) {
            Some(d) => {
                self.emit(Instr::name(Op::Load, var.clone()));
                self.emit(Instr::reg(Op::Get, r_end));
                self.emit(Instr::new(if d.is_sign_negative() { Op::Ge } else { Op::Le }));
            }
            None => {
                // (step >= 0 and var <= end) or (step < 0 and var >= end)
                self.emit(Instr::reg(Op::Get, r_step));
                self.emit(Instr::push(Decimal::ZERO));
                self.emit(Instr::new(Op::Ge));
                self.emit(Instr::name(Op::Load, var.clone()));
                self.emit(Instr::reg(Op::Get, r_end));
                self.emit(Instr::new(Op::Le));
                self.emit(Instr::new(Op::And));
                self.emit(Instr::reg(Op::Get, r_step));
                self.emit(Instr::push(Decimal::ZERO));
                self.emit(Instr::new(Op::Lt));
                self.emit(Instr::name(Op::Load, var.clone()));
                self.emit(Instr::reg(Op::Get, r_end));
                self.emit(Instr::new(Op::Ge));
                self.emit(Instr::new(Op::And));
                self.emit(Instr::new(Op::Or));
            }
        }
        self.emit(Instr::br_if(l_body.clone(), l_done.clone()));
        self.define(l_body);
        self.stmts(body);
        self.emit(Instr::name(Op::Load, var.clone()));
        self.emit(Instr::reg(Op::Get, r_step));
        self.emit(Instr::new(Op::Add));
        self.emit(Instr::name(Op::Store, var));
        self.emit(Instr::name(Op::Br, l_top));
        self.define(l_done);
    }

    fn expr(&mut self, e: &Expr) {
        match e {
            Expr::Number(d) => self.emit(Instr::push(*d)),
            Expr::Str(s) => self.emit(Instr::pushs(s.clone())),
            Expr::Var(name) => self.emit(Instr::name(Op::Load, name.to_ascii_lowercase())),
            Expr::Index { name, indices } => {
                for k in indices {
                    self.expr(k);
                }
                self.emit(Instr::arr(Op::LoadArr, name.to_ascii_lowercase(), indices.len()));
            }
            Expr::Call { name, .. } => {
                // No library surface: subs produce no value, so a call can
                // only appear as its own statement.
                self.bag.report(
                    ErrorCode::UnsupportedInvocation,
                    TextRange::at_line(self.rel_line),
                    format!("Unsupported invocation, {}", name),
                );
            }
            Expr::UnaryNeg(inner) => {
                self.expr(inner);
                self.emit(Instr::new(Op::Neg));
            }
            Expr::Binary { op, lhs, rhs } => {
                self.expr(lhs);
                self.expr(rhs);
                self.emit(Instr::new(match op {
                    BinOp::Add => Op::Add,
                    BinOp::Sub => Op::Sub,
                    BinOp::Mul => Op::Mul,
                    BinOp::Div => Op::Div,
                    BinOp::Mod => Op::Mod,
                    BinOp::Eq => Op::Eq,
                    BinOp::Ne => Op::Ne,
                    BinOp::Lt => Op::Lt,
                    BinOp::Le => Op::Le,
                    BinOp::Gt => Op::Gt,
                    BinOp::Ge => Op::Ge,
                    BinOp::And => Op::And,
                    BinOp::Or => Op::Or,
                }));
            }
        }
    }
}

// Compile-time sign of the step expression, when it is a literal.
fn literal_step(step: &Option<Expr>) -> Option<Decimal> {
    match step {
        None => Some(Decimal::ONE),
        Some(Expr::Number(d)) => Some(*d),
        Some(Expr::UnaryNeg(inner)) => match &**inner {
            Expr::Number(d) => Some(-*d),
            _ => None,
        },
        Some(_) => None,
    }
}
