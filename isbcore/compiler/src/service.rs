use serde::{Deserialize, Serialize};

use isb_ast::{Program, Stmt};
use isb_common::DiagnosticBag;
use isb_parser::parse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DiagnosticSeverity { Error, Warning, Information }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub severity: DiagnosticSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SymbolKind { Sub, Variable, Label }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompilerDiagnostics {
    pub errors: Vec<Diagnostic>,
    pub symbols: Vec<SymbolInfo>,
}

/// Parse-only analysis: diagnostics plus a flat symbol listing.
pub fn analyze_source(source: &str, _filename: &str) -> CompilerDiagnostics {
    let mut out = CompilerDiagnostics::default();
    let mut bag = DiagnosticBag::new();
    let ast = parse(source, &mut bag);
    for d in bag.iter() {
        out.errors.push(Diagnostic {
            message: d.message.clone(),
            line: d.range.start.line as usize,
            column: d.range.start.column as usize,
            severity: DiagnosticSeverity::Error,
        });
    }
    collect_symbols(&ast, &mut 0, &mut out.symbols);
    out
}

fn collect_symbols(ast: &Program, line: &mut usize, syms: &mut Vec<SymbolInfo>) {
    for s in ast {
        match s {
            Stmt::Line(n) => *line = *n as usize,
            Stmt::Sub { name, body } => {
                syms.push(SymbolInfo { name: name.clone(), kind: SymbolKind::Sub, line: *line, col: 0 });
                collect_symbols(body, line, syms);
            }
            Stmt::Assign { name, .. } => {
                syms.push(SymbolInfo { name: name.clone(), kind: SymbolKind::Variable, line: *line, col: 0 });
            }
            Stmt::Label(lbl) => {
                syms.push(SymbolInfo { name: lbl.clone(), kind: SymbolKind::Label, line: *line, col: 0 });
            }
            Stmt::If { arms, else_body } => {
                for (_, b) in arms { collect_symbols(b, line, syms); }
                if let Some(b) = else_body { collect_symbols(b, line, syms); }
            }
            Stmt::For { body, .. } | Stmt::While { body, .. } => collect_symbols(body, line, syms),
            _ => {}
        }
    }
}
