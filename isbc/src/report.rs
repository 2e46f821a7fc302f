//! Renders diagnostics for the terminal, one line per record.

use isb_common::Diagnostic;
use isb_vm::Engine;

// Compile errors carry a 0-based range; render it 1-based for humans.
pub fn render_compile(d: &Diagnostic) -> String {
    format!(
        "Compile error: {} ({}:{})",
        d.message,
        d.range.start.line + 1,
        d.range.start.column + 1
    )
}

// `Runtime error: <message> (<line>: <source-line-text>)`, 0-based line.
pub fn render_runtime(d: &Diagnostic, code_lines: &[String]) -> String {
    let line = d.range.start.line as usize;
    let text = code_lines.get(line).map(|s| s.trim()).unwrap_or("");
    format!("Runtime error: {} ({}: {})", d.message, line, text)
}

pub fn print_compile_errors(engine: &Engine) {
    for d in engine.diagnostics().iter() {
        eprintln!("{}", render_compile(d));
    }
}

pub fn print_runtime_errors(engine: &Engine) {
    for d in engine.diagnostics().iter() {
        eprintln!("{}", render_runtime(d, engine.code_lines()));
    }
}
