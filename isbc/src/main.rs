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
Created by Erik Lee Olson, Tarpon Springs, Florida
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

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use isb_compiler::service::analyze_source;
use isb_lexer::Lexer;
use isb_vm::Engine;

mod repl;
mod report;

#[derive(Parser, Debug)]
#[command(name = "isbc")]
#[command(about = "Interactive Small Basic — compiles BASIC to stack-machine assembly and runs it")]
struct Args {
    /// Program to run or compile: .bas source or .asm assembly.
    /// Without an input file an interactive REPL starts.
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Compile source to assembly without running (source input only)
    #[arg(short = 'c', long = "compile")]
    compile: bool,

    /// Assembly output path (stdout when omitted)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Dump the token stream of a source file and exit
    #[arg(long)]
    lex: bool,

    /// Print parse diagnostics and symbols instead of running
    #[arg(long)]
    analyze: bool,

    /// With --analyze: emit JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let Some(path) = args.input else {
        repl::start();
        return;
    };
    let src = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("read {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    if args.lex {
        cmd_lex(&src);
        return;
    }
    if args.analyze {
        cmd_analyze(&src, &path, args.json);
        return;
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Program".to_string());
    let is_asm = path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("asm"));
    let mut engine = Engine::new(name);

    if is_asm {
        if args.compile {
            eprintln!("--compile expects a .bas source input");
            std::process::exit(2);
        }
        if !engine.parse_assembly(&src) {
            report::print_compile_errors(&engine);
            std::process::exit(1);
        }
    } else {
        if !engine.compile(&src, false) {
            report::print_compile_errors(&engine);
            std::process::exit(1);
        }
        if args.compile {
            emit_assembly_output(&engine, args.output.as_deref());
            return;
        }
    }

    if !engine.run(true) {
        report::print_runtime_errors(&engine);
        std::process::exit(1);
    }
}

fn emit_assembly_output(engine: &Engine, output: Option<&Path>) {
    let asm = engine.assembly_text();
    match output {
        Some(p) => {
            if let Err(e) = fs::write(p, &asm) {
                eprintln!("write {}: {}", p.display(), e);
                std::process::exit(1);
            }
        }
        None => print!("{}", asm),
    }
}

fn cmd_lex(src: &str) {
    match Lexer::new(src).tokenize() {
        Ok(toks) => {
            for t in toks {
                println!(
                    "{:?}\t'{}'\t@{}:{}",
                    t.kind,
                    t.lexeme.escape_debug(),
                    t.range.start.line,
                    t.range.start.column
                );
            }
        }
        Err(e) => {
            eprintln!("lex error: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_analyze(src: &str, path: &Path, json: bool) {
    let diags = analyze_source(src, &path.to_string_lossy());
    if json {
        match serde_json::to_string_pretty(&diags) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("json: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        if diags.errors.is_empty() {
            println!("No errors.");
        } else {
            println!("Errors:");
            for e in &diags.errors {
                println!("- {:?} at {}:{}: {}", e.severity, e.line, e.column, e.message);
            }
        }
        if !diags.symbols.is_empty() {
            println!("Symbols:");
            for s in &diags.symbols {
                println!("- {:?} {} @{}:{}", s.kind, s.name, s.line, s.col);
            }
        }
    }
    if !diags.errors.is_empty() {
        std::process::exit(1);
    }
}
