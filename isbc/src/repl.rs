use std::io::{self, Write};

use isb_vm::incremental::{FragmentOutcome, Incremental};

use crate::report;

pub fn start() {
    println!("ISB - Interactive Small Basic");
    println!("Type 'quit' to leave, 'list' to show the program, 'clear' to start over.");

    // Try rustyline; fallback to stdio
    let mut rl: Option<rustyline::DefaultEditor> = rustyline::DefaultEditor::new().ok();
    let mut sess = Incremental::new("Program");

    loop {
        let prompt = if sess.is_pending() { "> " } else { "] " };
        let line = match rl.as_mut() {
            Some(editor) => match editor.readline(prompt) {
                Ok(l) => {
                    if !l.trim().is_empty() {
                        let _ = editor.add_history_entry(l.as_str());
                    }
                    l
                }
                Err(_) => break,
            },
            None => {
                print!("{}", prompt);
                let _ = io::stdout().flush();
                let mut l = String::new();
                match io::stdin().read_line(&mut l) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => l,
                }
            }
        };
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim();

        if !sess.is_pending() {
            // commands tolerate a trailing ()
            let cmd = trimmed.strip_suffix("()").unwrap_or(trimmed);
            if cmd.eq_ignore_ascii_case("quit") {
                break;
            }
            if cmd.eq_ignore_ascii_case("list") {
                for l in sess.engine().code_lines() {
                    println!("{}", l);
                }
                continue;
            }
            if cmd.eq_ignore_ascii_case("clear") {
                sess.clear();
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }
        }

        match sess.feed(line) {
            FragmentOutcome::Value(v) => println!("{}", v),
            FragmentOutcome::Done | FragmentOutcome::NeedMoreLines => {}
            FragmentOutcome::CompileError => {
                let eng = sess.engine();
                for d in eng.diagnostics().iter() {
                    eprintln!("{}", report::render_compile(d));
                }
            }
            FragmentOutcome::RuntimeError => {
                let eng = sess.engine();
                for d in eng.diagnostics().iter() {
                    eprintln!("{}", report::render_runtime(d, eng.code_lines()));
                }
            }
        }
    }
}
