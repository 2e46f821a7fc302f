use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::tempdir;

fn exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_isbc"))
}

#[test]
fn runs_a_source_program_cleanly() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("fib.bas");
    fs::write(&src, "Fib[0] = 0\nFib[1] = 1\nFor i = 2 To 10\nFib[i] = Fib[i-1] + Fib[i-2]\nEndFor\n").unwrap();

    let out = Command::new(exe()).arg("-i").arg(&src).output().expect("run isbc");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn compile_emits_assembly_to_stdout_and_file() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("prog.bas");
    fs::write(&src, "x = 1 + 2\n").unwrap();

    let out = Command::new(exe()).arg("-i").arg(&src).arg("-c").output().expect("run isbc");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("push 1"), "assembly missing push: {}", stdout);
    assert!(stdout.contains("add"));
    assert!(stdout.contains("store x"));

    let asm_path = dir.path().join("prog.asm");
    let out = Command::new(exe())
        .arg("-i").arg(&src)
        .arg("-c")
        .arg("-o").arg(&asm_path)
        .output()
        .expect("run isbc");
    assert!(out.status.success());
    let written = fs::read_to_string(&asm_path).unwrap();
    assert_eq!(written, stdout.as_ref());

    // the emitted assembly runs as an .asm input
    let out = Command::new(exe()).arg("-i").arg(&asm_path).output().expect("run isbc");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn runtime_error_text_names_line_and_source() {
    let dir = tempdir().expect("tempdir");
    let asm = dir.path().join("bad.asm");
    fs::write(&asm, "br abc\n").unwrap();

    let out = Command::new(exe()).arg("-i").arg(&asm).output().expect("run isbc");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("Runtime error: Undefined assembly label, abc (0: br abc)"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn compile_error_exits_nonzero() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("bad.bas");
    fs::write(&src, "x = = 1\n").unwrap();

    let out = Command::new(exe()).arg("-i").arg(&src).output().expect("run isbc");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Compile error:"), "stderr: {}", stderr);
}

#[test]
fn analyze_reports_symbols_as_json() {
    let dir = tempdir().expect("tempdir");
    let src = dir.path().join("prog.bas");
    fs::write(&src, "Sub Tick\nn = n + 1\nEndSub\nstart:\nTick()\n").unwrap();

    let out = Command::new(exe())
        .arg("-i").arg(&src)
        .arg("--analyze").arg("--json")
        .output()
        .expect("run isbc");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("\"Tick\""), "stdout: {}", stdout);
    assert!(stdout.contains("\"start\""));
}
