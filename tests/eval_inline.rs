use std::io::Write;
use std::process::{Command, Stdio};

fn jim() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jim"))
}

fn stdout_of(out: &std::process::Output) -> String {
    String::from_utf8_lossy(&out.stdout).trim_end().to_string()
}

fn script_file(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".tcl").tempfile().expect("temp file");
    file.write_all(text.as_bytes()).expect("write script");
    file
}

// --- -e scripts ---

#[test]
fn inline_prints_result() {
    let out = jim().args(["-e", "expr {1 + 2 * 3}"]).output().expect("failed to run jim");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(stdout_of(&out), "7");
}

#[test]
fn inline_empty_result_prints_nothing() {
    let out = jim().args(["-e", "set x {}"]).output().expect("failed to run jim");
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn inline_sees_arguments() {
    let out = jim()
        .args(["-e", "list $argc [lindex $argv 1]", "one", "two", "-three"])
        .output()
        .expect("failed to run jim");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(stdout_of(&out), "3 two");
}

#[test]
fn inline_puts_writes_stdout() {
    let out = jim().args(["-e", "puts hello; puts -nonewline world"]).output().expect("failed to run jim");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "hello\nworld");
}

#[test]
fn seed_makes_rand_repeatable() {
    let run = || {
        let out = jim().args(["--seed", "42", "-e", "list [rand 1000] [rand 1000]"]).output().expect("failed to run jim");
        assert!(out.status.success());
        stdout_of(&out)
    };
    assert_eq!(run(), run());
}

#[test]
fn max_depth_limits_recursion() {
    let out = jim()
        .args(["--max-depth", "30", "-e", "set n 0; proc r {} {incr ::n; r}; catch r; set n"])
        .output()
        .expect("failed to run jim");
    assert!(out.status.success());
    assert_eq!(stdout_of(&out), "30");
}

// --- exit status ---

#[test]
fn exit_code_is_passed_through() {
    let out = jim().args(["-e", "exit 3"]).output().expect("failed to run jim");
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn uncaught_error_exits_one() {
    let out = jim().args(["-e", "error boom"]).output().expect("failed to run jim");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error: boom"), "stderr: {stderr}");
}

#[test]
fn break_outside_loop_is_reported() {
    let out = jim().args(["-e", "break"]).output().expect("failed to run jim");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("invoked \"break\" outside of a loop"));
}

#[test]
fn json_error_report() {
    let out = jim().args(["--json", "-e", "set nope"]).output().expect("failed to run jim");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).expect("stderr is JSON");
    assert_eq!(v["severity"], "error");
    assert_eq!(v["message"], "can't read \"nope\": no such variable");
}

// --- files ---

#[test]
fn runs_file_with_arguments() {
    let file = script_file("puts [join $argv ,]\nputs $argc\n");
    let out = jim().arg(file.path()).args(["a", "b"]).output().expect("failed to run jim");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(stdout_of(&out), "a,b\n2");
}

#[test]
fn file_result_is_not_printed() {
    let file = script_file("set x 5\n");
    let out = jim().arg(file.path()).output().expect("failed to run jim");
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn file_error_shows_location_and_procedure() {
    let file = script_file("proc check {v} {\n    if {$v < 0} {error \"negative: $v\"}\n}\ncheck -1\n");
    let path = file.path().to_str().unwrap().to_string();
    let out = jim().args(["--json", &path]).output().expect("failed to run jim");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).expect("stderr is JSON");
    assert_eq!(v["message"], "negative: -1");
    assert_eq!(v["file"], path.as_str());
    assert_eq!(v["line"], 2);
    assert_eq!(v["notes"][0], format!("in procedure 'check' called at {path}:4"));
}

#[test]
fn missing_file_fails() {
    let out = jim().arg("/nonexistent/script.tcl").output().expect("failed to run jim");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("couldn't read file"));
}

// --- stdin ---

#[test]
fn reads_script_from_stdin() {
    let mut child = jim()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to run jim");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"foreach i {1 2 3} {puts $i}\n")
        .expect("write stdin");
    let out = child.wait_with_output().expect("wait");
    assert!(out.status.success());
    assert_eq!(stdout_of(&out), "1\n2\n3");
}
