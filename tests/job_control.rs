//! End-to-end tests that drive the shell binary over a pipe. There is no
//! controlling terminal here; the shell ignores the resulting ENOTTY
//! from tcsetpgrp, so job control still works against the pipe.

use std::io::Write;
use std::process::{Command, Stdio};

fn run_shell(lines: &[&str]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jsh"))
        .arg("-p")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn jsh");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
    }
    // dropping stdin sends EOF, which ends the session

    child.wait_with_output().expect("wait for jsh")
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn quit_exits_cleanly() {
    let output = run_shell(&["quit"]);
    assert!(output.status.success(), "status was {:?}", output.status);
}

#[test]
fn eof_exits_cleanly() {
    let output = run_shell(&[]);
    assert!(output.status.success(), "status was {:?}", output.status);
}

#[test]
fn foreground_pipeline_connects_stages() {
    let output = run_shell(&["echo hello | tr a-z A-Z"]);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("HELLO"), "stdout was: {stdout}");
    assert!(stdout.contains("[1] (Foreground)"), "stdout was: {stdout}");
}

#[test]
fn launch_report_lists_stages_in_order() {
    let output = run_shell(&["echo one | cat | wc -l"]);
    let stdout = stdout_of(&output);
    let echo_at = stdout.find("echo one").expect("echo listed");
    let cat_at = stdout.find("cat").expect("cat listed");
    let wc_at = stdout.find("wc -l").expect("wc listed");
    assert!(echo_at < cat_at && cat_at < wc_at, "stdout was: {stdout}");
}

#[test]
fn duplicate_stages_launch_once() {
    let spin = env!("CARGO_BIN_EXE_spin");
    let output = run_shell(&[&format!("{spin} 1 | {spin} 1")]);
    let stdout = stdout_of(&output);
    let listed = stdout.matches(&format!("{spin} 1")).count();
    assert_eq!(listed, 1, "stdout was: {stdout}");
}

#[test]
fn background_job_stays_listed_until_done() {
    let spin = env!("CARGO_BIN_EXE_spin");
    let output = run_shell(&[&format!("{spin} 2 &"), "jobs", "quit"]);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("[1] (Background)"), "stdout was: {stdout}");
    assert!(stdout.contains("Running"), "stdout was: {stdout}");
}

#[test]
fn builtin_misuse_reports_but_shell_survives() {
    let output = run_shell(&["fg", "fg 7", "echo STILL_HERE"]);
    let stdout = stdout_of(&output);
    let stderr = stderr_of(&output);
    assert!(stderr.contains("usage: fg"), "stderr was: {stderr}");
    assert!(stderr.contains("no such job 7"), "stderr was: {stderr}");
    assert!(stdout.contains("STILL_HERE"), "stdout was: {stdout}");
    assert!(output.status.success(), "status was {:?}", output.status);
}

#[test]
fn slay_out_of_range_index_is_an_error() {
    let spin = env!("CARGO_BIN_EXE_spin");
    let output = run_shell(&[&format!("{spin} 2 &"), "slay 1 5", "slay 1 0"]);
    let stderr = stderr_of(&output);
    assert!(
        stderr.contains("no process at index 5"),
        "stderr was: {stderr}"
    );
    assert!(output.status.success(), "status was {:?}", output.status);
}

#[test]
fn stopped_foreground_job_returns_control_to_the_shell() {
    let stopself = env!("CARGO_BIN_EXE_stopself");
    // The job stops itself; the shell must notice, fall back to the
    // read loop, and list the job as stopped. slay cleans it up so the
    // test leaves nothing behind.
    let output = run_shell(&[&format!("{stopself} 1"), "jobs", "slay 1 0"]);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Stopped"), "stdout was: {stdout}");
    assert!(stdout.contains("(Background)"), "stdout was: {stdout}");
    assert!(output.status.success(), "status was {:?}", output.status);
}

#[test]
fn interrupted_foreground_job_does_not_take_the_shell_down() {
    let intself = env!("CARGO_BIN_EXE_intself");
    let output = run_shell(&[&format!("{intself} 1"), "echo AFTER"]);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("AFTER"), "stdout was: {stdout}");
    assert!(output.status.success(), "status was {:?}", output.status);
}

#[test]
fn exec_failure_kills_only_that_child() {
    let output = run_shell(&["no-such-program-anywhere", "echo SHELL_ALIVE"]);
    let stdout = stdout_of(&output);
    let stderr = stderr_of(&output);
    assert!(stderr.contains("command not found"), "stderr was: {stderr}");
    assert!(stdout.contains("SHELL_ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "status was {:?}", output.status);
}
