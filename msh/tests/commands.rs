use std::process::Command;

fn run_msh(command: &str, tag: &str) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_msh"))
        .args(["-c", command])
        .env(
            "MSH_HISTORY_NAME",
            format!("/msh-itest-cmd-{}-{}", std::process::id(), tag),
        )
        .output()
        .expect("failed to execute msh")
}

#[test]
fn semicolon_runs_each_command() {
    let output = run_msh("echo one; echo two", "semis");
    assert!(output.status.success(), "command failed: {:?}", output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "one\ntwo\n");
}

#[test]
fn failure_does_not_stop_later_commands() {
    let output = run_msh("msh-no-such-command-xyz; echo after", "independent");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("after"), "stdout: {stdout}");
    assert!(!stderr.is_empty(), "expected an error report for the bad command");
}

#[test]
fn cd_changes_directory_for_later_commands() {
    let output = run_msh("cd /; pwd", "cd");
    assert!(output.status.success(), "command failed: {:?}", output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "/\n");
}

#[test]
fn cd_without_argument_reports_usage_error() {
    let output = run_msh("cd", "cdnone");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("cd: missing argument"),
        "stderr: {stderr}"
    );
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn empty_commands_are_skipped() {
    let output = run_msh(" ;  ; echo still-here", "empties");
    assert!(output.status.success(), "command failed: {:?}", output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "still-here\n");
}
