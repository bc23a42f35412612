#![cfg(unix)]

mod common;
use crate::common::builders::SupervisorBuilder;
use crate::common::console::SharedBuffer;
use crate::common::fake_prompt::FakePrompt;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::time::{Duration, Instant};

use nix::sys::signal;
use nix::unistd::Pid;

use ohscan::exec::{CommandSpec, ExecOutcome};

type TestResult = Result<(), Box<dyn Error>>;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new(["sh", "-c", script])
}

#[tokio::test]
async fn buffered_command_reports_output_and_exit_code() -> TestResult {
    init_tracing();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused")).build();

    let outcome = with_timeout(supervisor.execute(sh("echo hello; exit 3"))).await;

    assert_eq!(
        outcome,
        ExecOutcome::Completed {
            output: "hello\n".to_string(),
            exit_code: Some(3),
        }
    );
    Ok(())
}

#[tokio::test]
async fn stdout_and_stderr_share_one_ordered_stream() -> TestResult {
    init_tracing();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused")).build();

    let outcome = with_timeout(
        supervisor.execute(sh("echo out1; echo err1 >&2; echo out2; echo err2 >&2")),
    )
    .await;

    assert_eq!(outcome.output(), Some("out1\nerr1\nout2\nerr2\n"));
    Ok(())
}

#[tokio::test]
async fn live_output_is_echoed_in_order() -> TestResult {
    init_tracing();
    let console = SharedBuffer::new();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused"))
        .console(console.clone())
        .build();

    let spec = sh("for i in 1 2 3 4 5; do echo line$i; done").live_output(true);
    let outcome = with_timeout(supervisor.execute(spec)).await;

    let expected = "line1\nline2\nline3\nline4\nline5\n";
    assert_eq!(outcome.output(), Some(expected));
    assert_eq!(outcome.exit_code(), Some(0));
    assert_eq!(console.contents(), expected);
    Ok(())
}

#[tokio::test]
async fn buffered_command_does_not_touch_console() -> TestResult {
    init_tracing();
    let console = SharedBuffer::new();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused"))
        .console(console.clone())
        .build();

    let outcome = with_timeout(supervisor.execute(sh("echo quiet"))).await;

    assert!(outcome.is_completed());
    assert!(console.is_empty(), "unexpected console output: {:?}", console.contents());
    Ok(())
}

#[tokio::test]
async fn timeout_kills_the_process_and_reports_the_limit() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let pidfile = dir.path().join("pid");
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused")).build();

    let script = format!("echo $$ > {}; exec sleep 5", pidfile.display());
    let spec = sh(&script).timeout(Duration::from_secs(1));

    let started = Instant::now();
    let outcome = with_timeout(supervisor.execute(spec)).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, ExecOutcome::TimedOut(Duration::from_secs(1)));
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");

    let pid: i32 = fs::read_to_string(&pidfile)?.trim().parse()?;
    assert!(
        signal::kill(Pid::from_raw(pid), None).is_err(),
        "process {pid} still alive after timeout"
    );
    Ok(())
}

/// Alive and not merely waiting to be reaped.
fn is_running(pid: i32) -> bool {
    if signal::kill(Pid::from_raw(pid), None).is_err() {
        return false;
    }
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        // State follows the parenthesised command name.
        Ok(stat) => stat
            .rsplit_once(") ")
            .and_then(|(_, rest)| rest.chars().next())
            .is_some_and(|state| state != 'Z'),
        Err(_) => cfg!(not(target_os = "linux")),
    }
}

#[tokio::test]
async fn timeout_kills_grandchildren_too() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let pidfile = dir.path().join("pid");
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused")).build();

    // The shell stays the direct child; `sleep` is its child and holds the
    // output pipe.
    let script = format!("sleep 5 & echo $! > {}; wait; echo x", pidfile.display());
    let spec = sh(&script).timeout(Duration::from_secs(1));

    let started = Instant::now();
    let outcome = with_timeout(supervisor.execute(spec)).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, ExecOutcome::TimedOut(Duration::from_secs(1)));
    assert!(elapsed < Duration::from_millis(2500), "took {elapsed:?}");

    let pid: i32 = fs::read_to_string(&pidfile)?.trim().parse()?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!is_running(pid), "grandchild {pid} survived the timeout");
    Ok(())
}

#[tokio::test]
async fn timeout_is_ignored_in_live_mode() -> TestResult {
    init_tracing();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused")).build();

    let spec = sh("sleep 1; echo done")
        .timeout(Duration::from_millis(100))
        .live_output(true);
    let outcome = with_timeout(supervisor.execute(spec)).await;

    assert_eq!(outcome.output(), Some("done\n"));
    assert_eq!(outcome.exit_code(), Some(0));
    Ok(())
}

#[tokio::test]
async fn abort_predicate_terminates_long_running_command() -> TestResult {
    init_tracing();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused")).build();

    let started = Instant::now();
    let spec = sh("echo started; exec sleep 5")
        .abort_when(move || Ok(started.elapsed() >= Duration::from_millis(300)))
        .abort_poll_interval(Duration::from_millis(100));

    let outcome = with_timeout(supervisor.execute(spec)).await;
    let elapsed = started.elapsed();

    match outcome {
        ExecOutcome::Aborted { output } => assert_eq!(output, "started\n"),
        other => panic!("expected Aborted, got {other:?}"),
    }
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    Ok(())
}

#[tokio::test]
async fn predicate_firing_around_exit_never_faults() -> TestResult {
    init_tracing();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused")).build();

    for _ in 0..5 {
        let spec = CommandSpec::new(["true"])
            .abort_when(|| Ok(true))
            .abort_poll_interval(Duration::from_millis(50));
        let outcome = with_timeout(supervisor.execute(spec)).await;

        assert!(
            matches!(
                outcome,
                ExecOutcome::Completed { .. } | ExecOutcome::Aborted { .. }
            ),
            "unexpected outcome {outcome:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn monitor_exits_when_command_finishes_first() -> TestResult {
    init_tracing();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused")).build();

    // A long poll interval must not delay the outcome.
    let spec = CommandSpec::new(["true"])
        .abort_when(|| Ok(false))
        .abort_poll_interval(Duration::from_secs(30));

    let started = Instant::now();
    let outcome = with_timeout(supervisor.execute(spec)).await;

    assert_eq!(outcome.exit_code(), Some(0));
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
async fn failing_predicate_becomes_worker_fault() -> TestResult {
    init_tracing();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused")).build();

    let spec = sh("exec sleep 5")
        .abort_when(|| Err(anyhow::anyhow!("cannot read marker")))
        .abort_poll_interval(Duration::from_millis(50));

    let started = Instant::now();
    let outcome = with_timeout(supervisor.execute(spec)).await;

    match outcome {
        ExecOutcome::WorkerFault(msg) => {
            assert!(msg.contains("abort predicate failed"), "message: {msg}");
            assert!(msg.contains("cannot read marker"), "message: {msg}");
        }
        other => panic!("expected WorkerFault, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn elevated_commands_prompt_once_and_read_secret_from_stdin() -> TestResult {
    init_tracing();
    let prompt = FakePrompt::returning("hunter2");
    let supervisor = SupervisorBuilder::new(prompt.clone()).build();

    let first = with_timeout(
        supervisor.execute(CommandSpec::new(["env", "sh", "-c", "read pw; echo got:$pw"])),
    )
    .await;
    let second = with_timeout(
        supervisor.execute(
            CommandSpec::new(["env", "sh", "-c", "read pw; echo again:$pw"]).live_output(true),
        ),
    )
    .await;

    assert_eq!(first.output(), Some("got:hunter2\n"));
    assert_eq!(second.output(), Some("again:hunter2\n"));
    assert_eq!(prompt.calls(), 1);
    assert!(supervisor.credentials().is_cached());
    Ok(())
}

#[tokio::test]
async fn elevated_command_with_option_value_launches() -> TestResult {
    init_tracing();
    let prompt = FakePrompt::returning("secret");
    let supervisor = SupervisorBuilder::new(prompt.clone()).build();

    let outcome = with_timeout(
        supervisor.execute(CommandSpec::new(["env", "-u", "HOME", "sh", "-c", "echo ${HOME:-unset}"])),
    )
    .await;

    assert_eq!(
        outcome,
        ExecOutcome::Completed {
            output: "unset\n".to_string(),
            exit_code: Some(0),
        }
    );
    assert_eq!(prompt.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn unelevated_command_never_prompts() -> TestResult {
    init_tracing();
    let prompt = FakePrompt::returning("secret");
    let supervisor = SupervisorBuilder::new(prompt.clone()).build();

    let outcome = with_timeout(supervisor.execute(CommandSpec::new(["true"]))).await;

    assert!(outcome.is_completed());
    assert_eq!(prompt.calls(), 0);
    assert!(!supervisor.credentials().is_cached());
    Ok(())
}

#[tokio::test]
async fn missing_executable_shows_no_prompt_or_spinner() -> TestResult {
    init_tracing();
    let prompt = FakePrompt::returning("secret");
    let console = SharedBuffer::new();
    let supervisor = SupervisorBuilder::new(prompt.clone())
        .console(console.clone())
        .progress(true)
        .build();

    let elevated = with_timeout(
        supervisor.execute(CommandSpec::new(["env", "no-such-binary-xyz"]).description("Nope")),
    )
    .await;
    let plain = with_timeout(
        supervisor.execute(CommandSpec::new(["no-such-binary-xyz", "--help"]).description("Nope")),
    )
    .await;

    assert_eq!(
        elevated,
        ExecOutcome::LaunchNotFound("no-such-binary-xyz".to_string())
    );
    assert_eq!(plain, ExecOutcome::LaunchNotFound("no-such-binary-xyz".to_string()));
    assert_eq!(prompt.calls(), 0);
    assert!(console.is_empty(), "unexpected console output: {:?}", console.contents());
    Ok(())
}

#[tokio::test]
async fn credential_failure_is_reported_and_not_cached() -> TestResult {
    init_tracing();
    let prompt = FakePrompt::closed();
    let supervisor = SupervisorBuilder::new(prompt.clone()).build();

    let first = with_timeout(supervisor.execute(CommandSpec::new(["env", "true"]))).await;
    let second = with_timeout(supervisor.execute(CommandSpec::new(["env", "true"]))).await;

    assert!(matches!(first, ExecOutcome::CredentialFailure(_)), "{first:?}");
    assert!(matches!(second, ExecOutcome::CredentialFailure(_)), "{second:?}");
    // Nothing was cached, so the operator is asked again.
    assert_eq!(prompt.calls(), 2);
    assert!(!supervisor.credentials().is_cached());
    Ok(())
}

#[tokio::test]
async fn spinner_is_cleared_after_the_command() -> TestResult {
    init_tracing();
    let console = SharedBuffer::new();
    let supervisor = SupervisorBuilder::new(FakePrompt::returning("unused"))
        .console(console.clone())
        .progress(true)
        .build();

    let spec = sh("sleep 0.3; echo ok").description("Sleeping");
    let outcome = with_timeout(supervisor.execute(spec)).await;

    assert_eq!(outcome.output(), Some("ok\n"));
    let drawn = console.contents();
    assert!(drawn.contains("Sleeping ... "), "console: {drawn:?}");
    assert!(drawn.ends_with(&format!("\r{}\r", " ".repeat(80))), "console: {drawn:?}");
    Ok(())
}
