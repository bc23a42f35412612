mod common;
use crate::common::console::SharedBuffer;
use crate::common::fake_prompt::FakePrompt;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use ohscan::exec::collector::{collect_buffered, collect_live, spawn_collector, CollectMode};
use ohscan::exec::credential::Elevated;
use ohscan::exec::launcher;
use ohscan::exec::progress::ProgressReporter;
use ohscan::exec::{
    CommandSpec, CredentialProvider, ElevationPolicy, ExecError, ExecOutcome,
    DEFAULT_ABORT_POLL_INTERVAL,
};

type TestResult = Result<(), Box<dyn Error>>;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn command_spec_defaults() {
    let spec = CommandSpec::new(["ls", "-la"]);

    assert_eq!(spec.args, args(&["ls", "-la"]));
    assert_eq!(spec.timeout, None);
    assert!(!spec.live_output);
    assert!(spec.abort_predicate.is_none());
    assert_eq!(spec.abort_poll_interval, DEFAULT_ABORT_POLL_INTERVAL);
}

#[test]
fn elevation_inserts_stdin_flag_once() {
    let policy = ElevationPolicy {
        supported: true,
        ..ElevationPolicy::default()
    };

    let elevated = policy.apply(args(&["sudo", "docker", "pull", "img"]));
    assert_eq!(elevated.args, args(&["sudo", "-S", "docker", "pull", "img"]));
    assert!(elevated.needs_credential);
    assert_eq!(elevated.target, Some(2));

    let already = policy.apply(args(&["sudo", "-S", "docker", "kill", "c"]));
    assert_eq!(already.args, args(&["sudo", "-S", "docker", "kill", "c"]));
    assert_eq!(already.target, Some(2));
}

#[test]
fn options_after_token_leave_target_unknown() {
    let policy = ElevationPolicy {
        supported: true,
        ..ElevationPolicy::default()
    };

    for cmd in [
        &["sudo", "-u", "root", "true"][..],
        &["sudo", "-g", "wheel", "true"][..],
        &["sudo", "VAR=x", "true"][..],
    ] {
        let elevated = policy.apply(args(cmd));
        assert!(elevated.needs_credential);
        assert_eq!(elevated.target, None, "{cmd:?}");
    }
}

#[test]
fn option_values_are_not_looked_up_as_programs() -> TestResult {
    let policy = ElevationPolicy {
        token: "env".to_string(),
        stdin_flag: None,
        supported: true,
    };

    let elevated = policy.apply(args(&["env", "-u", "HOME", "true"]));
    let prepared = launcher::prepare(&elevated)?;

    assert_eq!(prepared.args, args(&["-u", "HOME", "true"]));
    Ok(())
}

#[test]
fn elevation_token_stripped_when_unsupported() {
    let policy = ElevationPolicy {
        supported: false,
        ..ElevationPolicy::default()
    };

    let elevated = policy.apply(args(&["sudo", "docker", "pull", "img"]));

    assert_eq!(
        elevated,
        Elevated {
            args: args(&["docker", "pull", "img"]),
            needs_credential: false,
            target: None,
        }
    );
}

#[test]
fn command_without_token_is_untouched() {
    let elevated = ElevationPolicy::default().apply(args(&["git", "ls-remote"]));

    assert_eq!(elevated.args, args(&["git", "ls-remote"]));
    assert!(!elevated.needs_credential);
}

#[test]
fn prepare_rejects_empty_command() {
    let elevated = ElevationPolicy::default().apply(Vec::new());

    let err = launcher::prepare(&elevated).unwrap_err();
    assert!(matches!(err, ExecError::Worker(_)), "{err:?}");
}

#[test]
fn prepare_reports_missing_program() {
    let elevated = ElevationPolicy::default().apply(args(&["definitely-not-installed-xyz"]));

    let err = launcher::prepare(&elevated).unwrap_err();
    assert_eq!(
        err,
        ExecError::LaunchNotFound("definitely-not-installed-xyz".to_string())
    );
}

#[tokio::test]
async fn concurrent_callers_share_a_single_prompt() -> TestResult {
    init_tracing();
    let prompt = FakePrompt::returning("s3cret");
    let provider = Arc::new(CredentialProvider::new(prompt.clone()));

    let a = Arc::clone(&provider);
    let b = Arc::clone(&provider);
    let (first, second) = with_timeout(async {
        tokio::join!(
            tokio::spawn(async move { a.ensure_credential().await }),
            tokio::spawn(async move { b.ensure_credential().await }),
        )
    })
    .await;

    assert_eq!(first??, "s3cret");
    assert_eq!(second??, "s3cret");
    assert_eq!(prompt.calls(), 1);
    assert!(provider.is_cached());
    Ok(())
}

#[tokio::test]
async fn failed_prompt_leaves_cache_empty() -> TestResult {
    init_tracing();
    let prompt = FakePrompt::closed();
    let provider = CredentialProvider::new(prompt.clone()).with_message("Password");

    let err = provider.ensure_credential().await.unwrap_err();

    assert!(matches!(err, ExecError::Credential(_)), "{err:?}");
    assert!(!provider.is_cached());
    assert_eq!(prompt.calls(), 1);
    Ok(())
}

#[test]
fn live_collection_replaces_invalid_utf8() -> TestResult {
    let input: &[u8] = b"ok\n\xff\xfe\nend";
    let mut echo = SharedBuffer::new();

    let text = collect_live(input, &mut echo)?;

    assert_eq!(text, "ok\n\u{FFFD}\u{FFFD}\nend");
    assert_eq!(echo.contents(), text);
    Ok(())
}

#[test]
fn buffered_collection_reads_to_eof() -> TestResult {
    let input: &[u8] = b"a\nb\n\xff";

    let text = collect_buffered(input)?;

    assert_eq!(text, "a\nb\n\u{FFFD}");
    Ok(())
}

#[tokio::test]
async fn collector_thread_delivers_result() -> TestResult {
    let input: &'static [u8] = b"one\ntwo\n";
    let echo = SharedBuffer::new();

    let rx = spawn_collector(input, CollectMode::Live(Box::new(echo.clone())))?;
    let text = with_timeout(rx).await??;

    assert_eq!(text, "one\ntwo\n");
    assert_eq!(echo.contents(), "one\ntwo\n");
    Ok(())
}

#[tokio::test]
async fn progress_draws_frames_then_clears() -> TestResult {
    let out = SharedBuffer::new();
    let reporter = ProgressReporter::new("Working", Box::new(out.clone()));

    let value = reporter
        .run_until(async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            7
        })
        .await;

    assert_eq!(value, 7);
    let drawn = out.contents();
    assert!(drawn.starts_with("\rWorking ... | "), "drawn: {drawn:?}");
    assert!(drawn.contains("\rWorking ... / "), "drawn: {drawn:?}");
    assert!(drawn.ends_with(&format!("\r{}\r", " ".repeat(80))), "drawn: {drawn:?}");
    Ok(())
}

#[tokio::test]
async fn disabled_progress_writes_nothing() -> TestResult {
    let value = ProgressReporter::disabled().run_until(async { "done" }).await;
    assert_eq!(value, "done");
    Ok(())
}

#[test]
fn outcome_conversions() {
    let completed = ExecOutcome::Completed {
        output: "x".to_string(),
        exit_code: Some(2),
    };
    assert_eq!(completed.clone().into_output(), Ok("x".to_string()));
    assert_eq!(completed.clone().into_success(), Err(ExecError::Failed(Some(2))));
    assert_eq!(completed.clone().into_finished(), Ok(completed));

    let aborted = ExecOutcome::Aborted {
        output: "partial".to_string(),
    };
    assert_eq!(aborted.output(), Some("partial"));
    assert_eq!(aborted.clone().into_output(), Err(ExecError::Aborted));
    assert_eq!(aborted.clone().into_finished(), Ok(aborted));

    let timed_out = ExecOutcome::TimedOut(Duration::from_secs(1));
    assert_eq!(timed_out.kind(), "timed_out");
    assert_eq!(
        timed_out.into_finished(),
        Err(ExecError::Timeout(Duration::from_secs(1)))
    );
}
