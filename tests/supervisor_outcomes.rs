// tests/supervisor_outcomes.rs
//
// In-process supervision with a recording process control and a hand-fed
// signal subscription: nothing here signals a real process group.

mod common;
use crate::common::init_tracing;

use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use tempfile::TempDir;

use flowguard::errors::Result;
use flowguard::exec::signals::subscribed_signals;
use flowguard::exec::supervisor::{UNBOUNDED_TIMEOUT, describe_status, timeout_from_secs};
use flowguard::exec::{LaunchSpec, ProcessControl, SignalSubscription, Supervisor, launch};
use flowguard::report::{MessageQueue, Reporter};
use flowguard::tasklog::TaskLog;
use flowguard::types::{ExitClass, OsSignal, Outcome};
use flowguard_test_utils::{RecordingControl, with_timeout};

fn spec(command: &str, args: &[&str]) -> LaunchSpec {
    LaunchSpec {
        command: command.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        ..LaunchSpec::default()
    }
}

fn read(path: &PathBuf) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn outcome_strings_and_exit_codes() {
    assert_eq!(Outcome::from_raw("0"), Outcome::Success);
    assert_eq!(Outcome::from_raw("Time out"), Outcome::TimedOut);
    assert_eq!(Outcome::from_raw("Signal received"), Outcome::SignalReceived);
    assert_eq!(
        Outcome::from_raw("exit status 3"),
        Outcome::Failed("exit status 3".into())
    );

    assert_eq!(Outcome::Success.classify(), ExitClass::Ok);
    assert_eq!(Outcome::TimedOut.classify().code(), 2);
    assert_eq!(Outcome::SignalReceived.classify().code(), 1);
    assert_eq!(Outcome::Failed("boom".into()).classify().code(), 1);
    assert_eq!(Outcome::Success.classify().code(), 0);

    assert!(Outcome::TimedOut.requires_kill());
    assert!(Outcome::SignalReceived.requires_kill());
    assert!(!Outcome::Failed("x".into()).requires_kill());
}

#[test]
fn non_positive_timeouts_are_unbounded() {
    assert_eq!(timeout_from_secs(0), UNBOUNDED_TIMEOUT);
    assert_eq!(timeout_from_secs(-7), UNBOUNDED_TIMEOUT);
    assert_eq!(timeout_from_secs(3), Duration::from_secs(3));
}

#[test]
fn wait_status_descriptions() {
    assert_eq!(describe_status(ExitStatus::from_raw(3 << 8)), "exit status 3");
    assert_eq!(describe_status(ExitStatus::from_raw(9)), "signal: killed");
    assert_eq!(describe_status(ExitStatus::from_raw(15)), "signal: terminated");
    assert_eq!(describe_status(ExitStatus::from_raw(11)), "signal: segmentation fault");
}

#[test]
fn signal_classification() {
    assert!(OsSignal::WindowChanged.is_ignorable());
    assert!(OsSignal::ChildExited.is_ignorable());
    for sig in [OsSignal::Hangup, OsSignal::Interrupt, OsSignal::Terminate, OsSignal::User1] {
        assert!(!sig.is_ignorable(), "{sig} must not be ignorable");
    }
}

#[test]
fn every_catchable_signal_is_subscribed() {
    let subscribed = subscribed_signals();
    for sig in [
        Signal::SIGVTALRM,
        Signal::SIGPROF,
        Signal::SIGXCPU,
        Signal::SIGTSTP,
        Signal::SIGTTIN,
        Signal::SIGTTOU,
        Signal::SIGPIPE,
        Signal::SIGHUP,
        Signal::SIGWINCH,
    ] {
        assert!(
            subscribed.contains(&OsSignal::from_raw(sig as i32)),
            "{sig:?} must be subscribed"
        );
    }
    for sig in [Signal::SIGKILL, Signal::SIGSTOP, Signal::SIGSEGV] {
        assert!(!subscribed.contains(&OsSignal::from_raw(sig as i32)));
    }
}

#[test]
fn signals_without_a_variant_are_never_ignorable() {
    let vtalrm = OsSignal::from_raw(Signal::SIGVTALRM as i32);
    assert_eq!(vtalrm, OsSignal::Other(Signal::SIGVTALRM as i32));
    assert!(!vtalrm.is_ignorable());
    assert_eq!(vtalrm.to_string(), "virtual timer expired");
    assert_eq!(vtalrm.as_raw(), Signal::SIGVTALRM as i32);

    assert_eq!(OsSignal::from_raw(Signal::SIGWINCH as i32), OsSignal::WindowChanged);
    assert_eq!(OsSignal::from_raw(Signal::SIGHUP as i32).as_raw(), Signal::SIGHUP as i32);
}

#[tokio::test]
async fn signal_without_a_variant_still_wins() {
    let dir = TempDir::new().unwrap();
    let exit_file = dir.path().join("exit");
    let control = RecordingControl::new();
    let (tx, mut signals) = SignalSubscription::manual();

    let sup = Supervisor::new(
        Arc::new(control.clone()),
        Duration::from_secs(30),
        exit_file.to_string_lossy(),
    );
    let launched = launch(&spec("sleep", &["5"])).await.unwrap();
    tx.send(OsSignal::from_raw(Signal::SIGPROF as i32)).await.unwrap();
    let outcome = with_timeout(sup.supervise(launched, &mut signals)).await;

    assert_eq!(outcome, Outcome::SignalReceived);
    assert_eq!(read(&exit_file), "Signal received");
    assert_eq!(control.own_group_kills(), 1);
}

#[tokio::test]
async fn successful_child_records_zero() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let exit_file = dir.path().join("exit");
    let control = RecordingControl::new();
    let (_tx, mut signals) = SignalSubscription::manual();

    let sup = Supervisor::new(
        Arc::new(control.clone()),
        Duration::from_secs(10),
        exit_file.to_string_lossy(),
    );
    let launched = launch(&spec("true", &[])).await.unwrap();
    let outcome = with_timeout(sup.supervise(launched, &mut signals)).await;

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(read(&exit_file), "0");
    assert_eq!(control.own_group_kills(), 0);
}

#[tokio::test]
async fn failing_child_records_its_status_without_killing() {
    let dir = TempDir::new().unwrap();
    let exit_file = dir.path().join("exit");
    let control = RecordingControl::new();
    let (_tx, mut signals) = SignalSubscription::manual();

    let sup = Supervisor::new(
        Arc::new(control.clone()),
        Duration::from_secs(10),
        exit_file.to_string_lossy(),
    );
    let launched = launch(&spec("sh", &["-c", "exit 3"])).await.unwrap();
    let outcome = with_timeout(sup.supervise(launched, &mut signals)).await;

    assert_eq!(outcome, Outcome::Failed("exit status 3".into()));
    assert_eq!(outcome.classify().code(), 1);
    assert_eq!(read(&exit_file), "exit status 3");
    assert_eq!(control.own_group_kills(), 0);
}

#[tokio::test]
async fn deadline_wins_over_slow_child() {
    let dir = TempDir::new().unwrap();
    let exit_file = dir.path().join("exit");
    let control = RecordingControl::new();
    let (_tx, mut signals) = SignalSubscription::manual();

    let sup = Supervisor::new(
        Arc::new(control.clone()),
        Duration::from_millis(200),
        exit_file.to_string_lossy(),
    );
    let launched = launch(&spec("sleep", &["5"])).await.unwrap();
    let started = Instant::now();
    let outcome = with_timeout(sup.supervise(launched, &mut signals)).await;

    assert_eq!(outcome, Outcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(read(&exit_file), "Time out");
    assert_eq!(control.own_group_kills(), 1);
}

#[tokio::test]
async fn non_ignorable_signal_wins() {
    let dir = TempDir::new().unwrap();
    let exit_file = dir.path().join("exit");
    let control = RecordingControl::new();
    let (tx, mut signals) = SignalSubscription::manual();

    let sup = Supervisor::new(
        Arc::new(control.clone()),
        Duration::from_secs(30),
        exit_file.to_string_lossy(),
    );
    let launched = launch(&spec("sleep", &["5"])).await.unwrap();
    tx.send(OsSignal::User1).await.unwrap();
    let outcome = with_timeout(sup.supervise(launched, &mut signals)).await;

    assert_eq!(outcome, Outcome::SignalReceived);
    assert_eq!(read(&exit_file), "Signal received");
    assert_eq!(control.own_group_kills(), 1);
}

#[tokio::test]
async fn ignorable_signals_do_not_end_the_wait() {
    let dir = TempDir::new().unwrap();
    let exit_file = dir.path().join("exit");
    let control = RecordingControl::new();
    let (tx, mut signals) = SignalSubscription::manual();

    let sup = Supervisor::new(
        Arc::new(control.clone()),
        Duration::from_secs(30),
        exit_file.to_string_lossy(),
    );
    let launched = launch(&spec("sleep", &["0.3"])).await.unwrap();
    tx.send(OsSignal::WindowChanged).await.unwrap();
    tx.send(OsSignal::ChildExited).await.unwrap();
    let outcome = with_timeout(sup.supervise(launched, &mut signals)).await;

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(read(&exit_file), "0");
    assert_eq!(control.own_group_kills(), 0);
}

#[tokio::test]
async fn dash_exit_file_is_not_written() {
    let dir = TempDir::new().unwrap();
    let control = RecordingControl::new();
    let (_tx, mut signals) = SignalSubscription::manual();

    let sup = Supervisor::new(Arc::new(control), Duration::from_secs(10), "-");
    let launched = launch(&spec("true", &[])).await.unwrap();
    assert_eq!(sup.supervise(launched, &mut signals).await, Outcome::Success);
    assert!(!dir.path().join("-").exists());
    assert!(!std::path::Path::new("-").exists());
}

#[tokio::test]
async fn captured_streams_land_in_their_files() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let err = dir.path().join("err");
    let control = RecordingControl::new();
    let (_tx, mut signals) = SignalSubscription::manual();

    let mut launch_spec = spec("sh", &["-c", "echo to-out; echo to-err >&2"]);
    launch_spec.stdout_file = out.to_string_lossy().into_owned();
    launch_spec.stderr_file = err.to_string_lossy().into_owned();

    let sup = Supervisor::new(Arc::new(control), Duration::from_secs(10), "-");
    let launched = launch(&launch_spec).await.unwrap();
    let outcome = with_timeout(sup.supervise(launched, &mut signals)).await;

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(read(&out), "to-out\n");
    assert_eq!(read(&err), "to-err\n");
}

#[tokio::test]
async fn capture_files_exist_even_when_child_is_silent() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let (_tx, mut signals) = SignalSubscription::manual();

    let mut launch_spec = spec("true", &[]);
    launch_spec.stdout_file = out.to_string_lossy().into_owned();

    let sup = Supervisor::new(Arc::new(RecordingControl::new()), Duration::from_secs(10), "-");
    let launched = launch(&launch_spec).await.unwrap();
    sup.supervise(launched, &mut signals).await;

    assert_eq!(read(&out), "");
}

#[tokio::test]
async fn unknown_command_is_a_spawn_error() {
    let err = launch(&spec("/nonexistent/bin/tool", &[])).await.unwrap_err();
    assert!(err.to_string().contains("/nonexistent/bin/tool"));
}

/// Records what the exit file held at the moment the group kill was issued.
struct SnapshotControl {
    exit_file: PathBuf,
    seen_at_kill: Mutex<Option<String>>,
}

impl ProcessControl for SnapshotControl {
    fn kill_group(&self, _pgid: i32) -> Result<()> {
        Ok(())
    }

    fn kill_own_group(&self) -> Result<()> {
        *self.seen_at_kill.lock().unwrap() = std::fs::read_to_string(&self.exit_file).ok();
        Ok(())
    }

    fn remove_file(&self, _path: &std::path::Path) -> Result<()> {
        Ok(())
    }

    fn run_cleanup(&self, _command: &str, _pids: &[String]) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn exit_file_is_written_before_the_group_kill() {
    let dir = TempDir::new().unwrap();
    let exit_file = dir.path().join("exit");
    let snapshot = Arc::new(SnapshotControl {
        exit_file: exit_file.clone(),
        seen_at_kill: Mutex::new(None),
    });
    let (_tx, mut signals) = SignalSubscription::manual();

    let sup = Supervisor::new(
        snapshot.clone(),
        Duration::from_millis(100),
        exit_file.to_string_lossy(),
    );
    let launched = launch(&spec("sleep", &["5"])).await.unwrap();
    with_timeout(sup.supervise(launched, &mut signals)).await;

    assert_eq!(snapshot.seen_at_kill.lock().unwrap().as_deref(), Some("Time out"));
}

#[tokio::test]
async fn root_instance_recovers_orphans_before_killing() {
    let dir = TempDir::new().unwrap();
    let control = RecordingControl::new();
    let (_tx, mut signals) = SignalSubscription::manual();

    let task_log = TaskLog::create_for_pid(dir.path(), 777).unwrap();
    task_log.record_started("65000", None).unwrap();
    task_log.record_started("65001", None).unwrap();
    task_log.record_finished("65001").unwrap();
    let log_path = task_log.path().to_path_buf();

    let sup = Supervisor::new(Arc::new(control.clone()), Duration::from_millis(100), "-")
        .with_task_log(task_log);
    assert!(sup.is_root());

    let launched = launch(&spec("sleep", &["5"])).await.unwrap();
    let outcome = with_timeout(sup.supervise(launched, &mut signals)).await;

    assert_eq!(outcome, Outcome::TimedOut);
    assert_eq!(control.killed_groups(), vec![65000]);
    assert_eq!(control.own_group_kills(), 1);
    assert!(!log_path.exists());
}

#[tokio::test]
async fn delegate_never_touches_a_task_log() {
    let control = RecordingControl::new();
    let (tx, mut signals) = SignalSubscription::manual();

    let sup = Supervisor::new(Arc::new(control.clone()), Duration::from_secs(30), "-");
    assert!(!sup.is_root());

    let launched = launch(&spec("sleep", &["5"])).await.unwrap();
    tx.send(OsSignal::Terminate).await.unwrap();
    with_timeout(sup.supervise(launched, &mut signals)).await;

    assert!(control.killed_groups().is_empty());
    assert_eq!(control.own_group_kills(), 1);
}

#[derive(Clone, Default)]
struct MemoryQueue(Arc<Mutex<Vec<String>>>);

impl MessageQueue for MemoryQueue {
    fn send(&mut self, body: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn reporter_receives_output_and_exit() {
    let queue = MemoryQueue::default();
    let reporter = Reporter::new("task-9", Box::new(queue.clone())).shared();
    let (_tx, mut signals) = SignalSubscription::manual();

    let mut launch_spec = spec("echo", &["hello"]);
    launch_spec.reporter = Some(reporter.clone());

    let sup = Supervisor::new(Arc::new(RecordingControl::new()), Duration::from_secs(10), "-")
        .with_reporter(Some(reporter))
        .with_drain_grace(Duration::from_secs(2));
    let launched = launch(&launch_spec).await.unwrap();
    sup.supervise(launched, &mut signals).await;

    let sent = queue.0.lock().unwrap().clone();
    // "hello\n" and "0" in base64; output is small enough for one message.
    assert_eq!(sent, vec!["task-9\taGVsbG8K\t\tMA==".to_string()]);
}
