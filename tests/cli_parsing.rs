// tests/cli_parsing.rs

use std::path::PathBuf;

use flowguard::cli::{ExecRequest, Invocation, Mode, usage_text};
use flowguard::errors::AgentError;
use flowguard::exec::resolve_exe_path;

fn argv(args: &[&str]) -> Vec<String> {
    std::iter::once("/usr/local/bin/flowguard")
        .chain(args.iter().copied())
        .map(str::to_string)
        .collect()
}

#[test]
fn exec_mode_parses_positionals_and_trailing_args() {
    let inv = Invocation::parse(argv(&["exec", "10", "out", "err", "exit", "ls", "-la", "/tmp"]))
        .unwrap();

    assert_eq!(inv.exe_path, PathBuf::from("/usr/local/bin/flowguard"));
    assert_eq!(
        inv.mode,
        Mode::Execute(ExecRequest {
            timeout_secs: 10,
            stdout_file: "out".into(),
            stderr_file: "err".into(),
            exit_file: "exit".into(),
            command: "ls".into(),
            args: vec!["-la".into(), "/tmp".into()],
        })
    );
}

#[test]
fn exec_mode_accepts_dashes_and_negative_timeout() {
    let inv = Invocation::parse(argv(&["exec", "-1", "-", "-", "-", "true"])).unwrap();
    match inv.mode {
        Mode::Execute(req) => {
            assert_eq!(req.timeout_secs, -1);
            assert_eq!(req.stdout_file, "-");
            assert_eq!(req.command, "true");
            assert!(req.args.is_empty());
        }
        other => panic!("expected exec mode, got {other:?}"),
    }
}

#[test]
fn exec_mode_with_too_few_parameters_is_usage_error() {
    let err = Invocation::parse(argv(&["exec", "10", "out", "err"])).unwrap_err();
    assert!(err.is_usage());
    assert!(err.to_string().contains("Invalid number of parameters"));
}

#[test]
fn exec_mode_with_bad_timeout_is_rejected() {
    let err = Invocation::parse(argv(&["exec", "ten", "-", "-", "-", "true"])).unwrap_err();
    assert!(matches!(err, AgentError::InvalidTimeout(ref t) if t == "ten"));
    assert!(err.is_usage());
    assert_eq!(err.to_string(), "Invalid time: 'ten'");
}

#[test]
fn kill_mode_requires_positive_pid() {
    let inv = Invocation::parse(argv(&["kill", "4321"])).unwrap();
    assert_eq!(inv.mode, Mode::Kill { pid: 4321 });

    for bad in [vec!["kill"], vec!["kill", "0"], vec!["kill", "abc"], vec!["kill", "-5"]] {
        let err = Invocation::parse(argv(&bad)).unwrap_err();
        assert!(err.is_usage(), "{bad:?} should be a usage error, got {err:?}");
    }
}

#[test]
fn anything_else_goes_to_the_interpreter() {
    let inv = Invocation::parse(argv(&["-v", "pipeline.bds", "-in", "a.txt"])).unwrap();
    assert_eq!(
        inv.mode,
        Mode::Interpreter {
            args: vec!["-v".into(), "pipeline.bds".into(), "-in".into(), "a.txt".into()]
        }
    );

    let bare = Invocation::parse(argv(&[])).unwrap();
    assert_eq!(bare.mode, Mode::Interpreter { args: vec![] });
}

#[test]
fn exe_path_is_cleaned_and_resolved() {
    assert_eq!(
        resolve_exe_path("/usr/local/bin/../bin/./flowguard").unwrap(),
        PathBuf::from("/usr/local/bin/flowguard")
    );

    let sh = resolve_exe_path("sh").unwrap();
    assert!(sh.is_absolute(), "{sh:?} should be absolute");
    assert!(sh.ends_with("sh"));

    let err = resolve_exe_path("definitely-not-a-real-program-xyz").unwrap_err();
    assert!(matches!(err, AgentError::ExecutableNotFound { .. }));
}

#[test]
fn usage_text_dumps_arguments() {
    let args = argv(&["exec", "10"]);
    let text = usage_text("Invalid number of parameters for 'exec' command", &args);
    assert!(text.starts_with("Error: Invalid number of parameters"));
    assert!(text.contains("\t0 : exec\n"));
    assert!(text.contains("\t1 : 10\n"));
    assert!(text.contains("Usage: flowguard command"));
}
