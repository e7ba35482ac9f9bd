// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::observer::RecordingObserver;
use crate::runner::ScriptedRunner;
use tokio::task::JoinHandle;
use warden_gate::RequestStatus;

const BANNER: &str = "Steam Console Client (c) Valve Corporation - version 1700000000";
const LOGIN: &str = "Logging in user 'deploy' to Steam Public...";
const PROMPT: &str = "Please confirm the login in the Steam Mobile app on your phone.";

fn supervisor(runner: ScriptedRunner, gate: &ConfirmationGate) -> InteractiveSupervisor {
    InteractiveSupervisor::new(Arc::new(runner), gate.clone()).with_quiet_period(None)
}

fn spec() -> ProcessSpec {
    ProcessSpec::new("steamcmd").args(["+login", "deploy", "+quit"])
}

/// Operator stand-in: resolves the first pending request it sees.
fn operator<F>(gate: &ConfirmationGate, resolve: F) -> JoinHandle<RequestId>
where
    F: FnOnce(&ConfirmationGate, RequestId) + Send + 'static,
{
    let gate = gate.clone();
    tokio::spawn(async move {
        loop {
            if let Some(request) = gate.list_pending().into_iter().next() {
                resolve(&gate, request.id);
                return request.id;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
}

mod streaming {
    use super::*;

    #[tokio::test]
    async fn test_drains_both_streams_and_reports_counts() {
        let gate = ConfirmationGate::new();
        let observer = Arc::new(RecordingObserver::new());
        let runner = ScriptedRunner::new()
            .stdout("one")
            .stderr("warning: low disk")
            .stdout("two")
            .stdout("three");

        let report = supervisor(runner, &gate)
            .with_observer(observer.clone())
            .run_interactive(&CancellationToken::new(), &spec(), Some("server-1"))
            .await
            .unwrap();

        assert_eq!(report.stdout_lines, 3);
        assert_eq!(report.stderr_lines, 1);
        assert_eq!(report.exit, ProcessExit { code: Some(0) });
        assert_eq!(report.confirmation, None);
        assert!(gate.is_empty());

        let outputs = observer.outputs();
        assert_eq!(outputs.len(), 4);
        assert!(outputs.iter().all(|o| o.subject_id.as_deref() == Some("server-1")));
        let errors: Vec<_> = outputs.iter().filter(|o| o.is_error).map(|o| o.line.as_str()).collect();
        assert_eq!(errors, vec!["warning: low disk"]);
    }

    #[tokio::test]
    async fn test_stdout_order_is_preserved() {
        let gate = ConfirmationGate::new();
        let observer = Arc::new(RecordingObserver::new());
        let mut runner = ScriptedRunner::new();
        for i in 0..50 {
            runner = runner.stdout(format!("line {}", i));
        }

        supervisor(runner, &gate)
            .with_observer(observer.clone())
            .with_output_buffer(1)
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap();

        let lines: Vec<_> = observer.outputs().into_iter().map(|o| o.line).collect();
        let expected: Vec<_> = (0..50).map(|i| format!("line {}", i)).collect();
        assert_eq!(lines, expected);
    }

    #[tokio::test]
    async fn test_observer_panics_do_not_fail_the_run() {
        struct Exploding;
        impl SupervisorObserver for Exploding {
            fn on_output(&self, _subject_id: Option<&str>, _line: &str, _is_error: bool) {
                panic!("observer bug");
            }
            fn on_command(&self, _event: &CommandEvent) {
                panic!("observer bug");
            }
        }

        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new().stdout("hello").stderr("world");

        let report = supervisor(runner, &gate)
            .with_observer(Arc::new(Exploding))
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap();

        assert_eq!(report.stdout_lines + report.stderr_lines, 2);
    }

    #[tokio::test]
    async fn test_command_events_bracket_the_run() {
        let gate = ConfirmationGate::new();
        let observer = Arc::new(RecordingObserver::new());

        supervisor(ScriptedRunner::new().stdout("ok"), &gate)
            .with_observer(observer.clone())
            .run_interactive(&CancellationToken::new(), &spec(), Some("server-1"))
            .await
            .unwrap();

        let commands = observer.commands();
        assert_eq!(commands.len(), 2);
        assert!(!commands[0].completed);
        assert_eq!(commands[0].executable, "steamcmd");
        assert_eq!(commands[0].args, vec!["+login", "deploy", "+quit"]);
        assert!(commands[1].completed);
        assert!(commands[1].success);
        assert_eq!(commands[1].error, None);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_spawn_failure_is_start_failure() {
        let gate = ConfirmationGate::new();
        let observer = Arc::new(RecordingObserver::new());
        let runner = ScriptedRunner::new().fail_spawn("no such file");

        let err = supervisor(runner, &gate)
            .with_observer(observer.clone())
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap_err();

        match err {
            SupervisorError::StartFailure { executable, .. } => assert_eq!(executable, "steamcmd"),
            other => panic!("expected StartFailure, got {:?}", other),
        }
        let finished = observer.commands().pop().unwrap();
        assert!(finished.completed);
        assert!(!finished.success);
        assert!(finished.error.unwrap().contains("failed to start"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_process_exit() {
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new().stdout("ERROR! Failed to install app").exit_code(8);

        let err = supervisor(runner, &gate)
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::ProcessExit { code: Some(8) }));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_spawns() {
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new().stdout("hello");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let supervisor = InteractiveSupervisor::new(Arc::new(runner.clone()), gate);
        let err = supervisor.run_interactive(&cancel, &spec(), None).await.unwrap_err();

        assert!(matches!(err, SupervisorError::Cancelled));
        assert!(runner.spawned().is_empty());
    }
}

mod confirmation {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_prompt_waits_for_operator_then_resumes() {
        let gate = ConfirmationGate::new();
        let observer = Arc::new(RecordingObserver::new());
        let runner = ScriptedRunner::new()
            .stdout(LOGIN)
            .stdout(PROMPT)
            .sleep(Duration::from_millis(10))
            .stdout("Waiting for user info...OK");

        let op = operator(&gate, |gate, id| gate.complete_request(&id).unwrap());
        let report = supervisor(runner, &gate)
            .with_observer(observer.clone())
            .run_interactive(&CancellationToken::new(), &spec(), Some("server-1"))
            .await
            .unwrap();
        let id = op.await.unwrap();

        assert_eq!(report.confirmation, Some(id));
        assert_eq!(report.stdout_lines, 3);
        let request = gate.get_request(&id).unwrap();
        assert_eq!(request.status, RequestStatus::Complete);
        assert_eq!(request.prompt_text, PROMPT);
        assert_eq!(request.subject_id.as_deref(), Some("server-1"));
        assert!(observer.outputs().iter().any(|o| o.line.ends_with("OK")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_prompt_times_out() {
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new()
            .stdout(PROMPT)
            .sleep(Duration::from_secs(3600));

        let started = Instant::now();
        let err = supervisor(runner, &gate)
            .with_confirm_timeout(Duration::from_millis(100))
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        let id = match err {
            SupervisorError::ConfirmationTimeout { id, timeout } => {
                assert_eq!(timeout, Duration::from_millis(100));
                id
            }
            other => panic!("expected ConfirmationTimeout, got {:?}", other),
        };
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(200), "took {:?}", elapsed);

        let request = gate.get_request(&id).unwrap();
        assert_eq!(request.status, RequestStatus::Error);
        assert_eq!(request.error_message.as_deref(), Some(warden_gate::TIMEOUT_REASON));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operator_error_is_denied_with_message() {
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new().stdout(PROMPT).stdout("never read");

        let op = operator(&gate, |gate, id| gate.error_request(&id, "wrong account").unwrap());
        let err = supervisor(runner, &gate)
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap_err();
        let id = op.await.unwrap();

        match err {
            SupervisorError::ConfirmationDenied { id: denied, message } => {
                assert_eq!(denied, id);
                assert_eq!(message, "wrong account");
            }
            other => panic!("expected ConfirmationDenied, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting_errors_the_request() {
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new().stdout(PROMPT).sleep(Duration::from_secs(3600));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let op = operator(&gate, move |_, _| trigger.cancel());
        let started = Instant::now();
        let err = supervisor(runner, &gate)
            .run_interactive(&cancel, &spec(), None)
            .await
            .unwrap_err();
        let id = op.await.unwrap();

        assert!(matches!(err, SupervisorError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
        let request = gate.get_request(&id).unwrap();
        assert_eq!(request.status, RequestStatus::Error);
        assert_eq!(request.error_message.as_deref(), Some(CANCELLED_REASON));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_request_per_run() {
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new()
            .stdout(PROMPT)
            .stdout("Enter the current code from your Steam Guard Mobile Authenticator app")
            .stderr("two-factor code mismatch, retrying");

        let op = operator(&gate, |gate, id| gate.complete_request(&id).unwrap());
        let report = supervisor(runner, &gate)
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap();
        op.await.unwrap();

        assert_eq!(gate.len(), 1);
        assert!(report.confirmation.is_some());
        assert_eq!(report.stdout_lines + report.stderr_lines, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_withdrawn_request_fails_the_run() {
        let clock = warden_gate::FakeClock::at_now();
        let gate = ConfirmationGate::with_clock(warden_gate::ClockHandle::Fake(clock.clone()));
        let runner = ScriptedRunner::new().stdout(PROMPT).sleep(Duration::from_secs(3600));

        let op = operator(&gate, move |gate, _| {
            clock.advance(Duration::from_secs(7200));
            assert_eq!(gate.cleanup_older_than(Duration::from_secs(3600)), 1);
        });
        let err = supervisor(runner, &gate)
            .with_confirm_timeout(Duration::from_secs(60))
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap_err();
        op.await.unwrap();

        assert!(matches!(err, SupervisorError::Confirmation(GateError::Withdrawn(_))));
        assert!(gate.is_empty());
    }
}

mod quiet_period {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_silence_after_banner_opens_request() {
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new()
            .stdout(BANNER)
            .stdout(LOGIN)
            .sleep(Duration::from_secs(20))
            .stdout("Waiting for user info...OK");

        let op = operator(&gate, |gate, id| gate.complete_request(&id).unwrap());
        let report = supervisor(runner, &gate)
            .with_quiet_period(Some(Duration::from_secs(1)))
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap();
        let id = op.await.unwrap();

        assert_eq!(report.confirmation, Some(id));
        assert_eq!(gate.len(), 1);
        assert_eq!(gate.get_request(&id).unwrap().prompt_text, QUIET_PROMPT_TEXT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steady_output_keeps_quiet_period_from_firing() {
        let gate = ConfirmationGate::new();
        let mut runner = ScriptedRunner::new().stdout(BANNER);
        for i in 0..10 {
            runner = runner
                .sleep(Duration::from_millis(500))
                .stdout(format!("Update state (0x61) downloading, progress: {}0.00", i));
        }

        let report = supervisor(runner, &gate)
            .with_quiet_period(Some(Duration::from_secs(1)))
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap();

        assert_eq!(report.confirmation, None);
        assert!(gate.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_banner_means_no_quiet_trigger() {
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new()
            .stdout("Redirecting stderr to 'logs/stderr.txt'")
            .sleep(Duration::from_secs(30))
            .stdout("done");

        let report = supervisor(runner, &gate)
            .with_quiet_period(Some(Duration::from_secs(1)))
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap();

        assert_eq!(report.confirmation, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_prompt_disarms_quiet_trigger() {
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new()
            .stdout(BANNER)
            .stdout(PROMPT)
            .sleep(Duration::from_secs(30))
            .stdout("OK");

        let op = operator(&gate, |gate, id| gate.complete_request(&id).unwrap());
        supervisor(runner, &gate)
            .with_quiet_period(Some(Duration::from_secs(1)))
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap();
        op.await.unwrap();

        assert_eq!(gate.len(), 1);
        assert!(gate.list_pending().is_empty());
    }
}

mod configured {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_from_config_uses_custom_keywords() {
        let config = SupervisorConfig::from_toml_str(
            r#"
            prompt_keywords = ["enter code"]
            quiet_period_ms = 0
            confirm_timeout_ms = 50
            "#,
        )
        .unwrap();
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new().stdout("Please ENTER CODE:").sleep(Duration::from_secs(5));

        let supervisor =
            InteractiveSupervisor::from_config(Arc::new(runner), gate.clone(), &config).unwrap();
        let err = supervisor
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::ConfirmationTimeout { timeout, .. } if timeout == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_default_keywords_do_not_match_under_custom_config() {
        let config = SupervisorConfig::from_toml_str("prompt_keywords = [\"enter code\"]\n").unwrap();
        let gate = ConfirmationGate::new();
        let runner = ScriptedRunner::new().stdout(PROMPT);

        let report = InteractiveSupervisor::from_config(Arc::new(runner), gate.clone(), &config)
            .unwrap()
            .with_quiet_period(None)
            .run_interactive(&CancellationToken::new(), &spec(), None)
            .await
            .unwrap();

        assert_eq!(report.confirmation, None);
    }
}

#[cfg(unix)]
mod live {
    use super::*;
    use crate::runner::TokioProcessRunner;

    #[tokio::test]
    async fn test_real_process_both_streams() {
        let gate = ConfirmationGate::new();
        let supervisor = InteractiveSupervisor::new(Arc::new(TokioProcessRunner::new()), gate)
            .with_quiet_period(None);
        let spec = ProcessSpec::new("sh").args(["-c", "echo hello; echo oops >&2; echo bye"]);

        let report = supervisor
            .run_interactive(&CancellationToken::new(), &spec, None)
            .await
            .unwrap();

        assert_eq!(report.stdout_lines, 2);
        assert_eq!(report.stderr_lines, 1);
    }

    #[tokio::test]
    async fn test_real_process_exit_code() {
        let supervisor =
            InteractiveSupervisor::new(Arc::new(TokioProcessRunner::new()), ConfirmationGate::new());
        let spec = ProcessSpec::new("sh").args(["-c", "exit 3"]);

        let err = supervisor
            .run_interactive(&CancellationToken::new(), &spec, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::ProcessExit { code: Some(3) }));
    }
}

#[cfg(target_os = "linux")]
mod termination {
    use super::*;
    use crate::runner::{SpawnedProcess, TokioProcessRunner};
    use parking_lot::Mutex;

    const WAITING_PROMPT: &str = "echo 'Please confirm the login in the Steam Mobile app'; exec sleep 300";

    /// Real runner that remembers the pid of the last process it started.
    #[derive(Default)]
    struct PidRunner {
        inner: TokioProcessRunner,
        pid: Arc<Mutex<Option<u32>>>,
    }

    impl ProcessRunner for PidRunner {
        fn spawn(&self, spec: &ProcessSpec) -> io::Result<SpawnedProcess> {
            let process = self.inner.spawn(spec)?;
            *self.pid.lock() = process.pid;
            Ok(process)
        }
    }

    fn is_running(pid: u32) -> bool {
        let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
            return false;
        };
        let state = stat.rsplit(')').next().and_then(|rest| rest.trim_start().chars().next());
        !matches!(state, Some('Z' | 'X'))
    }

    /// Blocks the thread, so nothing else on the test runtime gets to run.
    fn assert_terminated(pid: Arc<Mutex<Option<u32>>>) {
        let pid = (*pid.lock()).expect("process was spawned");
        for _ in 0..200 {
            if !is_running(pid) {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("process {} still running after the run returned", pid);
    }

    fn supervisor(runner: PidRunner, gate: &ConfirmationGate) -> InteractiveSupervisor {
        InteractiveSupervisor::new(Arc::new(runner), gate.clone()).with_quiet_period(None)
    }

    #[tokio::test]
    async fn test_cancel_kills_the_process() {
        let runner = PidRunner::default();
        let pid = runner.pid.clone();
        let cancel = CancellationToken::new();
        let canceller = {
            let (pid, cancel) = (pid.clone(), cancel.clone());
            tokio::spawn(async move {
                while pid.lock().is_none() {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };
        let spec = ProcessSpec::new("sh").args(["-c", "exec sleep 300"]);

        let err = supervisor(runner, &ConfirmationGate::new())
            .run_interactive(&cancel, &spec, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::Cancelled), "{:?}", err);
        assert_terminated(pid);
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_confirmation_timeout_kills_the_process() {
        let runner = PidRunner::default();
        let pid = runner.pid.clone();
        let spec = ProcessSpec::new("sh").args(["-c", WAITING_PROMPT]);

        let err = supervisor(runner, &ConfirmationGate::new())
            .with_confirm_timeout(Duration::from_millis(100))
            .run_interactive(&CancellationToken::new(), &spec, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::ConfirmationTimeout { .. }), "{:?}", err);
        assert_terminated(pid);
    }

    #[tokio::test]
    async fn test_denial_kills_the_process() {
        let gate = ConfirmationGate::new();
        let runner = PidRunner::default();
        let pid = runner.pid.clone();
        let operator = operator(&gate, |gate, id| {
            gate.error_request(&id, "not me").unwrap();
        });
        let spec = ProcessSpec::new("sh").args(["-c", WAITING_PROMPT]);

        let err = supervisor(runner, &gate)
            .run_interactive(&CancellationToken::new(), &spec, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::ConfirmationDenied { .. }), "{:?}", err);
        assert_terminated(pid);
        operator.await.unwrap();
    }
}
