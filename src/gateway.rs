//! Control gateway wrapping `supervisorctl`.
//!
//! Every call blocks until the external command exits. There is no timeout,
//! so a hung `supervisorctl` hangs the caller.
use std::{io, path::PathBuf, process::Command};

use tracing::{debug, info, warn};

use crate::{
    constants::SUPERVISORCTL,
    error::SupervisorError,
    locate,
    status::{RuntimeRecord, parse_status},
};

/// Captured result of running an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Whether the command exited with status zero.
    pub success: bool,
}

impl CommandOutput {
    /// Stdout followed by stderr, as a terminal would have shown them.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Capability to run an external command and capture its output.
pub trait CommandRunner {
    fn execute(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn execute(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        (**self).execute(program, args)
    }
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn execute(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}

const MISSING_CTL_SECTION: &str = "does not include supervisorctl section";

/// Issues control commands to supervisord and classifies their failures.
#[derive(Debug)]
pub struct Gateway<R = SystemRunner> {
    runner: R,
    program: String,
    config_path: Option<PathBuf>,
}

impl Gateway<SystemRunner> {
    /// Gateway that shells out to the real `supervisorctl`.
    pub fn system() -> Self {
        Self::new(SystemRunner)
    }
}

impl<R: CommandRunner> Gateway<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: SUPERVISORCTL.to_string(),
            config_path: None,
        }
    }

    /// Config file consulted when building remediation hints.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput, SupervisorError> {
        debug!("Running {} {}", self.program, args.join(" "));
        self.runner.execute(&self.program, args).map_err(|e| {
            SupervisorError::Gateway(format!("failed to run {}: {e}", self.program))
        })
    }

    /// Fetches and parses `supervisorctl status`.
    ///
    /// A failing run whose output names a missing `[supervisorctl]` section,
    /// a refused connection or a missing socket is an error. Otherwise any
    /// parsed record counts as success, since `status` also exits non-zero
    /// when some programs are not running.
    pub fn get_status(&self) -> Result<Vec<RuntimeRecord>, SupervisorError> {
        let output = self.run(&["status"])?;
        let message = if output.stderr.trim().is_empty() {
            output.stdout.trim()
        } else {
            output.stderr.trim()
        };

        if !output.success
            && let Some(err) = self.daemon_failure(message)
        {
            return Err(err);
        }

        let records = parse_status(&output.stdout);
        if !records.is_empty() {
            if !output.stderr.trim().is_empty() || !output.success {
                warn!(
                    "supervisorctl status reported problems alongside {} record(s): {}",
                    records.len(),
                    output.stderr.trim()
                );
            }
            return Ok(records);
        }

        if output.success {
            return Ok(records);
        }
        Err(SupervisorError::Gateway(format!(
            "failed to get status: {message}"
        )))
    }

    fn daemon_failure(&self, message: &str) -> Option<SupervisorError> {
        if message.contains(MISSING_CTL_SECTION) {
            let socket = locate::detect_socket_path(self.config_path.as_deref());
            return Some(SupervisorError::Configuration {
                remediation: format!(
                    "supervisord config is missing [supervisorctl] section.\n\n\
                     To fix this, add the following to your supervisord config file:\n\n\
                     [supervisorctl]\nserverurl={socket}\n\n\
                     Or if using TCP:\n[supervisorctl]\nserverurl=http://127.0.0.1:9001"
                ),
            });
        }

        let lowered = message.to_lowercase();
        if lowered.contains("connection refused") || lowered.contains("no such file") {
            return Some(SupervisorError::DaemonUnavailable);
        }
        None
    }

    fn control(&self, args: &[&str], what: &str) -> Result<(), SupervisorError> {
        let output = self.run(args)?;
        if output.success {
            info!("{} {} succeeded", self.program, args.join(" "));
            return Ok(());
        }
        Err(SupervisorError::Gateway(format!(
            "failed to {what}: {}",
            output.combined().trim()
        )))
    }

    pub fn start(&self, name: &str) -> Result<(), SupervisorError> {
        self.control(&["start", name], &format!("start {name}"))
    }

    pub fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        self.control(&["stop", name], &format!("stop {name}"))
    }

    pub fn restart(&self, name: &str) -> Result<(), SupervisorError> {
        self.control(&["restart", name], &format!("restart {name}"))
    }

    /// Asks supervisord to re-read its configuration files.
    pub fn reread(&self) -> Result<(), SupervisorError> {
        self.control(&["reread"], "reread config")
    }

    /// Applies re-read changes to one process group, or all when `name` is empty.
    pub fn update(&self, name: &str) -> Result<(), SupervisorError> {
        if name.is_empty() {
            self.control(&["update"], "update")
        } else {
            self.control(&["update", name], &format!("update {name}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedRunner;
    use std::fs;
    use tempfile::tempdir;

    fn failed(stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
            success: false,
        }
    }

    #[test]
    fn status_parses_records() {
        let runner = ScriptedRunner::new();
        runner.push_ok("web RUNNING pid 10, uptime 0:00:05\n");
        let gateway = Gateway::new(&runner);

        let records = gateway.get_status().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(runner.calls(), vec!["supervisorctl status"]);
    }

    #[test]
    fn records_win_over_stderr_warnings_and_exit_code() {
        let runner = ScriptedRunner::new();
        runner.push(failed("web STOPPED Not started\n", "some warning\n"));
        let gateway = Gateway::new(&runner);

        assert_eq!(gateway.get_status().unwrap().len(), 1);
    }

    #[test]
    fn unreachable_daemon_wins_over_text_that_parses_as_records() {
        let runner = ScriptedRunner::new();
        runner.push(failed("unix:///tmp/supervisor.sock no such file\n", ""));
        assert!(matches!(
            Gateway::new(&runner).get_status(),
            Err(SupervisorError::DaemonUnavailable)
        ));
    }

    #[test]
    fn empty_successful_report_is_empty_list() {
        let runner = ScriptedRunner::new();
        runner.push_ok("");
        assert!(Gateway::new(&runner).get_status().unwrap().is_empty());
    }

    #[test]
    fn missing_ctl_section_is_configuration_error_with_socket() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("supervisord.conf");
        fs::write(&config, "[unix_http_server]\nfile=/run/custom.sock\n").unwrap();

        let runner = ScriptedRunner::new();
        runner.push(failed(
            "",
            "Error: .ini file does not include supervisorctl section\n",
        ));
        let gateway = Gateway::new(&runner).with_config_path(&config);

        match gateway.get_status() {
            Err(SupervisorError::Configuration { remediation }) => {
                assert!(remediation.contains("[supervisorctl]"));
                assert!(remediation.contains("serverurl=unix:///run/custom.sock"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn refused_or_missing_socket_is_daemon_unavailable() {
        for message in [
            "error: <class 'socket.error'>, [Errno 111] Connection refused",
            "unix:///tmp/supervisor.sock no such file",
        ] {
            let runner = ScriptedRunner::new();
            runner.push(failed(message, ""));
            assert!(
                matches!(
                    Gateway::new(&runner).get_status(),
                    Err(SupervisorError::DaemonUnavailable)
                ),
                "{message}"
            );
        }
    }

    #[test]
    fn other_failures_wrap_raw_message() {
        let runner = ScriptedRunner::new();
        runner.push(failed("", "boom\n"));
        match Gateway::new(&runner).get_status() {
            Err(SupervisorError::Gateway(msg)) => assert_eq!(msg, "failed to get status: boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn spawn_failure_is_gateway_error() {
        let runner = ScriptedRunner::new();
        runner.push_io_error("not found");
        assert!(matches!(
            Gateway::new(&runner).get_status(),
            Err(SupervisorError::Gateway(msg)) if msg.contains("failed to run supervisorctl")
        ));
    }

    #[test]
    fn control_commands_use_expected_arguments() {
        let runner = ScriptedRunner::new();
        let gateway = Gateway::new(&runner);
        for _ in 0..6 {
            runner.push_ok("");
        }

        gateway.start("web").unwrap();
        gateway.stop("web").unwrap();
        gateway.restart("web").unwrap();
        gateway.reread().unwrap();
        gateway.update("web").unwrap();
        gateway.update("").unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "supervisorctl start web",
                "supervisorctl stop web",
                "supervisorctl restart web",
                "supervisorctl reread",
                "supervisorctl update web",
                "supervisorctl update",
            ]
        );
    }

    #[test]
    fn control_failure_wraps_combined_output() {
        let runner = ScriptedRunner::new();
        runner.push(failed("web: ERROR (no such process)\n", ""));
        match Gateway::new(&runner).start("web") {
            Err(SupervisorError::Gateway(msg)) => {
                assert_eq!(msg, "failed to start web: web: ERROR (no such process)")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
