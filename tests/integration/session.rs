use std::{fs, path::PathBuf};

use supervisord_tui::{
    config::ProcessDefinition,
    error::SupervisorError,
    gateway::Gateway,
    session::{Action, Session},
    status::ProcessStatus,
    test_utils::{ScriptedRunner, ok},
    transaction::{Edit, TxState},
};
use tempfile::{TempDir, tempdir};

const CONFIG: &str = "\
[unix_http_server]
file=/tmp/supervisor.sock

[supervisord]
logfile=/tmp/supervisord.log

[supervisorctl]
serverurl=unix:///tmp/supervisor.sock

[program:web]
command=/usr/bin/web
stderr_logfile=/nonexistent/web.err

[program:worker]
command=/usr/bin/worker
";

fn write_config(text: &str) -> (TempDir, PathBuf) {
    let temp = tempdir().expect("create tempdir");
    let path = temp.path().join("supervisord.conf");
    fs::write(&path, text).expect("write config");
    (temp, path)
}

#[test]
fn full_operator_workflow() {
    let (_temp, path) = write_config(CONFIG);
    let runner = ScriptedRunner::new();
    runner.when(
        "status",
        ok("web RUNNING pid 123, uptime 1:02:03\nworker STOPPED Not started\n"),
    );

    let mut session = Session::open(&path, Gateway::new(&runner)).expect("open session");
    let web = &session.processes()[0];
    assert_eq!(web.record.status, ProcessStatus::Running);
    assert_eq!(web.record.pid, 123);
    assert_eq!(web.record.uptime.as_secs(), 3723);

    session.select_next();
    session.control_selected(Action::Start).expect("start worker");
    assert!(runner.calls().contains(&"supervisorctl start worker".to_string()));
    assert_eq!(session.message(), Some("Started worker"));
    assert_eq!(session.selected().map(|p| p.name()), Some("worker"));

    let mut renamed = session
        .config()
        .get("worker")
        .cloned()
        .expect("worker definition");
    renamed.name = "jobs".into();
    runner.when(
        "status",
        ok("jobs STOPPED Not started\nweb RUNNING pid 123, uptime 1:02:10\n"),
    );
    session
        .apply(Edit::Update {
            original: "worker".into(),
            definition: renamed,
        })
        .expect("rename worker");

    assert_eq!(session.selected().map(|p| p.name()), Some("jobs"));
    assert!(session.config().get("worker").is_none());
    let calls = runner.calls();
    assert!(calls.contains(&"supervisorctl update".to_string()));
    assert!(!calls.iter().any(|call| call == "supervisorctl update jobs"));
    let written = fs::read_to_string(&path).expect("read config");
    assert!(written.contains("[program:jobs]\ncommand=/usr/bin/worker\n"));
}

#[test]
fn unknown_runtime_process_has_no_definition() {
    let (_temp, path) = write_config(CONFIG);
    let runner = ScriptedRunner::new();
    runner.when("status", ok("ghost RUNNING pid 9, uptime 0:00:01\n"));

    let session = Session::open(&path, Gateway::new(&runner)).expect("open session");
    assert_eq!(session.processes().len(), 1);
    assert!(session.processes()[0].definition.is_none());
}

#[test]
fn failed_edit_keeps_session_usable() {
    let (_temp, path) = write_config(CONFIG);
    let runner = ScriptedRunner::new();
    runner.when("status", ok("web RUNNING pid 1, uptime 0:00:01\n"));
    let mut session = Session::open(&path, Gateway::new(&runner)).expect("open session");

    runner.push_failure("ERROR: reread failed");
    let mut api = ProcessDefinition::new("api");
    api.command = "/usr/bin/api".into();
    let err = session.apply(Edit::Add(api.clone())).expect_err("reread fails");
    assert_eq!(err.step, TxState::Notifying);
    assert!(session.config().get("api").is_some());

    let err = session.apply(Edit::Add(api)).expect_err("already on disk");
    assert!(err.is_validation());

    session.poll();
    assert!(session.last_error().is_none());
}

#[test]
fn missing_control_section_is_reported_before_status() {
    let (_temp, path) = write_config("[supervisord]\n\n[program:web]\ncommand=/bin/web\n");
    let runner = ScriptedRunner::new();

    let err = Session::open(&path, Gateway::new(&runner)).expect_err("sections missing");
    match err {
        SupervisorError::Configuration { remediation } => {
            assert!(remediation.contains("[supervisorctl]"));
            assert!(remediation.contains("[unix_http_server] or [inet_http_server]"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(runner.calls().is_empty());
}

#[test]
fn daemon_missing_ctl_section_suggests_socket_from_config() {
    let (_temp, path) = write_config(CONFIG);
    let runner = ScriptedRunner::new();
    let mut output = ok("");
    output.success = false;
    output.stderr = "Error: .ini file does not include supervisorctl section".into();
    runner.push(output);

    let err = Session::open(&path, Gateway::new(&runner)).expect_err("status fails");
    assert!(err.to_string().contains("serverurl=unix:///tmp/supervisor.sock"));
}
