use std::fs;

use supervisord_tui::{
    config::Configuration,
    editor,
    gateway::Gateway,
    test_utils::ScriptedRunner,
    transaction::{Edit, EditTransaction, TxState},
};
use tempfile::tempdir;

const ORIGINAL: &str = "\
[unix_http_server]
file=/tmp/supervisor.sock

[supervisord]
logfile=/tmp/supervisord.log

[program:web]
command=/usr/bin/web --port 8080
autostart=true
stdout_logfile=/var/log/web.log
stdout_logfile_maxbytes=50MB
environment=\"B=2,A=1\"
";

#[test]
fn edit_buffer_change_is_written_and_activated() {
    let temp = tempdir().expect("create tempdir");
    let path = temp.path().join("supervisord.conf");
    fs::write(&path, ORIGINAL).expect("write config");

    let mut config = Configuration::load(&path).expect("load config");
    let runner = ScriptedRunner::new();
    let gateway = Gateway::new(&runner);

    let buffer = editor::definition_text(config.get("web").expect("web program"));
    assert!(buffer.contains("stdout_logfile_maxbytes=50MB\n"));
    assert!(buffer.contains("environment=A=1,B=2\n"));

    let edited = buffer.replace("--port 8080", "--port 9090");
    let definition = editor::parse_definition_text(&edited).expect("parse buffer");

    let mut tx = EditTransaction::new(Edit::Update {
        original: "web".into(),
        definition,
    });
    tx.execute(&mut config, &gateway).expect("transaction succeeds");

    assert_eq!(tx.state(), TxState::Done);
    assert_eq!(
        runner.calls(),
        vec!["supervisorctl reread", "supervisorctl update web"]
    );

    let written = fs::read_to_string(&path).expect("read config");
    assert!(written.starts_with("[program:web]\n"));
    assert!(written.contains("command=/usr/bin/web --port 9090\n"));
    assert!(written.contains("environment=A=1,B=2\n"));
    assert!(!written.contains("[supervisord]"));

    let reloaded = Configuration::load(&path).expect("reload");
    assert_eq!(reloaded.programs, config.programs);
}

#[test]
fn add_then_delete_round_trip() {
    let temp = tempdir().expect("create tempdir");
    let path = temp.path().join("supervisord.conf");
    fs::write(&path, ORIGINAL).expect("write config");

    let mut config = Configuration::load(&path).expect("load config");
    let runner = ScriptedRunner::new();
    let gateway = Gateway::new(&runner);

    let template = editor::template_text().replace("process-name", "queue");
    let queue = editor::parse_definition_text(&template).expect("parse template");
    EditTransaction::new(Edit::Add(queue))
        .execute(&mut config, &gateway)
        .expect("add succeeds");
    assert_eq!(config.programs.len(), 2);

    let mut delete = EditTransaction::new(Edit::Delete("web".into()));
    delete.execute(&mut config, &gateway).expect("delete succeeds");

    assert_eq!(runner.calls().last().map(String::as_str), Some("supervisorctl update"));
    let written = fs::read_to_string(&path).expect("read config");
    assert!(!written.contains("[program:web]"));
    assert!(written.contains("[program:queue]"));
}

#[test]
fn duplicate_add_has_no_side_effects() {
    let temp = tempdir().expect("create tempdir");
    let path = temp.path().join("supervisord.conf");
    fs::write(&path, ORIGINAL).expect("write config");

    let mut config = Configuration::load(&path).expect("load config");
    let runner = ScriptedRunner::new();

    let duplicate = editor::parse_definition_text("[program:web]\ncommand=/bin/other\n")
        .expect("parse buffer");
    let mut tx = EditTransaction::new(Edit::Add(duplicate));
    let err = tx
        .execute(&mut config, &Gateway::new(&runner))
        .expect_err("duplicate rejected");

    assert!(err.is_validation());
    assert!(err.to_string().contains("already exists"));
    assert_eq!(tx.state(), TxState::Editing);
    assert!(runner.calls().is_empty());
    assert_eq!(fs::read_to_string(&path).expect("read config"), ORIGINAL);
}

#[test]
fn activation_failure_leaves_file_updated() {
    let temp = tempdir().expect("create tempdir");
    let path = temp.path().join("supervisord.conf");
    fs::write(&path, ORIGINAL).expect("write config");

    let mut config = Configuration::load(&path).expect("load config");
    let runner = ScriptedRunner::new();
    runner.push_ok("web: changed\n");
    runner.push_failure("ERROR: spawn error");

    let definition = editor::parse_definition_text("[program:web]\ncommand=/bin/broken\n")
        .expect("parse buffer");
    let mut tx = EditTransaction::new(Edit::Update {
        original: "web".into(),
        definition,
    });
    let err = tx
        .execute(&mut config, &Gateway::new(&runner))
        .expect_err("update fails");

    assert_eq!(err.step, TxState::Activating);
    assert!(err.to_string().contains("spawn error"));
    assert!(
        fs::read_to_string(&path)
            .expect("read config")
            .contains("command=/bin/broken")
    );
}
