use assert_cmd::Command;
use predicates::boolean::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;
use tempfile::tempdir;

const FULL_CONFIG: &str = "\
[unix_http_server]
file=/tmp/supervisord-tui-test.sock

[supervisord]
logfile=/tmp/supervisord.log

[supervisorctl]
serverurl=unix:///tmp/supervisord-tui-test.sock

[program:web]
command=/bin/true
";

fn binary() -> Command {
    let mut cmd = Command::cargo_bin("supervisord-tui").expect("binary exists");
    cmd.env_remove("SUPERVISOR_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn prints_version() {
    binary()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("supervisord-tui").and(contains(env!("CARGO_PKG_VERSION"))));
}

#[test]
fn missing_explicit_config_exits_with_error() {
    let temp = tempdir().expect("create tempdir");

    binary()
        .args(["-c"])
        .arg(temp.path().join("nope.conf"))
        .assert()
        .code(1)
        .stderr(contains("Error initializing application: config file not found"));
}

#[test]
fn config_without_control_sections_prints_snippet() {
    let temp = tempdir().expect("create tempdir");
    let config = temp.path().join("supervisord.conf");
    fs::write(&config, "[program:web]\ncommand=/bin/true\n").expect("write config");

    binary()
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(
            contains("missing required sections")
                .and(contains("[supervisorctl]"))
                .and(contains("serverurl=unix:///tmp/supervisor.sock")),
        );
}

#[test]
fn unreachable_supervisorctl_is_fatal() {
    let temp = tempdir().expect("create tempdir");
    let config = temp.path().join("supervisord.conf");
    fs::write(&config, FULL_CONFIG).expect("write config");
    let empty_path = temp.path().join("bin");
    fs::create_dir(&empty_path).expect("create empty PATH dir");

    binary()
        .env("SUPERVISOR_CONFIG", &config)
        .env("PATH", &empty_path)
        .assert()
        .code(1)
        .stderr(contains("Error initializing application: failed to run supervisorctl"));
}

#[test]
fn rejects_unknown_log_level() {
    binary()
        .args(["--log-level", "chatty"])
        .assert()
        .failure()
        .stderr(contains("invalid log level"));
}

#[test]
fn accepts_single_dash_long_flags() {
    binary()
        .arg("-version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));

    let temp = tempdir().expect("create tempdir");
    binary()
        .arg("-config")
        .arg(temp.path().join("nope.conf"))
        .assert()
        .code(1)
        .stderr(contains("config file not found"));
}

#[test]
fn startup_failure_is_logged_to_temp_dir() {
    let temp = tempdir().expect("create tempdir");

    binary()
        .env("TMPDIR", temp.path())
        .args(["--log-level", "info", "-c"])
        .arg(temp.path().join("nope.conf"))
        .assert()
        .code(1)
        .stderr(contains("logging disabled").not());

    let log = fs::read_to_string(temp.path().join("supervisord-tui.log")).expect("read log");
    assert!(log.contains("Startup failed"));
}
