//! Parsing of `supervisorctl status` reports into runtime records.
//!
//! The report is free text whose layout is not versioned, so the parser never
//! fails. Lines with fewer than two fields are skipped and fields it cannot
//! read fall back to zero.
use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use strum_macros::{AsRefStr, Display, EnumString};

static PID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pid\s+(\d+)").expect("valid pid regex"));
static UPTIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"uptime\s+(.+)").expect("valid uptime regex"));
static DAYS_UPTIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+days?,\s+(\d+):(\d+):(\d+)").expect("valid days regex")
});

/// Process state as reported by supervisord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ProcessStatus {
    Running,
    Stopped,
    Starting,
    Stopping,
    Fatal,
    Exited,
    Unknown,
}

impl ProcessStatus {
    /// Maps a report token to a status; anything outside the vocabulary is `Unknown`.
    pub fn from_token(token: &str) -> Self {
        token.parse().unwrap_or(ProcessStatus::Unknown)
    }
}

/// Live state of one program as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRecord {
    pub name: String,
    pub status: ProcessStatus,
    /// `0` when the process is not running.
    pub pid: u32,
    /// Zero when the process is not running.
    pub uptime: Duration,
}

impl RuntimeRecord {
    /// A record for a process that is not running.
    pub fn new(name: impl Into<String>, status: ProcessStatus) -> Self {
        Self {
            name: name.into(),
            status,
            pid: 0,
            uptime: Duration::ZERO,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ProcessStatus::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.status == ProcessStatus::Stopped
    }
}

/// Parses a full status report.
///
/// Each line looks like one of:
///
/// ```text
/// web        RUNNING   pid 12345, uptime 0:05:23
/// web        RUNNING   pid 12345, uptime 7 days, 10:25:47
/// worker     STOPPED   Dec 25 08:28 PM
/// ```
pub fn parse_status(output: &str) -> Vec<RuntimeRecord> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<RuntimeRecord> {
    let line = line.trim();
    let mut fields = line.split_whitespace();
    let name = fields.next()?;
    let status = ProcessStatus::from_token(fields.next()?);

    let mut record = RuntimeRecord::new(name, status);
    if line.contains("pid") {
        if let Some(caps) = PID.captures(line) {
            record.pid = caps[1].parse().unwrap_or(0);
        }
        if let Some(caps) = UPTIME.captures(line) {
            record.uptime = parse_uptime(&caps[1]);
        }
    }

    Some(record)
}

/// Parses `H:MM:SS` or `<days> days, H:MM:SS`; any other shape is zero.
pub fn parse_uptime(text: &str) -> Duration {
    let text = text.trim();

    if text.contains("day")
        && let Some(caps) = DAYS_UPTIME.captures(text)
    {
        let field = |i: usize| caps[i].parse::<u64>().unwrap_or(0);
        let days = field(1).saturating_mul(86_400);
        return Duration::from_secs(days.saturating_add(hms(field(2), field(3), field(4))));
    }

    let parts: Vec<&str> = text.split(':').collect();
    if let [hours, minutes, seconds] = parts.as_slice() {
        let field = |s: &str| s.trim().parse::<u64>().unwrap_or(0);
        return Duration::from_secs(hms(field(*hours), field(*minutes), field(*seconds)));
    }

    Duration::ZERO
}

fn hms(hours: u64, minutes: u64, seconds: u64) -> u64 {
    hours
        .saturating_mul(3600)
        .saturating_add(minutes.saturating_mul(60))
        .saturating_add(seconds)
}

/// Formats an uptime as `HH:MM:SS`, prefixed with `<n>d` past one day.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let (days, rest) = (total / 86_400, total % 86_400);
    let clock = format!("{:02}:{:02}:{:02}", rest / 3600, rest % 3600 / 60, rest % 60);
    if days > 0 {
        format!("{days}d {clock}")
    } else {
        clock
    }
}
