use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::reconcile::Process;

/// Reads the last `lines` lines of a log file.
///
/// # Arguments
/// * `path` - The log file to read.
/// * `lines` - The number of trailing lines to keep.
///
/// # Returns
/// * The trailing lines in file order, or the error from opening the file.
pub fn tail_lines(path: &Path, lines: usize) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut tail = VecDeque::with_capacity(lines);
    for line in reader.lines().map_while(Result::ok) {
        if tail.len() == lines {
            tail.pop_front();
        }
        if lines > 0 {
            tail.push_back(line);
        }
    }

    Ok(tail.into())
}

/// Which of a program's two log files to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogKind {
    Stdout,
    Stderr,
}

/// Lines to display for one log of a merged process.
///
/// Missing configuration, an unset log path and read failures all turn into a
/// single explanatory line.
pub fn process_log(process: &Process, kind: LogKind, lines: usize) -> Vec<String> {
    let Some(definition) = &process.definition else {
        return vec!["Config not loaded for this process".to_string()];
    };

    let (path, label) = match kind {
        LogKind::Stdout => (&definition.stdout_logfile, "stdout"),
        LogKind::Stderr => (&definition.stderr_logfile, "stderr"),
    };
    if path.is_empty() {
        return vec![format!("No {label} logfile configured")];
    }

    match tail_lines(Path::new(path), lines) {
        Ok(tail) => tail,
        Err(err) => vec![format!("Error: {err}")],
    }
}
