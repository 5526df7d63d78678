//! Helpers shared by unit and integration tests.
use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    io,
    sync::{Mutex, MutexGuard, OnceLock},
};

use crate::gateway::{CommandOutput, CommandRunner};

/// Global lock for environment variable modifications in tests.
/// Tests that modify `HOME` or `SUPERVISOR_CONFIG` should hold it so parallel
/// tests do not observe each other's values.
pub static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandOutput),
    SpawnError(String),
}

impl Scripted {
    fn into_result(self) -> io::Result<CommandOutput> {
        match self {
            Scripted::Output(output) => Ok(output),
            Scripted::SpawnError(message) => Err(io::Error::new(io::ErrorKind::NotFound, message)),
        }
    }
}

/// Fake `CommandRunner` that replays canned outputs and records every call.
///
/// Queued responses are consumed in order. Once the queue is empty, a sticky
/// response registered with [`ScriptedRunner::when`] for the subcommand is
/// used, and failing that an empty successful output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    queue: RefCell<VecDeque<Scripted>>,
    sticky: RefCell<HashMap<String, Scripted>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, output: CommandOutput) {
        self.queue.borrow_mut().push_back(Scripted::Output(output));
    }

    pub fn push_ok(&self, stdout: &str) {
        self.push(ok(stdout));
    }

    pub fn push_failure(&self, output: &str) {
        self.push(failure(output));
    }

    pub fn push_io_error(&self, message: &str) {
        self.queue
            .borrow_mut()
            .push_back(Scripted::SpawnError(message.to_string()));
    }

    /// Answers every later `subcommand` call with `output`.
    pub fn when(&self, subcommand: &str, output: CommandOutput) {
        self.sticky
            .borrow_mut()
            .insert(subcommand.to_string(), Scripted::Output(output));
    }

    /// Every invocation so far, as `program arg1 arg2`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Invocations whose first argument was `subcommand`.
    pub fn calls_to(&self, subcommand: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.split_whitespace().nth(1) == Some(subcommand))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn execute(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let mut call = vec![program];
        call.extend_from_slice(args);
        self.calls.borrow_mut().push(call.join(" "));

        if let Some(next) = self.queue.borrow_mut().pop_front() {
            return next.into_result();
        }

        let sticky = args
            .first()
            .and_then(|subcommand| self.sticky.borrow().get(*subcommand).cloned());
        match sticky {
            Some(scripted) => scripted.into_result(),
            None => Ok(ok("")),
        }
    }
}

/// Successful output with the given stdout.
pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        success: true,
    }
}

/// Failed output with the given text on stdout.
pub fn failure(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        success: false,
    }
}
