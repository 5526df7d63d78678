//! Error handling for supervisord-tui.
use std::path::PathBuf;

use thiserror::Error;

use crate::transaction::TxState;

/// Defines all possible errors raised while reconciling supervisord state.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No configuration file was found in any searched location.
    #[error(
        "supervisord config file not found in common locations. Set SUPERVISOR_CONFIG environment variable or ensure config exists in one of: {}",
        searched.join(", ")
    )]
    NotFound {
        /// Conventional locations that were checked.
        searched: Vec<String>,
    },

    /// An explicitly requested config file does not exist.
    #[error("config file not found: {}", .0.display())]
    ConfigMissing(PathBuf),

    /// Malformed configuration file or edit buffer.
    #[error("invalid configuration: {0}")]
    Parse(String),

    /// The daemon control interface is misconfigured.
    #[error("{remediation}")]
    Configuration {
        /// Human readable fix, including a ready-to-paste snippet.
        remediation: String,
    },

    /// supervisord is not running or its socket is missing.
    #[error("supervisord is not running or socket not found. Start supervisord first")]
    DaemonUnavailable,

    /// Generic failure of an external control command.
    #[error("{0}")]
    Gateway(String),

    /// A proposed definition was rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    /// Reading or writing a file failed.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}

impl SupervisorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SupervisorError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error returned when an edit transaction aborts.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct TransactionError {
    /// The step that was executing when the transaction failed.
    pub step: TxState,
    /// What went wrong during that step.
    #[source]
    pub source: SupervisorError,
}

impl TransactionError {
    /// Whether the failure happened before anything was written to disk.
    pub fn is_validation(&self) -> bool {
        self.step == TxState::Validating
    }
}
