//! Constants and default values used across supervisord-tui.
//!
//! Paths, command names and timings live here so the locator, gateway and
//! session agree on them.

use std::time::Duration;

// ============================================================================
// Supervisor control tool
// ============================================================================

/// Name of the supervisord control tool invoked by the gateway.
pub const SUPERVISORCTL: &str = "supervisorctl";

/// Socket URL reported when the config does not declare one.
pub const DEFAULT_SOCKET_URL: &str = "unix:///tmp/supervisor.sock";

/// Socket path used when generating a minimal config snippet.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/supervisor.sock";

// ============================================================================
// Config file discovery
// ============================================================================

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "SUPERVISOR_CONFIG";

/// File name the diagnostic probe looks for in `supervisorctl` output.
pub const CONFIG_FILE_NAME: &str = "supervisord.conf";

/// Hidden config file searched under the user's home directory.
pub const HOME_CONFIG_FILE: &str = ".supervisord.conf";

/// OS-conventional install locations, searched in order.
pub const CONVENTIONAL_CONFIG_PATHS: &[&str] = &[
    "/etc/supervisor/supervisord.conf",
    "/etc/supervisord.conf",
    // Homebrew on Apple Silicon.
    "/opt/homebrew/etc/supervisord.conf",
    // Homebrew on Intel.
    "/usr/local/etc/supervisord.conf",
];

// ============================================================================
// Session
// ============================================================================

/// How often the session polls `supervisorctl status`.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// How long transient status messages stay on screen.
pub const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Number of log lines shown for each of stdout and stderr.
pub const LOG_TAIL_LINES: usize = 5;

/// Editor used when `$EDITOR` is unset.
pub const DEFAULT_EDITOR: &str = "vi";

/// File name of the diagnostic log written to the temp directory.
pub const LOG_FILE_NAME: &str = "supervisord-tui.log";
