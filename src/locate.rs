//! Locating the supervisord config file and the control socket it declares.
use std::{
    env, fs, iter,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    config::Line,
    constants::{
        CONFIG_ENV_VAR, CONFIG_FILE_NAME, CONVENTIONAL_CONFIG_PATHS, DEFAULT_SOCKET_PATH,
        DEFAULT_SOCKET_URL, HOME_CONFIG_FILE, SUPERVISORCTL,
    },
    error::SupervisorError,
    gateway::{CommandRunner, SystemRunner},
};

/// Best-effort source of a config path scraped from tool output.
///
/// Implementations may return `None` for any reason and must never fail.
pub trait DiagnosticProbe {
    fn probe(&self) -> Option<PathBuf>;
}

/// Probe that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl DiagnosticProbe for NoProbe {
    fn probe(&self) -> Option<PathBuf> {
        None
    }
}

/// Scans `supervisorctl version` output for a config file mention.
#[derive(Debug, Default)]
pub struct SupervisorctlProbe<R = SystemRunner> {
    runner: R,
}

impl<R: CommandRunner> SupervisorctlProbe<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> DiagnosticProbe for SupervisorctlProbe<R> {
    fn probe(&self) -> Option<PathBuf> {
        let output = self.runner.execute(SUPERVISORCTL, &["version"]).ok()?;
        if !output.success {
            return None;
        }
        scan_for_config_path(&output.stdout).map(PathBuf::from)
    }
}

/// Picks a config path out of free text.
///
/// Only lines mentioning "config file" are considered. Within such a line the
/// first token naming `supervisord.conf` wins, otherwise the token right after
/// one containing "config".
pub fn scan_for_config_path(text: &str) -> Option<String> {
    for line in text.lines() {
        if !line.to_lowercase().contains("config file") {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if let Some(token) = tokens.iter().find(|token| token.contains(CONFIG_FILE_NAME)) {
            return Some(token.to_string());
        }
        if let Some(pair) = tokens.windows(2).find(|pair| pair[0].contains("config")) {
            return Some(pair[1].to_string());
        }
    }
    None
}

/// The user's home directory, from `$HOME`.
pub fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Resolves the config file from env, probe, conventional paths and home.
pub struct Locator {
    env_path: Option<PathBuf>,
    probe: Box<dyn DiagnosticProbe>,
    conventional: Vec<PathBuf>,
    home: Option<PathBuf>,
}

impl Locator {
    /// Locator wired to the process environment and the real `supervisorctl`.
    pub fn from_env() -> Self {
        Self {
            env_path: env::var_os(CONFIG_ENV_VAR)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            probe: Box::new(SupervisorctlProbe::new(SystemRunner)),
            conventional: CONVENTIONAL_CONFIG_PATHS.iter().map(PathBuf::from).collect(),
            home: home_dir(),
        }
    }

    /// Locator with explicit inputs and no probe.
    pub fn new(
        env_path: Option<PathBuf>,
        conventional: Vec<PathBuf>,
        home: Option<PathBuf>,
    ) -> Self {
        Self {
            env_path,
            probe: Box::new(NoProbe),
            conventional,
            home,
        }
    }

    pub fn with_probe(mut self, probe: impl DiagnosticProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Returns the first existing config file.
    ///
    /// Order: environment variable, probe, conventional paths, home directory.
    pub fn locate(&self) -> Result<PathBuf, SupervisorError> {
        let home_candidate = self.home.as_ref().map(|home| home.join(HOME_CONFIG_FILE));
        let candidates = self
            .env_path
            .iter()
            .cloned()
            .chain(iter::once_with(|| self.probe.probe()).flatten())
            .chain(self.conventional.iter().cloned())
            .chain(home_candidate);

        for candidate in candidates {
            if candidate.is_file() {
                info!("Using supervisord config {}", candidate.display());
                return Ok(candidate);
            }
            debug!("No config at {}", candidate.display());
        }

        let mut searched: Vec<String> = self
            .conventional
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        searched.push(format!("~/{HOME_CONFIG_FILE}"));
        Err(SupervisorError::NotFound { searched })
    }
}

/// Finds the control socket declared in `[unix_http_server]`.
///
/// Uses `config_path` when given, otherwise locates the config. Any failure
/// falls back to the default socket URL.
pub fn detect_socket_path(config_path: Option<&Path>) -> String {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => match Locator::from_env().locate() {
            Ok(path) => path,
            Err(_) => return DEFAULT_SOCKET_URL.to_string(),
        },
    };

    match fs::read_to_string(&path) {
        Ok(text) => socket_from_text(&text, home_dir().as_deref())
            .unwrap_or_else(|| DEFAULT_SOCKET_URL.to_string()),
        Err(err) => {
            debug!("Cannot read {} for socket detection: {err}", path.display());
            DEFAULT_SOCKET_URL.to_string()
        }
    }
}

fn socket_from_text(text: &str, home: Option<&Path>) -> Option<String> {
    let mut in_unix_section = false;

    for raw in text.lines() {
        match Line::classify(raw) {
            Line::Section(name) | Line::Program(name) if !in_unix_section => {
                in_unix_section = name == "unix_http_server";
            }
            Line::Section(_) | Line::Program(_) => return None,
            Line::Directive("file", value) if in_unix_section => {
                return Some(format!("unix://{}", expand_home(value, home)));
            }
            _ => {}
        }
    }
    None
}

fn expand_home(path: &str, home: Option<&Path>) -> String {
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => home
            .join(rest.trim_start_matches('/'))
            .to_string_lossy()
            .into_owned(),
        _ => path.to_string(),
    }
}

/// Lists the sections supervisorctl needs that the file lacks.
pub fn validate_sections(path: &Path) -> Result<Vec<&'static str>, SupervisorError> {
    let text = fs::read_to_string(path).map_err(|e| SupervisorError::io(path, e))?;
    let mut sections = Vec::new();
    for raw in text.lines() {
        let trimmed = raw.trim();
        if let Line::Section(name) = Line::classify(raw)
            && trimmed.ends_with(']')
        {
            sections.push(name.to_string());
        }
    }
    let has = |name: &str| sections.iter().any(|section| section == name);

    let mut missing = Vec::new();
    if !has("supervisord") {
        missing.push("[supervisord]");
    }
    if !has("unix_http_server") && !has("inet_http_server") {
        missing.push("[unix_http_server] or [inet_http_server]");
    }
    if !has("supervisorctl") {
        missing.push("[supervisorctl]");
    }
    Ok(missing)
}

/// A minimal config that lets supervisorctl talk to supervisord over `socket_path`.
pub fn minimal_config(socket_path: &str) -> String {
    let socket_path = if socket_path.is_empty() {
        DEFAULT_SOCKET_PATH
    } else {
        socket_path
    };

    format!(
        "[unix_http_server]\n\
         file={socket_path}\n\
         chmod=0700\n\
         \n\
         [supervisord]\n\
         logfile=/tmp/supervisord.log\n\
         pidfile=/tmp/supervisord.pid\n\
         \n\
         [rpcinterface:supervisor]\n\
         supervisor.rpcinterface_factory = supervisor.rpcinterface:make_main_rpcinterface\n\
         \n\
         [supervisorctl]\n\
         serverurl=unix://{socket_path}\n"
    )
}

/// Fails with a remediation snippet when required sections are missing.
pub fn ensure_sections(path: &Path) -> Result<(), SupervisorError> {
    let missing = validate_sections(path)?;
    if missing.is_empty() {
        return Ok(());
    }

    let socket = detect_socket_path(Some(path));
    let snippet = minimal_config(socket.trim_start_matches("unix://"));
    Err(SupervisorError::Configuration {
        remediation: format!(
            "supervisord config is missing required sections: {}\n\n\
             Your config file needs these sections. Here's a minimal config to add:\n\n\
             {snippet}\n\
             Add this to the beginning of your config file: {}",
            missing.join(", "),
            path.display()
        ),
    })
}
