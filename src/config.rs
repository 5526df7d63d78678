//! Configuration management for supervisord program definitions.
//!
//! Only `[program:<name>]` sections are understood. Everything else in the
//! file is skipped on read and dropped on write, because [`Configuration::save`]
//! regenerates the whole file from the in-memory definitions.
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use tracing::debug;

use crate::{
    bytesize,
    envlist::{self, EnvMap},
    error::SupervisorError,
};

/// Declarative description of one supervised program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessDefinition {
    /// Unique key within a configuration.
    pub name: String,
    pub command: String,
    pub directory: String,
    pub user: String,
    pub autostart: bool,
    pub autorestart: bool,
    pub startsecs: u32,
    pub startretries: u32,
    pub stdout_logfile: String,
    pub stderr_logfile: String,
    pub stdout_logfile_maxbytes: u64,
    pub stdout_logfile_backups: u32,
    pub stderr_logfile_maxbytes: u64,
    pub stderr_logfile_backups: u32,
    pub environment: EnvMap,
    pub priority: i32,
    pub stopsignal: String,
    pub stopwaitsecs: u32,
}

impl ProcessDefinition {
    /// Creates an empty definition with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Applies a single `key=value` directive. Unknown keys are ignored.
    ///
    /// Integer values that fail to parse leave the field untouched.
    pub fn apply_directive(&mut self, key: &str, value: &str) {
        let value = value.trim();
        match key.trim() {
            "command" => self.command = value.to_string(),
            "directory" => self.directory = value.to_string(),
            "user" => self.user = value.to_string(),
            "autostart" => self.autostart = value.eq_ignore_ascii_case("true"),
            "autorestart" => self.autorestart = value.eq_ignore_ascii_case("true"),
            "startsecs" => set_number(&mut self.startsecs, value),
            "startretries" => set_number(&mut self.startretries, value),
            "stdout_logfile" => self.stdout_logfile = value.to_string(),
            "stderr_logfile" => self.stderr_logfile = value.to_string(),
            "stdout_logfile_maxbytes" => {
                self.stdout_logfile_maxbytes = bytesize::parse(value)
            }
            "stdout_logfile_backups" => set_number(&mut self.stdout_logfile_backups, value),
            "stderr_logfile_maxbytes" => {
                self.stderr_logfile_maxbytes = bytesize::parse(value)
            }
            "stderr_logfile_backups" => set_number(&mut self.stderr_logfile_backups, value),
            "environment" => envlist::parse(value, &mut self.environment),
            "priority" => set_number(&mut self.priority, value),
            "stopsignal" => self.stopsignal = value.to_string(),
            "stopwaitsecs" => set_number(&mut self.stopwaitsecs, value),
            other => debug!("ignoring unsupported directive '{other}' in [program:{}]", self.name),
        }
    }
}

fn set_number<T: FromStr>(field: &mut T, value: &str) {
    if let Ok(parsed) = value.parse::<T>() {
        *field = parsed;
    }
}

/// Renders the definition as a `[program:<name>]` block.
///
/// Empty strings and zero numbers are omitted; `autostart` and `autorestart`
/// are always written.
impl fmt::Display for ProcessDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[program:{}]", self.name)?;

        let text_fields = [
            ("command", &self.command),
            ("directory", &self.directory),
            ("user", &self.user),
        ];
        for (key, value) in text_fields {
            if !value.is_empty() {
                writeln!(f, "{key}={value}")?;
            }
        }

        writeln!(f, "autostart={}", self.autostart)?;
        writeln!(f, "autorestart={}", self.autorestart)?;
        if self.startsecs > 0 {
            writeln!(f, "startsecs={}", self.startsecs)?;
        }
        if self.startretries > 0 {
            writeln!(f, "startretries={}", self.startretries)?;
        }
        if !self.stdout_logfile.is_empty() {
            writeln!(f, "stdout_logfile={}", self.stdout_logfile)?;
        }
        if !self.stderr_logfile.is_empty() {
            writeln!(f, "stderr_logfile={}", self.stderr_logfile)?;
        }
        if self.stdout_logfile_maxbytes > 0 {
            writeln!(
                f,
                "stdout_logfile_maxbytes={}",
                bytesize::format(self.stdout_logfile_maxbytes)
            )?;
        }
        if self.stdout_logfile_backups > 0 {
            writeln!(f, "stdout_logfile_backups={}", self.stdout_logfile_backups)?;
        }
        if self.stderr_logfile_maxbytes > 0 {
            writeln!(
                f,
                "stderr_logfile_maxbytes={}",
                bytesize::format(self.stderr_logfile_maxbytes)
            )?;
        }
        if self.stderr_logfile_backups > 0 {
            writeln!(f, "stderr_logfile_backups={}", self.stderr_logfile_backups)?;
        }
        if !self.environment.is_empty() {
            writeln!(f, "environment={}", envlist::format(&self.environment))?;
        }
        if self.priority > 0 {
            writeln!(f, "priority={}", self.priority)?;
        }
        if !self.stopsignal.is_empty() {
            writeln!(f, "stopsignal={}", self.stopsignal)?;
        }
        if self.stopwaitsecs > 0 {
            writeln!(f, "stopwaitsecs={}", self.stopwaitsecs)?;
        }
        Ok(())
    }
}

/// Classification of a single trimmed config line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Line<'a> {
    Skip,
    Program(&'a str),
    Section(&'a str),
    Directive(&'a str, &'a str),
    Other,
}

impl<'a> Line<'a> {
    pub(crate) fn classify(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            return Line::Skip;
        }

        if let Some(name) = trimmed
            .strip_prefix("[program:")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return Line::Program(name.trim());
        }

        if let Some(section) = trimmed.strip_prefix('[') {
            return Line::Section(section.trim_end_matches(']').trim());
        }

        match trimmed.split_once('=') {
            Some((key, value)) => Line::Directive(key.trim(), value.trim()),
            None => Line::Other,
        }
    }
}

/// A supervisord configuration file reduced to its program definitions.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    /// File the configuration was loaded from and is saved back to.
    pub path: PathBuf,
    /// Definitions in first-seen order.
    pub programs: Vec<ProcessDefinition>,
    /// Lines of the file as originally read.
    pub raw_lines: Vec<String>,
}

impl Configuration {
    /// Creates an empty configuration bound to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Reads and parses the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SupervisorError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| SupervisorError::io(path, e))?;
        let config = Self::from_bytes(path, &bytes)?;
        debug!(
            "Loaded {} program(s) from {}",
            config.programs.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parses raw file contents.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Result<Self, SupervisorError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SupervisorError::Parse(format!("config is not valid UTF-8: {e}")))?;
        Self::parse(path, text)
    }

    /// Parses configuration text.
    ///
    /// Unknown directives and sections are ignored. An empty or repeated
    /// program name is the only fatal condition.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self, SupervisorError> {
        let mut config = Self::new(path);
        let mut current: Option<ProcessDefinition> = None;

        for (index, raw) in text.lines().enumerate() {
            config.raw_lines.push(raw.to_string());

            match Line::classify(raw) {
                Line::Program(name) => {
                    if let Some(done) = current.take() {
                        config.push_parsed(done)?;
                    }
                    if name.is_empty() {
                        return Err(SupervisorError::Parse(format!(
                            "line {}: program name is required",
                            index + 1
                        )));
                    }
                    current = Some(ProcessDefinition::new(name));
                }
                Line::Section(_) => {
                    if let Some(done) = current.take() {
                        config.push_parsed(done)?;
                    }
                }
                Line::Directive(key, value) => {
                    if let Some(program) = current.as_mut() {
                        program.apply_directive(key, value);
                    }
                }
                Line::Skip | Line::Other => {}
            }
        }

        if let Some(done) = current.take() {
            config.push_parsed(done)?;
        }

        Ok(config)
    }

    fn push_parsed(&mut self, program: ProcessDefinition) -> Result<(), SupervisorError> {
        if self.get(&program.name).is_some() {
            return Err(SupervisorError::Parse(format!(
                "duplicate program '{}'",
                program.name
            )));
        }
        self.programs.push(program);
        Ok(())
    }

    /// Renders every definition as a block, separated by blank lines.
    pub fn serialize(&self) -> String {
        self.programs
            .iter()
            .map(ProcessDefinition::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rewrites the file in full from the current definitions.
    pub fn save(&self) -> Result<(), SupervisorError> {
        fs::write(&self.path, self.serialize()).map_err(|e| SupervisorError::io(&self.path, e))
    }

    /// Returns the definition with exactly this name.
    pub fn get(&self, name: &str) -> Option<&ProcessDefinition> {
        self.programs.iter().find(|program| program.name == name)
    }

    /// Appends a new definition.
    pub fn add(&mut self, program: ProcessDefinition) -> Result<(), SupervisorError> {
        if self.get(&program.name).is_some() {
            return Err(SupervisorError::Validation(format!(
                "program '{}' already exists",
                program.name
            )));
        }
        self.programs.push(program);
        Ok(())
    }

    /// Replaces the definition named `original` in place.
    ///
    /// The replacement may carry a new name as long as it does not collide
    /// with another program. A missing `original` appends instead.
    pub fn update(
        &mut self,
        original: &str,
        program: ProcessDefinition,
    ) -> Result<(), SupervisorError> {
        if program.name != original && self.get(&program.name).is_some() {
            return Err(SupervisorError::Validation(format!(
                "program '{}' already exists",
                program.name
            )));
        }

        match self.programs.iter_mut().find(|p| p.name == original) {
            Some(slot) => *slot = program,
            None => self.programs.push(program),
        }
        Ok(())
    }

    /// Removes the named definition, returning whether it existed.
    pub fn delete(&mut self, name: &str) -> bool {
        let before = self.programs.len();
        self.programs.retain(|program| program.name != name);
        self.programs.len() != before
    }
}
