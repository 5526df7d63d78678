//! Text form of a single program definition, as shown in the edit buffer.
use crate::{
    config::{Line, ProcessDefinition},
    error::SupervisorError,
};

const TEMPLATE: &str = "\
[program:process-name]
command=/path/to/command
directory=/path/to/directory
user=nobody
autostart=true
autorestart=true
startsecs=10
startretries=3
stdout_logfile=/var/log/process.log
stderr_logfile=/var/log/process-error.log
stdout_logfile_maxbytes=1MB
stdout_logfile_backups=10
stderr_logfile_maxbytes=1MB
stderr_logfile_backups=10
environment=KEY1=value1,KEY2=value2
priority=999
stopsignal=TERM
stopwaitsecs=30
";

/// Starting text for a new program.
pub fn template_text() -> &'static str {
    TEMPLATE
}

/// Definition offered when editing a running process that has no config entry.
pub fn default_definition(name: &str) -> ProcessDefinition {
    ProcessDefinition {
        autostart: true,
        autorestart: true,
        startsecs: 10,
        startretries: 3,
        stdout_logfile_maxbytes: 1024 * 1024,
        stdout_logfile_backups: 10,
        stderr_logfile_maxbytes: 1024 * 1024,
        stderr_logfile_backups: 10,
        priority: 999,
        stopsignal: "TERM".to_string(),
        stopwaitsecs: 30,
        ..ProcessDefinition::new(name)
    }
}

/// Renders an existing definition for editing.
pub fn definition_text(definition: &ProcessDefinition) -> String {
    definition.to_string()
}

/// Parses the edit buffer back into a definition.
///
/// Only the first `[program:...]` block is read; text before it is ignored
/// and the next section header ends it.
pub fn parse_definition_text(text: &str) -> Result<ProcessDefinition, SupervisorError> {
    if text.trim().is_empty() {
        return Err(SupervisorError::Parse(
            "configuration cannot be empty".to_string(),
        ));
    }

    let mut definition: Option<ProcessDefinition> = None;
    for raw in text.lines() {
        match Line::classify(raw) {
            Line::Program(name) if definition.is_none() => {
                definition = Some(ProcessDefinition::new(name))
            }
            Line::Program(_) | Line::Section(_) if definition.is_some() => break,
            Line::Directive(key, value) => {
                if let Some(current) = definition.as_mut() {
                    current.apply_directive(key, value);
                }
            }
            _ => {}
        }
    }

    definition
        .filter(|definition| !definition.name.is_empty())
        .ok_or_else(|| SupervisorError::Parse("program name is required".to_string()))
}
