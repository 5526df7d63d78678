//! Merging runtime records with config definitions.
use crate::{
    config::{Configuration, ProcessDefinition},
    status::RuntimeRecord,
};

/// A runtime record joined with its definition, if one matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub record: RuntimeRecord,
    pub definition: Option<ProcessDefinition>,
}

impl Process {
    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn is_running(&self) -> bool {
        self.record.is_running()
    }

    pub fn is_stopped(&self) -> bool {
        self.record.is_stopped()
    }
}

/// Finds the definition for a reported name: exact match first, then
/// case-insensitive, first in definition order.
pub fn find_definition<'a>(config: &'a Configuration, name: &str) -> Option<&'a ProcessDefinition> {
    config.get(name).or_else(|| {
        config
            .programs
            .iter()
            .find(|program| program.name.to_lowercase() == name.to_lowercase())
    })
}

/// Builds the merged view, one entry per runtime record.
///
/// Definitions the daemon does not report are left out.
pub fn merge(records: Vec<RuntimeRecord>, config: &Configuration) -> Vec<Process> {
    records
        .into_iter()
        .map(|record| Process {
            definition: find_definition(config, &record.name).cloned(),
            record,
        })
        .collect()
}
