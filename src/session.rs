//! Interactive session state: the merged process list, selection and the
//! operations the front end triggers.
//!
//! Everything runs on the caller's thread. Polls, control commands and edit
//! transactions all take `&mut self`, so only one of them can be in flight.
use std::path::Path;

use tracing::{debug, info, warn};

use crate::{
    config::Configuration,
    error::{SupervisorError, TransactionError},
    gateway::{CommandRunner, Gateway, SystemRunner},
    locate,
    reconcile::{Process, merge},
    transaction::{Edit, EditTransaction},
};

/// Process control actions available on the selected process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Restart,
}

/// Live view of one supervisord instance.
#[derive(Debug)]
pub struct Session<R = SystemRunner> {
    gateway: Gateway<R>,
    config: Configuration,
    processes: Vec<Process>,
    selected: usize,
    last_error: Option<String>,
    message: Option<String>,
}

impl<R: CommandRunner> Session<R> {
    /// Loads the config at `config_path` and takes the first status snapshot.
    ///
    /// A missing file, missing control sections, an unreadable config or a
    /// failed initial status fetch are all fatal.
    pub fn open(config_path: &Path, gateway: Gateway<R>) -> Result<Self, SupervisorError> {
        if !config_path.is_file() {
            return Err(SupervisorError::ConfigMissing(config_path.to_path_buf()));
        }
        locate::ensure_sections(config_path)?;

        let config = Configuration::load(config_path)?;
        let gateway = gateway.with_config_path(config_path);
        let records = gateway.get_status()?;
        info!(
            "Session opened with {} program(s) and {} reported process(es)",
            config.programs.len(),
            records.len()
        );

        let processes = merge(records, &config);
        Ok(Self {
            gateway,
            config,
            processes,
            selected: 0,
            last_error: None,
            message: None,
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn gateway(&self) -> &Gateway<R> {
        &self.gateway
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Process> {
        self.processes.get(self.selected)
    }

    /// The most recent poll or control failure, cleared by the next good poll.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Transient feedback from the last successful action.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    pub fn select(&mut self, index: usize) {
        self.selected = index.min(self.processes.len().saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        self.select(self.selected.saturating_add(1));
    }

    pub fn select_previous(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }

    /// Moves the selection to the process called `name`, if listed.
    pub fn select_name(&mut self, name: &str) -> bool {
        match self.processes.iter().position(|p| p.name() == name) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    /// Refreshes runtime records, reloads the config and rebuilds the view.
    ///
    /// Failures are kept in [`Session::last_error`] and the previous view
    /// stays in place.
    pub fn poll(&mut self) {
        let records = match self.gateway.get_status() {
            Ok(records) => records,
            Err(err) => {
                warn!("Status poll failed: {err}");
                self.last_error = Some(err.to_string());
                return;
            }
        };

        match Configuration::load(&self.config.path) {
            Ok(config) => self.config = config,
            Err(err) => warn!("Keeping previous config, reload failed: {err}"),
        }

        let selected_name = self.selected().map(|p| p.name().to_string());
        self.processes = merge(records, &self.config);
        self.last_error = None;
        debug!("Poll merged {} process(es)", self.processes.len());

        let reselected = selected_name.is_some_and(|name| self.select_name(&name));
        if !reselected {
            self.select(self.selected);
        }
    }

    /// Rebuilds the view from the last runtime records and the current config.
    fn remerge(&mut self) {
        let records = self.processes.iter().map(|p| p.record.clone()).collect();
        self.processes = merge(records, &self.config);
        self.select(self.selected);
    }

    /// Runs `action` on the selected process, then polls.
    pub fn control_selected(&mut self, action: Action) -> Result<(), SupervisorError> {
        let Some(name) = self.selected().map(|p| p.name().to_string()) else {
            return Ok(());
        };

        let (result, verb) = match action {
            Action::Start => (self.gateway.start(&name), "Started"),
            Action::Stop => (self.gateway.stop(&name), "Stopped"),
            Action::Restart => (self.gateway.restart(&name), "Restarted"),
        };

        if let Err(err) = result {
            self.last_error = Some(err.to_string());
            return Err(err);
        }

        self.message = Some(format!("{verb} {name}"));
        self.poll();
        Ok(())
    }

    /// Applies an edit through the full transaction.
    ///
    /// On success the view is refreshed and the affected program selected.
    /// On failure the error is returned for the editor to show; the
    /// configuration keeps whatever the transaction got through and the view
    /// is rebuilt against it.
    pub fn apply(&mut self, edit: Edit) -> Result<(), TransactionError> {
        let mut transaction = EditTransaction::new(edit);
        if let Err(err) = transaction.execute(&mut self.config, &self.gateway) {
            if !err.is_validation() {
                self.remerge();
            }
            return Err(err);
        }

        self.message = Some(match transaction.edit() {
            Edit::Add(definition) => format!("Added {}", definition.name),
            Edit::Update { definition, .. } => format!("Saved {}", definition.name),
            Edit::Delete(name) => format!("Deleted {name}"),
        });

        self.poll();
        if let Some(name) = transaction.edit().affected_name() {
            self.select_name(name);
        }
        Ok(())
    }
}
