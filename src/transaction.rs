//! The "apply configuration change" transaction.
//!
//! Steps run in order: validate, persist, reload, notify (`reread`) and
//! activate (`update`). Nothing is rolled back. A failure after the file was
//! written leaves the file, the in-memory configuration and the daemon
//! possibly out of step until the next successful transaction.
use tracing::{debug, info, warn};

use crate::{
    config::{Configuration, ProcessDefinition},
    error::{SupervisorError, TransactionError},
    gateway::{CommandRunner, Gateway},
};

/// A configuration change requested by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Add a brand new program.
    Add(ProcessDefinition),
    /// Replace the program currently named `original`.
    Update {
        original: String,
        definition: ProcessDefinition,
    },
    /// Remove the named program.
    Delete(String),
}

impl Edit {
    /// Name whose process group `update` should target; empty means all.
    ///
    /// A rename touches two groups, the removed old one and the added new
    /// one, so it activates everything like a delete does.
    fn activation_scope(&self) -> &str {
        match self {
            Edit::Update {
                original,
                definition,
            } if *original != definition.name => "",
            Edit::Add(definition) | Edit::Update { definition, .. } => &definition.name,
            Edit::Delete(_) => "",
        }
    }

    /// The program to select once the change is live.
    pub fn affected_name(&self) -> Option<&str> {
        match self {
            Edit::Add(definition) | Edit::Update { definition, .. } => Some(&definition.name),
            Edit::Delete(_) => None,
        }
    }
}

/// Where a transaction currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxState {
    Editing,
    Validating,
    Persisting,
    Reloading,
    Notifying,
    Activating,
    Done,
    Failed,
}

/// One run of the apply sequence for a single [`Edit`].
#[derive(Debug)]
pub struct EditTransaction {
    edit: Edit,
    state: TxState,
    history: Vec<TxState>,
}

impl EditTransaction {
    pub fn new(edit: Edit) -> Self {
        Self {
            edit,
            state: TxState::Editing,
            history: vec![TxState::Editing],
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Every state entered so far, starting with `Editing`.
    pub fn history(&self) -> &[TxState] {
        &self.history
    }

    pub fn edit(&self) -> &Edit {
        &self.edit
    }

    fn enter(&mut self, state: TxState) {
        debug!("Edit transaction: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.history.push(state);
    }

    fn fail(&mut self, step: TxState, source: SupervisorError) -> TransactionError {
        warn!("Edit transaction failed while {step:?}: {source}");
        self.enter(TxState::Failed);
        TransactionError { step, source }
    }

    /// Runs every step against `config` and the daemon.
    ///
    /// Validation failures return the transaction to `Editing` without side
    /// effects. Any later failure moves it to `Failed`, keeping whatever was
    /// already applied to `config`.
    pub fn execute<R: CommandRunner>(
        &mut self,
        config: &mut Configuration,
        gateway: &Gateway<R>,
    ) -> Result<(), TransactionError> {
        self.enter(TxState::Validating);
        if let Err(err) = self.validate(config) {
            warn!("Rejected edit: {err}");
            self.enter(TxState::Editing);
            return Err(TransactionError {
                step: TxState::Validating,
                source: err,
            });
        }

        self.enter(TxState::Persisting);
        if let Err(err) = self.apply(config).and_then(|()| config.save()) {
            return Err(self.fail(TxState::Persisting, err));
        }

        self.enter(TxState::Reloading);
        match Configuration::load(&config.path) {
            Ok(reloaded) => *config = reloaded,
            Err(err) => return Err(self.fail(TxState::Reloading, err)),
        }

        self.enter(TxState::Notifying);
        if let Err(err) = gateway.reread() {
            return Err(self.fail(TxState::Notifying, err));
        }

        self.enter(TxState::Activating);
        if let Err(err) = gateway.update(self.edit.activation_scope()) {
            return Err(self.fail(TxState::Activating, err));
        }

        self.enter(TxState::Done);
        info!("Applied {:?} to {}", self.edit, config.path.display());
        Ok(())
    }

    fn validate(&self, config: &Configuration) -> Result<(), SupervisorError> {
        match &self.edit {
            Edit::Add(definition) => {
                require_name(definition)?;
                if config.get(&definition.name).is_some() {
                    return Err(SupervisorError::Validation(format!(
                        "program '{}' already exists",
                        definition.name
                    )));
                }
            }
            Edit::Update {
                original,
                definition,
            } => {
                require_name(definition)?;
                if &definition.name != original && config.get(&definition.name).is_some() {
                    return Err(SupervisorError::Validation(format!(
                        "program '{}' already exists",
                        definition.name
                    )));
                }
            }
            Edit::Delete(name) => {
                if name.trim().is_empty() {
                    return Err(SupervisorError::Validation(
                        "program name is required".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn apply(&self, config: &mut Configuration) -> Result<(), SupervisorError> {
        match &self.edit {
            Edit::Add(definition) => config.add(definition.clone()),
            Edit::Update {
                original,
                definition,
            } => config.update(original, definition.clone()),
            Edit::Delete(name) => {
                if !config.delete(name) {
                    debug!("Program '{name}' was not in the config; rewriting anyway");
                }
                Ok(())
            }
        }
    }
}

fn require_name(definition: &ProcessDefinition) -> Result<(), SupervisorError> {
    if definition.name.trim().is_empty() {
        return Err(SupervisorError::Validation(
            "program name is required".to_string(),
        ));
    }
    Ok(())
}
