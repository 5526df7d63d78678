//! supervisord-tui keeps a terminal view of a local supervisord in step with
//! its configuration file. It merges the daemon's live status with the
//! `[program:x]` definitions on disk, drives start/stop/restart through
//! `supervisorctl`, and applies add/edit/delete changes to the config file
//! followed by `reread` and `update`.

/// Human-readable byte sizes ("50MB").
pub mod bytesize;

/// CLI interface.
pub mod cli;

/// Configuration file model and INI codec.
pub mod config;

/// Defaults and well-known paths.
pub mod constants;

/// Edit buffer text for a single program.
pub mod editor;

/// `environment=` list codec.
pub mod envlist;

/// Error handling.
pub mod error;

/// `supervisorctl` command gateway.
pub mod gateway;

/// Config file discovery and control-section checks.
pub mod locate;

/// Log tails.
pub mod logs;

/// Joins runtime records with their definitions.
pub mod reconcile;

/// Interactive session state.
pub mod session;

/// Status line parsing.
pub mod status;

/// Scripted command runner and helpers for tests.
pub mod test_utils;

/// Edit transactions.
pub mod transaction;

/// Terminal front end.
pub mod tui;
