//! Error types for the case assembling pipeline.
//!
//! Rejected filenames and incomplete cases are not errors: the classifier
//! returns `None` and incomplete cases end in `CaseState::Blocked`.

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] DatabaseError),

    #[error("File store error on '{filename}': {reason}")]
    FileStore { filename: String, reason: String },

    #[error("Archive error on '{filename}': {reason}")]
    Archive { filename: String, reason: String },

    #[error("Invalid model header: {0}")]
    Header(String),

    #[error("HTTP error calling {service}: {reason}")]
    Http { service: &'static str, reason: String },

    #[error("{service} answered with status {status}")]
    ServiceStatus { service: &'static str, status: u16 },

    #[error("Cannot fetch authorization sets: {0}")]
    Authorization(String),

    #[error("Dependency cycle detected: {}", cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    #[error("Composite trigger '{0}' has no ledger record")]
    UnregisteredTrigger(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssemblyError {
    /// Fatal errors abort the whole run; every other error only skips the
    /// current file or case, which is retried on the next run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Ledger(_) | Self::Authorization(_))
    }
}
