//! Explicit per-run state model.
//!
//! Nothing here is persisted: each run recomputes states from the ledger's
//! handled and imported records. The enums make the run's decisions
//! checkable and keep illegal jumps out of the orchestrator.

use serde::Serialize;

use super::error::AssemblyError;
use super::types::BlockReason;

// ═══════════════════════════════════════════
// Candidate file
// ═══════════════════════════════════════════

/// Lifecycle of a listed file within one run. A file left in `Classified`
/// could not be registered and is retried on the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Discovered,
    Classified,
    Rejected,
    Registered,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Classified => "classified",
            Self::Rejected => "rejected",
            Self::Registered => "registered",
        }
    }

    pub fn can_transition_to(&self, next: FileState) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Classified)
                | (Self::Discovered, Self::Rejected)
                | (Self::Classified, Self::Registered)
        )
    }

    pub fn transition(self, next: FileState) -> Result<FileState, AssemblyError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(invalid(self.as_str(), next.as_str()))
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Registered)
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Composite trigger (SV file)
// ═══════════════════════════════════════════

/// Lifecycle of a registered SV file within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseState {
    Registered,
    DependencyResolving,
    Blocked(BlockReason),
    Ready,
    AssemblyAttempted,
    Imported,
    ImportFailed,
}

impl CaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::DependencyResolving => "dependency_resolving",
            Self::Blocked(_) => "blocked",
            Self::Ready => "ready",
            Self::AssemblyAttempted => "assembly_attempted",
            Self::Imported => "imported",
            Self::ImportFailed => "import_failed",
        }
    }

    pub fn can_transition_to(&self, next: &CaseState) -> bool {
        matches!(
            (self, next),
            (Self::Registered, Self::DependencyResolving)
                | (Self::DependencyResolving, Self::Blocked(_))
                | (Self::DependencyResolving, Self::Ready)
                | (Self::Ready, Self::AssemblyAttempted)
                | (Self::AssemblyAttempted, Self::Imported)
                | (Self::AssemblyAttempted, Self::ImportFailed)
        )
    }

    pub fn transition(self, next: CaseState) -> Result<CaseState, AssemblyError> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err(invalid(self.as_str(), next.as_str()))
        }
    }

    /// Only `Imported` is remembered by the ledger; every other end state
    /// is recomputed on the next run.
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Imported)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Blocked(_) | Self::Imported | Self::ImportFailed
        )
    }
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocked(reason) => write!(f, "blocked ({reason})"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

fn invalid(from: &str, to: &str) -> AssemblyError {
    AssemblyError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
    }
}
