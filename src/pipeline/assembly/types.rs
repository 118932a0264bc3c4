//! Core types for the case assembling pipeline.
//!
//! These types model the full lifecycle of a run:
//! Listing → Classification → Registration → Resolution → Reconciliation → Packaging → Import.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::FileState;

// ═══════════════════════════════════════════
// Model part
// ═══════════════════════════════════════════

/// The four profile kinds that together form one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelPart {
    Eq,
    Ssh,
    Tp,
    Sv,
}

impl ModelPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ssh => "SSH",
            Self::Tp => "TP",
            Self::Sv => "SV",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EQ" => Some(Self::Eq),
            "SSH" => Some(Self::Ssh),
            "TP" => Some(Self::Tp),
            "SV" => Some(Self::Sv),
            _ => None,
        }
    }

    pub fn all() -> &'static [ModelPart] {
        &[Self::Eq, Self::Ssh, Self::Tp, Self::Sv]
    }
}

impl std::fmt::Display for ModelPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Authorization
// ═══════════════════════════════════════════

/// Sourcing actors and business processes accepted for this run.
/// Fetched once at the start of each run and passed explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationSets {
    pub actors: HashSet<String>,
    pub business_processes: HashSet<String>,
}

impl AuthorizationSets {
    pub fn new<A, B>(actors: A, business_processes: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            actors: actors.into_iter().map(Into::into).collect(),
            business_processes: business_processes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_authorized_actor(&self, actor: &str) -> bool {
        self.actors.contains(actor)
    }

    pub fn is_authorized_business_process(&self, business_process: &str) -> bool {
        self.business_processes.contains(business_process)
    }
}

// ═══════════════════════════════════════════
// Profile filename
// ═══════════════════════════════════════════

/// A validated profile filename:
/// `<capture>_<businessProcess>_<sourcingActor>_<modelPart>_<version>.zip`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFilename {
    pub capture_time: String,
    /// Empty only for EQ profiles.
    pub business_process: String,
    pub sourcing_actor: String,
    pub model_part: ModelPart,
    /// In `[1, 999]`, written with exactly three digits.
    pub version: u16,
}

impl ProfileFilename {
    /// SV profiles trigger the assembly of a case.
    pub fn is_composite_trigger(&self) -> bool {
        self.model_part == ModelPart::Sv
    }

    /// Name of the assembled case: the filename without its model-part segment.
    pub fn assembled_name(&self) -> String {
        format!(
            "{}_{}_{}_{:03}.zip",
            self.capture_time, self.business_process, self.sourcing_actor, self.version
        )
    }
}

// ═══════════════════════════════════════════
// File store / document parser
// ═══════════════════════════════════════════

/// A file as listed by the file store: its name and an opaque locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    pub locator: String,
}

impl ListedFile {
    pub fn new(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
        }
    }
}

/// Identity and dependencies read from a profile's content header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub document_id: String,
    pub dependency_ids: Vec<String>,
}

// ═══════════════════════════════════════════
// Ledger records
// ═══════════════════════════════════════════

/// Everything written to the ledger when a file is first handled.
#[derive(Debug, Clone)]
pub struct FileRegistration {
    pub filename: String,
    pub origin: String,
    pub document_id: String,
    pub dependency_ids: Vec<String>,
    pub handled_at: DateTime<Utc>,
}

/// Recorded dependencies of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyLookup {
    /// The document id was never registered.
    Unknown,
    /// Registered with zero dependencies.
    Leaf,
    /// Registered with these dependencies, in header order.
    Edges(Vec<String>),
}

impl DependencyLookup {
    /// Dependencies to expand. Empty for both terminal variants.
    pub fn children(&self) -> &[String] {
        match self {
            Self::Edges(ids) => ids,
            Self::Unknown | Self::Leaf => &[],
        }
    }
}

/// Resolved ids split by whether this origin holds a file for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDependencies {
    /// Filenames of the documents available in the file store.
    pub available: Vec<String>,
    /// Document ids with no file for this origin (boundary candidates).
    pub missing: Vec<String>,
}

// ═══════════════════════════════════════════
// Boundaries
// ═══════════════════════════════════════════

/// Reference data supplied by the boundary server, never persisted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryArtifact {
    pub id: String,
    pub filename: String,
    pub content: Vec<u8>,
}

/// Outcome of boundary reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryReconciliation {
    /// At least two boundaries to embed.
    Resolved(Vec<BoundaryArtifact>),
    /// Strict mode: some referenced boundaries could not be fetched.
    Unresolved { missing_ids: Vec<String> },
    /// Not enough boundaries, even after the latest-set fallback.
    Insufficient { found: usize },
}

/// A usable case needs an equipment and a topology boundary.
pub const REQUIRED_BOUNDARY_COUNT: usize = 2;

// ═══════════════════════════════════════════
// Packaging
// ═══════════════════════════════════════════

/// Result of the profile-kind coverage check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCoverage {
    Complete,
    Incomplete { missing: Vec<ModelPart> },
}

/// A case archive ready to be submitted.
#[derive(Debug, Clone)]
pub struct AssembledCase {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Base64 SHA-256 of `bytes`, for diagnostics.
    pub digest: String,
}

// ═══════════════════════════════════════════
// Run configuration and result
// ═══════════════════════════════════════════

/// Why a case could not be assembled during this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    IncompleteProfiles { missing: Vec<ModelPart> },
    UnresolvedBoundaries { missing_ids: Vec<String> },
    InsufficientBoundaries { found: usize },
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncompleteProfiles { missing } => {
                let parts: Vec<&str> = missing.iter().map(|p| p.as_str()).collect();
                write!(f, "incomplete profile set, missing {}", parts.join(", "))
            }
            Self::UnresolvedBoundaries { missing_ids } => {
                write!(f, "unresolved referenced boundaries: {}", missing_ids.join(", "))
            }
            Self::InsufficientBoundaries { found } => {
                write!(f, "only {found} boundaries available, {REQUIRED_BOUNDARY_COUNT} required")
            }
        }
    }
}

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Ledger origin of every file listed in `directory`.
    pub origin: String,
    pub directory: String,
    /// Require every referenced boundary; never fall back to the latest set.
    pub strict_mode: bool,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub files_listed: u32,
    pub files_rejected: u32,
    pub files_handled: Vec<String>,
    pub files_already_handled: Vec<String>,
    /// End state of every listed file.
    pub file_states: BTreeMap<String, FileState>,
    pub cases_imported: Vec<String>,
    pub cases_import_failed: Vec<String>,
    pub cases_already_imported: Vec<String>,
    pub cases_blocked: Vec<String>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn empty(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_part_round_trip() {
        for part in ModelPart::all() {
            assert_eq!(ModelPart::from_str(part.as_str()), Some(*part));
        }
        assert_eq!(ModelPart::from_str("eq"), None);
        assert_eq!(ModelPart::from_str("DL"), None);
    }

    #[test]
    fn model_part_serializes_uppercase() {
        let json = serde_json::to_string(&ModelPart::Ssh).unwrap();
        assert_eq!(json, "\"SSH\"");
    }

    #[test]
    fn assembled_name_drops_model_part() {
        let name = ProfileFilename {
            capture_time: "20191106T0930Z".into(),
            business_process: "1D".into(),
            sourcing_actor: "XX".into(),
            model_part: ModelPart::Sv,
            version: 1,
        };
        assert!(name.is_composite_trigger());
        assert_eq!(name.assembled_name(), "20191106T0930Z_1D_XX_001.zip");
    }

    #[test]
    fn assembled_name_keeps_actor_containing_sv() {
        let name = ProfileFilename {
            capture_time: "20191106T0930Z".into(),
            business_process: "1D".into(),
            sourcing_actor: "SVK".into(),
            model_part: ModelPart::Sv,
            version: 12,
        };
        assert_eq!(name.assembled_name(), "20191106T0930Z_1D_SVK_012.zip");
    }

    #[test]
    fn dependency_lookup_children() {
        assert!(DependencyLookup::Unknown.children().is_empty());
        assert!(DependencyLookup::Leaf.children().is_empty());
        let edges = DependencyLookup::Edges(vec!["a".into(), "b".into()]);
        assert_eq!(edges.children(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn block_reason_display() {
        let reason = BlockReason::IncompleteProfiles {
            missing: vec![ModelPart::Ssh, ModelPart::Tp],
        };
        assert_eq!(reason.to_string(), "incomplete profile set, missing SSH, TP");
        let reason = BlockReason::InsufficientBoundaries { found: 1 };
        assert!(reason.to_string().contains("only 1 boundaries"));
    }

    #[test]
    fn authorization_sets_membership() {
        let authz = AuthorizationSets::new(["XX"], ["1D", "2D"]);
        assert!(authz.is_authorized_actor("XX"));
        assert!(!authz.is_authorized_actor("YY"));
        assert!(authz.is_authorized_business_process("2D"));
        assert!(!authz.is_authorized_business_process(""));
    }

    #[test]
    fn run_summary_empty_keeps_run_id() {
        let summary = RunSummary::empty("run-1");
        assert_eq!(summary.run_id, "run-1");
        assert!(summary.errors.is_empty());
        assert_eq!(summary.files_listed, 0);
        assert!(summary.file_states.is_empty());
    }

    #[test]
    fn run_summary_serializes_file_states() {
        let mut summary = RunSummary::empty("run-1");
        summary.file_states.insert("a.zip".into(), FileState::Registered);
        summary.file_states.insert("readme.txt".into(), FileState::Rejected);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["file_states"]["a.zip"], "registered");
        assert_eq!(json["file_states"]["readme.txt"], "rejected");
    }
}
