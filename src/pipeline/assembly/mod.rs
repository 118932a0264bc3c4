//! CGMES Case Assembling Pipeline
//!
//! Acquires profile files (EQ, SSH, TP, SV) deposited on a file store,
//! works out which files form a complete case, assembles the case archive
//! and forwards it to the case server, exactly once per case.
//!
//! ## Architecture
//!
//! ```text
//! FileStore → Classifier → Ledger ← Resolver → BoundaryReconciler → Packager → CaseImportService
//! ```
//!
//! The ledger's handled and imported records are the only durable state.
//! Every run recomputes readiness from them, so runs can be repeated on any
//! schedule.

pub mod error;
pub mod types;
pub mod traits;
pub mod classifier;
pub mod ledger;
pub mod resolver;
pub mod boundary;
pub mod header;
pub mod packager;
pub mod state;
pub mod orchestrator;
pub mod file_store;
pub mod http;
pub mod schedule;

pub use error::AssemblyError;
pub use types::*;
pub use traits::*;
pub use classifier::{classify, parse_profile_filename};
pub use ledger::SqliteLedger;
pub use resolver::{resolve_transitive_set, split_by_origin};
pub use boundary::BoundaryReconciler;
pub use header::{unwrap_single_entry, FullModelHeaderParser};
pub use packager::{check_profile_coverage, package};
pub use state::{CaseState, FileState};
pub use orchestrator::PipelineOrchestrator;
pub use file_store::LocalDirectoryStore;
pub use http::{HttpBoundaryService, HttpCaseImportService};
pub use schedule::{start_scheduler, ScheduleHandle};
