//! PipelineOrchestrator: one batch pass over the file store.
//!
//! list → classify → register unhandled files → for each SV file not yet
//! imported: resolve → split → coverage gate → reconcile → package → submit.
//! Only `register` and `record_imported` write to the ledger, so a run can be
//! repeated at any time.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use super::boundary::BoundaryReconciler;
use super::classifier::parse_profile_filename;
use super::error::AssemblyError;
use super::header::unwrap_single_entry;
use super::packager::{check_profile_coverage, package};
use super::resolver::{resolve_transitive_set, split_by_origin};
use super::state::{CaseState, FileState};
use super::traits::*;
use super::types::*;

/// Borrowed collaborators of one run.
pub struct PipelineOrchestrator<'a> {
    ledger: &'a dyn Ledger,
    store: &'a dyn FileStore,
    parser: &'a dyn DocumentParser,
    boundaries: &'a dyn BoundaryService,
    authorization: &'a dyn AuthorizationSource,
    importer: &'a dyn CaseImportService,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(
        ledger: &'a dyn Ledger,
        store: &'a dyn FileStore,
        parser: &'a dyn DocumentParser,
        boundaries: &'a dyn BoundaryService,
        authorization: &'a dyn AuthorizationSource,
        importer: &'a dyn CaseImportService,
    ) -> Self {
        Self {
            ledger,
            store,
            parser,
            boundaries,
            authorization,
            importer,
        }
    }

    /// Run one pass. Only fatal errors (ledger, authorization) are returned;
    /// every other failure is logged, kept in the summary and retried on the
    /// next run.
    pub fn run(&self, settings: &RunSettings) -> Result<RunSummary, AssemblyError> {
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("assembling_run", run_id = %run_id, origin = %settings.origin);
        let _guard = span.enter();

        let mut summary = RunSummary::empty(&run_id);
        let authz = load_authorization(self.authorization)?;

        let listing = match self.store.list(&settings.directory) {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(directory = %settings.directory, error = %e, "Cannot list file store");
                summary.errors.push(e.to_string());
                summary.duration_ms = start.elapsed().as_millis() as u64;
                log_summary(&summary);
                return Ok(summary);
            }
        };
        summary.files_listed = listing.len() as u32;

        // Step 1: classify
        let mut valid: Vec<(&ListedFile, ProfileFilename)> = Vec::new();
        for file in &listing {
            if summary.file_states.contains_key(&file.name) {
                tracing::warn!(filename = %file.name, "File listed twice, keeping the first entry");
                continue;
            }
            match parse_profile_filename(&file.name, &authz) {
                Some(profile) => {
                    advance_file(&mut summary, &file.name, FileState::Classified)?;
                    valid.push((file, profile));
                }
                None => {
                    advance_file(&mut summary, &file.name, FileState::Rejected)?;
                    tracing::debug!(filename = %file.name, "Rejected filename");
                    summary.files_rejected += 1;
                }
            }
        }
        tracing::info!(
            valid = valid.len(),
            triggers = valid.iter().filter(|(_, p)| p.is_composite_trigger()).count(),
            "Valid files found on file store"
        );

        // Step 2: register unhandled files
        for (file, _) in &valid {
            if self.ledger.is_handled(&file.name, &settings.origin)? {
                summary.files_already_handled.push(file.name.clone());
                advance_file(&mut summary, &file.name, FileState::Registered)?;
                continue;
            }
            match self.handle_file(file, &settings.origin) {
                Ok(_) => {
                    summary.files_handled.push(file.name.clone());
                    advance_file(&mut summary, &file.name, FileState::Registered)?;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(filename = %file.name, origin = %settings.origin, error = %e, "Cannot handle file");
                    summary.errors.push(format!("{}: {e}", file.name));
                }
            }
        }

        // Step 3: assemble and forward cases
        let locators: HashMap<&str, &ListedFile> =
            valid.iter().map(|(f, _)| (f.name.as_str(), *f)).collect();

        for (file, profile) in valid.iter().filter(|(_, p)| p.is_composite_trigger()) {
            if self.ledger.is_imported(&file.name, &settings.origin)? {
                summary.cases_already_imported.push(file.name.clone());
                continue;
            }
            match self.assemble_case(file, profile, &authz, &locators, settings) {
                Ok(CaseState::Imported) => summary.cases_imported.push(file.name.clone()),
                Ok(CaseState::Blocked(reason)) => {
                    tracing::info!(filename = %file.name, reason = %reason, "Case not ready yet");
                    summary.cases_blocked.push(file.name.clone());
                }
                Ok(_) => summary.cases_import_failed.push(file.name.clone()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(filename = %file.name, origin = %settings.origin, error = %e, "Cannot assemble case");
                    summary.errors.push(format!("{}: {e}", file.name));
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        log_summary(&summary);
        Ok(summary)
    }

    /// Fetch, unwrap and parse a file, then register it with its edges.
    fn handle_file(&self, file: &ListedFile, origin: &str) -> Result<bool, AssemblyError> {
        tracing::info!(filename = %file.name, "Handling file");
        let raw = self.store.fetch(&file.name, &file.locator)?;
        let content = unwrap_single_entry(&file.name, &raw)?;
        let header = self.parser.parse(&content)?;

        let created = self.ledger.register(&FileRegistration {
            filename: file.name.clone(),
            origin: origin.to_string(),
            document_id: header.document_id.clone(),
            dependency_ids: header.dependency_ids,
            handled_at: Utc::now(),
        })?;
        tracing::debug!(filename = %file.name, document_id = %header.document_id, created, "File registered");
        Ok(created)
    }

    fn assemble_case(
        &self,
        trigger: &ListedFile,
        profile: &ProfileFilename,
        authz: &AuthorizationSets,
        locators: &HashMap<&str, &ListedFile>,
        settings: &RunSettings,
    ) -> Result<CaseState, AssemblyError> {
        let origin = settings.origin.as_str();
        let root = self
            .ledger
            .document_id_for(&trigger.name, origin)?
            .ok_or_else(|| AssemblyError::UnregisteredTrigger(trigger.name.clone()))?;

        let state = CaseState::Registered.transition(CaseState::DependencyResolving)?;
        let resolved = resolve_transitive_set(self.ledger, &root)?;
        let split = split_by_origin(self.ledger, &resolved, origin)?;
        tracing::debug!(
            filename = %trigger.name,
            available = ?split.available,
            missing = ?split.missing,
            "Dependencies resolved"
        );

        if let ProfileCoverage::Incomplete { missing } = check_profile_coverage(&split.available, authz) {
            return state.transition(CaseState::Blocked(BlockReason::IncompleteProfiles { missing }));
        }

        let reconciler = BoundaryReconciler::new(self.boundaries);
        let artifacts = match reconciler.reconcile(&split.missing, settings.strict_mode) {
            BoundaryReconciliation::Resolved(artifacts) => artifacts,
            BoundaryReconciliation::Unresolved { missing_ids } => {
                return state.transition(CaseState::Blocked(BlockReason::UnresolvedBoundaries {
                    missing_ids,
                }));
            }
            BoundaryReconciliation::Insufficient { found } => {
                return state.transition(CaseState::Blocked(BlockReason::InsufficientBoundaries {
                    found,
                }));
            }
        };
        let state = state.transition(CaseState::Ready)?;

        let profiles = split
            .available
            .iter()
            .map(|name| {
                locators
                    .get(name.as_str())
                    .map(|f| (*f).clone())
                    .ok_or_else(|| AssemblyError::FileStore {
                        filename: name.clone(),
                        reason: "no longer listed in the file store".into(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let state = state.transition(CaseState::AssemblyAttempted)?;
        let case = package(profile, &profiles, &artifacts, self.store)?;
        tracing::info!(case = %case.name, digest = %case.digest, profiles = profiles.len(), boundaries = artifacts.len(), "Submitting case");

        let accepted = match self.importer.submit(&case.name, &case.bytes) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(case = %case.name, error = %e, "Case import request failed");
                false
            }
        };
        if !accepted {
            return state.transition(CaseState::ImportFailed);
        }

        self.ledger.record_imported(&trigger.name, origin, Utc::now())?;
        state.transition(CaseState::Imported)
    }
}

/// Move a listed file to its next state, starting from `Discovered`.
fn advance_file(summary: &mut RunSummary, filename: &str, next: FileState) -> Result<(), AssemblyError> {
    let current = summary
        .file_states
        .get(filename)
        .copied()
        .unwrap_or(FileState::Discovered);
    summary
        .file_states
        .insert(filename.to_string(), current.transition(next)?);
    Ok(())
}

/// Job execution summary, one line per counter and one per file.
fn log_summary(summary: &RunSummary) {
    tracing::info!(
        run_id = %summary.run_id,
        listed = summary.files_listed,
        rejected = summary.files_rejected,
        handled = summary.files_handled.len(),
        already_handled = summary.files_already_handled.len(),
        imported = summary.cases_imported.len(),
        import_failed = summary.cases_import_failed.len(),
        already_imported = summary.cases_already_imported.len(),
        blocked = summary.cases_blocked.len(),
        errors = summary.errors.len(),
        duration_ms = summary.duration_ms,
        "Job execution summary"
    );
    for file in &summary.files_handled {
        tracing::info!(filename = %file, "File successfully handled");
    }
    for file in &summary.cases_imported {
        tracing::info!(filename = %file, "Assembled case successfully imported");
    }
    for file in &summary.cases_import_failed {
        tracing::info!(filename = %file, "Assembled case import failed");
    }
    if let Ok(json) = serde_json::to_string(summary) {
        tracing::debug!(summary = %json, "Run summary");
    }
}
