//! Boundary reconciliation: referenced boundaries first, latest set as fallback.

use std::collections::HashSet;

use super::traits::BoundaryService;
use super::types::{BoundaryArtifact, BoundaryReconciliation, REQUIRED_BOUNDARY_COUNT};

/// Decides which boundary artifacts go into a case.
pub struct BoundaryReconciler<'a> {
    service: &'a dyn BoundaryService,
}

impl<'a> BoundaryReconciler<'a> {
    pub fn new(service: &'a dyn BoundaryService) -> Self {
        Self { service }
    }

    /// Look up every missing id. With fewer than two artifacts found, strict
    /// mode stops when a referenced boundary failed to resolve; otherwise the
    /// latest published set is used instead.
    pub fn reconcile(&self, missing_ids: &[String], strict_mode: bool) -> BoundaryReconciliation {
        let mut found: Vec<BoundaryArtifact> = Vec::new();
        let mut unresolved: Vec<String> = Vec::new();
        let mut requested = HashSet::new();

        for id in missing_ids {
            if !requested.insert(id.as_str()) {
                continue;
            }
            match self.service.get_by_id(id) {
                Ok(Some(artifact)) => {
                    if !found.iter().any(|a| a.id == artifact.id) {
                        found.push(artifact);
                    }
                }
                Ok(None) => {
                    tracing::info!(boundary_id = %id, "Referenced boundary not found");
                    unresolved.push(id.clone());
                }
                Err(e) => {
                    tracing::warn!(boundary_id = %id, error = %e, "Boundary lookup failed");
                    unresolved.push(id.clone());
                }
            }
        }

        if found.len() >= REQUIRED_BOUNDARY_COUNT {
            return BoundaryReconciliation::Resolved(found);
        }

        if strict_mode && !unresolved.is_empty() {
            return BoundaryReconciliation::Unresolved {
                missing_ids: unresolved,
            };
        }

        tracing::info!(
            found = found.len(),
            "Not enough referenced boundaries, using the latest boundary set"
        );
        let latest = match self.service.get_latest_set() {
            Ok(set) => dedup_by_id(set),
            Err(e) => {
                tracing::warn!(error = %e, "Latest boundary set lookup failed");
                Vec::new()
            }
        };

        if latest.len() < REQUIRED_BOUNDARY_COUNT {
            return BoundaryReconciliation::Insufficient {
                found: latest.len(),
            };
        }
        BoundaryReconciliation::Resolved(latest)
    }
}

fn dedup_by_id(artifacts: Vec<BoundaryArtifact>) -> Vec<BoundaryArtifact> {
    let mut seen = HashSet::new();
    artifacts
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect()
}
