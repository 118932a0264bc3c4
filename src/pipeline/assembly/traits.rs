//! Trait definitions for the case assembling pipeline.
//!
//! Six traits define the boundaries between the pipeline and its collaborators:
//! - Ledger: durable memory of handled files, imported cases and dependency edges
//! - FileStore: listing and fetching profile files
//! - DocumentParser: identity and dependencies of a profile
//! - BoundaryService: boundary lookups by id and latest set
//! - AuthorizationSource: authorized actors and business processes
//! - CaseImportService: forwarding of assembled cases

use chrono::{DateTime, Utc};

use super::error::AssemblyError;
use super::types::*;
use crate::db::DatabaseError;

/// Append-only ledger. Every key is scoped by origin except dependency edges,
/// which belong to the document id itself.
pub trait Ledger: Send {
    fn is_handled(&self, filename: &str, origin: &str) -> Result<bool, DatabaseError>;

    fn is_imported(&self, filename: &str, origin: &str) -> Result<bool, DatabaseError>;

    /// Record a handled file, its id mapping and its dependency edges.
    /// Returns false when `(filename, origin)` was already registered.
    fn register(&self, registration: &FileRegistration) -> Result<bool, DatabaseError>;

    fn record_imported(
        &self,
        filename: &str,
        origin: &str,
        imported_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    fn dependencies_of(&self, document_id: &str) -> Result<DependencyLookup, DatabaseError>;

    fn document_id_for(&self, filename: &str, origin: &str)
        -> Result<Option<String>, DatabaseError>;

    fn filename_for(&self, document_id: &str, origin: &str)
        -> Result<Option<String>, DatabaseError>;
}

/// Remote store where profile files are deposited.
pub trait FileStore: Send {
    /// List the files of a directory.
    fn list(&self, directory: &str) -> Result<Vec<ListedFile>, AssemblyError>;

    /// Fetch the raw bytes of a listed file.
    fn fetch(&self, filename: &str, locator: &str) -> Result<Vec<u8>, AssemblyError>;
}

/// Reads the identity header of a decompressed profile.
pub trait DocumentParser: Send {
    fn parse(&self, content: &[u8]) -> Result<DocumentHeader, AssemblyError>;
}

/// External source of boundary artifacts.
pub trait BoundaryService: Send {
    /// `Ok(None)` when the server does not know the id.
    fn get_by_id(&self, id: &str) -> Result<Option<BoundaryArtifact>, AssemblyError>;

    /// Most recent boundary set, possibly empty.
    fn get_latest_set(&self) -> Result<Vec<BoundaryArtifact>, AssemblyError>;
}

/// Source of the authorization sets, refreshed once per run.
pub trait AuthorizationSource: Send {
    fn list_authorized_actors(&self) -> Result<Vec<String>, AssemblyError>;

    fn list_authorized_business_processes(&self) -> Result<Vec<String>, AssemblyError>;
}

/// Downstream service receiving assembled cases.
pub trait CaseImportService: Send {
    /// `Ok(false)` when the service refused the case.
    fn submit(&self, archive_name: &str, archive: &[u8]) -> Result<bool, AssemblyError>;
}

/// Fetch both authorization sets for a run. Any failure is an
/// `Authorization` error, which aborts the run.
pub fn load_authorization(
    source: &dyn AuthorizationSource,
) -> Result<AuthorizationSets, AssemblyError> {
    let actors = source
        .list_authorized_actors()
        .map_err(|e| AssemblyError::Authorization(format!("actors: {e}")))?;
    let business_processes = source
        .list_authorized_business_processes()
        .map_err(|e| AssemblyError::Authorization(format!("business processes: {e}")))?;
    Ok(AuthorizationSets::new(actors, business_processes))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify traits are object-safe (can be used as `dyn Trait`)
    #[test]
    fn traits_are_object_safe() {
        fn _assert_ledger(_: &dyn Ledger) {}
        fn _assert_store(_: &dyn FileStore) {}
        fn _assert_parser(_: &dyn DocumentParser) {}
        fn _assert_boundaries(_: &dyn BoundaryService) {}
        fn _assert_authorization(_: &dyn AuthorizationSource) {}
        fn _assert_import(_: &dyn CaseImportService) {}
    }

    struct StaticAuthorization;

    impl AuthorizationSource for StaticAuthorization {
        fn list_authorized_actors(&self) -> Result<Vec<String>, AssemblyError> {
            Ok(vec!["XX".into(), "RTEFRANCE".into()])
        }

        fn list_authorized_business_processes(&self) -> Result<Vec<String>, AssemblyError> {
            Ok(vec!["1D".into()])
        }
    }

    struct DownAuthorization;

    impl AuthorizationSource for DownAuthorization {
        fn list_authorized_actors(&self) -> Result<Vec<String>, AssemblyError> {
            Err(AssemblyError::ServiceStatus {
                service: "cgmes-boundary-server",
                status: 502,
            })
        }

        fn list_authorized_business_processes(&self) -> Result<Vec<String>, AssemblyError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn authorization_failure_is_fatal() {
        let err = load_authorization(&DownAuthorization).unwrap_err();
        assert!(matches!(err, AssemblyError::Authorization(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn load_authorization_collects_both_sets() {
        let authz = load_authorization(&StaticAuthorization).unwrap();
        assert_eq!(authz.actors.len(), 2);
        assert!(authz.is_authorized_actor("RTEFRANCE"));
        assert!(authz.is_authorized_business_process("1D"));
    }
}
