//! Case packaging: profile coverage gate and archive assembly.

use std::collections::{BTreeSet, HashSet};
use std::io::{Cursor, Write};

use base64::Engine;
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::classifier::classify;
use super::error::AssemblyError;
use super::header::unwrap_single_entry;
use super::traits::FileStore;
use super::types::*;

/// Check that the available files cover every model part.
/// Pure: evaluated before any packaging I/O.
pub fn check_profile_coverage(available: &[String], authz: &AuthorizationSets) -> ProfileCoverage {
    let present: BTreeSet<ModelPart> = available
        .iter()
        .filter_map(|name| classify(name, authz))
        .collect();

    let missing: Vec<ModelPart> = ModelPart::all()
        .iter()
        .copied()
        .filter(|part| !present.contains(part))
        .collect();

    if missing.is_empty() {
        ProfileCoverage::Complete
    } else {
        ProfileCoverage::Incomplete { missing }
    }
}

/// Entry name of a profile inside the case archive.
pub fn profile_entry_name(filename: &str) -> String {
    match filename.strip_suffix(".zip") {
        Some(stem) => format!("{stem}.xml"),
        None => filename.to_string(),
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Build the case archive: boundaries verbatim, then each profile fetched
/// from the store and decompressed.
pub fn package(
    trigger: &ProfileFilename,
    profiles: &[ListedFile],
    boundaries: &[BoundaryArtifact],
    store: &dyn FileStore,
) -> Result<AssembledCase, AssemblyError> {
    let name = trigger.assembled_name();
    let archive_error = |reason: String| AssemblyError::Archive {
        filename: name.clone(),
        reason,
    };

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries: HashSet<String> = HashSet::new();

    for boundary in boundaries {
        if !entries.insert(boundary.filename.clone()) {
            tracing::debug!(boundary = %boundary.filename, "Boundary already in archive");
            continue;
        }
        writer
            .start_file(boundary.filename.as_str(), entry_options())
            .map_err(|e| archive_error(e.to_string()))?;
        writer
            .write_all(&boundary.content)
            .map_err(|e| archive_error(e.to_string()))?;
    }

    for profile in profiles {
        let entry_name = profile_entry_name(&profile.name);
        if !entries.insert(entry_name.clone()) {
            continue;
        }
        let raw = store.fetch(&profile.name, &profile.locator)?;
        let content = unwrap_single_entry(&profile.name, &raw)?;
        writer
            .start_file(entry_name.as_str(), entry_options())
            .map_err(|e| archive_error(e.to_string()))?;
        writer
            .write_all(&content)
            .map_err(|e| archive_error(e.to_string()))?;
    }

    let bytes = writer
        .finish()
        .map_err(|e| archive_error(e.to_string()))?
        .into_inner();
    let digest = base64::engine::general_purpose::STANDARD.encode(Sha256::digest(&bytes));

    tracing::debug!(
        case = %name,
        entries = entries.len(),
        size = bytes.len(),
        digest = %digest,
        "Case archive assembled"
    );

    Ok(AssembledCase {
        name,
        bytes,
        digest,
    })
}
