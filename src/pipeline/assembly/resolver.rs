//! Dependency tree resolution over the ledger's edges.

use std::collections::HashSet;

use super::error::AssemblyError;
use super::traits::Ledger;
use super::types::ResolvedDependencies;

/// Every document id reachable from `root`, root first, depth-first.
///
/// Ids reached through several parents appear once per encounter.
/// `Unknown` and `Leaf` documents both end their branch. Reaching an id
/// already on the current path fails with `DependencyCycle`.
pub fn resolve_transitive_set(
    ledger: &dyn Ledger,
    root: &str,
) -> Result<Vec<String>, AssemblyError> {
    let mut ordered = Vec::new();
    let mut visiting = HashSet::new();
    let mut path = Vec::new();
    resolve_dfs(ledger, root, &mut visiting, &mut path, &mut ordered)?;
    Ok(ordered)
}

fn resolve_dfs(
    ledger: &dyn Ledger,
    id: &str,
    visiting: &mut HashSet<String>,
    path: &mut Vec<String>,
    ordered: &mut Vec<String>,
) -> Result<(), AssemblyError> {
    if visiting.contains(id) {
        let start = path.iter().position(|p| p == id).unwrap_or(0);
        let mut cycle = path[start..].to_vec();
        cycle.push(id.to_string());
        return Err(AssemblyError::DependencyCycle { cycle });
    }

    ordered.push(id.to_string());
    let lookup = ledger.dependencies_of(id)?;
    if lookup.children().is_empty() {
        return Ok(());
    }

    visiting.insert(id.to_string());
    path.push(id.to_string());
    for child in lookup.children() {
        resolve_dfs(ledger, child, visiting, path, ordered)?;
    }
    path.pop();
    visiting.remove(id);
    Ok(())
}

/// Split resolved ids into filenames held by `origin` and ids it lacks.
/// Both lists are deduplicated, first encounter order kept.
pub fn split_by_origin(
    ledger: &dyn Ledger,
    ids: &[String],
    origin: &str,
) -> Result<ResolvedDependencies, AssemblyError> {
    let mut seen = HashSet::new();
    let mut resolved = ResolvedDependencies::default();

    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        match ledger.filename_for(id, origin)? {
            Some(filename) => {
                if !resolved.available.contains(&filename) {
                    resolved.available.push(filename);
                }
            }
            None => resolved.missing.push(id.clone()),
        }
    }
    Ok(resolved)
}
