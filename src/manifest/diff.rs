//! Build-over-build manifest diffing
//!
//! Two snapshots of the same page/filetype are flattened into
//! `bundle::file -> bytes` maps and diffed structurally. A file is tracked by
//! its flattened key, so a file that moved between bundles shows up as a
//! remove plus an add rather than a silent size change.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::manifest::snapshot::{BundleContent, ManifestError, ManifestSnapshot};

/// Separator joining bundle name and file path in the flattened key space
pub const KEY_SEPARATOR: &str = "::";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiffKind {
    Added,
    Removed,
    Modified,
}

/// One file-level size change between two builds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub bundle_name: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_size: Option<u64>,
    /// Signed byte delta, absent sizes counting as zero
    pub change: i64,
    pub kind: DiffKind,
}

/// Net growth across the changed files only, not the grand total of either
/// snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffTotals {
    pub previous: u64,
    pub current: u64,
    pub change: i64,
}

/// Sorted file-level changes plus their running totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    pub entries: Vec<DiffEntry>,
    pub totals: DiffTotals,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flatten a snapshot into ordered `bundle::file -> bytes` pairs.
///
/// `build_dir` is stripped from bundle names so manifests written before and
/// after a build-directory move still line up. An unmapped bundle uses its
/// own name as the synthetic file key. Key collisions mean the snapshot was
/// generated from a misconfigured build and are rejected.
fn flatten(
    snapshot: &ManifestSnapshot,
    build_dir: Option<&str>,
) -> Result<Vec<(String, u64)>, ManifestError> {
    let mut flat: Vec<(String, u64)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for bundle in &snapshot.bundles {
        let bundle_name = match build_dir {
            Some(prefix) if !prefix.is_empty() => bundle.name.replacen(prefix, "", 1),
            _ => bundle.name.clone(),
        };
        let mut push = |key: String, bytes: u64| -> Result<(), ManifestError> {
            if !seen.insert(key.clone()) {
                return Err(ManifestError::DuplicateKey { key });
            }
            flat.push((key, bytes));
            Ok(())
        };
        match &bundle.content {
            BundleContent::Mapped(files) => {
                for (file, bytes) in files.iter() {
                    push(format!("{bundle_name}{KEY_SEPARATOR}{file}"), bytes)?;
                }
            }
            BundleContent::Unmapped { total_bytes } => {
                push(
                    format!("{bundle_name}{KEY_SEPARATOR}{bundle_name}"),
                    *total_bytes,
                )?;
            }
        }
    }
    Ok(flat)
}

/// Split a flattened key back into its bundle and file halves
fn split_key(key: &str) -> Result<(&str, &str), ManifestError> {
    key.split_once(KEY_SEPARATOR)
        .ok_or_else(|| ManifestError::MalformedKey {
            key: key.to_string(),
        })
}

fn make_entry(
    key: &str,
    previous_size: Option<u64>,
    current_size: Option<u64>,
) -> Result<DiffEntry, ManifestError> {
    let (bundle_name, file) = split_key(key)?;
    let kind = match (previous_size, current_size) {
        (None, Some(_)) => DiffKind::Added,
        (Some(_), None) => DiffKind::Removed,
        _ => DiffKind::Modified,
    };
    Ok(DiffEntry {
        bundle_name: bundle_name.to_string(),
        file: file.to_string(),
        previous_size,
        current_size,
        change: current_size.unwrap_or(0) as i64 - previous_size.unwrap_or(0) as i64,
        kind,
    })
}

/// Diff two snapshots of the same page and filetype.
///
/// Output is sorted by `change` descending (largest growth first, largest
/// shrink last); ties keep generation order, which walks the previous
/// snapshot (removed/modified) before the current one (added). Files present
/// in both builds at the same size emit nothing.
pub fn diff(
    previous: &ManifestSnapshot,
    current: &ManifestSnapshot,
    build_dir: Option<&str>,
) -> Result<DiffReport, ManifestError> {
    let previous_flat = flatten(previous, build_dir)?;
    let current_flat = flatten(current, build_dir)?;
    let previous_index: HashMap<&str, u64> = previous_flat
        .iter()
        .map(|(key, bytes)| (key.as_str(), *bytes))
        .collect();
    let current_index: HashMap<&str, u64> = current_flat
        .iter()
        .map(|(key, bytes)| (key.as_str(), *bytes))
        .collect();

    let mut entries = Vec::new();
    for (key, previous_size) in &previous_flat {
        match current_index.get(key.as_str()) {
            None => entries.push(make_entry(key, Some(*previous_size), None)?),
            Some(&current_size) if current_size != *previous_size => {
                entries.push(make_entry(key, Some(*previous_size), Some(current_size))?);
            }
            Some(_) => {}
        }
    }
    for (key, current_size) in &current_flat {
        if !previous_index.contains_key(key.as_str()) {
            entries.push(make_entry(key, None, Some(*current_size))?);
        }
    }

    // Vec::sort_by is stable, so equal changes keep generation order
    entries.sort_by(|a, b| b.change.cmp(&a.change));

    let totals = DiffTotals {
        previous: entries.iter().map(|e| e.previous_size.unwrap_or(0)).sum(),
        current: entries.iter().map(|e| e.current_size.unwrap_or(0)).sum(),
        change: entries.iter().map(|e| e.change).sum(),
    };
    Ok(DiffReport { entries, totals })
}

/// Compare the persisted baseline manifest against the current one.
///
/// A missing baseline is the normal first-build state, reported as `Ok(None)`
/// rather than an error so batch callers proceed without special-casing.
pub fn diff_manifest_files(
    previous_path: &Path,
    current_path: &Path,
    build_dir: Option<&str>,
) -> Result<Option<DiffReport>, ManifestError> {
    if !previous_path.exists() {
        tracing::info!(
            path = %previous_path.display(),
            "no baseline manifest to compare against; skipping diff"
        );
        return Ok(None);
    }
    let previous = ManifestSnapshot::load(previous_path)?;
    let current = ManifestSnapshot::load(current_path)?;
    Ok(Some(diff(&previous, &current, build_dir)?))
}
