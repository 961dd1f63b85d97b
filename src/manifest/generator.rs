//! Current-build manifest generation
//!
//! The source-map analyzer is an external collaborator; it publishes, per
//! page and filetype, a bundle report attributing each bundle's bytes to the
//! source files that produced them. This module selects the bundles the page
//! actually loaded (via the audited network records), normalizes paths, and
//! assembles the snapshot that gets persisted for future diffs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::config::AssetManifestConfig;
use crate::manifest::snapshot::{
    Bundle, BundleContent, FileSizes, ManifestError, ManifestSnapshot, RawBundle,
};
use crate::resource_type::ResourceType;
use crate::trace::NetworkRecord;

/// Load a bundle report the analyzer dropped for one (page, filetype) pair
pub fn load_bundle_report(path: &Path) -> Result<Vec<RawBundle>, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ManifestError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Builds the persisted manifest for one (page, filetype) pair
pub struct ManifestGenerator<'a> {
    route_name: String,
    filetype: ResourceType,
    config: &'a AssetManifestConfig,
    include_url_pattern: Option<&'a str>,
}

impl<'a> ManifestGenerator<'a> {
    pub fn new(
        route_name: impl Into<String>,
        filetype: ResourceType,
        config: &'a AssetManifestConfig,
        include_url_pattern: Option<&'a str>,
    ) -> Self {
        Self {
            route_name: route_name.into(),
            filetype,
            config,
            include_url_pattern,
        }
    }

    /// Map the audited network requests onto on-disk asset paths.
    ///
    /// Keeps requests of this generator's filetype whose URL path contains
    /// the include pattern, swaps the pattern for the build directory, and
    /// strips a configured content-encoding extension. Without an include
    /// pattern there is no URL-to-disk mapping, so nothing qualifies.
    pub fn asset_paths(&self, records: &[NetworkRecord]) -> Vec<String> {
        let Some(pattern) = self.include_url_pattern else {
            tracing::warn!(
                route = %self.route_name,
                "includeUrlPattern not configured; no requests map onto build assets"
            );
            return Vec::new();
        };
        records
            .iter()
            .filter(|record| record.resource_type == Some(self.filetype))
            .filter_map(|record| url_path(&record.url))
            .filter(|path| path.contains(pattern))
            .map(|path| path.replacen(pattern, &self.config.build_dir, 1))
            .map(|path| self.strip_encoding(path))
            .collect()
    }

    /// Assemble the snapshot from the analyzer's bundle report.
    ///
    /// Only bundles the page actually loaded make it in. Bundle names lose
    /// the build-dir prefix, mapped file paths lose the checkout prefix, and
    /// everything is ordered by descending size for readable manifests.
    pub fn build_snapshot(
        &self,
        records: &[NetworkRecord],
        report: Vec<RawBundle>,
    ) -> ManifestSnapshot {
        let audited: HashSet<String> = self.asset_paths(records).into_iter().collect();
        let mut bundles: Vec<Bundle> = report
            .into_iter()
            .filter(|raw| audited.contains(&raw.bundle_name))
            .map(Bundle::from)
            .map(|bundle| self.normalize(bundle))
            .collect();
        bundles.sort_by(|a, b| b.total_bytes().cmp(&a.total_bytes()));

        ManifestSnapshot {
            route_name: self.route_name.replace('/', ""),
            filetype: self.filetype,
            bundles,
        }
    }

    /// Build the snapshot and persist it under the current-manifest dir
    pub fn generate(
        &self,
        records: &[NetworkRecord],
        report: Vec<RawBundle>,
    ) -> Result<PathBuf, ManifestError> {
        let snapshot = self.build_snapshot(records, report);
        if snapshot.bundles.is_empty() {
            tracing::warn!(
                route = %self.route_name,
                filetype = %self.filetype,
                "bundle report matched none of the audited requests"
            );
        }
        snapshot.store(&self.config.current_manifest_dir)
    }

    fn normalize(&self, bundle: Bundle) -> Bundle {
        let name = bundle.name.replacen(&self.config.build_dir, "", 1);
        let content = match bundle.content {
            BundleContent::Mapped(files) => BundleContent::Mapped(
                files
                    .iter()
                    .map(|(file, bytes)| (self.strip_base_dir(file), bytes))
                    .collect::<FileSizes>()
                    .sorted_by_size_desc(),
            ),
            unmapped @ BundleContent::Unmapped { .. } => unmapped,
        };
        Bundle { name, content }
    }

    /// Analyzer output sometimes carries absolute source paths; strip the
    /// checkout root so manifests compare across machines
    fn strip_base_dir(&self, file: &str) -> String {
        match &self.config.base_dir {
            Some(base_dir) if !base_dir.is_empty() => file.replacen(base_dir, "", 1),
            _ => file.to_string(),
        }
    }

    fn strip_encoding(&self, path: String) -> String {
        let Some(encoding) = &self.config.encoding else {
            return path;
        };
        match path.strip_suffix(&format!(".{encoding}")) {
            Some(stripped) => stripped.to_string(),
            None => path,
        }
    }
}

/// Path component of a request URL; bare paths pass through
fn url_path(url: &str) -> Option<String> {
    match Url::parse(url) {
        Ok(parsed) => Some(parsed.path().to_string()),
        Err(_) if url.starts_with('/') => Some(url.to_string()),
        Err(_) => None,
    }
}
