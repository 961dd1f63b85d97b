//! Audit configuration loading and validation
//!
//! The config is one JSON document declaring the audited pages, their
//! per-resource-type budgets, and (optionally) where manifests and diff
//! baselines live. Everything is validated eagerly at load time so a broken
//! config fails the run before any page is touched.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::resource_type::ResourceType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not present at {path}")]
    NotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config {path} is not valid JSON: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Maximum allowed size for one resource type, in KB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub resource_type: ResourceType,
    /// Budget in KB; compared against summed encoded bytes at `budget * 1024`
    pub budget: u64,
}

/// Budgets for one audited page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBudget {
    /// Route path appended to `base_url`
    pub path: String,
    /// Display name; falls back to the route path with slashes removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub resource_sizes: Vec<Budget>,
}

impl PageBudget {
    /// Name used in reports, trace file names, and manifest file names
    pub fn route_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.path.replace('/', ""),
        }
    }
}

/// Where to find the persisted baseline manifests to diff against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReportConfig {
    pub base_manifest_dir: PathBuf,
}

/// Manifest generation settings; present only when the build publishes
/// source-map analysis output for its bundles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifestConfig {
    /// Resource types to generate manifests for
    pub included_types: Vec<ResourceType>,
    /// Build output directory; URL paths map onto it and manifest keys have
    /// it stripped
    pub build_dir: String,
    /// Checkout root to strip from absolute source paths in analyzer output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<String>,
    /// Where this run's manifests are written
    pub current_manifest_dir: PathBuf,
    /// Where the external source-map analyzer drops its per-page bundle
    /// reports
    pub bundle_report_dir: PathBuf,
    /// Content-encoding extension to strip from asset paths (e.g. "br")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_report: Option<DiffReportConfig>,
}

/// Top-level audit configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub base_url: String,
    /// Directory holding captured trace files, one per page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_dir: Option<PathBuf>,
    /// User-timing mark that ends the audited load window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Only audit requests whose URL contains this substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_url_pattern: Option<String>,
    /// Drop requests whose URL contains this substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_url_pattern: Option<String>,
    #[serde(default)]
    pub budgets: Vec<PageBudget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_manifest: Option<AssetManifestConfig>,
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the hard requirements.
    ///
    /// A config without budgets is a fatal error here, which keeps it
    /// distinct from the empty-but-valid audit result a page produces when
    /// none of its budgeted types were observed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Invalid(
                "baseUrl not configured in config file".to_string(),
            ));
        }
        if self.budgets.is_empty() {
            return Err(ConfigError::Invalid(
                "budgets not configured in config file".to_string(),
            ));
        }
        for page in &self.budgets {
            if page.path.is_empty() {
                return Err(ConfigError::Invalid(
                    "budget entry with an empty path".to_string(),
                ));
            }
            let mut seen = HashSet::new();
            for budget in &page.resource_sizes {
                if !seen.insert(budget.resource_type) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate {} budget for path {}",
                        budget.resource_type, page.path
                    )));
                }
            }
        }
        if let Some(manifest) = &self.asset_manifest {
            if manifest.included_types.is_empty() {
                return Err(ConfigError::Invalid(
                    "assetManifest.includedTypes is empty".to_string(),
                ));
            }
            if manifest.build_dir.is_empty() {
                return Err(ConfigError::Invalid(
                    "assetManifest.buildDir not configured".to_string(),
                ));
            }
        }
        Ok(())
    }
}
