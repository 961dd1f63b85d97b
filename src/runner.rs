//! Page-by-page audit orchestration
//!
//! For each configured page: load its captured trace, correlate the events
//! into network records, apply the URL filters, audit against the page's
//! budgets, and — when manifests are configured — persist this build's
//! snapshots and diff the types that failed their budget against the
//! baseline. Pages are independent; one page failing does not stop the rest.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::audit::{audit, AuditVerdict};
use crate::config::{AssetManifestConfig, Config, PageBudget};
use crate::manifest::{
    diff_manifest_files, load_bundle_report, DiffReport, ManifestGenerator, ManifestSnapshot,
};
use crate::resource_type::ResourceType;
use crate::trace::{correlate, load_trace_file, NetworkRecord};

/// Naming convention for captured trace files under the trace dir
pub fn trace_file_name(route_name: &str) -> String {
    format!("{}-trace.json", route_name.replace('/', ""))
}

/// Diff results for one (page, filetype) pair; `report` is absent when no
/// baseline manifest existed yet
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDiff {
    pub filetype: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<DiffReport>,
}

/// Everything produced for one audited page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAudit {
    pub path: String,
    pub url: String,
    pub verdicts: Vec<AuditVerdict>,
    pub diffs: Vec<TypeDiff>,
}

impl PageAudit {
    pub fn failed_verdicts(&self) -> impl Iterator<Item = &AuditVerdict> {
        self.verdicts.iter().filter(|verdict| verdict.failed())
    }
}

/// A page whose audit could not be completed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFailure {
    pub path: String,
    pub reason: String,
}

/// Batch result across all configured pages
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub pages: Vec<PageAudit>,
    pub failures: Vec<PageFailure>,
}

impl AuditSummary {
    /// Number of budget verdicts that failed across all pages
    pub fn failed_audit_count(&self) -> usize {
        self.pages
            .iter()
            .map(|page| page.failed_verdicts().count())
            .sum()
    }
}

/// Drives the audit for every page in the config
pub struct Runner {
    config: Config,
    trace_dir: PathBuf,
}

impl Runner {
    pub fn new(config: Config, trace_dir_override: Option<PathBuf>) -> Result<Self> {
        let trace_dir = trace_dir_override
            .or_else(|| config.trace_dir.clone())
            .context("no trace directory configured; set traceDir in the config or pass --trace-dir")?;
        Ok(Self { config, trace_dir })
    }

    pub fn run(&self) -> AuditSummary {
        let mut pages = Vec::new();
        let mut failures = Vec::new();
        for page in &self.config.budgets {
            tracing::info!(path = %page.path, "auditing page");
            match self.audit_page(page) {
                Ok(page_audit) => pages.push(page_audit),
                Err(err) => {
                    tracing::error!(path = %page.path, error = %err, "page audit failed");
                    failures.push(PageFailure {
                        path: page.path.clone(),
                        reason: format!("{err:#}"),
                    });
                }
            }
        }
        AuditSummary { pages, failures }
    }

    fn audit_page(&self, page: &PageBudget) -> Result<PageAudit> {
        let url = format!("{}{}", self.config.base_url, page.path);
        let trace_path = self.trace_dir.join(trace_file_name(&page.route_name()));
        let events = load_trace_file(&trace_path)?;
        let mut records = correlate(&events, self.config.marker.as_deref(), &url)?;
        self.apply_url_filters(&mut records);

        let verdicts = audit(
            &page.resource_sizes,
            records.iter().map(|record| (record.resource_type, record.size)),
        );

        let diffs = match &self.config.asset_manifest {
            Some(manifest_config) => {
                self.generate_and_diff(page, manifest_config, &records, &verdicts)?
            }
            None => Vec::new(),
        };

        Ok(PageAudit {
            path: page.path.clone(),
            url,
            verdicts,
            diffs,
        })
    }

    fn apply_url_filters(&self, records: &mut Vec<NetworkRecord>) {
        if let Some(pattern) = &self.config.include_url_pattern {
            records.retain(|record| record.url.contains(pattern));
        }
        if let Some(pattern) = &self.config.exclude_url_pattern {
            records.retain(|record| !record.url.contains(pattern));
        }
    }

    /// Persist this build's manifests and diff the failed types against the
    /// baseline
    fn generate_and_diff(
        &self,
        page: &PageBudget,
        manifest_config: &AssetManifestConfig,
        records: &[NetworkRecord],
        verdicts: &[AuditVerdict],
    ) -> Result<Vec<TypeDiff>> {
        let route = page.route_name();
        let mut diffs = Vec::new();

        for &filetype in &manifest_config.included_types {
            let report_path = manifest_config
                .bundle_report_dir
                .join(ManifestSnapshot::file_name(&route, filetype));
            if !report_path.exists() {
                tracing::warn!(
                    path = %report_path.display(),
                    "no bundle report published for this filetype; skipping manifest"
                );
                continue;
            }

            let bundles = load_bundle_report(&report_path)?;
            let generator = ManifestGenerator::new(
                route.clone(),
                filetype,
                manifest_config,
                self.config.include_url_pattern.as_deref(),
            );
            let current_path = generator.generate(records, bundles)?;

            let Some(diff_config) = &manifest_config.diff_report else {
                continue;
            };
            let failed = verdicts
                .iter()
                .any(|verdict| verdict.resource_type == filetype && verdict.failed());
            if !failed {
                continue;
            }

            let base_path = diff_config
                .base_manifest_dir
                .join(ManifestSnapshot::file_name(&route, filetype));
            let report =
                diff_manifest_files(&base_path, &current_path, Some(&manifest_config.build_dir))?;
            diffs.push(TypeDiff { filetype, report });
        }
        Ok(diffs)
    }
}
