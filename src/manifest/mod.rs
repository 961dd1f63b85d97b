// Asset manifest snapshots: generation, persistence, and build-over-build
// diffing.
//
// Snapshots are append-only artifacts, one per (page, filetype) build. The
// generator writes this build's snapshot from the external source-map
// analyzer's output; the differ compares it against a persisted baseline.

mod diff;
mod generator;
mod snapshot;

pub use diff::{
    diff, diff_manifest_files, DiffEntry, DiffKind, DiffReport, DiffTotals, KEY_SEPARATOR,
};
pub use generator::{load_bundle_report, ManifestGenerator};
pub use snapshot::{Bundle, BundleContent, FileSizes, ManifestError, ManifestSnapshot, RawBundle};
