//! Persisted asset manifest snapshots
//!
//! One snapshot records, for one build of one page and one resource type,
//! which source file contributed how many bytes to each served bundle.
//! Snapshots are written once per build and read-only afterwards; diffing
//! loads two independent copies and never mutates either.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::resource_type::ResourceType;

/// Positional key the source-map analyzer emits when a bundle has no
/// per-file breakdown
pub(crate) const UNMAPPED_KEY: &str = "0";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest {path} is not a valid manifest document: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Two bundle/file pairs flattened onto the same key; the snapshot is
    /// misconfigured and must not be silently merged
    #[error("duplicate flattened manifest key '{key}'")]
    DuplicateKey { key: String },
    /// A flattened key without the bundle/file separator cannot be split back
    #[error("flattened manifest key '{key}' has no '::' separator")]
    MalformedKey { key: String },
}

/// File-path to byte-count mapping that preserves its on-disk order.
///
/// Manifest files keep bundle contents sorted by descending size; a BTreeMap
/// would re-sort them alphabetically on every round-trip, and diff tie-break
/// order depends on encounter order staying stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSizes(Vec<(String, u64)>);

impl FileSizes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: u64) {
        self.0.push((path.into(), bytes));
    }

    pub fn get(&self, path: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|(key, _)| key == path)
            .map(|(_, bytes)| *bytes)
    }

    pub fn contains_key(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(path, bytes)| (path.as_str(), *bytes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all byte counts
    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, bytes)| bytes).sum()
    }

    /// Re-order entries by descending size, ties keeping insertion order
    pub fn sorted_by_size_desc(mut self) -> Self {
        self.0.sort_by(|a, b| b.1.cmp(&a.1));
        self
    }
}

impl FromIterator<(String, u64)> for FileSizes {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for FileSizes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (path, bytes) in &self.0 {
            map.serialize_entry(path, bytes)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FileSizes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FileSizesVisitor;

        impl<'de> Visitor<'de> for FileSizesVisitor {
            type Value = FileSizes;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of file paths to byte counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((path, bytes)) = access.next_entry::<String, u64>()? {
                    entries.push((path, bytes));
                }
                Ok(FileSizes(entries))
            }
        }

        deserializer.deserialize_map(FileSizesVisitor)
    }
}

/// Contents of one built bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleContent {
    /// Per-source-file byte attribution from the analyzer
    Mapped(FileSizes),
    /// The analyzer produced no file breakdown; only the bundle total is known
    Unmapped { total_bytes: u64 },
}

/// One built output file and the source bytes it contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub content: BundleContent,
}

impl Bundle {
    pub fn total_bytes(&self) -> u64 {
        match &self.content {
            BundleContent::Mapped(files) => files.total(),
            BundleContent::Unmapped { total_bytes } => *total_bytes,
        }
    }
}

/// On-disk shape of one bundle, compatible with the analyzer output format.
///
/// An unmapped bundle travels as a single entry under the positional `"0"`
/// key; [`Bundle`] carries that case as a proper variant instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBundle {
    pub bundle_name: String,
    pub total_bytes: u64,
    #[serde(default)]
    pub files: FileSizes,
}

impl From<RawBundle> for Bundle {
    fn from(raw: RawBundle) -> Self {
        let content = if raw.files.contains_key(UNMAPPED_KEY) {
            BundleContent::Unmapped {
                total_bytes: raw.total_bytes,
            }
        } else {
            BundleContent::Mapped(raw.files)
        };
        Bundle {
            name: raw.bundle_name,
            content,
        }
    }
}

impl From<Bundle> for RawBundle {
    fn from(bundle: Bundle) -> Self {
        match bundle.content {
            BundleContent::Mapped(files) => RawBundle {
                bundle_name: bundle.name,
                total_bytes: files.total(),
                files,
            },
            BundleContent::Unmapped { total_bytes } => {
                let mut files = FileSizes::new();
                files.insert(UNMAPPED_KEY, total_bytes);
                RawBundle {
                    bundle_name: bundle.name,
                    total_bytes,
                    files,
                }
            }
        }
    }
}

/// A persisted record of per-bundle, per-file byte sizes for one build of
/// one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSnapshot {
    pub route_name: String,
    pub filetype: ResourceType,
    pub bundles: Vec<Bundle>,
}

/// On-disk manifest document; bundles are serialized under `files`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    route_name: String,
    filetype: ResourceType,
    files: Vec<RawBundle>,
}

impl ManifestSnapshot {
    /// File name convention shared by manifests, bundle reports, and their
    /// baselines: `<routeNameSansSlashes>-<filetype>.json`
    pub fn file_name(route_name: &str, filetype: ResourceType) -> String {
        format!("{}-{}.json", route_name.replace('/', ""), filetype)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: RawManifest =
            serde_json::from_str(&raw).map_err(|source| ManifestError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            route_name: manifest.route_name,
            filetype: manifest.filetype,
            bundles: manifest.files.into_iter().map(Bundle::from).collect(),
        })
    }

    /// Write the snapshot under `dir`, creating it as needed; returns the
    /// manifest path
    pub fn store(&self, dir: &Path) -> Result<PathBuf, ManifestError> {
        fs::create_dir_all(dir).map_err(|source| ManifestError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(Self::file_name(&self.route_name, self.filetype));
        let raw = RawManifest {
            route_name: self.route_name.clone(),
            filetype: self.filetype,
            files: self
                .bundles
                .iter()
                .cloned()
                .map(RawBundle::from)
                .collect(),
        };
        let body = serde_json::to_string(&raw).map_err(|source| ManifestError::Format {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, body).map_err(|source| ManifestError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
