//! Resource type classification from MIME types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse resource category for a network response
///
/// Budgets are declared per category, so the tag doubles as the grouping key
/// for budget audits and as the filetype component of manifest file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Font,
    Script,
    Other,
}

impl ResourceType {
    /// Classify a MIME type into a coarse resource category.
    ///
    /// Returns `None` when no MIME type is available (a request that never
    /// received response headers). Checks run in priority order; the first
    /// match wins. Matching is case-sensitive.
    pub fn from_mime_type(mime_type: Option<&str>) -> Option<Self> {
        let mime = mime_type?;
        if mime.is_empty() {
            return None;
        }
        let resource_type = if mime.starts_with("text/html") {
            Self::Document
        } else if mime.starts_with("text/css") {
            Self::Stylesheet
        } else if mime.starts_with("image/") {
            Self::Image
        } else if mime.contains("font") {
            Self::Font
        } else if mime.starts_with("text/javascript")
            || mime.contains("application/javascript")
            || mime.contains("script")
        {
            Self::Script
        } else {
            Self::Other
        };
        Some(resource_type)
    }

    /// Lower-case name as it appears in config files and manifest file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Stylesheet => "stylesheet",
            Self::Image => "image",
            Self::Font => "font",
            Self::Script => "script",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
