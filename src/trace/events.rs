//! Raw trace event ingestion
//!
//! Wire types for the trace JSON handed over by the browser automation
//! layer. Events arrive loosely ordered; only the five recognized
//! `(category, name)` pairs carry payloads the correlator cares about, and
//! those payloads are validated into typed fragments here rather than passed
//! around as raw JSON.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trace category carrying network request lifecycle events
pub const NETWORK_CATEGORY: &str = "network-timeline";
/// Trace category carrying user timing marks
pub const USER_TIMING_CATEGORY: &str = "user-timing";
/// Event name for the request-send fragment (request id + url)
pub const SEND_REQUEST_EVENT: &str = "SendRequest";
/// Event name for the response-headers fragment (mime type + status)
pub const RECEIVE_RESPONSE_EVENT: &str = "ReceiveResponse";
/// Event name for the finish fragment (encoded data length)
pub const FINISH_EVENT: &str = "Finish";

/// One timestamped browser instrumentation event
///
/// `timestamp` is monotonic within a capture but events are not guaranteed to
/// arrive in timestamp order; it is used only for marker truncation.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceEvent {
    pub category: String,
    pub name: String,
    pub timestamp: f64,
    #[serde(default)]
    pub args: TraceArgs,
}

/// Keyed payload container; the per-kind payload sits under `data`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraceArgs {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl TraceEvent {
    /// Deserialize the `args.data` payload of a recognized event.
    ///
    /// A recognized event without a payload, or with a payload missing
    /// required fields, fails here rather than producing a half-empty record.
    pub(crate) fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let data = self
            .args
            .data
            .clone()
            .unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data)
    }
}

/// Payload of a `SendRequest` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFragment {
    pub request_id: String,
    pub url: String,
}

/// Payload of a `ReceiveResponse` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadersFragment {
    pub request_id: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub status_code: Option<u32>,
}

/// Payload of a `Finish` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishFragment {
    pub request_id: String,
    #[serde(default)]
    pub encoded_data_length: Option<u64>,
}

#[derive(Debug, Error)]
pub enum TraceReadError {
    #[error("failed to read trace file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("trace file {path} is not a valid trace capture: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load a captured trace file: a JSON array of trace events
pub fn load_trace_file(path: &Path) -> Result<Vec<TraceEvent>, TraceReadError> {
    let raw = fs::read_to_string(path).map_err(|source| TraceReadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| TraceReadError::Format {
        path: path.to_path_buf(),
        source,
    })
}
