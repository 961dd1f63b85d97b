//! Network request reconstruction from raw trace events
//!
//! A single pass buckets the recognized event kinds, requests are truncated
//! at the user-timing marker, and the surviving request fragments are merged
//! with their headers/finish fragments by request id.

use serde::Serialize;
use thiserror::Error;

use crate::resource_type::ResourceType;
use crate::trace::events::{
    FinishFragment, HeadersFragment, RequestFragment, TraceEvent, FINISH_EVENT, NETWORK_CATEGORY,
    RECEIVE_RESPONSE_EVENT, SEND_REQUEST_EVENT, USER_TIMING_CATEGORY,
};

/// Substring identifying browser-internal error page URLs
const ERROR_PAGE_URL_MARKER: &str = "chrome-error";

/// One reconstructed network request
///
/// Fields sourced from a fragment that never arrived stay `None`; a request
/// that was sent but never finished before the marker is still a valid
/// (partial) record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub request_id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Encoded (transferred) byte count from the finish fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Error)]
pub enum CorrelationError {
    /// A recognized event carried a payload that does not deserialize
    #[error("malformed {name} event payload: {source}")]
    MalformedEvent {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// The page never loaded; the first reconstructed request is a browser
    /// error page, so returning records would look like a healthy empty page
    #[error("network requests could not be captured for {url}; make sure the site is reachable")]
    PageUnreachable { url: String },
}

/// Reconstruct per-request network records from a raw trace capture.
///
/// `marker_name` is the user-timing mark that ends the audited window: the
/// first occurrence wins, and request fragments stamped strictly after it are
/// dropped. Headers and finish fragments are never truncated independently;
/// one belonging to a dropped request is simply left unused. Output preserves
/// the input encounter order of the surviving request fragments.
pub fn correlate(
    events: &[TraceEvent],
    marker_name: Option<&str>,
    page_url: &str,
) -> Result<Vec<NetworkRecord>, CorrelationError> {
    let mut requests: Vec<(f64, RequestFragment)> = Vec::new();
    let mut headers: Vec<HeadersFragment> = Vec::new();
    let mut finishes: Vec<FinishFragment> = Vec::new();
    let mut marker_timestamp: Option<f64> = None;

    for event in events {
        if event.category == NETWORK_CATEGORY {
            match event.name.as_str() {
                SEND_REQUEST_EVENT => {
                    let fragment = event.payload().map_err(|source| {
                        CorrelationError::MalformedEvent {
                            name: SEND_REQUEST_EVENT,
                            source,
                        }
                    })?;
                    requests.push((event.timestamp, fragment));
                }
                RECEIVE_RESPONSE_EVENT => {
                    let fragment = event.payload().map_err(|source| {
                        CorrelationError::MalformedEvent {
                            name: RECEIVE_RESPONSE_EVENT,
                            source,
                        }
                    })?;
                    headers.push(fragment);
                }
                FINISH_EVENT => {
                    let fragment = event.payload().map_err(|source| {
                        CorrelationError::MalformedEvent {
                            name: FINISH_EVENT,
                            source,
                        }
                    })?;
                    finishes.push(fragment);
                }
                _ => {}
            }
        } else if event.category == USER_TIMING_CATEGORY
            && marker_name.is_some_and(|marker| event.name == marker)
            && marker_timestamp.is_none()
        {
            // First occurrence wins; later duplicates are ignored
            marker_timestamp = Some(event.timestamp);
        }
    }

    if let Some(cutoff) = marker_timestamp {
        // Boundary is inclusive: a request stamped exactly at the marker counts
        requests.retain(|(timestamp, _)| *timestamp <= cutoff);
    }

    let records: Vec<NetworkRecord> = requests
        .into_iter()
        .map(|(_, request)| {
            let header = headers
                .iter()
                .find(|fragment| fragment.request_id == request.request_id);
            let finish = finishes
                .iter()
                .find(|fragment| fragment.request_id == request.request_id);
            let mime_type = header.and_then(|fragment| fragment.mime_type.clone());
            NetworkRecord {
                resource_type: ResourceType::from_mime_type(mime_type.as_deref()),
                status_code: header.and_then(|fragment| fragment.status_code),
                size: finish.and_then(|fragment| fragment.encoded_data_length),
                request_id: request.request_id,
                url: request.url,
                mime_type,
            }
        })
        .collect();

    if let Some(first) = records.first() {
        if first.url.contains(ERROR_PAGE_URL_MARKER) {
            return Err(CorrelationError::PageUnreachable {
                url: page_url.to_string(),
            });
        }
    }

    tracing::debug!(
        records = records.len(),
        truncated_at_marker = marker_timestamp.is_some(),
        "trace correlation complete"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(category: &str, name: &str, timestamp: f64, data: serde_json::Value) -> TraceEvent {
        serde_json::from_value(json!({
            "category": category,
            "name": name,
            "timestamp": timestamp,
            "args": { "data": data }
        }))
        .unwrap()
    }

    fn send_request(id: &str, url: &str, timestamp: f64) -> TraceEvent {
        event(
            NETWORK_CATEGORY,
            SEND_REQUEST_EVENT,
            timestamp,
            json!({ "requestId": id, "url": url }),
        )
    }

    fn receive_response(id: &str, mime: &str, status: u32, timestamp: f64) -> TraceEvent {
        event(
            NETWORK_CATEGORY,
            RECEIVE_RESPONSE_EVENT,
            timestamp,
            json!({ "requestId": id, "mimeType": mime, "statusCode": status }),
        )
    }

    fn finish(id: &str, length: u64, timestamp: f64) -> TraceEvent {
        event(
            NETWORK_CATEGORY,
            FINISH_EVENT,
            timestamp,
            json!({ "requestId": id, "encodedDataLength": length }),
        )
    }

    fn marker(name: &str, timestamp: f64) -> TraceEvent {
        event(USER_TIMING_CATEGORY, name, timestamp, json!({}))
    }

    #[test]
    fn test_merges_fragments_by_request_id() {
        let events = vec![
            send_request("1", "/index.html", 2.0),
            receive_response("1", "text/html", 200, 3.0),
            // Finish can arrive stamped before its own response headers
            finish("1", 455, 1.0),
            send_request("2", "/index.js", 2.0),
            receive_response("2", "text/javascript", 200, 4.0),
            finish("2", 555, 3.0),
        ];

        let records = correlate(&events, None, "http://localhost/index.html").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].request_id, "1");
        assert_eq!(records[0].mime_type.as_deref(), Some("text/html"));
        assert_eq!(records[0].resource_type, Some(ResourceType::Document));
        assert_eq!(records[0].status_code, Some(200));
        assert_eq!(records[0].size, Some(455));
        assert_eq!(records[1].resource_type, Some(ResourceType::Script));
        assert_eq!(records[1].size, Some(555));
    }

    #[test]
    fn test_marker_truncates_later_requests_but_not_joins() {
        let events = vec![
            send_request("1", "/index.html", 2.0),
            marker("mark_end", 5.0),
            // At the boundary: included
            send_request("2", "/boundary.js", 5.0),
            // Past the boundary: dropped
            send_request("3", "/after.js", 8.0),
            // Headers for a surviving request, stamped after the marker: still joined
            receive_response("2", "text/javascript", 200, 9.0),
        ];

        let records = correlate(&events, Some("mark_end"), "http://localhost/").unwrap();
        let urls: Vec<&str> = records.iter().map(|record| record.url.as_str()).collect();
        assert_eq!(urls, vec!["/index.html", "/boundary.js"]);
        assert_eq!(records[1].resource_type, Some(ResourceType::Script));
    }

    #[test]
    fn test_first_marker_occurrence_wins() {
        let events = vec![
            send_request("1", "/index.html", 2.0),
            marker("mark_end", 3.0),
            marker("mark_end", 100.0),
            send_request("2", "/late.js", 10.0),
        ];

        let records = correlate(&events, Some("mark_end"), "http://localhost/").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "/index.html");
    }

    #[test]
    fn test_no_marker_configured_keeps_all_requests() {
        let events = vec![
            send_request("1", "/index.html", 2.0),
            marker("mark_end", 3.0),
            send_request("2", "/late.js", 10.0),
        ];

        let records = correlate(&events, None, "http://localhost/").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_partial_record_without_headers_or_finish_survives() {
        let events = vec![send_request("1", "/pending.js", 2.0)];

        let records = correlate(&events, None, "http://localhost/").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request_id, "1");
        assert!(records[0].mime_type.is_none());
        assert!(records[0].resource_type.is_none());
        assert!(records[0].status_code.is_none());
        assert!(records[0].size.is_none());
    }

    #[test]
    fn test_unrecognized_events_are_ignored() {
        let noise = vec![
            event(NETWORK_CATEGORY, "WillSendRequest", 1.0, json!({ "requestId": "9" })),
            event("disk-timeline", SEND_REQUEST_EVENT, 1.0, json!({})),
            event(USER_TIMING_CATEGORY, "navigationStart", 0.0, json!({})),
        ];
        let mut events = vec![send_request("1", "/index.html", 2.0)];
        events.extend(noise);

        let records = correlate(&events, Some("mark_end"), "http://localhost/").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "/index.html");
    }

    #[test]
    fn test_duplicate_request_ids_join_first_found_fragment() {
        let events = vec![
            send_request("1", "/a.js", 1.0),
            receive_response("1", "text/javascript", 200, 2.0),
            receive_response("1", "text/css", 200, 3.0),
            finish("1", 100, 4.0),
            finish("1", 999, 5.0),
        ];

        let records = correlate(&events, None, "http://localhost/").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mime_type.as_deref(), Some("text/javascript"));
        assert_eq!(records[0].size, Some(100));
    }

    #[test]
    fn test_malformed_send_request_payload_is_an_error() {
        let events = vec![event(
            NETWORK_CATEGORY,
            SEND_REQUEST_EVENT,
            1.0,
            json!({ "requestId": "1" }),
        )];

        let err = correlate(&events, None, "http://localhost/").unwrap_err();
        assert!(matches!(
            err,
            CorrelationError::MalformedEvent {
                name: SEND_REQUEST_EVENT,
                ..
            }
        ));
    }

    #[test]
    fn test_error_page_as_first_record_is_unreachable() {
        let events = vec![send_request(
            "1",
            "chrome-error://chromewebdata/",
            1.0,
        )];

        let err = correlate(&events, None, "http://unreachable.example/").unwrap_err();
        match err {
            CorrelationError::PageUnreachable { url } => {
                assert_eq!(url, "http://unreachable.example/");
            }
            other => panic!("expected PageUnreachable, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_capture_yields_empty_records() {
        let records = correlate(&[], Some("mark_end"), "http://localhost/").unwrap();
        assert!(records.is_empty());
    }
}
