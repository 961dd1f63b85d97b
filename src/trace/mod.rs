// Trace capture ingestion and network request reconstruction.
//
// The browser automation layer hands over a flat JSON array of timestamped
// events; this module validates the recognized event payloads and correlates
// them into per-request network records, truncated at an optional user-timing
// marker.

mod correlator;
mod events;

pub use correlator::{correlate, CorrelationError, NetworkRecord};
pub use events::{
    load_trace_file, FinishFragment, HeadersFragment, RequestFragment, TraceArgs, TraceEvent,
    TraceReadError, FINISH_EVENT, NETWORK_CATEGORY, RECEIVE_RESPONSE_EVENT, SEND_REQUEST_EVENT,
    USER_TIMING_CATEGORY,
};
