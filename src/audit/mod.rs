// Budget auditing over reconstructed network records.
//
// Works on plain (resource type, size) pairs, whatever produced them; the
// correlator is one source but not a dependency.

mod summary;
mod verdict;

pub use summary::summarize_by_type;
pub use verdict::{audit, AuditVerdict, BYTES_PER_KB};
