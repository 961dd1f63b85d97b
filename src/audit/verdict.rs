//! Budget compliance verdicts

use serde::Serialize;

use crate::audit::summary::summarize_by_type;
use crate::config::Budget;
use crate::resource_type::ResourceType;

/// Budgets are configured in KB; comparisons happen in bytes
pub const BYTES_PER_KB: u64 = 1024;

/// Outcome of checking one resource type against its configured budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditVerdict {
    pub resource_type: ResourceType,
    /// Summed encoded bytes across all matching records
    pub size: u64,
    /// Bytes past the budget; absent when within (or exactly at) budget,
    /// which is what downstream reporting keys off to tell pass from fail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_over_budget: Option<u64>,
}

impl AuditVerdict {
    /// A failed audit has an overrun that is present and greater than zero
    pub fn failed(&self) -> bool {
        self.size_over_budget.is_some_and(|over| over > 0)
    }
}

/// Check every configured budget against the observed per-type totals.
///
/// Budgets whose resource type was never observed in the load yield no
/// verdict; the audit only evaluates what the page actually requested. An
/// empty result is valid (a config with no budgets at all is rejected at
/// config validation, long before this point).
pub fn audit<I>(budgets: &[Budget], records: I) -> Vec<AuditVerdict>
where
    I: IntoIterator<Item = (Option<ResourceType>, Option<u64>)>,
{
    let summary = summarize_by_type(records);
    budgets
        .iter()
        .filter_map(|budget| {
            let size = *summary.get(&budget.resource_type)?;
            let limit = budget.budget * BYTES_PER_KB;
            Some(AuditVerdict {
                resource_type: budget.resource_type,
                size,
                size_over_budget: (size > limit).then(|| size - limit),
            })
        })
        .collect()
}
