//! Per-resource-type size aggregation

use std::collections::HashMap;

use crate::resource_type::ResourceType;

/// Sum observed sizes per resource type.
///
/// Accepts `(resource_type, size)` pairs from any record source. Records
/// without a classified type belong to no budget group and are skipped; a
/// record that never finished counts as zero bytes but still makes its
/// group non-empty.
pub fn summarize_by_type<I>(records: I) -> HashMap<ResourceType, u64>
where
    I: IntoIterator<Item = (Option<ResourceType>, Option<u64>)>,
{
    let mut summary: HashMap<ResourceType, u64> = HashMap::new();
    for (resource_type, size) in records {
        let Some(resource_type) = resource_type else {
            continue;
        };
        *summary.entry(resource_type).or_insert(0) += size.unwrap_or(0);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_sizes_per_type() {
        let summary = summarize_by_type(vec![
            (Some(ResourceType::Script), Some(1000)),
            (Some(ResourceType::Script), Some(500)),
            (Some(ResourceType::Stylesheet), Some(200)),
        ]);
        assert_eq!(summary.get(&ResourceType::Script), Some(&1500));
        assert_eq!(summary.get(&ResourceType::Stylesheet), Some(&200));
    }

    #[test]
    fn test_absent_size_counts_as_zero_but_group_exists() {
        let summary = summarize_by_type(vec![(Some(ResourceType::Font), None)]);
        assert_eq!(summary.get(&ResourceType::Font), Some(&0));
    }

    #[test]
    fn test_unclassified_records_are_skipped() {
        let summary = summarize_by_type(vec![(None, Some(4096))]);
        assert!(summary.is_empty());
    }
}
