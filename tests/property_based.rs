//! Property-based tests for the audit pipeline
//!
//! Core laws covered:
//! 1. MIME classification is total and never panics
//! 2. Correlation is unaffected by unrecognized trace events
//! 3. Marker truncation keeps exactly the requests at or before the marker
//! 4. Budget overrun is absent iff the summed size fits the budget
//! 5. Diff output is sorted by change descending
//! 6. A snapshot diffed against itself is empty

use proptest::prelude::*;
use serde_json::json;

use balanza::audit::{audit, BYTES_PER_KB};
use balanza::config::Budget;
use balanza::manifest::{diff, Bundle, BundleContent, FileSizes, ManifestSnapshot};
use balanza::resource_type::ResourceType;
use balanza::trace::{correlate, TraceEvent};

fn send_request(id: &str, url: &str, timestamp: f64) -> TraceEvent {
    serde_json::from_value(json!({
        "category": "network-timeline",
        "name": "SendRequest",
        "timestamp": timestamp,
        "args": { "data": { "requestId": id, "url": url } }
    }))
    .unwrap()
}

fn noise_event(category: &str, name: &str, timestamp: f64) -> TraceEvent {
    serde_json::from_value(json!({
        "category": category,
        "name": name,
        "timestamp": timestamp,
        "args": { "data": { "anything": true } }
    }))
    .unwrap()
}

fn snapshot_from_files(files: Vec<(String, u64)>) -> ManifestSnapshot {
    ManifestSnapshot {
        route_name: "page".to_string(),
        filetype: ResourceType::Script,
        bundles: vec![Bundle {
            name: "app.min.js".to_string(),
            content: BundleContent::Mapped(files.into_iter().collect::<FileSizes>()),
        }],
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_classifier_is_total(mime in "\\PC*") {
        // Property: any string classifies without panicking, and only an
        // empty string yields no classification
        let result = ResourceType::from_mime_type(Some(&mime));
        prop_assert_eq!(result.is_none(), mime.is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_unrecognized_events_do_not_affect_correlation(
        request_count in 1usize..10,
        noise_names in prop::collection::vec("[a-z]{4,12}", 0..10),
    ) {
        // Property: events outside the five recognized (category, name)
        // pairs are invisible to the correlator
        let requests: Vec<TraceEvent> = (0..request_count)
            .map(|i| send_request(&i.to_string(), &format!("/asset-{i}.js"), i as f64))
            .collect();

        let mut noisy = requests.clone();
        for (i, name) in noise_names.iter().enumerate() {
            // Unknown names in a known category, and known names in an
            // unknown category, are both noise
            noisy.push(noise_event("network-timeline", &format!("{name}X"), i as f64));
            noisy.push(noise_event(name, "SendRequest", i as f64));
        }

        let clean_records = correlate(&requests, None, "http://localhost/").unwrap();
        let noisy_records = correlate(&noisy, None, "http://localhost/").unwrap();
        prop_assert_eq!(clean_records, noisy_records);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_marker_truncation_boundary(
        timestamps in prop::collection::vec(0u32..100, 1..20),
        cutoff in 0u32..100,
    ) {
        // Property: requests at or before the marker survive, requests
        // strictly after it are dropped, and survivor order is preserved
        let mut events: Vec<TraceEvent> = timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| send_request(&i.to_string(), &format!("/asset-{i}.js"), *ts as f64))
            .collect();
        events.push(serde_json::from_value(json!({
            "category": "user-timing",
            "name": "mark_end",
            "timestamp": cutoff as f64,
            "args": {}
        })).unwrap());

        let records = correlate(&events, Some("mark_end"), "http://localhost/").unwrap();

        let expected: Vec<String> = timestamps
            .iter()
            .enumerate()
            .filter(|(_, ts)| **ts <= cutoff)
            .map(|(i, _)| i.to_string())
            .collect();
        let actual: Vec<String> = records.into_iter().map(|r| r.request_id).collect();
        prop_assert_eq!(actual, expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_overrun_absent_iff_within_budget(
        sizes in prop::collection::vec(0u64..100_000, 1..20),
        budget_kb in 1u64..200,
    ) {
        let budgets = vec![Budget {
            resource_type: ResourceType::Script,
            budget: budget_kb,
        }];
        let records: Vec<(Option<ResourceType>, Option<u64>)> = sizes
            .iter()
            .map(|size| (Some(ResourceType::Script), Some(*size)))
            .collect();

        let verdicts = audit(&budgets, records);
        prop_assert_eq!(verdicts.len(), 1);

        let total: u64 = sizes.iter().sum();
        let limit = budget_kb * BYTES_PER_KB;
        prop_assert_eq!(verdicts[0].size, total);
        if total <= limit {
            prop_assert_eq!(verdicts[0].size_over_budget, None);
        } else {
            prop_assert_eq!(verdicts[0].size_over_budget, Some(total - limit));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_diff_is_sorted_by_change_descending(
        previous_sizes in prop::collection::btree_map("[a-z]{1,6}\\.js", 0u64..10_000, 0..15),
        current_sizes in prop::collection::btree_map("[a-z]{1,6}\\.js", 0u64..10_000, 0..15),
    ) {
        let previous = snapshot_from_files(
            previous_sizes.into_iter().collect(),
        );
        let current = snapshot_from_files(
            current_sizes.into_iter().collect(),
        );

        let report = diff(&previous, &current, None).unwrap();
        for window in report.entries.windows(2) {
            prop_assert!(window[0].change >= window[1].change);
        }

        // Totals are internally consistent with the entries
        let change_sum: i64 = report.entries.iter().map(|e| e.change).sum();
        prop_assert_eq!(report.totals.change, change_sum);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_self_diff_is_empty(
        sizes in prop::collection::btree_map("[a-z]{1,6}\\.js", 0u64..10_000, 0..15),
    ) {
        let snapshot = snapshot_from_files(sizes.into_iter().collect());
        let report = diff(&snapshot, &snapshot.clone(), None).unwrap();
        prop_assert!(report.is_empty());
        prop_assert_eq!(report.totals.change, 0);
    }
}
