use std::collections::HashSet;

use qrand_core::{
    FailureKind, RequestedCount, ResponseNormalizer, SourceCatalog, SourceHealth,
};
use serde_json::{json, Value};

#[derive(Clone)]
struct SourceCase {
    name: &'static str,
    enabled: bool,
    sample_success: Value,
    expected: Vec<i64>,
}

fn source_cases() -> Vec<SourceCase> {
    vec![
        SourceCase {
            name: "ANU QRNG (wp-json endpoint)",
            enabled: false,
            sample_success: json!({"success": true, "data": [12, 200, 7]}),
            expected: vec![12, 200, 7],
        },
        SourceCase {
            name: "HotBits",
            enabled: false,
            sample_success: json!({"status": "success", "random-data": [1, 2, 3]}),
            expected: vec![1, 2, 3],
        },
        SourceCase {
            name: "QNu Labs QRNG",
            enabled: false,
            sample_success: json!({"success": true, "numbers": [9, 8]}),
            expected: vec![9, 8],
        },
        SourceCase {
            name: "ANU QRNG (jsonI endpoint)",
            enabled: true,
            sample_success: json!({
                "type": "uint8",
                "length": 3,
                "data": [17, 0, 255],
                "success": true
            }),
            expected: vec![17, 0, 255],
        },
        SourceCase {
            name: "QRandom.io",
            enabled: true,
            sample_success: json!({"numbers": [4, 44, 144], "elapsedTime": 0.2}),
            expected: vec![4, 44, 144],
        },
        SourceCase {
            name: "LfD QRNG (OTH Regensburg)",
            enabled: true,
            sample_success: json!({"length": "3", "qrn": "0A7FFF"}),
            expected: vec![10, 127, 255],
        },
    ]
}

#[test]
fn builtin_catalog_declares_every_known_source_in_priority_order() {
    let catalog = SourceCatalog::builtin();
    let names = catalog
        .sources()
        .iter()
        .map(|source| source.name())
        .collect::<Vec<_>>();
    let expected = source_cases()
        .iter()
        .map(|case| case.name)
        .collect::<Vec<_>>();

    assert_eq!(names, expected);
    let unique = names.iter().collect::<HashSet<_>>();
    assert_eq!(unique.len(), names.len(), "source names must be unique");
}

#[test]
fn only_reachable_sources_are_active_by_default() {
    let catalog = SourceCatalog::builtin();
    let active = catalog
        .active(&SourceHealth::default())
        .into_iter()
        .map(|source| source.name())
        .collect::<Vec<_>>();
    let expected = source_cases()
        .into_iter()
        .filter(|case| case.enabled)
        .map(|case| case.name)
        .collect::<Vec<_>>();

    assert_eq!(active, expected);
}

#[test]
fn every_source_renders_the_requested_count_into_its_endpoint() {
    let count = RequestedCount::new(42).expect("valid count");

    for source in SourceCatalog::builtin().sources() {
        let endpoint = source.endpoint(count);
        assert!(
            endpoint.starts_with("https://"),
            "source '{}': endpoint must be https",
            source.name()
        );
        assert!(
            endpoint.contains("42"),
            "source '{}': endpoint must carry the count",
            source.name()
        );
        assert!(
            !endpoint.contains("{count}"),
            "source '{}': placeholder left in endpoint",
            source.name()
        );
    }
}

#[test]
fn representative_success_payloads_normalize_for_all_sources() {
    let catalog = SourceCatalog::builtin();

    for case in source_cases() {
        let source = catalog
            .get(case.name)
            .unwrap_or_else(|| panic!("source '{}' missing from catalog", case.name));

        let numbers = ResponseNormalizer
            .normalize(&case.sample_success, source)
            .unwrap_or_else(|failure| panic!("source '{}': {failure}", case.name));

        assert_eq!(numbers, case.expected, "source '{}': numbers", case.name);
    }
}

#[test]
fn error_bodies_are_reported_as_api_failures_for_all_sources() {
    let catalog = SourceCatalog::builtin();
    let body = json!({"success": false, "status": "error", "message": "rate limited"});

    for source in catalog.sources() {
        let failure = ResponseNormalizer
            .normalize(&body, source)
            .expect_err("error body must not normalize");

        assert_eq!(
            failure.kind,
            FailureKind::ApiReportedFailure,
            "source '{}': failure kind",
            source.name()
        );
        assert!(
            failure.message.contains("rate limited"),
            "source '{}': upstream message kept",
            source.name()
        );
    }
}
