//! Property-based tests for the import pipeline.
//!
//! Property-based tests verify:
//! 1. **Flattening**: idempotent, and the same whether done at once or in steps
//! 2. **Merge keys**: every spelling of one instant lands on one key
//! 3. **Sanitization**: pivot responses with `NaN` become valid JSON
//! 4. **Group names**: collisions never change the group list
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p chronomerge --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p chronomerge --test property_tests
//! ```

use chrono::{TimeZone, Utc};
use indexmap::IndexMap;
use proptest::prelude::*;
use serde_json::{Map, Value, json};

use chronomerge::grouping::{GroupSet, group_and_transform_data};
use chronomerge::inference::{normalize_to_iso_date, parse_date_value, to_iso_key};
use chronomerge::input::{flatten_object, flatten_record};
use chronomerge::pivot::sanitize_nan;
use chronomerge::{FileConfig, FlatRecord};

// =============================================================================
// Test Strategies
// =============================================================================

/// Scalar and array leaves.
fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9 .]{0,8}".prop_map(Value::from),
        prop::collection::vec(any::<i32>(), 0..3).prop_map(|v| json!(v)),
    ]
}

/// Keys never contain dots, so flattened names cannot collide.
fn key() -> impl Strategy<Value = String> {
    "[a-z]{1,4}"
}

fn nested_value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 32, 4, |inner| {
        prop::collection::btree_map(key(), inner, 0..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    })
}

fn nested_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(key(), nested_value(), 0..5).prop_map(|m| m.into_iter().collect())
}

/// Components of a UTC instant with whole seconds.
fn instant_parts() -> impl Strategy<Value = (i32, u32, u32, u32, u32, u32)> {
    (2000i32..2099, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60)
}

/// Flatten only the top level of nesting.
fn flatten_one_level(object: &Map<String, Value>) -> FlatRecord {
    let mut out = FlatRecord::new();
    for (k, v) in object {
        match v {
            Value::Object(child) => {
                for (ck, cv) in child {
                    out.insert(format!("{}.{}", k, ck), cv.clone());
                }
            }
            other => {
                out.insert(k.clone(), other.clone());
            }
        }
    }
    out
}

// =============================================================================
// Flattening
// =============================================================================

proptest! {
    #[test]
    fn flatten_is_idempotent(object in nested_object()) {
        let flat = flatten_object(&object);
        prop_assert_eq!(flatten_record(&flat), flat);
    }

    #[test]
    fn flatten_in_steps_matches_flatten_at_once(object in nested_object()) {
        let stepwise = flatten_record(&flatten_one_level(&object));
        prop_assert_eq!(stepwise, flatten_object(&object));
    }

    #[test]
    fn flattened_values_are_never_objects(object in nested_object()) {
        prop_assert!(flatten_object(&object).values().all(|v| !v.is_object()));
    }
}

// =============================================================================
// Merge keys
// =============================================================================

proptest! {
    #[test]
    fn spellings_of_one_instant_share_a_key((y, mo, d, h, mi, s) in instant_parts()) {
        let spellings = [
            format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", y, mo, d, h, mi, s),
            format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.000Z", y, mo, d, h, mi, s),
            format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, mo, d, h, mi, s),
            format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}+00:00", y, mo, d, h, mi, s),
            format!("{:02}.{:02}.{:04} {:02}:{:02}:{:02}", d, mo, y, h, mi, s),
        ];
        let keys: Vec<Option<String>> = spellings.iter().map(|s| normalize_to_iso_date(s)).collect();
        prop_assert!(keys[0].is_some());
        for key in &keys {
            prop_assert_eq!(key, &keys[0]);
        }

        let millis = Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().timestamp_millis();
        let from_number = parse_date_value(&json!(millis)).map(|dt| to_iso_key(&dt));
        prop_assert_eq!(&from_number, &keys[0]);
    }

    #[test]
    fn same_instant_rows_merge_into_one_entry(
        (y, mo, d, h, mi, s) in instant_parts(),
        a in -1000.0f64..1000.0,
        b in -1000.0f64..1000.0,
    ) {
        let row = |date: String, value: f64| -> FlatRecord {
            serde_json::from_value(json!({"date": date, "value": value})).unwrap()
        };
        let mut files = IndexMap::new();
        files.insert("a".to_string(), FileConfig {
            date_column: "date".to_string(),
            value_column: "value".to_string(),
            raw_data: vec![row(format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", y, mo, d, h, mi, s), a)],
        });
        files.insert("b".to_string(), FileConfig {
            date_column: "date".to_string(),
            value_column: "value".to_string(),
            raw_data: vec![row(format!("{:02}/{:02}/{:04} {:02}:{:02}:{:02}", d, mo, y, h, mi, s), b)],
        });

        let mut groups = GroupSet::new();
        groups.initialize(&files);
        let merged = group_and_transform_data(&groups, &files);

        prop_assert_eq!(merged.len(), 1);
        let (_, values) = merged.iter().next().unwrap();
        prop_assert_eq!(values["Value Group 1"].len(), 2);
    }
}

// =============================================================================
// Pivot response sanitization
// =============================================================================

proptest! {
    #[test]
    fn nan_cells_become_null(cells in prop::collection::vec(prop::option::of(-1e6f64..1e6), 1..8)) {
        let body = format!(
            "[{{{}}}]",
            cells
                .iter()
                .enumerate()
                .map(|(i, c)| match c {
                    Some(v) => format!("\"c{}\": {}", i, v),
                    None => format!("\"c{}\": NaN", i),
                })
                .collect::<Vec<_>>()
                .join(", ")
        );

        let parsed: Value = serde_json::from_str(&sanitize_nan(&body)).unwrap();
        for (i, cell) in cells.iter().enumerate() {
            let value = &parsed[0][format!("c{}", i)];
            match cell {
                None => prop_assert!(value.is_null()),
                Some(_) => prop_assert!(value.is_number()),
            }
        }
    }

    #[test]
    fn sanitizing_valid_json_keeps_it_valid(texts in prop::collection::vec("[a-zA-Z:, ]{0,12}", 0..6)) {
        let body = serde_json::to_string(&texts).unwrap();
        prop_assert!(serde_json::from_str::<Value>(&sanitize_nan(&body)).is_ok());
    }
}

// =============================================================================
// Group names
// =============================================================================

proptest! {
    #[test]
    fn case_variants_of_taken_names_are_rejected(upper in prop::collection::vec(any::<bool>(), 13)) {
        let taken: String = "value group 1"
            .chars()
            .zip(upper.iter())
            .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c })
            .collect();

        let mut files = IndexMap::new();
        files.insert("a".to_string(), FileConfig {
            date_column: "date".to_string(),
            value_column: "value".to_string(),
            raw_data: Vec::new(),
        });
        let mut groups = GroupSet::new();
        groups.initialize(&files);
        let id = groups.add_group();
        let before = groups.groups().to_vec();

        prop_assert!(groups.rename_group(&id, &taken).is_err());
        prop_assert_eq!(groups.groups(), before.as_slice());
    }
}
