// SPDX-License-Identifier: Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Property laws for the sanitizer and the projection.
//!
//! The generators below produce hostile half-shaped documents on purpose:
//! wrong types, missing ids, out-of-range numbers, duplicate keys. The laws
//! must hold for all of them.

use proptest::prelude::*;
use serde_json::{json, Value};
use vigil_world::projection::project;
use vigil_world::sanitize::sanitize;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(|n| json!(n)),
        any::<f64>().prop_map(|f| json!(f)),
        "[a-z_]{0,12}".prop_map(Value::from),
    ]
}

fn arbitrary_json() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-z_]{1,10}", inner, 0..5)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn world_shaped() -> impl Strategy<Value = Value> {
    // A document with the right top-level spine but chaotic interiors.
    (arbitrary_json(), arbitrary_json(), arbitrary_json()).prop_map(|(a, f, w)| {
        json!({ "agents": a, "factions": f, "world": w })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sanitize_never_panics(v in arbitrary_json()) {
        let _ = sanitize(&v);
    }

    #[test]
    fn sanitize_is_idempotent(v in world_shaped()) {
        let once = sanitize(&v);
        let reserialized = serde_json::to_value(&once).unwrap();
        let twice = sanitize(&reserialized);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn projection_is_idempotent(v in world_shaped()) {
        let doc = sanitize(&v);
        let first = project(&doc);
        // Rebuild a document from the canonical snapshot; its projection
        // must agree with the original fingerprint.
        let rebuilt = sanitize(&first.snapshot);
        let second = project(&rebuilt);
        prop_assert_eq!(first.hash, second.hash);
    }

    #[test]
    fn projection_hash_is_stable(v in world_shaped()) {
        let doc = sanitize(&v);
        prop_assert_eq!(project(&doc).hash, project(&doc).hash);
    }
}

#[test]
fn fresh_world_round_trips() {
    let fresh = vigil_world::WorldDoc::fresh();
    let v = serde_json::to_value(&fresh).unwrap();
    assert_eq!(sanitize(&v), fresh);
}
