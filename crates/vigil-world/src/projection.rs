// SPDX-License-Identifier: Apache-2.0

//! Canonical snapshot projection and fingerprint.
//!
//! Determinism contract
//! - The fingerprint is a SHA-256 digest over a canonical byte stream: the
//!   projected tree serialized as JSON with lexicographically sorted object
//!   keys (`BTreeMap`-backed maps) and explicitly sorted sequences.
//! - Narrative/log data is not authoritative and is dropped before hashing:
//!   `chronicle`, `news`, per-agent/faction `archive`, `processedEventIds`,
//!   and the whole `execution` view.
//! - Sequence ordering is explicit and stable: by `id` for id-bearing lists,
//!   by `(tag, name, x, y, z)` for markers, by `offer_id` within a market,
//!   by `key` within decision options, by `(day-zero-padded-6, id)` for
//!   crier entries.
//! - Numeric normalization: non-finite floats serialize as `null`; strings
//!   are trimmed; absent optionals are omitted, never `null`.
//!
//! Two callers that agree on authoritative facts but disagree on log
//! contents or insertion order therefore agree on the hash. This is the sole
//! freshness check admitted by the execution adapter.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::doc::WorldDoc;

/// Result of projecting a world document.
#[derive(Debug, Clone)]
pub struct Projection {
    /// The canonical snapshot tree.
    pub snapshot: Value,
    /// Lowercase 64-hex SHA-256 of the canonical byte encoding.
    pub hash: String,
    /// The decision epoch (`clock.day`), or `None` when unparseable.
    pub decision_epoch: Option<i64>,
}

/// Project a world document to its canonical snapshot, fingerprint, and
/// decision epoch. Pure; no I/O.
#[must_use]
pub fn project(doc: &WorldDoc) -> Projection {
    let snapshot = canonical_value(doc);
    let encoded = snapshot.to_string();
    let mut hasher = Sha256::new();
    hasher.update(encoded.as_bytes());
    let hash = hex::encode(hasher.finalize());
    Projection {
        snapshot,
        hash,
        decision_epoch: Some(doc.world.clock.day),
    }
}

/// Build the canonical snapshot tree for `doc`.
#[must_use]
pub fn canonical_value(doc: &WorldDoc) -> Value {
    // Serialization of the typed document cannot fail; a `Null` here would
    // mean the document type itself stopped being serializable.
    let mut value = serde_json::to_value(doc).unwrap_or(Value::Null);
    debug_assert!(value.is_object(), "world document must project to an object");

    if let Some(root) = value.as_object_mut() {
        for section in ["agents", "factions"] {
            if let Some(map) = root.get_mut(section).and_then(Value::as_object_mut) {
                for entry in map.values_mut() {
                    if let Some(obj) = entry.as_object_mut() {
                        obj.remove("archive");
                    }
                }
            }
        }
        if let Some(world) = root.get_mut("world").and_then(Value::as_object_mut) {
            canonicalize_world(world);
        }
    }
    trim_strings(&mut value);
    value
}

fn canonicalize_world(world: &mut Map<String, Value>) {
    for incidental in ["chronicle", "news", "processedEventIds", "execution"] {
        world.remove(incidental);
    }

    for id_list in [
        "quests",
        "rumors",
        "decisions",
        "projects",
        "salvageRuns",
        "majorMissions",
    ] {
        sort_seq(world.get_mut(id_list), |v| key_str(v, "id"));
    }
    if let Some(events) = world.get_mut("events").and_then(Value::as_object_mut) {
        sort_seq(events.get_mut("active"), |v| key_str(v, "id"));
    }
    sort_seq(world.get_mut("markers"), marker_key);
    sort_seq(world.get_mut("markets"), |v| key_str(v, "name"));
    if let Some(markets) = world.get_mut("markets").and_then(Value::as_array_mut) {
        for market in markets {
            if let Some(m) = market.as_object_mut() {
                sort_seq(m.get_mut("offers"), |v| key_str(v, "offer_id"));
            }
        }
    }
    if let Some(decisions) = world.get_mut("decisions").and_then(Value::as_array_mut) {
        for decision in decisions {
            if let Some(d) = decision.as_object_mut() {
                sort_seq(d.get_mut("options"), |v| key_str(v, "key"));
            }
        }
    }
    if let Some(towns) = world.get_mut("towns").and_then(Value::as_object_mut) {
        for town in towns.values_mut() {
            if let Some(t) = town.as_object_mut() {
                sort_seq(t.get_mut("crierQueue"), day_id_key);
                sort_seq(t.get_mut("recentImpacts"), impact_key);
            }
        }
    }
    if let Some(nether) = world.get_mut("nether").and_then(Value::as_object_mut) {
        sort_seq(nether.get_mut("eventLedger"), ledger_key);
    }
}

fn sort_seq<F>(value: Option<&mut Value>, key: F)
where
    F: Fn(&Value) -> String,
{
    if let Some(arr) = value.and_then(Value::as_array_mut) {
        arr.sort_by(|a, b| key(a).cmp(&key(b)));
    }
}

fn key_str(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or("").to_owned()
}

fn key_num(v: &Value, key: &str) -> i64 {
    v.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn marker_key(v: &Value) -> String {
    let coord = |k: &str| v.get(k).and_then(Value::as_f64).unwrap_or(0.0);
    format!(
        "{}|{}|{}|{}|{}",
        key_str(v, "tag"),
        key_str(v, "name"),
        coord("x"),
        coord("y"),
        coord("z"),
    )
}

fn day_id_key(v: &Value) -> String {
    format!("{:06}|{}", key_num(v, "day"), key_str(v, "id"))
}

fn impact_key(v: &Value) -> String {
    format!(
        "{:06}|{}|{}|{}",
        key_num(v, "day"),
        key_str(v, "source"),
        key_num(v, "delta"),
        key_str(v, "text"),
    )
}

fn ledger_key(v: &Value) -> String {
    format!(
        "{:06}|{}|{}|{}",
        key_num(v, "day"),
        key_str(v, "town"),
        key_str(v, "card"),
        key_num(v, "delta"),
    )
}

fn trim_strings(value: &mut Value) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_owned();
            }
        }
        Value::Array(items) => {
            for item in items {
                trim_strings(item);
            }
        }
        Value::Object(map) => {
            for entry in map.values_mut() {
                trim_strings(entry);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::project;
    use crate::doc::{ChronicleRecord, Marker, NewsEntry, WorldDoc};

    fn marked_doc() -> WorldDoc {
        let mut doc = WorldDoc::fresh();
        doc.world.markers.push(Marker {
            name: "beta".to_owned(),
            x: 1.0,
            y: 64.0,
            z: -3.0,
            tag: Some("town".to_owned()),
            created_at: "2024-01-01T00:00:00Z".to_owned(),
        });
        doc.world.markers.push(Marker {
            name: "alpha".to_owned(),
            x: 0.0,
            y: 64.0,
            z: 0.0,
            tag: Some("town".to_owned()),
            created_at: "2024-01-02T00:00:00Z".to_owned(),
        });
        doc
    }

    #[test]
    fn hash_ignores_log_data() {
        let mut a = marked_doc();
        let b = marked_doc();
        a.world.chronicle.push(ChronicleRecord {
            record_id: 1,
            msg: "noise".to_owned(),
            ..ChronicleRecord::default()
        });
        a.world.news.push(NewsEntry {
            msg: "noise".to_owned(),
            ..NewsEntry::default()
        });
        a.world.processed_event_ids.push("ev1".to_owned());
        assert_eq!(project(&a).hash, project(&b).hash);
    }

    #[test]
    fn hash_ignores_sequence_insertion_order() {
        let a = marked_doc();
        let mut b = WorldDoc::fresh();
        // same markers, reversed insertion order
        let mut markers = a.world.markers.clone();
        markers.reverse();
        b.world.markers = markers;
        assert_eq!(project(&a).hash, project(&b).hash);
    }

    #[test]
    fn hash_sees_authoritative_changes() {
        let a = marked_doc();
        let mut b = marked_doc();
        b.world.clock.day = 2;
        assert_ne!(project(&a).hash, project(&b).hash);
        assert_eq!(project(&b).decision_epoch, Some(2));
    }

    #[test]
    fn projection_is_stable() {
        let doc = marked_doc();
        assert_eq!(project(&doc).hash, project(&doc).hash);
        assert_eq!(project(&doc).hash.len(), 64);
    }
}
