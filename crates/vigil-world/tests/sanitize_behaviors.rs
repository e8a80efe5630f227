// SPDX-License-Identifier: Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Targeted sanitizer behaviors over hand-built hostile fixtures. The
//! property tests assert the laws; these pin the individual degradations.

use serde_json::json;
use vigil_world::doc::{ActorRole, MissionStatus, Phase, QuestKind, Season};
use vigil_world::sanitize::sanitize;

#[test]
fn economy_keeps_only_finite_non_negative_integer_balances() {
    let doc = sanitize(&json!({
        "world": {
            "economy": {
                "ledger": {
                    "Mara": 12,
                    "Eli": -3,
                    "Odo": 2.5,
                    "Pike": "lots",
                    "Finn": 0
                },
                "minted_total": -5
            }
        }
    }));
    let economy = &doc.world.economy;
    assert_eq!(economy.currency, "emerald");
    assert_eq!(economy.ledger.len(), 2);
    assert_eq!(economy.ledger["Mara"], 12);
    assert_eq!(economy.ledger["Finn"], 0);
    assert_eq!(economy.minted_total, None, "negative cap is dropped");
}

#[test]
fn offers_need_positive_amount_price_and_unique_ids() {
    let doc = sanitize(&json!({
        "world": {
            "markets": [{
                "name": "bazaar",
                "offers": [
                    {"offer_id": "of0001", "owner": "Mara", "side": "sell", "amount": 3, "price": 5},
                    {"offer_id": "of0002", "owner": "Eli", "side": "buy", "amount": 0, "price": 5},
                    {"offer_id": "of0003", "owner": "Eli", "side": "buy", "amount": 2, "price": -1},
                    {"offer_id": "of0001", "owner": "Odo", "side": "sell", "amount": 9, "price": 9},
                    {"owner": "Pike", "side": "sell", "amount": 1, "price": 1}
                ]
            }]
        }
    }));
    let offers = &doc.world.markets[0].offers;
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].offer_id, "of0001");
    assert_eq!(offers[0].owner, "Mara");
    assert!(offers[0].active, "active defaults to true");
}

#[test]
fn quests_drop_unrecognized_types_and_bad_stamps() {
    let doc = sanitize(&json!({
        "world": {
            "quests": [
                {"id": "q0001", "type": "visit_town", "reward": 5,
                 "offered_at": "2024-01-01T00:00:00Z"},
                {"id": "q0002", "type": "slay_dragon", "reward": 5,
                 "offered_at": "2024-01-01T00:00:00Z"},
                {"id": "q0003", "type": "trade_n", "reward": -2,
                 "offered_at": "2024-01-01T00:00:00Z"},
                {"id": "q0004", "type": "trade_n", "reward": 5,
                 "offered_at": "sometime last winter"}
            ]
        }
    }));
    assert_eq!(doc.world.quests.len(), 1);
    assert_eq!(doc.world.quests[0].id, "q0001");
    assert_eq!(doc.world.quests[0].kind, QuestKind::VisitTown);
}

#[test]
fn townsfolk_quests_are_bounded_per_town() {
    let quests: Vec<_> = (0..30)
        .map(|i| {
            json!({
                "id": format!("q{:04}", i + 1),
                "type": "visit_town",
                "town": "alpha",
                "giver_role": "townsfolk",
                "reward": 1,
                "offered_at": "2024-01-01T00:00:00Z"
            })
        })
        .collect();
    let doc = sanitize(&json!({ "world": { "quests": quests } }));
    assert_eq!(doc.world.quests.len(), 24);
    // the most recent survive
    assert_eq!(doc.world.quests[0].id, "q0007");
    assert_eq!(doc.world.quests.last().unwrap().id, "q0030");
}

#[test]
fn double_active_missions_collapse_to_the_pointed_one() {
    let doc = sanitize(&json!({
        "world": {
            "towns": {
                "alpha": {"name": "Alpha", "activeMajorMissionId": "m0002"}
            },
            "majorMissions": [
                {"id": "m0001", "town": "alpha", "title": "first", "status": "active"},
                {"id": "m0002", "town": "alpha", "title": "second", "status": "active"}
            ]
        }
    }));
    let statuses: Vec<_> = doc.world.major_missions.iter().map(|m| (m.id.as_str(), m.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("m0001", MissionStatus::Briefed),
            ("m0002", MissionStatus::Active)
        ]
    );
    assert_eq!(
        doc.world.towns["alpha"].active_major_mission_id.as_deref(),
        Some("m0002")
    );
}

#[test]
fn nether_ledger_truncates_and_last_tick_day_covers_it() {
    let ledger: Vec<_> = (0..150)
        .map(|i| json!({"day": i + 1, "card": "long_shadow", "town": "alpha", "delta": 1}))
        .collect();
    let doc = sanitize(&json!({
        "world": {
            "nether": {
                "eventLedger": ledger,
                "modifiers": {"longNight": 40, "omen": -40, "scarcity": 3, "threat": 0},
                "lastTickDay": 2
            }
        }
    }));
    let nether = &doc.world.nether;
    assert_eq!(nether.event_ledger.len(), 120);
    assert_eq!(nether.event_ledger[0].day, 31, "oldest dropped");
    assert_eq!(nether.modifiers.long_night, 9);
    assert_eq!(nether.modifiers.omen, -9);
    assert_eq!(nether.last_tick_day, 150, "covers the max seen day");
}

#[test]
fn actors_get_synthetic_names() {
    let doc = sanitize(&json!({
        "world": {
            "towns": {"alpha": {"name": "Emberfall"}},
            "actors": {
                "alpha:warden": {"actorId": "alpha:warden", "townId": "alpha", "role": "warden"},
                "alpha:townsfolk": {"actorId": "alpha:townsfolk", "townId": "alpha", "role": "townsfolk"},
                "alpha:mayor": {"actorId": "alpha:mayor", "townId": "alpha", "role": "mayor",
                                 "name": "Alderman Hult"}
            }
        }
    }));
    assert_eq!(doc.world.actors["alpha:warden"].name, "Warden of Emberfall");
    assert_eq!(doc.world.actors["alpha:warden"].role, ActorRole::Warden);
    assert_eq!(
        doc.world.actors["alpha:townsfolk"].name,
        "Townsfolk of Emberfall"
    );
    assert_eq!(doc.world.actors["alpha:mayor"].name, "Alderman Hult");
}

#[test]
fn markers_drop_non_finite_and_dedupe_by_name() {
    let doc = sanitize(&json!({
        "world": {
            "markers": [
                {"name": "gate", "x": 0.0, "y": 64.0, "z": 0.0},
                {"name": "pit", "x": "NaN", "y": 64.0, "z": 0.0},
                {"name": "gate", "x": 5.0, "y": 70.0, "z": 5.0, "tag": "keep"}
            ]
        }
    }));
    assert_eq!(doc.world.markers.len(), 1);
    assert_eq!(doc.world.markers[0].x, 5.0, "latest record wins");
    assert_eq!(doc.world.markers[0].tag.as_deref(), Some("keep"));
}

#[test]
fn processed_event_ids_dedupe_keeping_the_last_occurrence() {
    let doc = sanitize(&json!({
        "world": {
            "processedEventIds": ["a", "b", 7, "a", "c", null]
        }
    }));
    assert_eq!(doc.world.processed_event_ids, vec!["b", "a", "c"]);
}

#[test]
fn clock_degrades_to_sane_values() {
    let doc = sanitize(&json!({
        "world": {
            "clock": {
                "day": -3,
                "phase": "night",
                "season": "monsoon",
                "updated_at": "yesterday-ish"
            }
        }
    }));
    let clock = &doc.world.clock;
    assert_eq!(clock.day, 1);
    assert_eq!(clock.phase, Phase::Night);
    assert_eq!(clock.season, Season::Dawn);
    assert_eq!(clock.updated_at, "1970-01-01T00:00:00Z");
}
