// SPDX-License-Identifier: Apache-2.0

//! Post-commit invariant checks.
//!
//! Re-checks the persisted-snapshot invariants without mutating anything.
//! The store surfaces the result as `{ok, issues}`; a non-empty issue list
//! on a committed snapshot means a mutator or the sanitizer has a bug.

use std::collections::BTreeSet;

use crate::bounds;
use crate::doc::{MissionStatus, WorldDoc};

/// Outcome of an integrity sweep.
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    /// Human-readable descriptions of every violated invariant.
    pub issues: Vec<String>,
}

impl IntegrityReport {
    /// True when no invariant is violated.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Sweep `doc` for invariant violations.
#[must_use]
pub fn check(doc: &WorldDoc) -> IntegrityReport {
    let mut issues = Vec::new();
    let world = &doc.world;

    // processedEventIds: unique, bounded.
    let unique: BTreeSet<&String> = world.processed_event_ids.iter().collect();
    if unique.len() != world.processed_event_ids.len() {
        issues.push("processedEventIds contains duplicates".to_owned());
    }
    if world.processed_event_ids.len() > bounds::MAX_PROCESSED_EVENT_IDS {
        issues.push(format!(
            "processedEventIds length {} exceeds {}",
            world.processed_event_ids.len(),
            bounds::MAX_PROCESSED_EVENT_IDS
        ));
    }

    // Market offer ids unique per market.
    for market in &world.markets {
        let mut seen = BTreeSet::new();
        for offer in &market.offers {
            if !seen.insert(&offer.offer_id) {
                issues.push(format!(
                    "market {} repeats offer_id {}",
                    market.name, offer.offer_id
                ));
            }
        }
    }

    // Ledger non-negative; minted_total covers the circulating sum.
    let mut sum: i64 = 0;
    for (agent, balance) in &world.economy.ledger {
        if *balance < 0 {
            issues.push(format!("ledger balance for {agent} is negative"));
        }
        sum = sum.saturating_add(*balance);
    }
    if let Some(minted) = world.economy.minted_total {
        if sum > minted {
            issues.push(format!(
                "ledger sum {sum} exceeds minted_total {minted}"
            ));
        }
    }

    // At most one active major mission per town; pointer consistent.
    for (town_id, town) in &world.towns {
        let active: Vec<&str> = world
            .major_missions
            .iter()
            .filter(|m| m.town == *town_id && m.status == MissionStatus::Active)
            .map(|m| m.id.as_str())
            .collect();
        if active.len() > 1 {
            issues.push(format!("town {town_id} has {} active missions", active.len()));
        }
        match (&town.active_major_mission_id, active.first()) {
            (Some(pointer), Some(id)) if pointer != id => {
                issues.push(format!(
                    "town {town_id} points at mission {pointer} but {id} is active"
                ));
            }
            (Some(pointer), None) => {
                issues.push(format!(
                    "town {town_id} points at mission {pointer} but none is active"
                ));
            }
            _ => {}
        }
        if town.crier_queue.len() > bounds::MAX_CRIER_QUEUE {
            issues.push(format!("town {town_id} crier queue over cap"));
        }
        if town.recent_impacts.len() > bounds::MAX_RECENT_IMPACTS {
            issues.push(format!("town {town_id} recent impacts over cap"));
        }
    }

    // Quest rewards non-negative.
    for quest in &world.quests {
        if quest.reward < 0 {
            issues.push(format!("quest {} has negative reward", quest.id));
        }
    }

    // Feed caps.
    if world.chronicle.len() > bounds::MAX_CHRONICLE {
        issues.push("chronicle over cap".to_owned());
    }
    if world.news.len() > bounds::MAX_NEWS {
        issues.push("news over cap".to_owned());
    }
    if world.nether.event_ledger.len() > bounds::MAX_NETHER_LEDGER {
        issues.push("nether event ledger over cap".to_owned());
    }

    IntegrityReport { issues }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::check;
    use crate::doc::{MajorMission, MissionStatus, WorldDoc};

    #[test]
    fn fresh_world_is_clean() {
        assert!(check(&WorldDoc::fresh()).ok());
    }

    #[test]
    fn duplicate_event_ids_flagged() {
        let mut doc = WorldDoc::fresh();
        doc.world.processed_event_ids = vec!["a".to_owned(), "a".to_owned()];
        let report = check(&doc);
        assert!(!report.ok());
        assert!(report.issues[0].contains("duplicates"));
    }

    #[test]
    fn double_active_mission_flagged() {
        let mut doc = WorldDoc::fresh();
        doc.world.towns.insert("alpha".to_owned(), Default::default());
        for id in ["m0001", "m0002"] {
            doc.world.major_missions.push(MajorMission {
                id: id.to_owned(),
                town: "alpha".to_owned(),
                title: "t".to_owned(),
                phase: 1,
                status: MissionStatus::Active,
            });
        }
        assert!(!check(&doc).ok());
    }
}
