// SPDX-License-Identifier: Apache-2.0

//! Declared preconditions: pure predicates over the projected world.
//!
//! The set is closed. An unknown kind fails its check (classifying the
//! handoff `rejected`) rather than erroring — callers learn the vocabulary
//! from the outcome, and the world is never touched either way.

use vigil_commands::projects::SALVAGE_FOCUSES;
use vigil_proto::handoff::PreconditionSpec;
use vigil_proto::result::PreconditionOutcome;
use vigil_proto::Proposal;
use vigil_world::doc::{MissionStatus, QuestKind, WorldDoc};

/// Evaluate one declared precondition against `doc`.
#[must_use]
pub fn evaluate(doc: &WorldDoc, proposal: &Proposal, spec: &PreconditionSpec) -> PreconditionOutcome {
    let (passed, detail) = match spec.kind.as_str() {
        "project_exists" => {
            let target = spec.target_id.as_deref().unwrap_or_default();
            let found = doc.world.projects.iter().any(|p| p.id == target);
            (found, (!found).then(|| format!("no project {target}")))
        }
        "side_quest_exists" => {
            let target = spec.target_id.as_deref().unwrap_or_default();
            let found = doc
                .world
                .quests
                .iter()
                .any(|q| q.id == target && q.kind == QuestKind::RumorTask);
            (found, (!found).then(|| format!("no side quest {target}")))
        }
        "mission_absent" => {
            let town = spec
                .target_id
                .as_deref()
                .or(proposal.town_id.as_deref())
                .unwrap_or_default();
            let active = doc
                .world
                .major_missions
                .iter()
                .any(|m| m.town == town && m.status == MissionStatus::Active);
            (!active, active.then(|| format!("{town} has an active mission")))
        }
        "salvage_focus_supported" => {
            let expected = spec.expected.as_deref().unwrap_or_default();
            let supported = SALVAGE_FOCUSES.contains(&expected);
            (
                supported,
                (!supported).then(|| format!("unsupported focus {expected}")),
            )
        }
        "town_exists" => {
            let target = spec.target_id.as_deref().unwrap_or_default();
            let found = doc.world.towns.contains_key(target);
            (found, (!found).then(|| format!("no town {target}")))
        }
        "actor_exists" => {
            let target = spec.target_id.as_deref().unwrap_or_default();
            let found = doc.world.actors.contains_key(target);
            (found, (!found).then(|| format!("no actor {target}")))
        }
        unknown => (false, Some(format!("unknown precondition kind {unknown}"))),
    };
    PreconditionOutcome {
        spec: spec.clone(),
        passed,
        detail,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::evaluate;
    use vigil_proto::handoff::PreconditionSpec;
    use vigil_proto::Proposal;
    use vigil_world::doc::{Project, WorldDoc};

    fn spec(kind: &str, target: Option<&str>, expected: Option<&str>) -> PreconditionSpec {
        PreconditionSpec {
            kind: kind.to_owned(),
            target_id: target.map(str::to_owned),
            expected: expected.map(str::to_owned),
        }
    }

    #[test]
    fn project_exists_checks_the_list() {
        let mut doc = WorldDoc::fresh();
        let proposal = Proposal::default();
        assert!(!evaluate(&doc, &proposal, &spec("project_exists", Some("p0001"), None)).passed);
        doc.world.projects.push(Project {
            id: "p0001".to_owned(),
            ..Project::default()
        });
        assert!(evaluate(&doc, &proposal, &spec("project_exists", Some("p0001"), None)).passed);
    }

    #[test]
    fn unknown_kinds_fail_closed() {
        let doc = WorldDoc::fresh();
        let outcome = evaluate(&doc, &Proposal::default(), &spec("phase_of_moon", None, None));
        assert!(!outcome.passed);
        assert!(outcome.detail.as_deref().is_some_and(|d| d.contains("unknown")));
    }

    #[test]
    fn salvage_focus_compares_the_expected_value() {
        let doc = WorldDoc::fresh();
        let proposal = Proposal::default();
        assert!(
            evaluate(&doc, &proposal, &spec("salvage_focus_supported", None, Some("metal"))).passed
        );
        assert!(
            !evaluate(&doc, &proposal, &spec("salvage_focus_supported", None, Some("gold"))).passed
        );
    }
}
