// SPDX-License-Identifier: Apache-2.0

//! Decision commands.
//!
//! Choosing applies the option's effects exactly once: mood/threat deltas,
//! reputation movement against the concerned factions, and at most one
//! spawned rumor. The `status` flip is the guard; a second choose on the
//! same decision is refused without mutation.

use vigil_world::doc::{DecisionStatus, EventMods, WorldDoc};

use crate::ctx::CmdCtx;
use crate::events::apply_mods;
use crate::feed;
use crate::rumors::spawn_rumor_record;

/// `decision list` — read-only.
pub fn decision_list(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    let open: Vec<_> = doc
        .world
        .decisions
        .iter()
        .filter(|d| d.status == DecisionStatus::Open)
        .collect();
    if open.is_empty() {
        ctx.say("no open decisions");
        return false;
    }
    for decision in open {
        ctx.say(format!("{} [{}] {}", decision.id, decision.town, decision.prompt));
    }
    false
}

/// `decision show <id>` — read-only.
pub fn decision_show(doc: &WorldDoc, ctx: &mut CmdCtx<'_>, id: &str) -> bool {
    let Some(decision) = doc.world.decisions.iter().find(|d| d.id == id) else {
        return ctx.refuse(format!("unknown decision: {id}"));
    };
    ctx.say(format!("{} [{}] {}", decision.id, decision.town, decision.prompt));
    for option in &decision.options {
        ctx.say(format!("  {}: {}", option.key, option.label));
    }
    if let Some(chosen) = &decision.chosen_key {
        ctx.say(format!("  chosen: {chosen}"));
    }
    false
}

/// `decision choose <id> <option_key>`
pub fn decision_choose(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, id: &str, option_key: &str) -> bool {
    let Some(decision) = doc.world.decisions.iter().find(|d| d.id == id) else {
        return ctx.refuse(format!("unknown decision: {id}"));
    };
    if decision.status == DecisionStatus::Chosen {
        return ctx.refuse(format!("decision {id} was already made"));
    }
    let Some(option) = decision.options.iter().find(|o| o.key == option_key) else {
        return ctx.refuse(format!("decision {id} has no option {option_key}"));
    };

    let town = decision.town.clone();
    let label = option.label.clone();
    let fx = option.effects.clone();

    apply_mods(
        &mut doc.world,
        &town,
        &EventMods {
            fear: fx.fear,
            unrest: fx.unrest,
            prosperity: fx.prosperity,
            threat: fx.threat_delta,
        },
    );
    // Positive rep eases a faction's hostility toward the player.
    for (faction, delta) in &fx.rep_delta {
        if let Some(state) = doc.world.factions.get_mut(faction) {
            state.hostility_to_player = (state.hostility_to_player - delta).clamp(0, 100);
        }
    }
    if let Some(spawn) = &fx.rumor_spawn {
        if doc.world.towns.contains_key(&spawn.town) {
            spawn_rumor_record(
                doc,
                ctx,
                &spawn.town.clone(),
                &spawn.kind.clone(),
                spawn.strength,
                &spawn.detail.clone(),
                spawn.ttl_days,
            );
        }
    }

    if let Some(decision) = doc.world.decisions.iter_mut().find(|d| d.id == id) {
        decision.status = DecisionStatus::Chosen;
        decision.chosen_key = Some(option_key.to_owned());
    }
    feed::chronicle(
        &mut doc.world,
        ctx,
        "decision",
        Some(&town),
        None,
        "decision",
        format!("{town} chose: {label}"),
    );
    feed::impact(&mut doc.world, &town, "decision", fx.threat_delta, &label);
    ctx.say(format!("so it is decided: {label}"));
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::decision_choose;
    use crate::ctx::CmdCtx;
    use crate::towns::ensure_town;
    use vigil_world::doc::{
        Decision, DecisionEffects, DecisionOption, DecisionStatus, RumorSpawn, WorldDoc,
    };

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    fn with_decision() -> WorldDoc {
        let mut doc = WorldDoc::fresh();
        ensure_town(&mut doc.world, "alpha");
        doc.world.decisions.push(Decision {
            id: "d0001".to_owned(),
            town: "alpha".to_owned(),
            prompt: "test?".to_owned(),
            options: vec![DecisionOption {
                key: "a".to_owned(),
                label: "option a".to_owned(),
                effects: DecisionEffects {
                    fear: -5,
                    threat_delta: 3,
                    rumor_spawn: Some(RumorSpawn {
                        town: "alpha".to_owned(),
                        kind: "mundane".to_owned(),
                        strength: 1,
                        detail: "spilled_grain".to_owned(),
                        ttl_days: 2,
                    }),
                    ..DecisionEffects::default()
                },
            }],
            status: DecisionStatus::Open,
            chosen_key: None,
            created_day: 1,
        });
        doc.world.moods.by_town.get_mut("alpha").unwrap().fear = 20;
        doc
    }

    #[test]
    fn choose_applies_effects_exactly_once() {
        let mut doc = with_decision();
        let mut c = ctx();
        assert!(decision_choose(&mut doc, &mut c, "d0001", "a"));
        assert_eq!(doc.world.moods.by_town["alpha"].fear, 15);
        assert_eq!(doc.world.threat.by_town["alpha"], 3);
        assert_eq!(doc.world.rumors.len(), 1);
        // choosing again is refused and mutates nothing
        assert!(!decision_choose(&mut doc, &mut c, "d0001", "a"));
        assert_eq!(doc.world.moods.by_town["alpha"].fear, 15);
        assert_eq!(doc.world.rumors.len(), 1);
    }

    #[test]
    fn bad_option_is_refused() {
        let mut doc = with_decision();
        let mut c = ctx();
        assert!(!decision_choose(&mut doc, &mut c, "d0001", "z"));
        assert_eq!(doc.world.decisions[0].status, DecisionStatus::Open);
    }
}
