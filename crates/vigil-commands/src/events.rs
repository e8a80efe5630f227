// SPDX-License-Identifier: Apache-2.0

//! The seeded event deck.
//!
//! A draw is a pure function of `(events.seed, events.index)`: the same
//! seed and cursor always produce the same card, and the cursor advances by
//! exactly one per draw. Each drawn card applies its mood/threat mods to
//! the target town and, when the town has no open decision, poses one —
//! the card's dilemma — whose options carry the card's decision effects.

use vigil_world::doc::{
    ActiveEvent, Decision, DecisionEffects, DecisionOption, DecisionStatus, EventMods,
    IdCounters, WorldDoc, WorldState,
};
use vigil_world::rng::{mix_u64, DetRng};

use crate::ctx::CmdCtx;
use crate::feed;

/// One card in the event deck.
struct EventCard {
    kind: &'static str,
    headline: &'static str,
    mods: EventMods,
    duration_days: i64,
    prompt: &'static str,
    options: [(&'static str, &'static str, DecisionEffects); 2],
}

fn effects(fear: i64, unrest: i64, prosperity: i64, threat_delta: i64) -> DecisionEffects {
    DecisionEffects {
        fear,
        unrest,
        prosperity,
        threat_delta,
        rep_delta: std::collections::BTreeMap::new(),
        rumor_spawn: None,
    }
}

fn deck() -> Vec<EventCard> {
    vec![
        EventCard {
            kind: "mist_shapes",
            headline: "shapes move in the mist beyond the walls",
            mods: EventMods { fear: 8, unrest: 2, prosperity: 0, threat: 5 },
            duration_days: 2,
            prompt: "The mist thickens. Send wardens out, or bar the gates?",
            options: [
                ("patrol", "Send the wardens out", effects(-4, 0, 0, -3)),
                ("bar_gates", "Bar the gates until dawn", effects(2, 3, -2, 0)),
            ],
        },
        EventCard {
            kind: "raid_scare",
            headline: "riders were seen circling the far fields",
            mods: EventMods { fear: 10, unrest: 6, prosperity: 0, threat: 10 },
            duration_days: 1,
            prompt: "Riders on the ridge. Muster the militia, or buy them off?",
            options: [
                ("muster", "Muster the militia", effects(-3, 4, -2, -6)),
                ("tribute", "Send tribute", effects(0, -2, -6, -4)),
            ],
        },
        EventCard {
            kind: "good_harvest",
            headline: "the harvest came in heavier than hoped",
            mods: EventMods { fear: -4, unrest: -2, prosperity: 12, threat: 0 },
            duration_days: 3,
            prompt: "Granaries are full. Feast now, or store against the long night?",
            options: [
                ("feast", "Hold a feast", effects(-6, -4, 4, 0)),
                ("store", "Fill the stores", effects(0, 2, 2, -2)),
            ],
        },
        EventCard {
            kind: "strange_omen",
            headline: "an omen was read in the smoke over the square",
            mods: EventMods { fear: 6, unrest: 2, prosperity: 0, threat: 3 },
            duration_days: 2,
            prompt: "The omen divides the town. Consult the priest, or forbid the talk?",
            options: [
                ("consult", "Consult the priest", effects(-3, -1, 0, 0)),
                ("forbid", "Forbid omen-talk", effects(2, 5, 0, 0)),
            ],
        },
        EventCard {
            kind: "wandering_trader",
            headline: "a wandering trader has set out her wares",
            mods: EventMods { fear: 0, unrest: 0, prosperity: 6, threat: 0 },
            duration_days: 1,
            prompt: "The trader asks for an escort onward. Grant it?",
            options: [
                ("escort", "Grant an escort", effects(0, 0, 3, 1)),
                ("refuse", "Turn her away", effects(1, 1, -2, 0)),
            ],
        },
        EventCard {
            kind: "grave_whispers",
            headline: "whispers rise from the old gravefield",
            mods: EventMods { fear: 12, unrest: 3, prosperity: -2, threat: 6 },
            duration_days: 2,
            prompt: "The gravefield will not stay quiet. Salt the ground, or post a vigil?",
            options: [
                ("salt", "Salt the ground", effects(-4, 0, -2, -3)),
                ("vigil", "Post a night vigil", effects(-2, 2, 0, -4)),
            ],
        },
    ]
}

/// Apply `mods` to a town's mood and threat, clamped to `[0, 100]`.
pub fn apply_mods(world: &mut WorldState, town: &str, mods: &EventMods) {
    if let Some(mood) = world.moods.by_town.get_mut(town) {
        mood.fear = (mood.fear + mods.fear).clamp(0, 100);
        mood.unrest = (mood.unrest + mods.unrest).clamp(0, 100);
        mood.prosperity = (mood.prosperity + mods.prosperity).clamp(0, 100);
    }
    if let Some(threat) = world.threat.by_town.get_mut(town) {
        *threat = (*threat + mods.threat).clamp(0, 100);
    }
}

/// `event seed <n>` — reseed the deck and rewind the cursor.
pub fn event_seed(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, seed: i64) -> bool {
    doc.world.events.seed = seed;
    doc.world.events.index = 0;
    ctx.say(format!("event deck seeded with {seed}"));
    true
}

/// `event draw <town>` — draw the next card against a town.
pub fn event_draw(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town: &str) -> bool {
    if !doc.world.towns.contains_key(town) {
        return ctx.refuse(format!("unknown town: {town}"));
    }
    draw_card(doc, ctx, town);
    true
}

/// Draw one card against `town`: apply mods, record the active event,
/// advance the cursor, and pose the card's dilemma when the town has no
/// open decision.
pub fn draw_card(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town: &str) {
    let cards = deck();
    let seed = doc.world.events.seed;
    let index = doc.world.events.index;
    let mut rng = DetRng::new(mix_u64(seed as u64, index as u64));
    let Some(card) = rng.pick(&cards) else { return };

    apply_mods(&mut doc.world, town, &card.mods);

    let ordinal = IdCounters::take(&mut doc.world.ids.event);
    let day = doc.world.clock.day;
    doc.world.events.active.push(ActiveEvent {
        id: format!("e{ordinal:04}"),
        kind: card.kind.to_owned(),
        town: town.to_owned(),
        starts_day: day,
        ends_day: day + card.duration_days,
        mods: card.mods.clone(),
    });
    doc.world.events.index = index + 1;

    let has_open_decision = doc
        .world
        .decisions
        .iter()
        .any(|d| d.town == town && d.status == DecisionStatus::Open);
    if !has_open_decision {
        let ordinal = IdCounters::take(&mut doc.world.ids.decision);
        doc.world.decisions.push(Decision {
            id: format!("d{ordinal:04}"),
            town: town.to_owned(),
            prompt: card.prompt.to_owned(),
            options: card
                .options
                .iter()
                .map(|(key, label, fx)| DecisionOption {
                    key: (*key).to_owned(),
                    label: (*label).to_owned(),
                    effects: fx.clone(),
                })
                .collect(),
            status: DecisionStatus::Open,
            chosen_key: None,
            created_day: day,
        });
    }

    feed::chronicle(
        &mut doc.world,
        ctx,
        "event",
        Some(town),
        None,
        "event",
        format!("{}: {}", card.kind, card.headline),
    );
    feed::news(&mut doc.world, ctx, Some(town), card.headline.to_owned());
    ctx.say(format!("event {} strikes {town}", card.kind));
}

/// `event clear <id>`
pub fn event_clear(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, id: &str) -> bool {
    let before = doc.world.events.active.len();
    doc.world.events.active.retain(|e| e.id != id);
    if doc.world.events.active.len() == before {
        return ctx.refuse(format!("unknown event: {id}"));
    }
    ctx.say(format!("event {id} cleared"));
    true
}

/// `event list` — read-only.
pub fn event_list(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if doc.world.events.active.is_empty() {
        ctx.say("no active events");
        return false;
    }
    for event in &doc.world.events.active {
        ctx.say(format!(
            "{} {} in {} (day {}–{})",
            event.id, event.kind, event.town, event.starts_day, event.ends_day
        ));
    }
    false
}
