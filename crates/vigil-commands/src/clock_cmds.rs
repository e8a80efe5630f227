// SPDX-License-Identifier: Apache-2.0

//! The world clock.
//!
//! `clock advance <n>` flips day↔night once per tick. Crossing from day
//! into night is a night boundary, and night boundaries do the world's
//! housekeeping in a fixed order:
//!
//! 1. increment `clock.day`;
//! 2. auto-draw exactly one event from the seeded deck (cursor =
//!    `events.index`) against a deterministically rotated town;
//! 3. expire rumors whose `expires_day` fell behind the new day;
//! 4. apply mood-threshold narration;
//! 5. on contract days (2, 4, 6), emit 1–2 offered contracts per town,
//!    deterministic from `(town, day)`.
//!
//! Every step is a pure function of the working document, so replaying the
//! same tick sequence on two isolated stores yields identical projections.

use vigil_world::bounds;
use vigil_world::doc::{Phase, Quest, QuestKind, QuestStatus, WorldDoc};
use vigil_world::rng::{mix_str, mix_u64, DetRng};

use crate::ctx::CmdCtx;
use crate::events::draw_card;
use crate::feed;
use crate::quests::push_quest;

/// Days on which towns put out fresh contracts.
const CONTRACT_DAYS: [i64; 3] = [2, 4, 6];

/// Mood level at which narration fires.
const MOOD_NARRATION_THRESHOLD: i64 = 70;

/// `clock advance <n>`
pub fn clock_advance(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, ticks: i64) -> bool {
    if ticks <= 0 {
        return ctx.refuse("ticks must be positive");
    }
    for _ in 0..ticks {
        advance_one_tick(doc, ctx);
    }
    doc.world.clock.updated_at = ctx.now_iso.clone();
    let clock = &doc.world.clock;
    ctx.say(format!(
        "day {} ({:?}, {:?})",
        clock.day, clock.phase, clock.season
    ));
    true
}

fn advance_one_tick(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>) {
    match doc.world.clock.phase {
        Phase::Day => {
            doc.world.clock.phase = Phase::Night;
            doc.world.clock.day += 1;
            on_night_boundary(doc, ctx);
        }
        Phase::Night => {
            doc.world.clock.phase = Phase::Day;
        }
    }
}

fn on_night_boundary(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>) {
    let day = doc.world.clock.day;

    // One card against a rotating town. No towns, no draw.
    let towns: Vec<String> = doc.world.towns.keys().cloned().collect();
    if !towns.is_empty() {
        let slot = (doc.world.events.index.unsigned_abs() as usize) % towns.len();
        let town = towns[slot].clone();
        draw_card(doc, ctx, &town);
    }

    expire_rumors(doc, ctx, day);
    narrate_moods(doc, ctx);
    if CONTRACT_DAYS.contains(&day) {
        emit_contracts(doc, ctx, day);
    }
}

fn expire_rumors(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, day: i64) {
    let expired: Vec<(String, String)> = doc
        .world
        .rumors
        .iter()
        .filter(|r| !r.resolved && r.expires_day < day)
        .map(|r| (r.id.clone(), r.town.clone()))
        .collect();
    if expired.is_empty() {
        return;
    }
    doc.world
        .rumors
        .retain(|r| r.resolved || r.expires_day >= day);
    for (id, town) in expired {
        feed::chronicle(
            &mut doc.world,
            ctx,
            "clock",
            Some(&town),
            None,
            "rumor",
            format!("rumor {id} faded with the night"),
        );
    }
}

fn narrate_moods(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>) {
    let towns: Vec<String> = doc.world.towns.keys().cloned().collect();
    for town in towns {
        let Some(mood) = doc.world.moods.by_town.get(&town).cloned() else {
            continue;
        };
        if mood.fear >= MOOD_NARRATION_THRESHOLD {
            feed::chronicle(
                &mut doc.world,
                ctx,
                "clock",
                Some(&town),
                None,
                "mood",
                format!("fear grips {town}"),
            );
            feed::crier(&mut doc.world, &town, "mood", "stay within the walls after dark");
        }
        if mood.unrest >= MOOD_NARRATION_THRESHOLD {
            feed::chronicle(
                &mut doc.world,
                ctx,
                "clock",
                Some(&town),
                None,
                "mood",
                format!("unrest boils in {town}"),
            );
        }
        if mood.prosperity >= MOOD_NARRATION_THRESHOLD {
            feed::news(
                &mut doc.world,
                ctx,
                Some(&town),
                format!("trade thrives in {town}"),
            );
        }
    }
}

fn emit_contracts(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, day: i64) {
    let seed = doc.world.events.seed;
    let towns: Vec<String> = doc.world.towns.keys().cloned().collect();
    for town in towns {
        let mut rng = DetRng::new(mix_str(mix_u64(seed.unsigned_abs(), day.unsigned_abs()), &town));
        let count = 1 + rng.next_bounded(2);
        for _ in 0..count {
            let quest = if rng.next_bounded(2) == 0 {
                Quest {
                    kind: QuestKind::TradeN,
                    target: 2 + rng.next_bounded(3) as i64,
                    ..contract_base(&town, 3 + rng.next_bounded(6) as i64)
                }
            } else {
                Quest {
                    kind: QuestKind::VisitTown,
                    target_town: Some(town.clone()),
                    ..contract_base(&town, 3 + rng.next_bounded(6) as i64)
                }
            };
            let id = push_quest(doc, ctx, quest);
            feed::crier(
                &mut doc.world,
                &town,
                "contract",
                &format!("work posted: {id}"),
            );
        }
        trim_townsfolk_quests(doc, &town);
    }
}

fn contract_base(town: &str, reward: i64) -> Quest {
    Quest {
        id: String::new(),
        kind: QuestKind::VisitTown,
        town: town.to_owned(),
        owner: None,
        giver_role: Some("townsfolk".to_owned()),
        status: QuestStatus::Offered,
        reward,
        progress: 0,
        target: 0,
        target_town: None,
        rumor_id: None,
        offered_at: String::new(),
        offered_day: 0,
    }
}

/// Keep only the most recent townsfolk-originated quests per town.
fn trim_townsfolk_quests(doc: &mut WorldDoc, town: &str) {
    let indexes: Vec<usize> = doc
        .world
        .quests
        .iter()
        .enumerate()
        .filter(|(_, q)| q.town == town && q.giver_role.as_deref() == Some("townsfolk"))
        .map(|(i, _)| i)
        .collect();
    if indexes.len() <= bounds::MAX_TOWNSFOLK_QUESTS_PER_TOWN {
        return;
    }
    let excess: Vec<usize> = indexes
        .iter()
        .take(indexes.len() - bounds::MAX_TOWNSFOLK_QUESTS_PER_TOWN)
        .copied()
        .collect();
    let mut keep = 0usize;
    doc.world.quests.retain(|_| {
        let drop = excess.contains(&keep);
        keep += 1;
        !drop
    });
}

/// `clock season <dawn|long_night|thaw|harvest>`
pub fn clock_season(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, season: vigil_world::doc::Season) -> bool {
    if doc.world.clock.season == season {
        return ctx.refuse("the season is already upon us");
    }
    doc.world.clock.season = season;
    doc.world.clock.updated_at = ctx.now_iso.clone();
    feed::news(
        &mut doc.world,
        ctx,
        None,
        format!("the season turns: {season:?}"),
    );
    ctx.say(format!("season set to {season:?}"));
    true
}

/// `clock status` — read-only.
pub fn clock_status(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    let clock = &doc.world.clock;
    ctx.say(format!(
        "day {} ({:?}, {:?}), updated {}",
        clock.day, clock.phase, clock.season, clock.updated_at
    ));
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::clock_advance;
    use crate::ctx::CmdCtx;
    use crate::towns::ensure_town;
    use vigil_world::doc::{Phase, WorldDoc};

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    #[test]
    fn one_tick_crosses_into_night_and_draws_once() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        ensure_town(&mut doc.world, "alpha");
        let index_before = doc.world.events.index;
        assert!(clock_advance(&mut doc, &mut c, 1));
        assert_eq!(doc.world.clock.phase, Phase::Night);
        assert_eq!(doc.world.clock.day, 2);
        assert_eq!(doc.world.events.index, index_before + 1);
        assert_eq!(doc.world.events.active.len(), 1);
    }

    #[test]
    fn night_to_day_draws_nothing() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        ensure_town(&mut doc.world, "alpha");
        assert!(clock_advance(&mut doc, &mut c, 1)); // day -> night, draws
        let drawn = doc.world.events.index;
        assert!(clock_advance(&mut doc, &mut c, 1)); // night -> day
        assert_eq!(doc.world.events.index, drawn);
        assert_eq!(doc.world.clock.day, 2);
    }

    #[test]
    fn contracts_appear_on_contract_days() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        ensure_town(&mut doc.world, "alpha");
        // Day 1 -> tick twice per day; day 2 is a contract day.
        assert!(clock_advance(&mut doc, &mut c, 1));
        let contracts = doc
            .world
            .quests
            .iter()
            .filter(|q| q.giver_role.as_deref() == Some("townsfolk"))
            .count();
        assert!((1..=2).contains(&contracts), "got {contracts}");
    }

    #[test]
    fn rumor_expiry_runs_on_the_boundary() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        ensure_town(&mut doc.world, "alpha");
        doc.world.rumors.push(vigil_world::doc::Rumor {
            id: "r0001".to_owned(),
            town: "alpha".to_owned(),
            kind: "mundane".to_owned(),
            strength: 1,
            detail: "old_tale".to_owned(),
            expires_day: 1,
            resolved: false,
            quest_id: None,
        });
        assert!(clock_advance(&mut doc, &mut c, 1)); // day becomes 2; 1 < 2 expires
        assert!(doc.world.rumors.is_empty());
    }

    #[test]
    fn zero_ticks_is_refused() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(!clock_advance(&mut doc, &mut c, 0));
    }
}
