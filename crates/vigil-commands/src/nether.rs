// SPDX-License-Identifier: Apache-2.0

//! The nether tick: a seeded card deck pressing on the whole map.
//!
//! Each ticked day draws one card — a pure function of
//! `(deckState.seed, deckState.cursor)` — nudges one bounded modifier, and
//! writes one ledger entry per town. Equal seeds and state tick
//! identically; the ledger keeps only its most recent 120 entries.

use vigil_world::bounds;
use vigil_world::doc::{NetherLedgerEntry, WorldDoc};
use vigil_world::rng::{mix_u64, DetRng};

use crate::ctx::CmdCtx;
use crate::feed;

/// One nether card: which modifier it presses and how hard.
struct NetherCard {
    name: &'static str,
    delta: i64,
    /// Which modifier the card moves.
    target: ModTarget,
}

#[derive(Clone, Copy)]
enum ModTarget {
    LongNight,
    Omen,
    Scarcity,
    Threat,
}

const NETHER_CARDS: [NetherCard; 8] = [
    NetherCard { name: "long_shadow", delta: 1, target: ModTarget::LongNight },
    NetherCard { name: "pale_dawn", delta: -1, target: ModTarget::LongNight },
    NetherCard { name: "black_omen", delta: 2, target: ModTarget::Omen },
    NetherCard { name: "quiet_sky", delta: -1, target: ModTarget::Omen },
    NetherCard { name: "thin_larders", delta: 1, target: ModTarget::Scarcity },
    NetherCard { name: "found_cache", delta: -2, target: ModTarget::Scarcity },
    NetherCard { name: "howling_gate", delta: 2, target: ModTarget::Threat },
    NetherCard { name: "sealed_rift", delta: -2, target: ModTarget::Threat },
];

/// `nether tick <days>`
pub fn nether_tick(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, days: i64) -> bool {
    if days <= 0 {
        return ctx.refuse("days must be positive");
    }
    let towns: Vec<String> = doc.world.towns.keys().cloned().collect();
    for _ in 0..days {
        tick_one_day(doc, &towns);
    }
    bounds::cap_newest(&mut doc.world.nether.event_ledger, bounds::MAX_NETHER_LEDGER);
    let last_day = doc.world.nether.last_tick_day;
    let cursor = doc.world.nether.deck_state.cursor;
    feed::chronicle(
        &mut doc.world,
        ctx,
        "nether",
        None,
        None,
        "nether",
        format!("the nether turned {days} days"),
    );
    ctx.say(format!("nether day {last_day} (cursor {cursor})"));
    true
}

fn tick_one_day(doc: &mut WorldDoc, towns: &[String]) {
    let nether = &mut doc.world.nether;
    let day = nether.last_tick_day + 1;
    let cursor = nether.deck_state.cursor;
    let mut rng = DetRng::new(mix_u64(
        nether.deck_state.seed.unsigned_abs(),
        cursor.unsigned_abs(),
    ));
    let card = &NETHER_CARDS[(rng.next_bounded(NETHER_CARDS.len() as u64)) as usize];

    let cap = bounds::MAX_NETHER_MODIFIER;
    let slot = match card.target {
        ModTarget::LongNight => &mut nether.modifiers.long_night,
        ModTarget::Omen => &mut nether.modifiers.omen,
        ModTarget::Scarcity => &mut nether.modifiers.scarcity,
        ModTarget::Threat => &mut nether.modifiers.threat,
    };
    *slot = (*slot + card.delta).clamp(-cap, cap);

    for town in towns {
        nether.event_ledger.push(NetherLedgerEntry {
            day,
            card: card.name.to_owned(),
            town: town.clone(),
            delta: card.delta,
        });
    }
    nether.deck_state.cursor = cursor + 1;
    nether.last_tick_day = day;

    // Threat cards press directly on every town's threat level.
    if matches!(card.target, ModTarget::Threat) {
        for town in towns {
            if let Some(threat) = doc.world.threat.by_town.get_mut(town) {
                *threat = (*threat + card.delta).clamp(0, 100);
            }
        }
    }
}

/// `nether status` — read-only.
pub fn nether_status(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    let nether = &doc.world.nether;
    ctx.say(format!(
        "nether day {} cursor {} ledger {} entries",
        nether.last_tick_day,
        nether.deck_state.cursor,
        nether.event_ledger.len()
    ));
    let mods = &nether.modifiers;
    ctx.say(format!(
        "long_night {} omen {} scarcity {} threat {}",
        mods.long_night, mods.omen, mods.scarcity, mods.threat
    ));
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::nether_tick;
    use crate::ctx::CmdCtx;
    use crate::towns::ensure_town;
    use vigil_world::bounds;
    use vigil_world::doc::WorldDoc;
    use vigil_world::projection::project;

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    fn ticked(seed: i64, days: i64) -> WorldDoc {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        ensure_town(&mut doc.world, "alpha");
        ensure_town(&mut doc.world, "beta");
        doc.world.nether.deck_state.seed = seed;
        assert!(nether_tick(&mut doc, &mut c, days));
        doc
    }

    #[test]
    fn equal_seeds_tick_identically() {
        let a = ticked(99, 10);
        let b = ticked(99, 10);
        assert_eq!(project(&a).hash, project(&b).hash);
        assert_eq!(a.world.nether.deck_state.cursor, 10);
        assert_eq!(a.world.nether.last_tick_day, 10);
    }

    #[test]
    fn modifiers_stay_bounded_and_ledger_capped() {
        let doc = ticked(5, 200);
        let mods = &doc.world.nether.modifiers;
        for value in [mods.long_night, mods.omen, mods.scarcity, mods.threat] {
            assert!(value.abs() <= bounds::MAX_NETHER_MODIFIER);
        }
        assert!(doc.world.nether.event_ledger.len() <= bounds::MAX_NETHER_LEDGER);
    }

    #[test]
    fn non_positive_days_refused() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(!nether_tick(&mut doc, &mut c, 0));
        assert_eq!(doc.world.nether.deck_state.cursor, 0);
    }
}
