// SPDX-License-Identifier: Apache-2.0

//! Bounded feed appends: chronicle, news, crier queue, recent impacts.
//!
//! Every append enforces its cap (drop oldest) so no mutator can push a
//! committed snapshot over the documented bounds.

use vigil_world::bounds;
use vigil_world::doc::{
    ChronicleRecord, CrierEntry, IdCounters, ImpactEntry, NewsEntry, WorldState,
};

use crate::ctx::CmdCtx;
use crate::hooks::Effect;

/// Append a chronicle record.
pub fn chronicle(
    world: &mut WorldState,
    ctx: &mut CmdCtx<'_>,
    source_id: &str,
    town_id: Option<&str>,
    faction_id: Option<&str>,
    kind: &str,
    msg: impl Into<String>,
) {
    let msg = msg.into();
    let record_id = IdCounters::take(&mut world.ids.chronicle);
    world.chronicle.push(ChronicleRecord {
        record_id,
        source_id: Some(source_id.to_owned()),
        town_id: town_id.map(str::to_owned),
        faction_id: faction_id.map(str::to_owned),
        at: ctx.now_millis,
        kind: kind.to_owned(),
        msg: msg.clone(),
        meta: None,
    });
    bounds::cap_newest(&mut world.chronicle, bounds::MAX_CHRONICLE);
    if ctx.chronicle_preview.is_none() {
        ctx.chronicle_preview = Some(msg);
    }
}

/// Append a news entry and defer its broadcast effect.
pub fn news(
    world: &mut WorldState,
    ctx: &mut CmdCtx<'_>,
    town: Option<&str>,
    msg: impl Into<String>,
) {
    let msg = msg.into();
    world.news.push(NewsEntry {
        at: ctx.now_iso.clone(),
        day: world.clock.day,
        town: town.map(str::to_owned),
        msg: msg.clone(),
    });
    bounds::cap_newest(&mut world.news, bounds::MAX_NEWS);
    ctx.effect(Effect::News {
        town: town.map(str::to_owned),
        line: msg.clone(),
    });
    if ctx.news_preview.is_none() {
        ctx.news_preview = Some(msg);
    }
}

/// Enqueue a crier entry for `town_id`. No-op for unknown towns.
pub fn crier(world: &mut WorldState, town_id: &str, kind: &str, text: &str) {
    let day = world.clock.day;
    if !world.towns.contains_key(town_id) {
        return;
    }
    let ordinal = IdCounters::take(&mut world.ids.crier);
    if let Some(town) = world.towns.get_mut(town_id) {
        town.crier_queue.push(CrierEntry {
            id: format!("c{ordinal:04}"),
            day,
            kind: kind.to_owned(),
            text: text.to_owned(),
        });
        bounds::cap_newest(&mut town.crier_queue, bounds::MAX_CRIER_QUEUE);
    }
}

/// Record an impact against `town_id`. No-op for unknown towns.
pub fn impact(world: &mut WorldState, town_id: &str, source: &str, delta: i64, text: &str) {
    let day = world.clock.day;
    if let Some(town) = world.towns.get_mut(town_id) {
        town.recent_impacts.push(ImpactEntry {
            day,
            source: source.to_owned(),
            delta,
            text: text.to_owned(),
        });
        bounds::cap_newest(&mut town.recent_impacts, bounds::MAX_RECENT_IMPACTS);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{chronicle, news};
    use crate::ctx::CmdCtx;
    use vigil_world::bounds;
    use vigil_world::doc::WorldState;

    #[test]
    fn feeds_enforce_caps() {
        let mut world = WorldState::default();
        let mut ctx = CmdCtx::new("op", "1970-01-01T00:00:00Z".to_owned(), 0);
        for i in 0..(bounds::MAX_CHRONICLE + 20) {
            chronicle(&mut world, &mut ctx, "test", None, None, "note", format!("n{i}"));
            news(&mut world, &mut ctx, None, format!("n{i}"));
        }
        assert_eq!(world.chronicle.len(), bounds::MAX_CHRONICLE);
        assert_eq!(world.news.len(), bounds::MAX_NEWS);
        assert_eq!(world.chronicle[0].msg, "n20");
        assert_eq!(ctx.chronicle_preview.as_deref(), Some("n0"));
    }
}
