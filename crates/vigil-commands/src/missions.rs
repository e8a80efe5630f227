// SPDX-License-Identifier: Apache-2.0

//! Major missions: one per town, mayor-brokered.
//!
//! `mayor talk` briefs a mission (and cries it), `mayor accept` promotes it
//! to the town's single active mission, `mission advance` moves the phase,
//! and the terminal verbs set a three-day cooldown and move the town's
//! hope/dread.

use vigil_world::doc::{IdCounters, MajorMission, MissionStatus, WorldDoc};

use crate::ctx::CmdCtx;
use crate::feed;

/// Days a town rests between major missions.
const MISSION_COOLDOWN_DAYS: i64 = 3;

/// Hope gained / dread shed on mission completion.
const COMPLETE_HOPE: i64 = 8;
const COMPLETE_DREAD: i64 = -4;

/// Hope lost / dread gained on mission failure.
const FAIL_HOPE: i64 = -5;
const FAIL_DREAD: i64 = 6;

/// Mission titles, rotated deterministically per town.
const MISSION_TITLES: [&str; 4] = [
    "Relight the beacon line",
    "Break the siege of the granary road",
    "Escort the winter caravan",
    "Cleanse the flooded mine",
];

/// `mayor talk <town>`
pub fn mayor_talk(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town_id: &str) -> bool {
    let Some(town) = doc.world.towns.get(town_id) else {
        return ctx.refuse(format!("unknown town: {town_id}"));
    };
    if town.active_major_mission_id.is_some() {
        return ctx.refuse(format!("{town_id} already has a mission underway"));
    }
    if doc.world.clock.day < town.major_mission_cooldown_until_day {
        return ctx.refuse(format!(
            "the mayor of {town_id} has nothing new until day {}",
            town.major_mission_cooldown_until_day
        ));
    }
    if let Some(existing) = doc
        .world
        .major_missions
        .iter()
        .find(|m| m.town == town_id && m.status == MissionStatus::Briefed)
    {
        let (id, title) = (existing.id.clone(), existing.title.clone());
        ctx.say(format!("the mayor repeats the briefing: {title} ({id})"));
        return false;
    }

    let ordinal = IdCounters::take(&mut doc.world.ids.mission);
    let id = format!("m{ordinal:04}");
    let title = MISSION_TITLES[(ordinal.unsigned_abs() as usize) % MISSION_TITLES.len()];
    doc.world.major_missions.push(MajorMission {
        id: id.clone(),
        town: town_id.to_owned(),
        title: title.to_owned(),
        phase: 1,
        status: MissionStatus::Briefed,
    });
    feed::crier(
        &mut doc.world,
        town_id,
        "mission_available",
        &format!("the mayor seeks help: {title}"),
    );
    feed::chronicle(
        &mut doc.world,
        ctx,
        "mission",
        Some(town_id),
        None,
        "mission",
        format!("mission briefed in {town_id}: {title}"),
    );
    ctx.say(format!("the mayor lays it out: {title} ({id})"));
    true
}

/// `mayor accept <town>` — promote the briefed mission to active.
pub fn mayor_accept(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town_id: &str) -> bool {
    if !doc.world.towns.contains_key(town_id) {
        return ctx.refuse(format!("unknown town: {town_id}"));
    }
    let has_active = doc
        .world
        .major_missions
        .iter()
        .any(|m| m.town == town_id && m.status == MissionStatus::Active);
    if has_active {
        return ctx.refuse(format!("{town_id} already has an active mission"));
    }
    let Some(mission) = doc
        .world
        .major_missions
        .iter_mut()
        .find(|m| m.town == town_id && m.status == MissionStatus::Briefed)
    else {
        return ctx.refuse(format!("no briefed mission in {town_id}"));
    };
    mission.status = MissionStatus::Active;
    let (id, title) = (mission.id.clone(), mission.title.clone());
    if let Some(town) = doc.world.towns.get_mut(town_id) {
        town.active_major_mission_id = Some(id.clone());
    }
    feed::chronicle(
        &mut doc.world,
        ctx,
        "mission",
        Some(town_id),
        None,
        "mission",
        format!("{town_id} takes up the mission: {title}"),
    );
    ctx.say(format!("mission {id} is underway"));
    true
}

/// `mission advance <town>`
pub fn mission_advance(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town_id: &str) -> bool {
    let Some(mission) = active_mission_mut(doc, town_id) else {
        return ctx.refuse(format!("no active mission in {town_id}"));
    };
    mission.phase += 1;
    let (id, phase) = (mission.id.clone(), mission.phase);
    ctx.say(format!("mission {id} advances to phase {phase}"));
    true
}

/// `mission complete <town>`
pub fn mission_complete(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town_id: &str) -> bool {
    finish_mission(doc, ctx, town_id, MissionStatus::Completed)
}

/// `mission fail <town>`
pub fn mission_fail(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, town_id: &str) -> bool {
    finish_mission(doc, ctx, town_id, MissionStatus::Failed)
}

fn finish_mission(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    town_id: &str,
    terminal: MissionStatus,
) -> bool {
    let Some(mission) = active_mission_mut(doc, town_id) else {
        return ctx.refuse(format!("no active mission in {town_id}"));
    };
    mission.status = terminal;
    let (id, title) = (mission.id.clone(), mission.title.clone());

    let day = doc.world.clock.day;
    let (hope_delta, dread_delta, verb) = match terminal {
        MissionStatus::Completed => (COMPLETE_HOPE, COMPLETE_DREAD, "completed"),
        _ => (FAIL_HOPE, FAIL_DREAD, "failed"),
    };
    if let Some(town) = doc.world.towns.get_mut(town_id) {
        town.active_major_mission_id = None;
        town.major_mission_cooldown_until_day = day + MISSION_COOLDOWN_DAYS;
        town.hope = (town.hope + hope_delta).clamp(0, 100);
        town.dread = (town.dread + dread_delta).clamp(0, 100);
    }
    feed::chronicle(
        &mut doc.world,
        ctx,
        "mission",
        Some(town_id),
        None,
        "mission",
        format!("mission {verb} in {town_id}: {title}"),
    );
    feed::news(
        &mut doc.world,
        ctx,
        Some(town_id),
        format!("word spreads: {title} {verb}"),
    );
    feed::impact(&mut doc.world, town_id, "mission", hope_delta, &title);
    ctx.say(format!("mission {id} {verb}"));
    true
}

fn active_mission_mut<'a>(doc: &'a mut WorldDoc, town_id: &str) -> Option<&'a mut MajorMission> {
    doc.world
        .major_missions
        .iter_mut()
        .find(|m| m.town == town_id && m.status == MissionStatus::Active)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{mayor_accept, mayor_talk, mission_advance, mission_complete, mission_fail};
    use crate::ctx::CmdCtx;
    use crate::towns::ensure_town;
    use vigil_world::doc::{MissionStatus, WorldDoc};
    use vigil_world::integrity;

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    fn with_town() -> WorldDoc {
        let mut doc = WorldDoc::fresh();
        ensure_town(&mut doc.world, "alpha");
        doc
    }

    #[test]
    fn talk_accept_advance_complete() {
        let mut doc = with_town();
        let mut c = ctx();
        assert!(mayor_talk(&mut doc, &mut c, "alpha"));
        assert!(!doc.world.towns["alpha"].crier_queue.is_empty());
        assert!(mayor_accept(&mut doc, &mut c, "alpha"));
        assert_eq!(
            doc.world.towns["alpha"].active_major_mission_id.as_deref(),
            Some("m0001")
        );
        assert!(mission_advance(&mut doc, &mut c, "alpha"));
        assert_eq!(doc.world.major_missions[0].phase, 2);

        let hope_before = doc.world.towns["alpha"].hope;
        assert!(mission_complete(&mut doc, &mut c, "alpha"));
        assert_eq!(doc.world.major_missions[0].status, MissionStatus::Completed);
        assert!(doc.world.towns["alpha"].active_major_mission_id.is_none());
        assert_eq!(doc.world.towns["alpha"].hope, hope_before + 8);
        assert_eq!(doc.world.towns["alpha"].major_mission_cooldown_until_day, 4);
        assert!(integrity::check(&doc).ok());
    }

    #[test]
    fn at_most_one_active_and_cooldown_blocks_talk() {
        let mut doc = with_town();
        let mut c = ctx();
        assert!(mayor_talk(&mut doc, &mut c, "alpha"));
        assert!(mayor_accept(&mut doc, &mut c, "alpha"));
        // while active: no second briefing, no second accept
        assert!(!mayor_talk(&mut doc, &mut c, "alpha"));
        assert!(!mayor_accept(&mut doc, &mut c, "alpha"));
        assert!(mission_fail(&mut doc, &mut c, "alpha"));
        // cooldown until day 4 blocks the next briefing
        assert!(!mayor_talk(&mut doc, &mut c, "alpha"));
        doc.world.clock.day = 4;
        assert!(mayor_talk(&mut doc, &mut c, "alpha"));
        assert!(integrity::check(&doc).ok());
    }

    #[test]
    fn repeat_briefing_is_not_a_mutation() {
        let mut doc = with_town();
        let mut c = ctx();
        assert!(mayor_talk(&mut doc, &mut c, "alpha"));
        assert!(!mayor_talk(&mut doc, &mut c, "alpha"), "repeat briefing");
        assert_eq!(doc.world.major_missions.len(), 1);
    }
}
