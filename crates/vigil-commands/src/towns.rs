// SPDX-License-Identifier: Apache-2.0

//! Town materialization and the `town status` query.
//!
//! Towns come into being the first time something names them: a marker
//! tagged `town:<id>`, an event, a mission. Materialization fills in the
//! default record, mood and threat entries, and the implicit actor set —
//! all deterministic, so two runs that name the same towns agree on the
//! projected world.

use vigil_world::actors::materialize_town_actors;
use vigil_world::doc::{Town, TownMood, WorldState};

use crate::ctx::CmdCtx;

/// Materialize `town_id` if absent; returns whether it already existed.
pub fn ensure_town(world: &mut WorldState, town_id: &str) -> bool {
    let existed = world.towns.contains_key(town_id);
    if !existed {
        world.towns.insert(
            town_id.to_owned(),
            Town {
                name: display_name(town_id),
                ..Town::default()
            },
        );
    }
    world
        .moods
        .by_town
        .entry(town_id.to_owned())
        .or_insert_with(TownMood::default);
    world.threat.by_town.entry(town_id.to_owned()).or_insert(0);
    materialize_town_actors(world, town_id);
    existed
}

/// Title-case a town id for display (`emberfall` → `Emberfall`).
fn display_name(town_id: &str) -> String {
    let mut chars = town_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `threat set <town> <n>`
pub fn threat_set(world: &mut WorldState, ctx: &mut CmdCtx<'_>, town_id: &str, value: i64) -> bool {
    if !world.towns.contains_key(town_id) {
        return ctx.refuse(format!("unknown town: {town_id}"));
    }
    let clamped = value.clamp(0, 100);
    world.threat.by_town.insert(town_id.to_owned(), clamped);
    ctx.say(format!("threat over {town_id} set to {clamped}"));
    true
}

/// `mood set <town> <fear|unrest|prosperity> <n>`
pub fn mood_set(
    world: &mut WorldState,
    ctx: &mut CmdCtx<'_>,
    town_id: &str,
    axis: &str,
    value: i64,
) -> bool {
    if !world.towns.contains_key(town_id) {
        return ctx.refuse(format!("unknown town: {town_id}"));
    }
    let clamped = value.clamp(0, 100);
    let mood = world.moods.by_town.entry(town_id.to_owned()).or_default();
    match axis {
        "fear" => mood.fear = clamped,
        "unrest" => mood.unrest = clamped,
        "prosperity" => mood.prosperity = clamped,
        other => return ctx.refuse(format!("unknown mood axis: {other}")),
    }
    ctx.say(format!("{axis} in {town_id} set to {clamped}"));
    true
}

/// `town region <town> <region>`
pub fn town_region(world: &mut WorldState, ctx: &mut CmdCtx<'_>, town_id: &str, region: &str) -> bool {
    let Some(town) = world.towns.get_mut(town_id) else {
        return ctx.refuse(format!("unknown town: {town_id}"));
    };
    town.region = Some(region.to_owned());
    ctx.say(format!("{town_id} lies in {region}"));
    true
}

/// `town tag <town> <tag>` — adds the tag once.
pub fn town_tag(world: &mut WorldState, ctx: &mut CmdCtx<'_>, town_id: &str, tag: &str) -> bool {
    let Some(town) = world.towns.get_mut(town_id) else {
        return ctx.refuse(format!("unknown town: {town_id}"));
    };
    if !town.tags.insert(tag.to_owned()) {
        return ctx.refuse(format!("{town_id} already tagged {tag}"));
    }
    ctx.say(format!("{town_id} tagged {tag}"));
    true
}

/// `actor status <actor_id> <status>`
pub fn actor_status(world: &mut WorldState, ctx: &mut CmdCtx<'_>, actor_id: &str, status: &str) -> bool {
    let Some(actor) = world.actors.get_mut(actor_id) else {
        return ctx.refuse(format!("unknown actor: {actor_id}"));
    };
    if actor.status == status {
        return ctx.refuse(format!("{actor_id} is already {status}"));
    }
    actor.status = status.to_owned();
    let name = actor.name.clone();
    ctx.say(format!("{name} is now {status}"));
    true
}

/// `town status <town>` — read-only summary lines.
pub fn town_status(world: &WorldState, ctx: &mut CmdCtx<'_>, town_id: &str) -> bool {
    let Some(town) = world.towns.get(town_id) else {
        return ctx.refuse(format!("unknown town: {town_id}"));
    };
    let mood = world.moods.by_town.get(town_id).cloned().unwrap_or_default();
    let threat = world.threat.by_town.get(town_id).copied().unwrap_or(0);
    ctx.say(format!(
        "{} [{}] hope {} dread {} threat {}",
        town.name, town.status, town.hope, town.dread, threat
    ));
    ctx.say(format!(
        "fear {} unrest {} prosperity {}",
        mood.fear, mood.unrest, mood.prosperity
    ));
    if let Some(mission_id) = &town.active_major_mission_id {
        ctx.say(format!("active mission: {mission_id}"));
    }
    let projects = world
        .projects
        .iter()
        .filter(|p| p.town == town_id && p.status == vigil_world::doc::WorkStatus::Active)
        .count();
    if projects > 0 {
        ctx.say(format!("active projects: {projects}"));
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::ensure_town;
    use vigil_world::doc::WorldState;

    #[test]
    fn materialization_is_idempotent() {
        let mut world = WorldState::default();
        assert!(!ensure_town(&mut world, "alpha"));
        let actors_before = world.actors.len();
        assert!(ensure_town(&mut world, "alpha"));
        assert_eq!(world.actors.len(), actors_before);
        assert_eq!(world.towns["alpha"].name, "Alpha");
        assert!(world.moods.by_town.contains_key("alpha"));
        assert_eq!(world.threat.by_town["alpha"], 0);
    }

    #[test]
    fn admin_setters_clamp_and_validate() {
        use super::{actor_status, mood_set, threat_set, town_tag};
        use crate::ctx::CmdCtx;

        let mut world = WorldState::default();
        let mut c = CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0);
        assert!(!threat_set(&mut world, &mut c, "alpha", 50), "unknown town");
        ensure_town(&mut world, "alpha");

        assert!(threat_set(&mut world, &mut c, "alpha", 250));
        assert_eq!(world.threat.by_town["alpha"], 100);
        assert!(mood_set(&mut world, &mut c, "alpha", "fear", -4));
        assert_eq!(world.moods.by_town["alpha"].fear, 0);
        assert!(!mood_set(&mut world, &mut c, "alpha", "dreadfulness", 5));

        assert!(town_tag(&mut world, &mut c, "alpha", "walled"));
        assert!(!town_tag(&mut world, &mut c, "alpha", "walled"), "once");

        assert!(actor_status(&mut world, &mut c, "alpha:warden", "wounded"));
        assert_eq!(world.actors["alpha:warden"].status, "wounded");
        assert!(!actor_status(&mut world, &mut c, "ghost:mayor", "gone"));
    }
}
