// SPDX-License-Identifier: Apache-2.0

//! Reputation and titles.
//!
//! Titles are a set: crossing a threshold grants the title at most once,
//! and the event-id dedup on the surrounding transaction keeps the grant
//! (and its narration) exactly-once across replays.

use vigil_world::doc::WorldDoc;

use crate::ctx::CmdCtx;
use crate::feed;

/// Faction reputation at which "Pact Friend" is granted.
pub const PACT_FRIEND_THRESHOLD: i64 = 5;

/// Completed rumor side-quests at which "Wanderer" is granted.
pub const WANDERER_THRESHOLD: i64 = 3;

/// `rep add <agent> <faction> <n>`
pub fn rep_add(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    agent: &str,
    faction: &str,
    amount: i64,
) -> bool {
    if amount == 0 {
        return ctx.refuse("rep delta must be non-zero");
    }
    if !doc.world.factions.contains_key(faction) && !doc.factions.contains_key(faction) {
        return ctx.refuse(format!("unknown faction: {faction}"));
    }
    let profile = &mut doc.agents.entry(agent.to_owned()).or_default().profile;
    let rep = profile.rep.entry(faction.to_owned()).or_insert(0);
    let before = *rep;
    *rep += amount;
    let after = *rep;
    ctx.say(format!("{agent} now stands at {after} with {faction}"));

    if before < PACT_FRIEND_THRESHOLD && after >= PACT_FRIEND_THRESHOLD {
        grant_title(doc, ctx, agent, "Pact Friend", Some(faction));
    }
    true
}

/// Grant "Wanderer" when the completed-rumor-quest count crosses the
/// threshold. Called from quest completion.
pub fn grant_wanderer_if_earned(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    agent: &str,
    completed: i64,
) {
    if completed >= WANDERER_THRESHOLD {
        grant_title(doc, ctx, agent, "Wanderer", None);
    }
}

fn grant_title(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    agent: &str,
    title: &str,
    faction: Option<&str>,
) {
    let titles = &mut doc.agents.entry(agent.to_owned()).or_default().profile.titles;
    if !titles.insert(title.to_owned()) {
        return; // already held
    }
    feed::chronicle(
        &mut doc.world,
        ctx,
        "rep",
        None,
        faction,
        "title",
        format!("{agent} earned the title {title}"),
    );
    feed::news(
        &mut doc.world,
        ctx,
        None,
        format!("{agent} is now known as {title}"),
    );
}

/// `faction add <id> [<doctrine>]`
pub fn faction_add(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, id: &str, doctrine: Option<&str>) -> bool {
    if doc.world.factions.contains_key(id) {
        return ctx.refuse(format!("faction {id} already exists"));
    }
    doc.world.factions.insert(
        id.to_owned(),
        vigil_world::doc::FactionState {
            name: id.to_owned(),
            towns: std::collections::BTreeSet::new(),
            doctrine: doctrine.unwrap_or_default().to_owned(),
            rivals: Vec::new(),
            hostility_to_player: 0,
            stability: 50,
        },
    );
    doc.factions.entry(id.to_owned()).or_default();
    feed::chronicle(
        &mut doc.world,
        ctx,
        "faction",
        None,
        Some(id),
        "faction",
        format!("the banners of {id} are raised"),
    );
    ctx.say(format!("faction {id} founded"));
    true
}

/// `faction note <faction> <text…>`
pub fn faction_note(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, faction: &str, note: &str) -> bool {
    if !doc.world.factions.contains_key(faction) && !doc.factions.contains_key(faction) {
        return ctx.refuse(format!("unknown faction: {faction}"));
    }
    let memory = doc.factions.entry(faction.to_owned()).or_default();
    memory.long_notes.push(vigil_world::doc::NoteEntry {
        at: ctx.now_iso.clone(),
        text: note.to_owned(),
        important: false,
    });
    vigil_world::bounds::cap_newest(
        &mut memory.long_notes,
        vigil_world::bounds::MAX_LONG_NOTES,
    );
    ctx.say(format!("noted for {faction}"));
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{rep_add, PACT_FRIEND_THRESHOLD};
    use crate::ctx::CmdCtx;
    use vigil_world::doc::{FactionState, WorldDoc};

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    fn with_faction() -> WorldDoc {
        let mut doc = WorldDoc::fresh();
        doc.world.factions.insert(
            "pact".to_owned(),
            FactionState {
                name: "The Pact".to_owned(),
                ..FactionState::default()
            },
        );
        doc
    }

    #[test]
    fn pact_friend_granted_once_at_threshold() {
        let mut doc = with_faction();
        let mut c = ctx();
        assert!(rep_add(&mut doc, &mut c, "Mara", "pact", PACT_FRIEND_THRESHOLD - 1));
        assert!(doc.agents["Mara"].profile.titles.is_empty());
        assert!(rep_add(&mut doc, &mut c, "Mara", "pact", 1));
        assert!(doc.agents["Mara"].profile.titles.contains("Pact Friend"));
        let chronicle_len = doc.world.chronicle.len();
        // Further gains re-cross nothing and grant nothing.
        assert!(rep_add(&mut doc, &mut c, "Mara", "pact", 3));
        assert_eq!(doc.world.chronicle.len(), chronicle_len);
    }

    #[test]
    fn unknown_faction_is_refused() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(!rep_add(&mut doc, &mut c, "Mara", "ghosts", 2));
        assert!(doc.agents.is_empty());
    }
}
