// SPDX-License-Identifier: Apache-2.0

//! Rumors and their side quests.

use vigil_world::doc::{IdCounters, Quest, QuestKind, QuestStatus, Rumor, WorldDoc};

use crate::ctx::CmdCtx;
use crate::feed;
use crate::quests::push_quest;

/// `rumor spawn <town> <kind> <strength> <detail> <ttl_days>`
pub fn rumor_spawn(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    town: &str,
    kind: &str,
    strength: i64,
    detail: &str,
    ttl_days: i64,
) -> bool {
    if strength < 0 {
        return ctx.refuse("strength must be non-negative");
    }
    if ttl_days < 0 {
        return ctx.refuse("ttl_days must be non-negative");
    }
    if !doc.world.towns.contains_key(town) {
        return ctx.refuse(format!("unknown town: {town}"));
    }
    let id = spawn_rumor_record(doc, ctx, town, kind, strength, detail, ttl_days);
    ctx.say(format!("rumor {id} is making the rounds in {town}"));
    true
}

/// Insert a rumor record; shared with decision effects. Returns the id.
pub fn spawn_rumor_record(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    town: &str,
    kind: &str,
    strength: i64,
    detail: &str,
    ttl_days: i64,
) -> String {
    let ordinal = IdCounters::take(&mut doc.world.ids.rumor);
    let id = format!("r{ordinal:04}");
    let expires_day = doc.world.clock.day + ttl_days.max(0);
    doc.world.rumors.push(Rumor {
        id: id.clone(),
        town: town.to_owned(),
        kind: kind.to_owned(),
        strength: strength.max(0),
        detail: detail.to_owned(),
        expires_day,
        resolved: false,
        quest_id: None,
    });
    feed::chronicle(
        &mut doc.world,
        ctx,
        "rumor",
        Some(town),
        None,
        "rumor",
        format!("whispers of {detail} ({kind}) in {town}"),
    );
    id
}

/// `rumor resolve <id>`
pub fn rumor_resolve(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, id: &str) -> bool {
    let Some(rumor) = doc.world.rumors.iter_mut().find(|r| r.id == id) else {
        return ctx.refuse(format!("unknown rumor: {id}"));
    };
    if rumor.resolved {
        return ctx.refuse(format!("rumor {id} is already laid to rest"));
    }
    rumor.resolved = true;
    let town = rumor.town.clone();
    feed::chronicle(
        &mut doc.world,
        ctx,
        "rumor",
        Some(&town),
        None,
        "rumor",
        format!("rumor {id} laid to rest"),
    );
    ctx.say(format!("rumor {id} resolved"));
    true
}

/// `rumor clear <id>` — removes the record outright.
pub fn rumor_clear(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, id: &str) -> bool {
    let before = doc.world.rumors.len();
    doc.world.rumors.retain(|r| r.id != id);
    if doc.world.rumors.len() == before {
        return ctx.refuse(format!("unknown rumor: {id}"));
    }
    ctx.say(format!("rumor {id} cleared"));
    true
}

/// `rumor quest <rumor_id>` — bind a side quest to an open rumor.
pub fn rumor_quest(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, rumor_id: &str) -> bool {
    let Some(rumor) = doc.world.rumors.iter().find(|r| r.id == rumor_id) else {
        return ctx.refuse(format!("unknown rumor: {rumor_id}"));
    };
    if rumor.resolved {
        return ctx.refuse(format!("rumor {rumor_id} is already laid to rest"));
    }
    if let Some(existing) = &rumor.quest_id {
        return ctx.refuse(format!("rumor {rumor_id} already has quest {existing}"));
    }
    let town = rumor.town.clone();
    let strength = rumor.strength;

    let quest_id = push_quest(
        doc,
        ctx,
        Quest {
            id: String::new(),
            kind: QuestKind::RumorTask,
            town: town.clone(),
            owner: None,
            giver_role: None,
            status: QuestStatus::Offered,
            // stronger rumors pay better
            reward: 4 + strength * 2,
            progress: 0,
            target: 0,
            target_town: None,
            rumor_id: Some(rumor_id.to_owned()),
            offered_at: String::new(),
            offered_day: 0,
        },
    );
    if let Some(rumor) = doc.world.rumors.iter_mut().find(|r| r.id == rumor_id) {
        rumor.quest_id = Some(quest_id.clone());
    }
    ctx.say(format!("side quest {quest_id} posted for rumor {rumor_id}"));
    true
}

/// `rumor list` — read-only.
pub fn rumor_list(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if doc.world.rumors.is_empty() {
        ctx.say("no rumors");
        return false;
    }
    for rumor in &doc.world.rumors {
        let state = if rumor.resolved { "resolved" } else { "live" };
        ctx.say(format!(
            "{} [{}] {} in {} until day {}",
            rumor.id, state, rumor.detail, rumor.town, rumor.expires_day
        ));
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{rumor_quest, rumor_resolve, rumor_spawn};
    use crate::ctx::CmdCtx;
    use crate::towns::ensure_town;
    use vigil_world::doc::{QuestKind, WorldDoc};

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    #[test]
    fn spawn_then_bind_quest_once() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        ensure_town(&mut doc.world, "alpha");
        doc.world.clock.day = 3;
        assert!(rumor_spawn(&mut doc, &mut c, "alpha", "supernatural", 2, "mist_shapes", 2));
        assert_eq!(doc.world.rumors[0].expires_day, 5);

        assert!(rumor_quest(&mut doc, &mut c, "r0001"));
        assert!(!rumor_quest(&mut doc, &mut c, "r0001"), "only one quest per rumor");
        let quest = &doc.world.quests[0];
        assert_eq!(quest.kind, QuestKind::RumorTask);
        assert_eq!(quest.rumor_id.as_deref(), Some("r0001"));
        assert_eq!(quest.reward, 8);
        assert_eq!(doc.world.rumors[0].quest_id.as_deref(), Some(quest.id.as_str()));
    }

    #[test]
    fn resolved_rumors_take_no_quest() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        ensure_town(&mut doc.world, "alpha");
        assert!(rumor_spawn(&mut doc, &mut c, "alpha", "mundane", 1, "missing_goat", 1));
        assert!(rumor_resolve(&mut doc, &mut c, "r0001"));
        assert!(!rumor_resolve(&mut doc, &mut c, "r0001"));
        assert!(!rumor_quest(&mut doc, &mut c, "r0001"));
    }
}
