// SPDX-License-Identifier: Apache-2.0

//! Quest lifecycle: `offered → accepted → in_progress → completed|cancelled`.
//!
//! Completion pays the reward exactly once; the status check is the guard,
//! and replays never reach it because the surrounding transaction dedups on
//! the operation's event id.

use vigil_world::doc::{
    IdCounters, Quest, QuestKind, QuestStatus, WorldDoc,
};

use crate::ctx::CmdCtx;
use crate::economy::{agent_known, mint_into};
use crate::feed;
use crate::reputation::grant_wanderer_if_earned;

/// `quest offer <town> <type> <reward> [<target>]`
pub fn quest_offer(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    town: &str,
    kind: QuestKind,
    reward: i64,
    target: Option<&str>,
) -> bool {
    if reward < 0 {
        return ctx.refuse("reward must be non-negative");
    }
    if !doc.world.towns.contains_key(town) {
        return ctx.refuse(format!("unknown town: {town}"));
    }
    let (trade_target, target_town) = match kind {
        QuestKind::TradeN => {
            let Some(n) = target.and_then(|t| t.parse::<i64>().ok()).filter(|n| *n > 0) else {
                return ctx.refuse("trade_n quests need a positive trade count");
            };
            (n, None)
        }
        QuestKind::VisitTown => {
            let destination = target.unwrap_or(town);
            if !doc.world.towns.contains_key(destination) {
                return ctx.refuse(format!("unknown town: {destination}"));
            }
            (0, Some(destination.to_owned()))
        }
        QuestKind::RumorTask => return ctx.refuse("rumor tasks are offered via `rumor quest`"),
    };
    let quest_id = push_quest(
        doc,
        ctx,
        Quest {
            id: String::new(),
            kind,
            town: town.to_owned(),
            owner: None,
            giver_role: None,
            status: QuestStatus::Offered,
            reward,
            progress: 0,
            target: trade_target,
            target_town,
            rumor_id: None,
            offered_at: String::new(),
            offered_day: 0,
        },
    );
    ctx.say(format!("quest {quest_id} offered in {town}"));
    true
}

/// Insert `quest`, filling id and offer stamps. Returns the id.
pub fn push_quest(doc: &mut WorldDoc, ctx: &CmdCtx<'_>, mut quest: Quest) -> String {
    let ordinal = IdCounters::take(&mut doc.world.ids.quest);
    quest.id = format!("q{ordinal:04}");
    quest.offered_at = ctx.now_iso.clone();
    quest.offered_day = doc.world.clock.day;
    let id = quest.id.clone();
    doc.world.quests.push(quest);
    id
}

/// `quest accept <agent> <quest_id>`
pub fn quest_accept(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, agent: &str, quest_id: &str) -> bool {
    if !agent_known(doc, agent) {
        return ctx.refuse(format!("unknown agent: {agent}"));
    }
    let Some(quest) = doc.world.quests.iter_mut().find(|q| q.id == quest_id) else {
        return ctx.refuse(format!("unknown quest: {quest_id}"));
    };
    if quest.status != QuestStatus::Offered {
        return ctx.refuse(format!("quest {quest_id} is not open"));
    }
    quest.status = QuestStatus::Accepted;
    quest.owner = Some(agent.to_owned());
    ctx.say(format!("{agent} accepted quest {quest_id}"));
    true
}

/// `quest complete <quest_id>` — pays the reward exactly once.
pub fn quest_complete(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, quest_id: &str) -> bool {
    let Some(idx) = doc.world.quests.iter().position(|q| q.id == quest_id) else {
        return ctx.refuse(format!("unknown quest: {quest_id}"));
    };
    let quest = doc.world.quests[idx].clone();
    if !matches!(quest.status, QuestStatus::Accepted | QuestStatus::InProgress) {
        return ctx.refuse(format!("quest {quest_id} is not in progress"));
    }
    let Some(owner) = quest.owner.clone() else {
        return ctx.refuse(format!("quest {quest_id} has no owner"));
    };
    if quest.kind == QuestKind::TradeN && quest.progress < quest.target {
        return ctx.refuse(format!(
            "quest {quest_id} at {}/{} trades",
            quest.progress, quest.target
        ));
    }
    finish_quest(doc, ctx, idx, &owner);
    ctx.say(format!("quest {quest_id} complete; {owner} rewarded"));
    true
}

/// `quest cancel <quest_id>`
pub fn quest_cancel(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, quest_id: &str) -> bool {
    let Some(quest) = doc.world.quests.iter_mut().find(|q| q.id == quest_id) else {
        return ctx.refuse(format!("unknown quest: {quest_id}"));
    };
    if matches!(quest.status, QuestStatus::Completed | QuestStatus::Cancelled) {
        return ctx.refuse(format!("quest {quest_id} is already settled"));
    }
    quest.status = QuestStatus::Cancelled;
    ctx.say(format!("quest {quest_id} cancelled"));
    true
}

/// `quest visit <quest_id>` — visit-style quests complete on arrival.
pub fn quest_visit(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, quest_id: &str) -> bool {
    let Some(idx) = doc.world.quests.iter().position(|q| q.id == quest_id) else {
        return ctx.refuse(format!("unknown quest: {quest_id}"));
    };
    let quest = doc.world.quests[idx].clone();
    if !matches!(quest.status, QuestStatus::Accepted | QuestStatus::InProgress) {
        return ctx.refuse(format!("quest {quest_id} is not in progress"));
    }
    if quest.kind == QuestKind::TradeN {
        return ctx.refuse("trade quests complete at the market, not by visiting");
    }
    let Some(owner) = quest.owner.clone() else {
        return ctx.refuse(format!("quest {quest_id} has no owner"));
    };
    finish_quest(doc, ctx, idx, &owner);

    if quest.kind == QuestKind::RumorTask {
        if let Some(rumor_id) = &quest.rumor_id {
            if let Some(rumor) = doc.world.rumors.iter_mut().find(|r| r.id == *rumor_id) {
                rumor.resolved = true;
            }
        }
        let completed = {
            let profile = &mut doc.agents.entry(owner.clone()).or_default().profile;
            profile.rumor_quests_completed += 1;
            profile.rumor_quests_completed
        };
        grant_wanderer_if_earned(doc, ctx, &owner, completed);
    }
    ctx.say(format!("quest {quest_id} complete; {owner} rewarded"));
    true
}

/// `quest list` — read-only.
pub fn quest_list(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if doc.world.quests.is_empty() {
        ctx.say("no quests");
        return false;
    }
    for quest in &doc.world.quests {
        let owner = quest.owner.as_deref().unwrap_or("-");
        ctx.say(format!(
            "{} {:?} {:?} town={} owner={} reward={}",
            quest.id, quest.kind, quest.status, quest.town, owner, quest.reward
        ));
    }
    false
}

fn finish_quest(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, idx: usize, owner: &str) {
    let (id, reward, town) = {
        let quest = &mut doc.world.quests[idx];
        quest.status = QuestStatus::Completed;
        (quest.id.clone(), quest.reward, quest.town.clone())
    };
    if reward > 0 {
        mint_into(doc, owner, reward);
    }
    let currency = doc.world.economy.currency.clone();
    feed::chronicle(
        &mut doc.world,
        ctx,
        "quest",
        Some(&town),
        None,
        "quest",
        format!("{owner} finished {id} for {reward} {currency}"),
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{quest_accept, quest_cancel, quest_complete, quest_offer, quest_visit};
    use crate::ctx::CmdCtx;
    use crate::economy::mint;
    use crate::towns::ensure_town;
    use vigil_world::doc::{QuestKind, QuestStatus, WorldDoc};

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    fn seeded() -> (WorldDoc, CmdCtx<'static>) {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        ensure_town(&mut doc.world, "alpha");
        assert!(mint(&mut doc, &mut c, "Mara", 10));
        (doc, c)
    }

    #[test]
    fn visit_quest_full_lifecycle() {
        let (mut doc, mut c) = seeded();
        assert!(quest_offer(&mut doc, &mut c, "alpha", QuestKind::VisitTown, 5, None));
        assert!(quest_accept(&mut doc, &mut c, "Mara", "q0001"));
        assert!(quest_visit(&mut doc, &mut c, "q0001"));
        assert_eq!(doc.world.quests[0].status, QuestStatus::Completed);
        assert_eq!(doc.world.economy.ledger["Mara"], 15);
        // completion pays once: the quest is settled now
        assert!(!quest_visit(&mut doc, &mut c, "q0001"));
        assert!(!quest_complete(&mut doc, &mut c, "q0001"));
        assert_eq!(doc.world.economy.ledger["Mara"], 15);
    }

    #[test]
    fn trade_quest_needs_progress() {
        let (mut doc, mut c) = seeded();
        assert!(quest_offer(&mut doc, &mut c, "alpha", QuestKind::TradeN, 7, Some("3")));
        assert!(quest_accept(&mut doc, &mut c, "Mara", "q0001"));
        assert!(!quest_complete(&mut doc, &mut c, "q0001"), "0/3 trades");
        doc.world.quests[0].progress = 3;
        assert!(quest_complete(&mut doc, &mut c, "q0001"));
        assert_eq!(doc.world.economy.ledger["Mara"], 17);
    }

    #[test]
    fn offers_validate_inputs() {
        let (mut doc, mut c) = seeded();
        assert!(!quest_offer(&mut doc, &mut c, "ghost_town", QuestKind::VisitTown, 5, None));
        assert!(!quest_offer(&mut doc, &mut c, "alpha", QuestKind::TradeN, 5, None), "missing count");
        assert!(!quest_offer(&mut doc, &mut c, "alpha", QuestKind::RumorTask, 5, None));
        assert!(!quest_offer(&mut doc, &mut c, "alpha", QuestKind::VisitTown, -1, None));
        assert!(doc.world.quests.is_empty());
    }

    #[test]
    fn cancel_only_open_quests() {
        let (mut doc, mut c) = seeded();
        assert!(quest_offer(&mut doc, &mut c, "alpha", QuestKind::VisitTown, 0, None));
        assert!(quest_cancel(&mut doc, &mut c, "q0001"));
        assert!(!quest_cancel(&mut doc, &mut c, "q0001"));
        assert_eq!(doc.world.quests[0].status, QuestStatus::Cancelled);
    }
}
