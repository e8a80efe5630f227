// SPDX-License-Identifier: Apache-2.0

//! The god command service: one entry point from command text to a
//! committed, replay-safe world mutation.
//!
//! Contract of [`GodCommandService::apply`]:
//! - a successful mutation returns `applied = true`;
//! - a replay of the same operation id returns `applied = false` (the
//!   transaction skips on the derived event id);
//! - validation failures return `applied = false` with a diagnostic line
//!   and leave the snapshot bit-identical (the mutator rejects, so nothing
//!   persists and the event id is not consumed);
//! - read-only verbs never open a transaction at all;
//! - runtime hooks fire only after the transaction commits.

use std::sync::Arc;

use tracing::debug;

use vigil_store::{TransactOptions, TxControl, WorldStore};
use vigil_world::doc::WorldDoc;
use vigil_world::{Clock, SystemClock};

use crate::ctx::CmdCtx;
use crate::error::CommandError;
use crate::hooks::{Effect, NullHooks, RuntimeHooks};
use crate::parse::{parse, GodCommand, ParseError};
use crate::{
    agents_cmds, clock_cmds, decisions, economy, events, intent, jobs, marks, markets, missions,
    nether, player, projects, quests, reputation, rumors, towns,
};

/// One command submission.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Agents present for this exchange (speaker attribution context).
    pub agents: Vec<String>,
    /// The command text.
    pub command: String,
    /// Caller-chosen operation id; the replay key.
    pub operation_id: String,
}

/// The canonical command outcome.
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    /// Whether a mutation was applied and committed.
    pub applied: bool,
    /// Diagnostic / narrative output lines.
    pub output_lines: Vec<String>,
    /// First chronicle line the command produced, if any.
    pub chronicle_preview: Option<String>,
    /// First news line the command produced, if any.
    pub news_preview: Option<String>,
}

impl CommandOutcome {
    fn not_applied(lines: Vec<String>) -> Self {
        Self {
            applied: false,
            output_lines: lines,
            chronicle_preview: None,
            news_preview: None,
        }
    }
}

/// The god command service.
pub struct GodCommandService {
    store: Arc<WorldStore>,
    hooks: Box<dyn RuntimeHooks>,
    clock: Arc<dyn Clock>,
}

impl GodCommandService {
    /// Service over `store` with no runtime hooks.
    #[must_use]
    pub fn new(store: Arc<WorldStore>) -> Self {
        Self::with_hooks(store, Box::new(NullHooks))
    }

    /// Service over `store` flushing effects into `hooks`.
    #[must_use]
    pub fn with_hooks(store: Arc<WorldStore>, hooks: Box<dyn RuntimeHooks>) -> Self {
        Self {
            store,
            hooks,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (tests pin it).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<WorldStore> {
        &self.store
    }

    /// Apply one god command.
    pub fn apply(&self, request: &CommandRequest) -> Result<CommandOutcome, CommandError> {
        let command = match parse(&request.command) {
            Ok(command) => command,
            Err(err @ ParseError::NonFinite(_)) => {
                return Err(CommandError::InvalidInput(err.to_string()));
            }
            Err(err) => return Ok(CommandOutcome::not_applied(vec![err.to_string()])),
        };

        let now_iso = self.clock.now_rfc3339();
        let now_millis = self.clock.now_millis();

        if is_query(&command) {
            let doc = self.store.snapshot();
            let mut ctx = CmdCtx::new(&request.operation_id, now_iso, now_millis);
            dispatch_query(&doc, &mut ctx, &command);
            return Ok(CommandOutcome::not_applied(ctx.lines));
        }

        let event_id = derive_event_id(&command, &request.operation_id);
        let outcome = self.store.transact(
            TransactOptions::with_event_id(event_id.clone()),
            |doc| run_mutator(doc, &request.operation_id, &now_iso, now_millis, &command),
        )?;

        if outcome.skipped {
            debug!(event_id, "command replay skipped");
            return Ok(CommandOutcome::not_applied(vec![
                "already done; nothing changes".to_owned(),
            ]));
        }
        let Some((result, effects)) = outcome.result else {
            return Ok(CommandOutcome::not_applied(vec![
                "no outcome recorded".to_owned(),
            ]));
        };
        if result.applied {
            self.hooks.flush(&effects);
        }
        Ok(result)
    }
}

fn run_mutator(
    doc: &mut WorldDoc,
    op_id: &str,
    now_iso: &str,
    now_millis: i64,
    command: &GodCommand,
) -> TxControl<(CommandOutcome, Vec<Effect>)> {
    let mut ctx = CmdCtx::new(op_id, now_iso.to_owned(), now_millis);
    let applied = dispatch(doc, &mut ctx, command);
    let effects = std::mem::take(&mut ctx.effects);
    let outcome = CommandOutcome {
        applied,
        output_lines: ctx.lines,
        chronicle_preview: ctx.chronicle_preview,
        news_preview: ctx.news_preview,
    };
    if applied {
        TxControl::Commit((outcome, effects))
    } else {
        TxControl::Reject((outcome, Vec::new()))
    }
}

/// Read-only verbs that never open a transaction.
fn is_query(command: &GodCommand) -> bool {
    matches!(
        command,
        GodCommand::MarkList
            | GodCommand::MarketList
            | GodCommand::QuestList
            | GodCommand::ClockStatus
            | GodCommand::EventList
            | GodCommand::RumorList
            | GodCommand::DecisionList
            | GodCommand::DecisionShow { .. }
            | GodCommand::ProjectList
            | GodCommand::NetherStatus
            | GodCommand::TownStatus { .. }
            | GodCommand::PlayerStatus
            | GodCommand::AgentStatus { .. }
    )
}

fn dispatch_query(doc: &WorldDoc, ctx: &mut CmdCtx<'_>, command: &GodCommand) {
    match command {
        GodCommand::MarkList => marks::mark_list(doc, ctx),
        GodCommand::MarketList => markets::market_list(doc, ctx),
        GodCommand::QuestList => quests::quest_list(doc, ctx),
        GodCommand::ClockStatus => clock_cmds::clock_status(doc, ctx),
        GodCommand::EventList => events::event_list(doc, ctx),
        GodCommand::RumorList => rumors::rumor_list(doc, ctx),
        GodCommand::DecisionList => decisions::decision_list(doc, ctx),
        GodCommand::DecisionShow { id } => decisions::decision_show(doc, ctx, id),
        GodCommand::ProjectList => projects::project_list(doc, ctx),
        GodCommand::NetherStatus => nether::nether_status(doc, ctx),
        GodCommand::TownStatus { town } => towns::town_status(&doc.world, ctx, town),
        GodCommand::PlayerStatus => player::player_status(doc, ctx),
        GodCommand::AgentStatus { agent } => agents_cmds::agent_status(doc, ctx, agent),
        _ => false,
    };
}

#[allow(clippy::too_many_lines)]
fn dispatch(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, command: &GodCommand) -> bool {
    match command {
        GodCommand::MarkAdd { name, x, y, z, tag } => {
            marks::mark_add(doc, ctx, name, *x, *y, *z, tag.as_deref())
        }
        GodCommand::MarkRemove { name } => marks::mark_remove(doc, ctx, name),
        GodCommand::JobSet {
            agent,
            role,
            home_marker,
        } => jobs::job_set(doc, ctx, agent, role, home_marker.as_deref()),
        GodCommand::JobClear { agent } => jobs::job_clear(doc, ctx, agent),
        GodCommand::Mint { agent, amount } => economy::mint(doc, ctx, agent, *amount),
        GodCommand::Transfer { src, dst, amount } => {
            economy::transfer(doc, ctx, src, dst, *amount)
        }
        GodCommand::MarketAdd { name, marker } => {
            markets::market_add(doc, ctx, name, marker.as_deref())
        }
        GodCommand::MarketRemove { name } => markets::market_remove(doc, ctx, name),
        GodCommand::OfferAdd {
            market,
            owner,
            side,
            amount,
            price,
        } => markets::offer_add(doc, ctx, market, owner, *side, *amount, *price),
        GodCommand::OfferCancel { market, offer_id } => {
            markets::offer_cancel(doc, ctx, market, offer_id)
        }
        GodCommand::Trade {
            market,
            offer_id,
            taker,
            qty,
        } => markets::trade(doc, ctx, market, offer_id, taker, *qty),
        GodCommand::QuestOffer {
            town,
            kind,
            reward,
            target,
        } => quests::quest_offer(doc, ctx, town, *kind, *reward, target.as_deref()),
        GodCommand::QuestAccept { agent, quest_id } => {
            quests::quest_accept(doc, ctx, agent, quest_id)
        }
        GodCommand::QuestComplete { quest_id } => quests::quest_complete(doc, ctx, quest_id),
        GodCommand::QuestCancel { quest_id } => quests::quest_cancel(doc, ctx, quest_id),
        GodCommand::QuestVisit { quest_id } => quests::quest_visit(doc, ctx, quest_id),
        GodCommand::ClockAdvance { ticks } => clock_cmds::clock_advance(doc, ctx, *ticks),
        GodCommand::EventSeed { seed } => events::event_seed(doc, ctx, *seed),
        GodCommand::EventDraw { town } => events::event_draw(doc, ctx, town),
        GodCommand::EventClear { id } => events::event_clear(doc, ctx, id),
        GodCommand::RumorSpawn {
            town,
            kind,
            strength,
            detail,
            ttl_days,
        } => rumors::rumor_spawn(doc, ctx, town, kind, *strength, detail, *ttl_days),
        GodCommand::RumorResolve { id } => rumors::rumor_resolve(doc, ctx, id),
        GodCommand::RumorClear { id } => rumors::rumor_clear(doc, ctx, id),
        GodCommand::RumorQuest { rumor_id } => rumors::rumor_quest(doc, ctx, rumor_id),
        GodCommand::DecisionChoose { id, option_key } => {
            decisions::decision_choose(doc, ctx, id, option_key)
        }
        GodCommand::MayorTalk { town } => missions::mayor_talk(doc, ctx, town),
        GodCommand::MayorAccept { town } => missions::mayor_accept(doc, ctx, town),
        GodCommand::MissionAdvance { town } => missions::mission_advance(doc, ctx, town),
        GodCommand::MissionComplete { town } => missions::mission_complete(doc, ctx, town),
        GodCommand::MissionFail { town } => missions::mission_fail(doc, ctx, town),
        GodCommand::ProjectStart { town, kind } => projects::project_start(doc, ctx, town, kind),
        GodCommand::ProjectAdvance { town, project_id } => {
            projects::project_advance(doc, ctx, town, project_id)
        }
        GodCommand::ProjectComplete { town, project_id } => {
            projects::project_complete(doc, ctx, town, project_id)
        }
        GodCommand::ProjectFail { town, project_id } => {
            projects::project_fail(doc, ctx, town, project_id)
        }
        GodCommand::SalvageStart { town, focus } => {
            projects::salvage_start(doc, ctx, town, focus)
        }
        GodCommand::SalvageAdvance { town, run_id } => {
            projects::salvage_advance(doc, ctx, town, run_id)
        }
        GodCommand::SalvageComplete { town, run_id } => {
            projects::salvage_complete(doc, ctx, town, run_id)
        }
        GodCommand::SalvageFail { town, run_id } => {
            projects::salvage_fail(doc, ctx, town, run_id)
        }
        GodCommand::RepAdd {
            agent,
            faction,
            amount,
        } => reputation::rep_add(doc, ctx, agent, faction, *amount),
        GodCommand::FactionAdd { faction, doctrine } => {
            reputation::faction_add(doc, ctx, faction, doctrine.as_deref())
        }
        GodCommand::FactionNote { faction, note } => {
            reputation::faction_note(doc, ctx, faction, note)
        }
        GodCommand::NetherTick { days } => nether::nether_tick(doc, ctx, *days),
        GodCommand::TownRegion { town, region } => {
            towns::town_region(&mut doc.world, ctx, town, region)
        }
        GodCommand::TownTag { town, tag } => towns::town_tag(&mut doc.world, ctx, town, tag),
        GodCommand::PlayerLegitimacy { delta } => player::player_legitimacy(doc, ctx, *delta),
        GodCommand::PlayerKill => player::player_kill(doc, ctx),
        GodCommand::PlayerRevive => player::player_revive(doc, ctx),
        GodCommand::RuleLethal { enabled } => player::rule_lethal(doc, ctx, *enabled),
        GodCommand::WarStart => player::war_start(doc, ctx),
        GodCommand::WarEnd => player::war_end(doc, ctx),
        GodCommand::ClockSeason { season } => clock_cmds::clock_season(doc, ctx, *season),
        GodCommand::ThreatSet { town, value } => {
            towns::threat_set(&mut doc.world, ctx, town, *value)
        }
        GodCommand::MoodSet { town, axis, value } => {
            towns::mood_set(&mut doc.world, ctx, town, axis, *value)
        }
        GodCommand::ActorStatus { actor_id, status } => {
            towns::actor_status(&mut doc.world, ctx, actor_id, status)
        }
        GodCommand::AgentTrust { agent, delta } => {
            agents_cmds::agent_trust(doc, ctx, agent, *delta)
        }
        GodCommand::AgentTrait {
            agent,
            trait_name,
            value,
        } => agents_cmds::agent_trait(doc, ctx, agent, trait_name, *value),
        GodCommand::AgentFlag { agent, flag } => agents_cmds::agent_flag(doc, ctx, agent, flag),
        GodCommand::AgentMood { agent, mood } => agents_cmds::agent_mood(doc, ctx, agent, mood),
        GodCommand::AgentSummary { agent, text } => {
            agents_cmds::agent_summary(doc, ctx, agent, text)
        }
        GodCommand::AgentIntent {
            agent,
            intent: chosen,
        } => intent::agent_intent(doc, ctx, agent, chosen),
        GodCommand::Say { agent, line } => agents_cmds::agent_say(doc, ctx, agent, line),
        // queries are routed before dispatch; reaching one here is a bug
        GodCommand::MarkList
        | GodCommand::MarketList
        | GodCommand::QuestList
        | GodCommand::ClockStatus
        | GodCommand::EventList
        | GodCommand::RumorList
        | GodCommand::DecisionList
        | GodCommand::DecisionShow { .. }
        | GodCommand::ProjectList
        | GodCommand::NetherStatus
        | GodCommand::TownStatus { .. }
        | GodCommand::PlayerStatus
        | GodCommand::AgentStatus { .. } => false,
    }
}

/// Derived event id: family, verb, operation id, plus a fan-out suffix for
/// commands addressed to a named principal.
fn derive_event_id(command: &GodCommand, op_id: &str) -> String {
    match command {
        GodCommand::MarkAdd { .. } => format!("mark:add:{op_id}"),
        GodCommand::MarkRemove { .. } => format!("mark:remove:{op_id}"),
        GodCommand::JobSet { agent, .. } => format!("job:set:{op_id}:agent:{agent}"),
        GodCommand::JobClear { agent } => format!("job:clear:{op_id}:agent:{agent}"),
        GodCommand::Mint { agent, .. } => format!("economy:mint:{op_id}:agent:{agent}"),
        GodCommand::Transfer { src, .. } => format!("economy:transfer:{op_id}:agent:{src}"),
        GodCommand::MarketAdd { .. } => format!("market:add:{op_id}"),
        GodCommand::MarketRemove { .. } => format!("market:remove:{op_id}"),
        GodCommand::OfferAdd { .. } => format!("offer:add:{op_id}"),
        GodCommand::OfferCancel { .. } => format!("offer:cancel:{op_id}"),
        GodCommand::Trade { .. } => format!("market:trade:{op_id}"),
        GodCommand::QuestOffer { .. } => format!("quest:offer:{op_id}"),
        GodCommand::QuestAccept { agent, .. } => format!("quest:accept:{op_id}:agent:{agent}"),
        GodCommand::QuestComplete { .. } => format!("quest:complete:{op_id}"),
        GodCommand::QuestCancel { .. } => format!("quest:cancel:{op_id}"),
        GodCommand::QuestVisit { .. } => format!("quest:visit:{op_id}"),
        GodCommand::ClockAdvance { .. } => format!("clock:advance:{op_id}"),
        GodCommand::EventSeed { .. } => format!("event:seed:{op_id}"),
        GodCommand::EventDraw { .. } => format!("event:draw:{op_id}"),
        GodCommand::EventClear { .. } => format!("event:clear:{op_id}"),
        GodCommand::RumorSpawn { .. } => format!("rumor:spawn:{op_id}"),
        GodCommand::RumorResolve { .. } => format!("rumor:resolve:{op_id}"),
        GodCommand::RumorClear { .. } => format!("rumor:clear:{op_id}"),
        GodCommand::RumorQuest { .. } => format!("rumor:quest:{op_id}"),
        GodCommand::DecisionChoose { .. } => format!("decision:choose:{op_id}"),
        GodCommand::MayorTalk { .. } => format!("mission:talk:{op_id}"),
        GodCommand::MayorAccept { .. } => format!("mission:accept:{op_id}"),
        GodCommand::MissionAdvance { .. } => format!("mission:advance:{op_id}"),
        GodCommand::MissionComplete { .. } => format!("mission:complete:{op_id}"),
        GodCommand::MissionFail { .. } => format!("mission:fail:{op_id}"),
        GodCommand::ProjectStart { .. } => format!("project:start:{op_id}"),
        GodCommand::ProjectAdvance { .. } => format!("project:advance:{op_id}"),
        GodCommand::ProjectComplete { .. } => format!("project:complete:{op_id}"),
        GodCommand::ProjectFail { .. } => format!("project:fail:{op_id}"),
        GodCommand::SalvageStart { .. } => format!("salvage:start:{op_id}"),
        GodCommand::SalvageAdvance { .. } => format!("salvage:advance:{op_id}"),
        GodCommand::SalvageComplete { .. } => format!("salvage:complete:{op_id}"),
        GodCommand::SalvageFail { .. } => format!("salvage:fail:{op_id}"),
        GodCommand::RepAdd { agent, .. } => format!("rep:add:{op_id}:agent:{agent}"),
        GodCommand::FactionAdd { faction, .. } => {
            format!("faction:add:{op_id}:faction:{faction}")
        }
        GodCommand::FactionNote { faction, .. } => {
            format!("faction:note:{op_id}:faction:{faction}")
        }
        GodCommand::NetherTick { .. } => format!("nether:tick:{op_id}"),
        GodCommand::TownRegion { .. } => format!("town:region:{op_id}"),
        GodCommand::TownTag { .. } => format!("town:tag:{op_id}"),
        GodCommand::PlayerLegitimacy { .. } => format!("player:legitimacy:{op_id}"),
        GodCommand::PlayerKill => format!("player:kill:{op_id}"),
        GodCommand::PlayerRevive => format!("player:revive:{op_id}"),
        GodCommand::RuleLethal { .. } => format!("rule:lethal:{op_id}"),
        GodCommand::WarStart => format!("war:start:{op_id}"),
        GodCommand::WarEnd => format!("war:end:{op_id}"),
        GodCommand::ClockSeason { .. } => format!("clock:season:{op_id}"),
        GodCommand::ThreatSet { .. } => format!("threat:set:{op_id}"),
        GodCommand::MoodSet { .. } => format!("mood:set:{op_id}"),
        GodCommand::ActorStatus { .. } => format!("actor:status:{op_id}"),
        GodCommand::AgentTrust { agent, .. } => format!("agent:trust:{op_id}:agent:{agent}"),
        GodCommand::AgentTrait { agent, .. } => format!("agent:trait:{op_id}:agent:{agent}"),
        GodCommand::AgentFlag { agent, .. } => format!("agent:flag:{op_id}:agent:{agent}"),
        GodCommand::AgentMood { agent, .. } => format!("agent:mood:{op_id}:agent:{agent}"),
        GodCommand::AgentSummary { agent, .. } => format!("agent:summary:{op_id}:agent:{agent}"),
        GodCommand::AgentIntent { agent, .. } => format!("agent:intent:{op_id}:agent:{agent}"),
        GodCommand::Say { agent, .. } => format!("say:{op_id}:agent:{agent}"),
        // queries never reach the transaction layer
        GodCommand::MarkList
        | GodCommand::MarketList
        | GodCommand::QuestList
        | GodCommand::ClockStatus
        | GodCommand::EventList
        | GodCommand::RumorList
        | GodCommand::DecisionList
        | GodCommand::DecisionShow { .. }
        | GodCommand::ProjectList
        | GodCommand::NetherStatus
        | GodCommand::TownStatus { .. }
        | GodCommand::PlayerStatus
        | GodCommand::AgentStatus { .. } => format!("query:{op_id}"),
    }
}
