// SPDX-License-Identifier: Apache-2.0

//! The command vocabulary: one token-stream language, parsed into a closed
//! sum type.
//!
//! Parsing is pure. A flat dispatch keyed by the first token (and, for the
//! multi-verb families, the second) maps onto one variant per operation,
//! each carrying its validated argument shape. Target existence is *not*
//! checked here — that needs the working world and belongs to the mutators.
//!
//! Two failure grades:
//! - [`ParseError::NonFinite`] is impossible input; the service turns it
//!   into a hard `[INVALID_INPUT]` error before any transaction opens.
//! - Everything else is a diagnostic: the service answers
//!   `applied = false` with the error's display line.

use thiserror::Error;
use vigil_world::doc::{QuestKind, Season, Side};

/// A parsed god command.
#[derive(Debug, Clone, PartialEq)]
pub enum GodCommand {
    /// `mark add <name> <x> <y> <z> [<tag>]`
    MarkAdd {
        /// Marker name.
        name: String,
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
        /// Z coordinate.
        z: f64,
        /// Optional tag (`town:<id>` materializes the town).
        tag: Option<String>,
    },
    /// `mark remove <name>`
    MarkRemove {
        /// Marker name.
        name: String,
    },
    /// `mark list`
    MarkList,
    /// `job set <agent> <role> [<home_marker>]`
    JobSet {
        /// Agent name.
        agent: String,
        /// Role from the whitelist.
        role: String,
        /// Optional home marker; must exist.
        home_marker: Option<String>,
    },
    /// `job clear <agent>`
    JobClear {
        /// Agent name.
        agent: String,
    },
    /// `mint <agent> <n>`
    Mint {
        /// Receiving agent.
        agent: String,
        /// Positive integer amount.
        amount: i64,
    },
    /// `transfer <src> <dst> <n>`
    Transfer {
        /// Paying agent.
        src: String,
        /// Receiving agent.
        dst: String,
        /// Positive integer amount.
        amount: i64,
    },
    /// `market add <name> [<marker>]`
    MarketAdd {
        /// Market name.
        name: String,
        /// Optional marker; must exist.
        marker: Option<String>,
    },
    /// `market remove <name>`
    MarketRemove {
        /// Market name.
        name: String,
    },
    /// `market list`
    MarketList,
    /// `offer add <market> <owner> <side> <amount> <price>`
    OfferAdd {
        /// Market name.
        market: String,
        /// Owning agent.
        owner: String,
        /// Buy or sell.
        side: Side,
        /// Positive amount.
        amount: i64,
        /// Positive unit price.
        price: i64,
    },
    /// `offer cancel <market> <offer_id>`
    OfferCancel {
        /// Market name.
        market: String,
        /// Offer id.
        offer_id: String,
    },
    /// `trade <market> <offer_id> <taker> <qty>`
    Trade {
        /// Market name.
        market: String,
        /// Offer id.
        offer_id: String,
        /// Counterparty agent.
        taker: String,
        /// Positive quantity.
        qty: i64,
    },
    /// `quest offer <town> <type> <reward> [<target>]`
    QuestOffer {
        /// Originating town.
        town: String,
        /// Quest type.
        kind: QuestKind,
        /// Non-negative reward.
        reward: i64,
        /// Trade count or destination town, by type.
        target: Option<String>,
    },
    /// `quest accept <agent> <quest_id>`
    QuestAccept {
        /// Accepting agent.
        agent: String,
        /// Quest id.
        quest_id: String,
    },
    /// `quest complete <quest_id>`
    QuestComplete {
        /// Quest id.
        quest_id: String,
    },
    /// `quest cancel <quest_id>`
    QuestCancel {
        /// Quest id.
        quest_id: String,
    },
    /// `quest visit <quest_id>`
    QuestVisit {
        /// Quest id.
        quest_id: String,
    },
    /// `quest list`
    QuestList,
    /// `clock advance <n>`
    ClockAdvance {
        /// Ticks to advance; positive.
        ticks: i64,
    },
    /// `clock status`
    ClockStatus,
    /// `event seed <n>`
    EventSeed {
        /// New deck seed.
        seed: i64,
    },
    /// `event draw <town>`
    EventDraw {
        /// Target town.
        town: String,
    },
    /// `event clear <id>`
    EventClear {
        /// Active event id.
        id: String,
    },
    /// `event list`
    EventList,
    /// `rumor spawn <town> <kind> <strength> <detail> <ttl_days>`
    RumorSpawn {
        /// Town the rumor circulates in.
        town: String,
        /// Rumor kind label.
        kind: String,
        /// Non-negative strength.
        strength: i64,
        /// Detail label.
        detail: String,
        /// Days until expiry.
        ttl_days: i64,
    },
    /// `rumor resolve <id>`
    RumorResolve {
        /// Rumor id.
        id: String,
    },
    /// `rumor clear <id>`
    RumorClear {
        /// Rumor id.
        id: String,
    },
    /// `rumor quest <rumor_id>`
    RumorQuest {
        /// Rumor to bind a side quest to.
        rumor_id: String,
    },
    /// `rumor list`
    RumorList,
    /// `decision list`
    DecisionList,
    /// `decision show <id>`
    DecisionShow {
        /// Decision id.
        id: String,
    },
    /// `decision choose <id> <option_key>`
    DecisionChoose {
        /// Decision id.
        id: String,
        /// Option key.
        option_key: String,
    },
    /// `mayor talk <town>`
    MayorTalk {
        /// Town whose mayor speaks.
        town: String,
    },
    /// `mayor accept <town>`
    MayorAccept {
        /// Town whose briefed mission is accepted.
        town: String,
    },
    /// `mission advance <town>`
    MissionAdvance {
        /// Town with the active mission.
        town: String,
    },
    /// `mission complete <town>`
    MissionComplete {
        /// Town with the active mission.
        town: String,
    },
    /// `mission fail <town>`
    MissionFail {
        /// Town with the active mission.
        town: String,
    },
    /// `project start <town> <type>`
    ProjectStart {
        /// Owning town.
        town: String,
        /// Project type label.
        kind: String,
    },
    /// `project advance <town> <project_id>`
    ProjectAdvance {
        /// Owning town.
        town: String,
        /// Project id.
        project_id: String,
    },
    /// `project complete <town> <project_id>`
    ProjectComplete {
        /// Owning town.
        town: String,
        /// Project id.
        project_id: String,
    },
    /// `project fail <town> <project_id>`
    ProjectFail {
        /// Owning town.
        town: String,
        /// Project id.
        project_id: String,
    },
    /// `project list`
    ProjectList,
    /// `salvage start <town> <focus>`
    SalvageStart {
        /// Owning town.
        town: String,
        /// Salvage focus from the supported set.
        focus: String,
    },
    /// `salvage advance <town> <run_id>`
    SalvageAdvance {
        /// Owning town.
        town: String,
        /// Run id.
        run_id: String,
    },
    /// `salvage complete <town> <run_id>`
    SalvageComplete {
        /// Owning town.
        town: String,
        /// Run id.
        run_id: String,
    },
    /// `salvage fail <town> <run_id>`
    SalvageFail {
        /// Owning town.
        town: String,
        /// Run id.
        run_id: String,
    },
    /// `rep add <agent> <faction> <n>`
    RepAdd {
        /// Agent whose reputation moves.
        agent: String,
        /// Faction it moves with.
        faction: String,
        /// Signed integer delta.
        amount: i64,
    },
    /// `faction add <id> [<doctrine>]`
    FactionAdd {
        /// Faction id.
        faction: String,
        /// Doctrine label, if any.
        doctrine: Option<String>,
    },
    /// `faction note <faction> <text…>`
    FactionNote {
        /// Faction name.
        faction: String,
        /// Note text (rest of line).
        note: String,
    },
    /// `nether tick <days>`
    NetherTick {
        /// Days to tick; positive.
        days: i64,
    },
    /// `nether status`
    NetherStatus,
    /// `town status <town>`
    TownStatus {
        /// Town id.
        town: String,
    },
    /// `town region <town> <region>`
    TownRegion {
        /// Town id.
        town: String,
        /// Region label.
        region: String,
    },
    /// `town tag <town> <tag>`
    TownTag {
        /// Town id.
        town: String,
        /// Tag to add.
        tag: String,
    },
    /// `player status`
    PlayerStatus,
    /// `player legitimacy <delta>`
    PlayerLegitimacy {
        /// Signed delta, clamped into `[0, 100]`.
        delta: i64,
    },
    /// `player kill`
    PlayerKill,
    /// `player revive`
    PlayerRevive,
    /// `rule lethal <on|off>`
    RuleLethal {
        /// Whether lethal politics are permitted.
        enabled: bool,
    },
    /// `war start`
    WarStart,
    /// `war end`
    WarEnd,
    /// `clock season <season>`
    ClockSeason {
        /// The season to set.
        season: Season,
    },
    /// `threat set <town> <n>`
    ThreatSet {
        /// Town id.
        town: String,
        /// New threat value, clamped into `[0, 100]`.
        value: i64,
    },
    /// `mood set <town> <axis> <n>`
    MoodSet {
        /// Town id.
        town: String,
        /// `fear`, `unrest`, or `prosperity`.
        axis: String,
        /// New value, clamped into `[0, 100]`.
        value: i64,
    },
    /// `actor status <actor_id> <status>`
    ActorStatus {
        /// Actor id.
        actor_id: String,
        /// New status label.
        status: String,
    },
    /// `agent trust <name> <delta>`
    AgentTrust {
        /// Agent name.
        agent: String,
        /// Signed trust delta.
        delta: i64,
    },
    /// `agent trait <name> <trait> <value>`
    AgentTrait {
        /// Agent name.
        agent: String,
        /// Trait name.
        trait_name: String,
        /// New value.
        value: i64,
    },
    /// `agent flag <name> <flag>`
    AgentFlag {
        /// Agent name.
        agent: String,
        /// Flag label.
        flag: String,
    },
    /// `agent mood <name> <mood>`
    AgentMood {
        /// Agent name.
        agent: String,
        /// Mood label.
        mood: String,
    },
    /// `agent summary <name> <text…>`
    AgentSummary {
        /// Agent name.
        agent: String,
        /// Summary text (rest of line).
        text: String,
    },
    /// `agent intent <name> <intent>`
    AgentIntent {
        /// Agent name.
        agent: String,
        /// The intent chosen this tick.
        intent: String,
    },
    /// `agent status <name>`
    AgentStatus {
        /// Agent name.
        agent: String,
    },
    /// `say <agent> <text…>`
    Say {
        /// Speaking agent.
        agent: String,
        /// The spoken line (rest of line).
        line: String,
    },
}

/// Parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Empty command line.
    #[error("empty command")]
    Empty,
    /// First (or second) token is not a recognized operation.
    #[error("unknown command: {0}")]
    Unknown(String),
    /// Wrong argument count or shape.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// An argument that must be an integer was not.
    #[error("{0} must be an integer")]
    BadInteger(&'static str),
    /// A coordinate parsed but is not finite.
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
}

fn req<'a>(tokens: &[&'a str], idx: usize, usage: &'static str) -> Result<&'a str, ParseError> {
    tokens.get(idx).copied().ok_or(ParseError::Usage(usage))
}

fn int_arg(token: &str, what: &'static str) -> Result<i64, ParseError> {
    token.parse::<i64>().map_err(|_| ParseError::BadInteger(what))
}

fn coord_arg(token: &str, what: &'static str) -> Result<f64, ParseError> {
    let value: f64 = token.parse().map_err(|_| ParseError::BadInteger(what))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseError::NonFinite(what))
    }
}

/// Parse one command line.
pub fn parse(command: &str) -> Result<GodCommand, ParseError> {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    let Some(family) = tokens.first() else {
        return Err(ParseError::Empty);
    };

    match *family {
        "mark" => parse_mark(&tokens),
        "job" => parse_job(&tokens),
        "mint" => {
            const USAGE: &str = "mint <agent> <n>";
            Ok(GodCommand::Mint {
                agent: req(&tokens, 1, USAGE)?.to_owned(),
                amount: int_arg(req(&tokens, 2, USAGE)?, "amount")?,
            })
        }
        "transfer" => {
            const USAGE: &str = "transfer <src> <dst> <n>";
            Ok(GodCommand::Transfer {
                src: req(&tokens, 1, USAGE)?.to_owned(),
                dst: req(&tokens, 2, USAGE)?.to_owned(),
                amount: int_arg(req(&tokens, 3, USAGE)?, "amount")?,
            })
        }
        "market" => parse_market(&tokens),
        "offer" => parse_offer(&tokens),
        "trade" => {
            const USAGE: &str = "trade <market> <offer_id> <taker> <qty>";
            Ok(GodCommand::Trade {
                market: req(&tokens, 1, USAGE)?.to_owned(),
                offer_id: req(&tokens, 2, USAGE)?.to_owned(),
                taker: req(&tokens, 3, USAGE)?.to_owned(),
                qty: int_arg(req(&tokens, 4, USAGE)?, "qty")?,
            })
        }
        "quest" => parse_quest(&tokens),
        "clock" => parse_clock(&tokens),
        "event" => parse_event(&tokens),
        "rumor" => parse_rumor(&tokens),
        "decision" => parse_decision(&tokens),
        "mayor" => parse_mayor(&tokens),
        "mission" => parse_mission(&tokens),
        "project" => parse_project(&tokens),
        "salvage" => parse_salvage(&tokens),
        "rep" => parse_rep(&tokens),
        "faction" => parse_faction(&tokens),
        "nether" => parse_nether(&tokens),
        "town" => parse_town(&tokens),
        "player" => parse_player(&tokens),
        "rule" => parse_rule(&tokens),
        "war" => parse_war(&tokens),
        "threat" => parse_threat(&tokens),
        "mood" => parse_mood(&tokens),
        "actor" => parse_actor(&tokens),
        "agent" => parse_agent(&tokens),
        "say" => {
            const USAGE: &str = "say <agent> <text…>";
            let agent = req(&tokens, 1, USAGE)?;
            let line = tokens[2..].join(" ");
            if line.is_empty() {
                return Err(ParseError::Usage(USAGE));
            }
            Ok(GodCommand::Say {
                agent: agent.to_owned(),
                line,
            })
        }
        other => Err(ParseError::Unknown(other.to_owned())),
    }
}

fn parse_mark(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    const USAGE: &str = "mark add <name> <x> <y> <z> [<tag>]";
    match tokens.get(1).copied() {
        Some("add") => Ok(GodCommand::MarkAdd {
            name: req(tokens, 2, USAGE)?.to_owned(),
            x: coord_arg(req(tokens, 3, USAGE)?, "x")?,
            y: coord_arg(req(tokens, 4, USAGE)?, "y")?,
            z: coord_arg(req(tokens, 5, USAGE)?, "z")?,
            tag: tokens.get(6).map(|s| (*s).to_owned()),
        }),
        Some("remove") => Ok(GodCommand::MarkRemove {
            name: req(tokens, 2, "mark remove <name>")?.to_owned(),
        }),
        Some("list") => Ok(GodCommand::MarkList),
        other => Err(unknown_verb("mark", other)),
    }
}

fn parse_job(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("set") => {
            const USAGE: &str = "job set <agent> <role> [<home_marker>]";
            Ok(GodCommand::JobSet {
                agent: req(tokens, 2, USAGE)?.to_owned(),
                role: req(tokens, 3, USAGE)?.to_owned(),
                home_marker: tokens.get(4).map(|s| (*s).to_owned()),
            })
        }
        Some("clear") => Ok(GodCommand::JobClear {
            agent: req(tokens, 2, "job clear <agent>")?.to_owned(),
        }),
        other => Err(unknown_verb("job", other)),
    }
}

fn parse_market(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("add") => Ok(GodCommand::MarketAdd {
            name: req(tokens, 2, "market add <name> [<marker>]")?.to_owned(),
            marker: tokens.get(3).map(|s| (*s).to_owned()),
        }),
        Some("remove") => Ok(GodCommand::MarketRemove {
            name: req(tokens, 2, "market remove <name>")?.to_owned(),
        }),
        Some("list") => Ok(GodCommand::MarketList),
        other => Err(unknown_verb("market", other)),
    }
}

fn parse_offer(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("add") => {
            const USAGE: &str = "offer add <market> <owner> <buy|sell> <amount> <price>";
            let side = match req(tokens, 4, USAGE)? {
                "buy" => Side::Buy,
                "sell" => Side::Sell,
                _ => return Err(ParseError::Usage(USAGE)),
            };
            Ok(GodCommand::OfferAdd {
                market: req(tokens, 2, USAGE)?.to_owned(),
                owner: req(tokens, 3, USAGE)?.to_owned(),
                side,
                amount: int_arg(req(tokens, 5, USAGE)?, "amount")?,
                price: int_arg(req(tokens, 6, USAGE)?, "price")?,
            })
        }
        Some("cancel") => {
            const USAGE: &str = "offer cancel <market> <offer_id>";
            Ok(GodCommand::OfferCancel {
                market: req(tokens, 2, USAGE)?.to_owned(),
                offer_id: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        other => Err(unknown_verb("offer", other)),
    }
}

fn parse_quest(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("offer") => {
            const USAGE: &str = "quest offer <town> <trade_n|visit_town|rumor_task> <reward> [<target>]";
            let kind = match req(tokens, 3, USAGE)? {
                "trade_n" => QuestKind::TradeN,
                "visit_town" => QuestKind::VisitTown,
                "rumor_task" => QuestKind::RumorTask,
                _ => return Err(ParseError::Usage(USAGE)),
            };
            Ok(GodCommand::QuestOffer {
                town: req(tokens, 2, USAGE)?.to_owned(),
                kind,
                reward: int_arg(req(tokens, 4, USAGE)?, "reward")?,
                target: tokens.get(5).map(|s| (*s).to_owned()),
            })
        }
        Some("accept") => {
            const USAGE: &str = "quest accept <agent> <quest_id>";
            Ok(GodCommand::QuestAccept {
                agent: req(tokens, 2, USAGE)?.to_owned(),
                quest_id: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("complete") => Ok(GodCommand::QuestComplete {
            quest_id: req(tokens, 2, "quest complete <quest_id>")?.to_owned(),
        }),
        Some("cancel") => Ok(GodCommand::QuestCancel {
            quest_id: req(tokens, 2, "quest cancel <quest_id>")?.to_owned(),
        }),
        Some("visit") => Ok(GodCommand::QuestVisit {
            quest_id: req(tokens, 2, "quest visit <quest_id>")?.to_owned(),
        }),
        Some("list") => Ok(GodCommand::QuestList),
        other => Err(unknown_verb("quest", other)),
    }
}

fn parse_clock(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("advance") => Ok(GodCommand::ClockAdvance {
            ticks: int_arg(req(tokens, 2, "clock advance <n>")?, "ticks")?,
        }),
        Some("season") => {
            const USAGE: &str = "clock season <dawn|long_night|thaw|harvest>";
            let season = match req(tokens, 2, USAGE)? {
                "dawn" => Season::Dawn,
                "long_night" => Season::LongNight,
                "thaw" => Season::Thaw,
                "harvest" => Season::Harvest,
                _ => return Err(ParseError::Usage(USAGE)),
            };
            Ok(GodCommand::ClockSeason { season })
        }
        Some("status") => Ok(GodCommand::ClockStatus),
        other => Err(unknown_verb("clock", other)),
    }
}

fn parse_event(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("seed") => Ok(GodCommand::EventSeed {
            seed: int_arg(req(tokens, 2, "event seed <n>")?, "seed")?,
        }),
        Some("draw") => Ok(GodCommand::EventDraw {
            town: req(tokens, 2, "event draw <town>")?.to_owned(),
        }),
        Some("clear") => Ok(GodCommand::EventClear {
            id: req(tokens, 2, "event clear <id>")?.to_owned(),
        }),
        Some("list") => Ok(GodCommand::EventList),
        other => Err(unknown_verb("event", other)),
    }
}

fn parse_rumor(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("spawn") => {
            const USAGE: &str = "rumor spawn <town> <kind> <strength> <detail> <ttl_days>";
            Ok(GodCommand::RumorSpawn {
                town: req(tokens, 2, USAGE)?.to_owned(),
                kind: req(tokens, 3, USAGE)?.to_owned(),
                strength: int_arg(req(tokens, 4, USAGE)?, "strength")?,
                detail: req(tokens, 5, USAGE)?.to_owned(),
                ttl_days: int_arg(req(tokens, 6, USAGE)?, "ttl_days")?,
            })
        }
        Some("resolve") => Ok(GodCommand::RumorResolve {
            id: req(tokens, 2, "rumor resolve <id>")?.to_owned(),
        }),
        Some("clear") => Ok(GodCommand::RumorClear {
            id: req(tokens, 2, "rumor clear <id>")?.to_owned(),
        }),
        Some("quest") => Ok(GodCommand::RumorQuest {
            rumor_id: req(tokens, 2, "rumor quest <rumor_id>")?.to_owned(),
        }),
        Some("list") => Ok(GodCommand::RumorList),
        other => Err(unknown_verb("rumor", other)),
    }
}

fn parse_decision(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("list") => Ok(GodCommand::DecisionList),
        Some("show") => Ok(GodCommand::DecisionShow {
            id: req(tokens, 2, "decision show <id>")?.to_owned(),
        }),
        Some("choose") => {
            const USAGE: &str = "decision choose <id> <option_key>";
            Ok(GodCommand::DecisionChoose {
                id: req(tokens, 2, USAGE)?.to_owned(),
                option_key: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        other => Err(unknown_verb("decision", other)),
    }
}

fn parse_mayor(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("talk") => Ok(GodCommand::MayorTalk {
            town: req(tokens, 2, "mayor talk <town>")?.to_owned(),
        }),
        Some("accept") => Ok(GodCommand::MayorAccept {
            town: req(tokens, 2, "mayor accept <town>")?.to_owned(),
        }),
        other => Err(unknown_verb("mayor", other)),
    }
}

fn parse_mission(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("advance") => Ok(GodCommand::MissionAdvance {
            town: req(tokens, 2, "mission advance <town>")?.to_owned(),
        }),
        Some("complete") => Ok(GodCommand::MissionComplete {
            town: req(tokens, 2, "mission complete <town>")?.to_owned(),
        }),
        Some("fail") => Ok(GodCommand::MissionFail {
            town: req(tokens, 2, "mission fail <town>")?.to_owned(),
        }),
        other => Err(unknown_verb("mission", other)),
    }
}

fn parse_project(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("start") => {
            const USAGE: &str = "project start <town> <type>";
            Ok(GodCommand::ProjectStart {
                town: req(tokens, 2, USAGE)?.to_owned(),
                kind: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("advance") => {
            const USAGE: &str = "project advance <town> <project_id>";
            Ok(GodCommand::ProjectAdvance {
                town: req(tokens, 2, USAGE)?.to_owned(),
                project_id: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("complete") => {
            const USAGE: &str = "project complete <town> <project_id>";
            Ok(GodCommand::ProjectComplete {
                town: req(tokens, 2, USAGE)?.to_owned(),
                project_id: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("fail") => {
            const USAGE: &str = "project fail <town> <project_id>";
            Ok(GodCommand::ProjectFail {
                town: req(tokens, 2, USAGE)?.to_owned(),
                project_id: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("list") => Ok(GodCommand::ProjectList),
        other => Err(unknown_verb("project", other)),
    }
}

fn parse_salvage(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("start") => {
            const USAGE: &str = "salvage start <town> <focus>";
            Ok(GodCommand::SalvageStart {
                town: req(tokens, 2, USAGE)?.to_owned(),
                focus: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("advance") => {
            const USAGE: &str = "salvage advance <town> <run_id>";
            Ok(GodCommand::SalvageAdvance {
                town: req(tokens, 2, USAGE)?.to_owned(),
                run_id: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("complete") => {
            const USAGE: &str = "salvage complete <town> <run_id>";
            Ok(GodCommand::SalvageComplete {
                town: req(tokens, 2, USAGE)?.to_owned(),
                run_id: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("fail") => {
            const USAGE: &str = "salvage fail <town> <run_id>";
            Ok(GodCommand::SalvageFail {
                town: req(tokens, 2, USAGE)?.to_owned(),
                run_id: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        other => Err(unknown_verb("salvage", other)),
    }
}

fn parse_rep(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("add") => {
            const USAGE: &str = "rep add <agent> <faction> <n>";
            Ok(GodCommand::RepAdd {
                agent: req(tokens, 2, USAGE)?.to_owned(),
                faction: req(tokens, 3, USAGE)?.to_owned(),
                amount: int_arg(req(tokens, 4, USAGE)?, "rep")?,
            })
        }
        other => Err(unknown_verb("rep", other)),
    }
}

fn parse_faction(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("add") => Ok(GodCommand::FactionAdd {
            faction: req(tokens, 2, "faction add <id> [<doctrine>]")?.to_owned(),
            doctrine: tokens.get(3).map(|s| (*s).to_owned()),
        }),
        Some("note") => {
            const USAGE: &str = "faction note <faction> <text…>";
            let faction = req(tokens, 2, USAGE)?;
            let note = tokens[3..].join(" ");
            if note.is_empty() {
                return Err(ParseError::Usage(USAGE));
            }
            Ok(GodCommand::FactionNote {
                faction: faction.to_owned(),
                note,
            })
        }
        other => Err(unknown_verb("faction", other)),
    }
}

fn parse_nether(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("tick") => Ok(GodCommand::NetherTick {
            days: int_arg(req(tokens, 2, "nether tick <days>")?, "days")?,
        }),
        Some("status") => Ok(GodCommand::NetherStatus),
        other => Err(unknown_verb("nether", other)),
    }
}

fn parse_town(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("status") => Ok(GodCommand::TownStatus {
            town: req(tokens, 2, "town status <town>")?.to_owned(),
        }),
        Some("region") => {
            const USAGE: &str = "town region <town> <region>";
            Ok(GodCommand::TownRegion {
                town: req(tokens, 2, USAGE)?.to_owned(),
                region: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("tag") => {
            const USAGE: &str = "town tag <town> <tag>";
            Ok(GodCommand::TownTag {
                town: req(tokens, 2, USAGE)?.to_owned(),
                tag: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        other => Err(unknown_verb("town", other)),
    }
}

fn parse_player(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("status") => Ok(GodCommand::PlayerStatus),
        Some("legitimacy") => Ok(GodCommand::PlayerLegitimacy {
            delta: int_arg(req(tokens, 2, "player legitimacy <delta>")?, "delta")?,
        }),
        Some("kill") => Ok(GodCommand::PlayerKill),
        Some("revive") => Ok(GodCommand::PlayerRevive),
        other => Err(unknown_verb("player", other)),
    }
}

fn parse_rule(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("lethal") => {
            const USAGE: &str = "rule lethal <on|off>";
            let enabled = match req(tokens, 2, USAGE)? {
                "on" => true,
                "off" => false,
                _ => return Err(ParseError::Usage(USAGE)),
            };
            Ok(GodCommand::RuleLethal { enabled })
        }
        other => Err(unknown_verb("rule", other)),
    }
}

fn parse_war(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("start") => Ok(GodCommand::WarStart),
        Some("end") => Ok(GodCommand::WarEnd),
        other => Err(unknown_verb("war", other)),
    }
}

fn parse_threat(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("set") => {
            const USAGE: &str = "threat set <town> <n>";
            Ok(GodCommand::ThreatSet {
                town: req(tokens, 2, USAGE)?.to_owned(),
                value: int_arg(req(tokens, 3, USAGE)?, "threat")?,
            })
        }
        other => Err(unknown_verb("threat", other)),
    }
}

fn parse_mood(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("set") => {
            const USAGE: &str = "mood set <town> <fear|unrest|prosperity> <n>";
            Ok(GodCommand::MoodSet {
                town: req(tokens, 2, USAGE)?.to_owned(),
                axis: req(tokens, 3, USAGE)?.to_owned(),
                value: int_arg(req(tokens, 4, USAGE)?, "mood")?,
            })
        }
        other => Err(unknown_verb("mood", other)),
    }
}

fn parse_actor(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("status") => {
            const USAGE: &str = "actor status <actor_id> <status>";
            Ok(GodCommand::ActorStatus {
                actor_id: req(tokens, 2, USAGE)?.to_owned(),
                status: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        other => Err(unknown_verb("actor", other)),
    }
}

fn parse_agent(tokens: &[&str]) -> Result<GodCommand, ParseError> {
    match tokens.get(1).copied() {
        Some("trust") => {
            const USAGE: &str = "agent trust <name> <delta>";
            Ok(GodCommand::AgentTrust {
                agent: req(tokens, 2, USAGE)?.to_owned(),
                delta: int_arg(req(tokens, 3, USAGE)?, "trust")?,
            })
        }
        Some("trait") => {
            const USAGE: &str = "agent trait <name> <courage|greed|faith> <value>";
            Ok(GodCommand::AgentTrait {
                agent: req(tokens, 2, USAGE)?.to_owned(),
                trait_name: req(tokens, 3, USAGE)?.to_owned(),
                value: int_arg(req(tokens, 4, USAGE)?, "trait")?,
            })
        }
        Some("flag") => {
            const USAGE: &str = "agent flag <name> <flag>";
            Ok(GodCommand::AgentFlag {
                agent: req(tokens, 2, USAGE)?.to_owned(),
                flag: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("mood") => {
            const USAGE: &str = "agent mood <name> <mood>";
            Ok(GodCommand::AgentMood {
                agent: req(tokens, 2, USAGE)?.to_owned(),
                mood: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("summary") => {
            const USAGE: &str = "agent summary <name> <text…>";
            let agent = req(tokens, 2, USAGE)?;
            let text = tokens[3..].join(" ");
            if text.is_empty() {
                return Err(ParseError::Usage(USAGE));
            }
            Ok(GodCommand::AgentSummary {
                agent: agent.to_owned(),
                text,
            })
        }
        Some("intent") => {
            const USAGE: &str = "agent intent <name> <intent>";
            Ok(GodCommand::AgentIntent {
                agent: req(tokens, 2, USAGE)?.to_owned(),
                intent: req(tokens, 3, USAGE)?.to_owned(),
            })
        }
        Some("status") => Ok(GodCommand::AgentStatus {
            agent: req(tokens, 2, "agent status <name>")?.to_owned(),
        }),
        other => Err(unknown_verb("agent", other)),
    }
}

fn unknown_verb(family: &str, verb: Option<&str>) -> ParseError {
    match verb {
        Some(verb) => ParseError::Unknown(format!("{family} {verb}")),
        None => ParseError::Unknown(family.to_owned()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{parse, GodCommand, ParseError};
    use vigil_world::doc::Side;

    #[test]
    fn mark_add_round_trip() {
        let cmd = parse("mark add alpha_hall 0 64 0 town:alpha").unwrap();
        assert_eq!(
            cmd,
            GodCommand::MarkAdd {
                name: "alpha_hall".to_owned(),
                x: 0.0,
                y: 64.0,
                z: 0.0,
                tag: Some("town:alpha".to_owned()),
            }
        );
    }

    #[test]
    fn non_finite_coordinates_are_invalid_input() {
        assert_eq!(
            parse("mark add bad inf 0 0"),
            Err(ParseError::NonFinite("x"))
        );
        assert_eq!(
            parse("mark add bad 0 NaN 0"),
            Err(ParseError::NonFinite("y"))
        );
    }

    #[test]
    fn non_integer_amounts_are_diagnostics() {
        assert_eq!(parse("mint Mara 2.5"), Err(ParseError::BadInteger("amount")));
        assert_eq!(
            parse("trade bazaar of0001 Eli one"),
            Err(ParseError::BadInteger("qty"))
        );
    }

    #[test]
    fn offer_sides_parse() {
        match parse("offer add bazaar Mara sell 2 5").unwrap() {
            GodCommand::OfferAdd { side, amount, price, .. } => {
                assert_eq!(side, Side::Sell);
                assert_eq!((amount, price), (2, 5));
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn unknown_family_and_verb() {
        assert_eq!(parse("smite Mara"), Err(ParseError::Unknown("smite".to_owned())));
        assert_eq!(
            parse("mark smite x"),
            Err(ParseError::Unknown("mark smite".to_owned()))
        );
        assert_eq!(parse("   "), Err(ParseError::Empty));
    }

    #[test]
    fn faction_note_keeps_the_rest_of_the_line() {
        match parse("faction note pact sworn to hold the road").unwrap() {
            GodCommand::FactionNote { faction, note } => {
                assert_eq!(faction, "pact");
                assert_eq!(note, "sworn to hold the road");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
