// SPDX-License-Identifier: Apache-2.0

//! The world document: the single aggregate root owned by the world store.
//!
//! Shape contract
//! - Every mapping is a `BTreeMap` and every set a `BTreeSet`, so iteration
//!   and serialization order are deterministic regardless of insertion order.
//! - Field names on the wire are the observed external names of the world
//!   file (`processedEventIds`, `hostilityToPlayer`, `updated_at`,
//!   `starts_day`, …); serde rename attributes pin each one. Mixed casing is
//!   load-bearing: the on-disk format predates this crate.
//! - Everything referenced by id (quest, project, mission, rumor, decision,
//!   offer) lives in a small bounded list and is looked up by linear scan.
//!   The lists stay small enough that an id-to-index map would buy nothing.
//!
//! All length caps live in [`crate::bounds`]; the sanitizer and the append
//! helpers both enforce them, and `validate` re-checks them after commit.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Epoch timestamp used wherever a time field has to exist but nothing
/// meaningful was recorded.
pub const EPOCH_RFC3339: &str = "1970-01-01T00:00:00Z";

/// Root of the persisted world: agent memories, faction memories, and the
/// authoritative world state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldDoc {
    /// Per-agent memory, keyed by agent name.
    #[serde(default)]
    pub agents: BTreeMap<String, AgentMemory>,
    /// Per-faction memory, keyed by faction name.
    #[serde(default)]
    pub factions: BTreeMap<String, FactionMemory>,
    /// The authoritative world state.
    #[serde(default)]
    pub world: WorldState,
}

impl WorldDoc {
    /// The canonical fresh shape used when the world file is missing or
    /// unparseable.
    #[must_use]
    pub fn fresh() -> Self {
        Self::default()
    }
}

/// One agent's remembered state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentMemory {
    /// Short-lived notes, oldest first.
    pub short_notes: Vec<NoteEntry>,
    /// Long-lived notes, oldest first.
    pub long_notes: Vec<NoteEntry>,
    /// Rolling summary text.
    pub summary: String,
    /// Archived notes rotated out of the live sequences.
    pub archive: Vec<ArchiveEntry>,
    /// Most recent spoken lines, oldest first.
    pub recent_utterances: Vec<String>,
    /// RFC 3339 instant of the last processed agent tick, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_processed_time: Option<String>,
    /// Behavioral profile.
    pub profile: AgentProfile,
}

/// A timestamped note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteEntry {
    /// RFC 3339 instant the note was taken.
    pub at: String,
    /// Note text.
    pub text: String,
    /// Whether the note was flagged important when recorded.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub important: bool,
}

/// An archived `{time, text}` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveEntry {
    /// RFC 3339 instant the entry was archived.
    pub at: String,
    /// Archived text.
    pub text: String,
}

/// Agent behavioral profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentProfile {
    /// Trust toward the player.
    pub trust: i64,
    /// Current mood label.
    pub mood: String,
    /// Free-form behavior flags.
    pub flags: Vec<String>,
    /// Assigned job, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobAssignment>,
    /// Current world-level intent label, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_intent: Option<String>,
    /// Intent chosen on the previous tick; drives the repetition breaker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_intent: Option<String>,
    /// Consecutive ticks the same job-driven intent has been chosen.
    pub repetition_count: i64,
    /// Reputation per faction.
    pub rep: BTreeMap<String, i64>,
    /// Personality traits.
    pub traits: Traits,
    /// Earned titles. Granted at most once each.
    pub titles: BTreeSet<String>,
    /// Completed rumor side-quests, counted toward the Wanderer title.
    pub rumor_quests_completed: i64,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            trust: 0,
            mood: "neutral".to_owned(),
            flags: Vec::new(),
            job: None,
            world_intent: None,
            last_intent: None,
            repetition_count: 0,
            rep: BTreeMap::new(),
            traits: Traits::default(),
            titles: BTreeSet::new(),
            rumor_quests_completed: 0,
        }
    }
}

/// An agent's assigned job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobAssignment {
    /// Role from the job whitelist.
    pub role: String,
    /// Marker the agent treats as home, if any. Must name an existing marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_marker: Option<String>,
}

/// Courage / greed / faith personality triple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Traits {
    /// Courage score.
    pub courage: i64,
    /// Greed score.
    pub greed: i64,
    /// Faith score.
    pub faith: i64,
}

/// One faction's remembered state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactionMemory {
    /// Long-lived notes, oldest first.
    pub long_notes: Vec<NoteEntry>,
    /// Rolling summary text.
    pub summary: String,
    /// Archived notes.
    pub archive: Vec<ArchiveEntry>,
}

/// The authoritative world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldState {
    /// The player record.
    pub player: Player,
    /// World rule toggles.
    pub rules: Rules,
    /// Whether a war is in progress.
    pub war_active: bool,
    /// Political factions, keyed by faction id.
    pub factions: BTreeMap<String, FactionState>,
    /// The world clock.
    pub clock: WorldClock,
    /// Per-town threat levels.
    pub threat: ThreatMap,
    /// Per-town mood triples.
    pub moods: MoodMap,
    /// Seeded event deck state and active events.
    pub events: EventState,
    /// Live rumors.
    pub rumors: Vec<Rumor>,
    /// Open and resolved decisions.
    pub decisions: Vec<Decision>,
    /// Named world markers.
    pub markers: Vec<Marker>,
    /// Markets and their offers.
    pub markets: Vec<Market>,
    /// Currency ledger.
    pub economy: Economy,
    /// Quests in all states.
    pub quests: Vec<Quest>,
    /// Major missions per town.
    pub major_missions: Vec<MajorMission>,
    /// Town projects.
    pub projects: Vec<Project>,
    /// Salvage runs.
    pub salvage_runs: Vec<SalvageRun>,
    /// Towns, keyed by town id.
    pub towns: BTreeMap<String, Town>,
    /// Named actors, keyed by actor id.
    pub actors: BTreeMap<String, Actor>,
    /// Nether deck state and bounded event ledger.
    pub nether: Nether,
    /// Narrative chronicle, newest last. Capped.
    pub chronicle: Vec<ChronicleRecord>,
    /// Broadcast news, newest last. Capped.
    pub news: Vec<NewsEntry>,
    /// Ring of recently processed event ids, oldest first.
    pub processed_event_ids: Vec<String>,
    /// Projected execution view (history + pending markers).
    pub execution: ExecutionLog,
    /// Monotonic id counters for derived records.
    pub ids: IdCounters,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            player: Player::default(),
            rules: Rules::default(),
            war_active: false,
            factions: BTreeMap::new(),
            clock: WorldClock::default(),
            threat: ThreatMap::default(),
            moods: MoodMap::default(),
            events: EventState::default(),
            rumors: Vec::new(),
            decisions: Vec::new(),
            markers: Vec::new(),
            markets: Vec::new(),
            economy: Economy::default(),
            quests: Vec::new(),
            major_missions: Vec::new(),
            projects: Vec::new(),
            salvage_runs: Vec::new(),
            towns: BTreeMap::new(),
            actors: BTreeMap::new(),
            nether: Nether::default(),
            chronicle: Vec::new(),
            news: Vec::new(),
            processed_event_ids: Vec::new(),
            execution: ExecutionLog::default(),
            ids: IdCounters::default(),
        }
    }
}

/// The player record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    /// Player display name.
    pub name: String,
    /// Whether the player is alive.
    pub alive: bool,
    /// Legitimacy in `[0, 100]`.
    pub legitimacy: i64,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            name: "Player".to_owned(),
            alive: true,
            legitimacy: 50,
        }
    }
}

/// World rule toggles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rules {
    /// Whether lethal political outcomes are permitted.
    pub allow_lethal_politics: bool,
}

/// A political faction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactionState {
    /// Display name.
    pub name: String,
    /// Towns under this faction's sway.
    pub towns: BTreeSet<String>,
    /// Doctrine label.
    pub doctrine: String,
    /// Rival faction ids.
    pub rivals: Vec<String>,
    /// Hostility toward the player in `[0, 100]`.
    pub hostility_to_player: i64,
    /// Internal stability in `[0, 100]`.
    pub stability: i64,
}

/// Day/night phase of the world clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Daytime.
    #[default]
    Day,
    /// Nighttime.
    Night,
}

/// Season of the world clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    /// The opening season.
    #[default]
    Dawn,
    /// The long night.
    LongNight,
    /// The thaw.
    Thaw,
    /// Harvest season.
    Harvest,
}

/// The world clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldClock {
    /// Current day, `>= 1`.
    pub day: i64,
    /// Day or night.
    pub phase: Phase,
    /// Current season.
    pub season: Season,
    /// RFC 3339 instant of the last clock mutation.
    pub updated_at: String,
}

impl Default for WorldClock {
    fn default() -> Self {
        Self {
            day: 1,
            phase: Phase::Day,
            season: Season::Dawn,
            updated_at: EPOCH_RFC3339.to_owned(),
        }
    }
}

/// Per-town threat levels, each in `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreatMap {
    /// Threat keyed by town id.
    pub by_town: BTreeMap<String, i64>,
}

/// Per-town moods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoodMap {
    /// Mood triple keyed by town id.
    pub by_town: BTreeMap<String, TownMood>,
}

/// Fear / unrest / prosperity triple, each clamped to `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TownMood {
    /// Fear level.
    pub fear: i64,
    /// Unrest level.
    pub unrest: i64,
    /// Prosperity level.
    pub prosperity: i64,
}

/// Seeded event deck state and currently active events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventState {
    /// Deck seed.
    pub seed: i64,
    /// Deck cursor: index of the next card to draw.
    pub index: i64,
    /// Active events.
    pub active: Vec<ActiveEvent>,
}

/// An active drawn event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveEvent {
    /// Event id.
    pub id: String,
    /// Event type label.
    #[serde(rename = "type")]
    pub kind: String,
    /// Town the event applies to.
    pub town: String,
    /// Day the event starts.
    pub starts_day: i64,
    /// Day the event ends.
    pub ends_day: i64,
    /// Mood/threat deltas applied on draw.
    pub mods: EventMods,
}

/// Mood and threat deltas carried by an event card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventMods {
    /// Fear delta.
    pub fear: i64,
    /// Unrest delta.
    pub unrest: i64,
    /// Prosperity delta.
    pub prosperity: i64,
    /// Threat delta.
    pub threat: i64,
}

/// A live or resolved rumor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rumor {
    /// Rumor id.
    pub id: String,
    /// Town the rumor circulates in.
    pub town: String,
    /// Rumor kind label (e.g. `supernatural`).
    pub kind: String,
    /// Strength score.
    pub strength: i64,
    /// Detail label.
    pub detail: String,
    /// Day the rumor expires.
    pub expires_day: i64,
    /// Whether the rumor has been resolved.
    pub resolved: bool,
    /// Side quest spawned from this rumor, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quest_id: Option<String>,
}

/// Lifecycle of a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    /// Awaiting a choice.
    #[default]
    Open,
    /// A choice was applied.
    Chosen,
}

/// A pending or resolved decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Decision {
    /// Decision id.
    pub id: String,
    /// Town the decision concerns.
    pub town: String,
    /// Prompt shown to the caller.
    pub prompt: String,
    /// Choice options. Keys are unique.
    pub options: Vec<DecisionOption>,
    /// Open or chosen.
    pub status: DecisionStatus,
    /// Key of the chosen option, once chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_key: Option<String>,
    /// Day the decision was created.
    pub created_day: i64,
}

/// One selectable option of a decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionOption {
    /// Option key, unique within the decision.
    pub key: String,
    /// Human-readable label.
    pub label: String,
    /// Effects applied exactly once when chosen.
    pub effects: DecisionEffects,
}

/// Effects applied when a decision option is chosen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionEffects {
    /// Fear delta.
    pub fear: i64,
    /// Unrest delta.
    pub unrest: i64,
    /// Prosperity delta.
    pub prosperity: i64,
    /// Threat delta.
    pub threat_delta: i64,
    /// Reputation deltas keyed by faction.
    pub rep_delta: BTreeMap<String, i64>,
    /// Rumor spawned by this option, at most one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rumor_spawn: Option<RumorSpawn>,
}

/// Specification of a rumor spawned by a decision effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RumorSpawn {
    /// Town for the spawned rumor.
    pub town: String,
    /// Rumor kind label.
    pub kind: String,
    /// Strength score.
    pub strength: i64,
    /// Detail label.
    pub detail: String,
    /// Days until expiry, counted from the spawn day.
    pub ttl_days: i64,
}

/// A named world marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Marker {
    /// Marker name, unique. Duplicate adds overwrite.
    pub name: String,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
    /// Optional tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// RFC 3339 instant of the last write to this marker.
    pub created_at: String,
}

/// A market holding an ordered offer book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Market {
    /// Market name, unique.
    pub name: String,
    /// Marker the market sits at, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Offers, ordered by insertion. `offer_id` is unique within the market.
    pub offers: Vec<Offer>,
}

/// Buy/sell side of an offer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Offer to buy.
    Buy,
    /// Offer to sell.
    #[default]
    Sell,
}

/// A standing market offer. Once `active` is false the offer is frozen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Offer {
    /// Offer id, unique within the owning market.
    pub offer_id: String,
    /// Owning agent.
    pub owner: String,
    /// Buy or sell.
    pub side: Side,
    /// Remaining amount. Positive while active.
    pub amount: i64,
    /// Unit price. Positive.
    pub price: i64,
    /// Whether the offer can still trade.
    pub active: bool,
}

/// The currency ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Economy {
    /// Currency label.
    pub currency: String,
    /// Non-negative integer balances keyed by agent.
    pub ledger: BTreeMap<String, i64>,
    /// Total ever minted. Absent when no cap was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minted_total: Option<i64>,
}

impl Default for Economy {
    fn default() -> Self {
        Self {
            currency: "emerald".to_owned(),
            ledger: BTreeMap::new(),
            minted_total: None,
        }
    }
}

/// Recognized quest types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    /// Complete `target` buyer-side trades.
    TradeN,
    /// Visit a target town.
    #[default]
    VisitTown,
    /// Investigate a rumor.
    RumorTask,
}

/// Quest lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Offered, unclaimed.
    #[default]
    Offered,
    /// Accepted by an owner.
    Accepted,
    /// In progress.
    InProgress,
    /// Completed; reward paid.
    Completed,
    /// Cancelled.
    Cancelled,
}

/// A quest record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quest {
    /// Quest id.
    pub id: String,
    /// Quest type.
    #[serde(rename = "type")]
    pub kind: QuestKind,
    /// Originating town.
    pub town: String,
    /// Owning agent once accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Role of the quest giver, when townsfolk-originated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub giver_role: Option<String>,
    /// Lifecycle state.
    pub status: QuestStatus,
    /// Non-negative integer reward, paid exactly once on completion.
    pub reward: i64,
    /// Progress toward `target` (trade quests).
    pub progress: i64,
    /// Completion target (trade quests).
    pub target: i64,
    /// Destination town (visit quests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_town: Option<String>,
    /// Bound rumor id (rumor tasks).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rumor_id: Option<String>,
    /// RFC 3339 instant the quest was offered.
    pub offered_at: String,
    /// Day the quest was offered.
    pub offered_day: i64,
}

/// Major mission lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    /// Briefed by the mayor, not yet accepted.
    #[default]
    Briefed,
    /// Accepted and underway. At most one per town.
    Active,
    /// Completed.
    Completed,
    /// Failed.
    Failed,
}

/// A town's major mission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MajorMission {
    /// Mission id.
    pub id: String,
    /// Owning town.
    pub town: String,
    /// Mission title.
    pub title: String,
    /// Current phase, starting at 1.
    pub phase: i64,
    /// Lifecycle state.
    pub status: MissionStatus,
}

/// Project / salvage lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    /// Underway.
    #[default]
    Active,
    /// Completed.
    Completed,
    /// Failed.
    Failed,
}

/// A town project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Project id.
    pub id: String,
    /// Owning town.
    pub town: String,
    /// Project type label (e.g. `lantern_line`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Current stage, starting at 1.
    pub stage: i64,
    /// Lifecycle state.
    pub status: WorkStatus,
    /// Day the project started.
    pub started_day: i64,
}

/// A salvage run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalvageRun {
    /// Run id.
    pub id: String,
    /// Owning town.
    pub town: String,
    /// Salvage focus (e.g. `metal`).
    pub focus: String,
    /// Current stage, starting at 1.
    pub stage: i64,
    /// Lifecycle state.
    pub status: WorkStatus,
    /// Day the run started.
    pub started_day: i64,
}

/// A town record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Town {
    /// Display name.
    pub name: String,
    /// Status label.
    pub status: String,
    /// Region label, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Sorted unique tags.
    pub tags: BTreeSet<String>,
    /// Id of the single active major mission, or none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_major_mission_id: Option<String>,
    /// Day until which new major missions are on cooldown.
    pub major_mission_cooldown_until_day: i64,
    /// Hope in `[0, 100]`.
    pub hope: i64,
    /// Dread in `[0, 100]`.
    pub dread: i64,
    /// Bounded narration queue for the town crier.
    pub crier_queue: Vec<CrierEntry>,
    /// Bounded list of recent impacts.
    pub recent_impacts: Vec<ImpactEntry>,
}

impl Default for Town {
    fn default() -> Self {
        Self {
            name: String::new(),
            status: "standing".to_owned(),
            region: None,
            tags: BTreeSet::new(),
            active_major_mission_id: None,
            major_mission_cooldown_until_day: 0,
            hope: 50,
            dread: 20,
            crier_queue: Vec::new(),
            recent_impacts: Vec::new(),
        }
    }
}

/// One crier queue entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrierEntry {
    /// Entry id.
    pub id: String,
    /// Day the entry was enqueued.
    pub day: i64,
    /// Entry kind label (e.g. `mission_available`).
    pub kind: String,
    /// Narration text.
    pub text: String,
}

/// One recent-impact entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactEntry {
    /// Day the impact landed.
    pub day: i64,
    /// What caused it.
    pub source: String,
    /// Signed magnitude.
    pub delta: i64,
    /// Impact text.
    pub text: String,
}

/// Actor roles materialized per town.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// Town mayor.
    Mayor,
    /// Guard captain.
    Captain,
    /// Warden.
    Warden,
    /// Generic townsfolk.
    #[default]
    Townsfolk,
}

impl ActorRole {
    /// All roles materialized for every town, in canonical order.
    pub const ALL: [Self; 4] = [Self::Mayor, Self::Captain, Self::Warden, Self::Townsfolk];

    /// Lowercase wire label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Mayor => "mayor",
            Self::Captain => "captain",
            Self::Warden => "warden",
            Self::Townsfolk => "townsfolk",
        }
    }
}

/// A named actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Actor {
    /// Actor id.
    pub actor_id: String,
    /// Town the actor belongs to.
    pub town_id: String,
    /// Display name. Synthesized deterministically when absent.
    pub name: String,
    /// Role.
    pub role: ActorRole,
    /// Status label.
    pub status: String,
}

/// Nether deck state, modifiers, and bounded event ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Nether {
    /// Bounded ledger of applied nether events, oldest first.
    pub event_ledger: Vec<NetherLedgerEntry>,
    /// Bounded world modifiers.
    pub modifiers: NetherModifiers,
    /// Seeded card deck state.
    pub deck_state: DeckState,
    /// Last day a nether tick was applied.
    pub last_tick_day: i64,
}

/// One nether ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetherLedgerEntry {
    /// Nether day the card was applied.
    pub day: i64,
    /// Card label.
    pub card: String,
    /// Town affected.
    pub town: String,
    /// Signed magnitude applied.
    pub delta: i64,
}

/// Nether world modifiers, each bounded to `[-9, 9]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetherModifiers {
    /// Long-night pressure.
    pub long_night: i64,
    /// Omen pressure.
    pub omen: i64,
    /// Scarcity pressure.
    pub scarcity: i64,
    /// Threat pressure.
    pub threat: i64,
}

/// Seeded deck cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckState {
    /// Deck seed.
    pub seed: i64,
    /// Next card index.
    pub cursor: i64,
}

/// A chronicle record. Also the row shape of `world_chronicle_records`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChronicleRecord {
    /// Monotonic record id.
    pub record_id: i64,
    /// Source identifier (command family, execution id, …), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Town concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town_id: Option<String>,
    /// Faction concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction_id: Option<String>,
    /// Epoch milliseconds the record was written.
    pub at: i64,
    /// Record type label.
    #[serde(rename = "type")]
    pub kind: String,
    /// Record text.
    pub msg: String,
    /// Structured metadata, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// One news entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsEntry {
    /// RFC 3339 instant the entry was broadcast.
    pub at: String,
    /// Day of broadcast.
    pub day: i64,
    /// Town concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    /// News text.
    pub msg: String,
}

/// Projected execution view held inside the world document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionLog {
    /// Terminal execution results, oldest first. Capped.
    pub history: Vec<Value>,
    /// Staged pending markers for in-flight executions.
    pub pending: Vec<PendingExecution>,
    /// Append-only execution event ledger, oldest first. Capped.
    pub event_ledger: Vec<Value>,
}

/// A staged pending execution marker.
///
/// Staged with `completed_command_count = 0` before the first authority
/// command, updated after each committed command, deleted when the terminal
/// receipt is written. A surviving marker with a positive count is the
/// unambiguous signal for interrupted-execution recovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingExecution {
    /// Handoff id.
    pub handoff_id: String,
    /// Idempotency key.
    pub idempotency_key: String,
    /// Proposal type label.
    pub proposal_type: String,
    /// Acting actor id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Town concerned, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town_id: Option<String>,
    /// Authority commands, in execution order.
    pub authority_commands: Vec<String>,
    /// Number of authority commands that committed.
    pub completed_command_count: i64,
    /// Epoch milliseconds the marker was staged.
    pub staged_at: i64,
    /// Snapshot hash projected before execution began.
    pub before_snapshot_hash: String,
}

/// Monotonic id counters for derived records.
///
/// Counters make derived ids (`q0004`, `r0002`, …) a pure function of the
/// command history, which keeps two isolated runs of the same seeded command
/// sequence bit-identical. The sanitizer recomputes each counter from the
/// highest id present so a hand-edited file cannot cause collisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdCounters {
    /// Next quest ordinal.
    pub quest: i64,
    /// Next rumor ordinal.
    pub rumor: i64,
    /// Next decision ordinal.
    pub decision: i64,
    /// Next project ordinal.
    pub project: i64,
    /// Next mission ordinal.
    pub mission: i64,
    /// Next salvage-run ordinal.
    pub salvage: i64,
    /// Next offer ordinal.
    pub offer: i64,
    /// Next crier-entry ordinal.
    pub crier: i64,
    /// Next chronicle record id.
    pub chronicle: i64,
    /// Next event ordinal.
    pub event: i64,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            quest: 1,
            rumor: 1,
            decision: 1,
            project: 1,
            mission: 1,
            salvage: 1,
            offer: 1,
            crier: 1,
            chronicle: 1,
            event: 1,
        }
    }
}

impl IdCounters {
    /// Take the next ordinal from `counter`.
    pub fn take(counter: &mut i64) -> i64 {
        let n = (*counter).max(1);
        *counter = n + 1;
        n
    }
}
