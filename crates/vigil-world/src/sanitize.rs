// SPDX-License-Identifier: Apache-2.0

//! Load-time schema sanitizer.
//!
//! Accepts any JSON value — including hostile or half-migrated documents —
//! and produces a canonical [`WorldDoc`]. The sanitizer never fails; it
//! degrades: defaults for missing fields, coercion for mistyped ones, range
//! clamps, dropped records where a required id is absent, and length caps on
//! every bounded container.
//!
//! This module is the authoritative migration layer: every historical shape
//! the system ever wrote must map to the current one here. New shapes extend
//! the sanitizer; they never fork it.
//!
//! Law (property-tested): `sanitize(sanitize(x)) == sanitize(x)`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::DateTime;
use serde_json::{Map, Value};

use crate::actors::synthetic_name;
use crate::bounds;
use crate::doc::{
    Actor, ActorRole, ActiveEvent, AgentMemory, AgentProfile, ArchiveEntry, CrierEntry,
    Decision, DecisionEffects, DecisionOption, DecisionStatus, DeckState, Economy, EventMods,
    EventState, ExecutionLog, FactionMemory, FactionState, IdCounters, ImpactEntry,
    JobAssignment, MajorMission, Marker, Market, MissionStatus, MoodMap, Nether,
    NetherLedgerEntry, NetherModifiers, NewsEntry, NoteEntry, Offer, PendingExecution, Phase,
    Player, Project, Quest, QuestKind, QuestStatus, Rules, Rumor, RumorSpawn, SalvageRun,
    Season, Side, ThreatMap, Town, TownMood, Traits, WorldClock, WorldDoc, WorldState,
    WorkStatus, ChronicleRecord, EPOCH_RFC3339,
};

/// Sanitize an arbitrary JSON value into the canonical world shape.
#[must_use]
pub fn sanitize(value: &Value) -> WorldDoc {
    let root = value.as_object();
    let agents = root
        .and_then(|m| m.get("agents"))
        .and_then(Value::as_object)
        .map(sanitize_agents)
        .unwrap_or_default();
    let factions = root
        .and_then(|m| m.get("factions"))
        .and_then(Value::as_object)
        .map(sanitize_faction_memories)
        .unwrap_or_default();
    let world = root
        .and_then(|m| m.get("world"))
        .map(sanitize_world)
        .unwrap_or_default();
    WorldDoc {
        agents,
        factions,
        world,
    }
}

// ── coercion helpers ────────────────────────────────────────────────

fn int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        _ => None,
    }
}

fn int_or(m: &Map<String, Value>, key: &str, default: i64) -> i64 {
    m.get(key).and_then(int).unwrap_or(default)
}

fn float(v: &Value) -> Option<f64> {
    v.as_f64().filter(|f| f.is_finite())
}

fn clamp(v: i64, lo: i64, hi: i64) -> i64 {
    v.clamp(lo, hi)
}

fn pct(m: &Map<String, Value>, key: &str, default: i64) -> i64 {
    clamp(int_or(m, key, default), 0, 100)
}

fn text(v: &Value) -> Option<String> {
    let s = v.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_owned())
    }
}

fn text_or(m: &Map<String, Value>, key: &str, default: &str) -> String {
    m.get(key)
        .and_then(text)
        .unwrap_or_else(|| default.to_owned())
}

fn opt_text(m: &Map<String, Value>, key: &str) -> Option<String> {
    m.get(key).and_then(text)
}

fn boolean(m: &Map<String, Value>, key: &str, default: bool) -> bool {
    m.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn list<'a>(m: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    m.get(key).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

fn rfc3339_or_epoch(m: &Map<String, Value>, key: &str) -> String {
    m.get(key)
        .and_then(text)
        .filter(|s| DateTime::parse_from_rfc3339(s).is_ok())
        .unwrap_or_else(|| EPOCH_RFC3339.to_owned())
}

fn string_map(m: &Map<String, Value>, key: &str) -> BTreeMap<String, i64> {
    let mut out = BTreeMap::new();
    if let Some(obj) = m.get(key).and_then(Value::as_object) {
        for (k, v) in obj {
            if let Some(n) = int(v) {
                out.insert(k.clone(), n);
            }
        }
    }
    out
}

fn string_set(m: &Map<String, Value>, key: &str) -> BTreeSet<String> {
    list(m, key).iter().filter_map(text).collect()
}

fn string_vec(m: &Map<String, Value>, key: &str) -> Vec<String> {
    list(m, key).iter().filter_map(text).collect()
}

/// Highest numeric suffix of ids shaped `<prefix><digits>`, used to rebuild
/// id counters so a sanitized document never re-issues an existing id.
fn next_ordinal<'a, I>(prefix: &str, ids: I) -> i64
where
    I: Iterator<Item = &'a str>,
{
    let mut max = 0i64;
    for id in ids {
        if let Some(rest) = id.strip_prefix(prefix) {
            if let Ok(n) = rest.parse::<i64>() {
                max = max.max(n);
            }
        }
    }
    max + 1
}

// ── agent / faction memories ────────────────────────────────────────

fn sanitize_notes(values: &[Value], cap: usize) -> Vec<NoteEntry> {
    let mut out: Vec<NoteEntry> = values
        .iter()
        .filter_map(|v| {
            let m = v.as_object()?;
            let note_text = opt_text(m, "text")?;
            Some(NoteEntry {
                at: rfc3339_or_epoch(m, "at"),
                text: note_text,
                important: boolean(m, "important", false),
            })
        })
        .collect();
    bounds::cap_newest(&mut out, cap);
    out
}

fn sanitize_archive(values: &[Value]) -> Vec<ArchiveEntry> {
    let mut out: Vec<ArchiveEntry> = values
        .iter()
        .filter_map(|v| {
            let m = v.as_object()?;
            let entry_text = opt_text(m, "text")?;
            Some(ArchiveEntry {
                at: rfc3339_or_epoch(m, "at"),
                text: entry_text,
            })
        })
        .collect();
    bounds::cap_newest(&mut out, bounds::MAX_ARCHIVE);
    out
}

fn sanitize_profile(m: &Map<String, Value>) -> AgentProfile {
    let traits = m
        .get("traits")
        .and_then(Value::as_object)
        .map_or_else(Traits::default, |t| Traits {
            courage: int_or(t, "courage", 0),
            greed: int_or(t, "greed", 0),
            faith: int_or(t, "faith", 0),
        });
    let job = m.get("job").and_then(Value::as_object).and_then(|j| {
        let role = opt_text(j, "role")?;
        Some(JobAssignment {
            role,
            home_marker: opt_text(j, "home_marker"),
        })
    });
    AgentProfile {
        trust: int_or(m, "trust", 0),
        mood: text_or(m, "mood", "neutral"),
        flags: string_vec(m, "flags"),
        job,
        world_intent: opt_text(m, "world_intent"),
        last_intent: opt_text(m, "last_intent"),
        repetition_count: int_or(m, "repetition_count", 0).max(0),
        rep: string_map(m, "rep"),
        traits,
        titles: string_set(m, "titles"),
        rumor_quests_completed: int_or(m, "rumor_quests_completed", 0).max(0),
    }
}

fn sanitize_agents(agents: &Map<String, Value>) -> BTreeMap<String, AgentMemory> {
    let mut out = BTreeMap::new();
    for (name, v) in agents {
        let Some(m) = v.as_object() else { continue };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let mut utterances: Vec<String> = string_vec(m, "recentUtterances");
        bounds::cap_newest(&mut utterances, bounds::MAX_RECENT_UTTERANCES);
        out.insert(
            name.to_owned(),
            AgentMemory {
                short_notes: sanitize_notes(list(m, "shortNotes"), bounds::MAX_SHORT_NOTES),
                long_notes: sanitize_notes(list(m, "longNotes"), bounds::MAX_LONG_NOTES),
                summary: text_or(m, "summary", ""),
                archive: sanitize_archive(list(m, "archive")),
                recent_utterances: utterances,
                last_processed_time: opt_text(m, "lastProcessedTime")
                    .filter(|s| DateTime::parse_from_rfc3339(s).is_ok()),
                profile: m
                    .get("profile")
                    .and_then(Value::as_object)
                    .map_or_else(AgentProfile::default, sanitize_profile),
            },
        );
    }
    out
}

fn sanitize_faction_memories(factions: &Map<String, Value>) -> BTreeMap<String, FactionMemory> {
    let mut out = BTreeMap::new();
    for (name, v) in factions {
        let Some(m) = v.as_object() else { continue };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        out.insert(
            name.to_owned(),
            FactionMemory {
                long_notes: sanitize_notes(list(m, "longNotes"), bounds::MAX_LONG_NOTES),
                summary: text_or(m, "summary", ""),
                archive: sanitize_archive(list(m, "archive")),
            },
        );
    }
    out
}

// ── world state ─────────────────────────────────────────────────────

fn sanitize_world(value: &Value) -> WorldState {
    let Some(m) = value.as_object() else {
        return WorldState::default();
    };

    let mut world = WorldState {
        player: sanitize_player(m),
        rules: Rules {
            allow_lethal_politics: m
                .get("rules")
                .and_then(Value::as_object)
                .map_or(false, |r| boolean(r, "allowLethalPolitics", false)),
        },
        war_active: boolean(m, "warActive", false),
        factions: sanitize_factions(m),
        clock: sanitize_clock(m),
        threat: sanitize_threat(m),
        moods: sanitize_moods(m),
        events: sanitize_events(m),
        rumors: sanitize_rumors(m),
        decisions: sanitize_decisions(m),
        markers: sanitize_markers(m),
        markets: sanitize_markets(m),
        economy: sanitize_economy(m),
        quests: Vec::new(),
        major_missions: Vec::new(),
        projects: sanitize_projects(m),
        salvage_runs: sanitize_salvage(m),
        towns: sanitize_towns(m),
        actors: BTreeMap::new(),
        nether: sanitize_nether(m),
        chronicle: sanitize_chronicle(m),
        news: sanitize_news(m),
        processed_event_ids: sanitize_processed_ids(m),
        execution: sanitize_execution(m),
        ids: IdCounters::default(),
    };

    world.actors = sanitize_actors(m, &world.towns);
    world.quests = sanitize_quests(m);
    world.major_missions = sanitize_missions(m, &mut world.towns);
    rebuild_id_counters(&mut world);
    world
}

fn sanitize_player(m: &Map<String, Value>) -> Player {
    m.get("player")
        .and_then(Value::as_object)
        .map_or_else(Player::default, |p| Player {
            name: text_or(p, "name", "Player"),
            alive: boolean(p, "alive", true),
            legitimacy: pct(p, "legitimacy", 50),
        })
}

fn sanitize_factions(m: &Map<String, Value>) -> BTreeMap<String, FactionState> {
    let mut out = BTreeMap::new();
    if let Some(map) = m.get("factions").and_then(Value::as_object) {
        for (id, v) in map {
            let Some(f) = v.as_object() else { continue };
            let id = id.trim();
            if id.is_empty() {
                continue;
            }
            out.insert(
                id.to_owned(),
                FactionState {
                    name: text_or(f, "name", id),
                    towns: string_set(f, "towns"),
                    doctrine: text_or(f, "doctrine", ""),
                    rivals: string_vec(f, "rivals"),
                    hostility_to_player: pct(f, "hostilityToPlayer", 0),
                    stability: pct(f, "stability", 50),
                },
            );
        }
    }
    out
}

fn sanitize_clock(m: &Map<String, Value>) -> WorldClock {
    let Some(c) = m.get("clock").and_then(Value::as_object) else {
        return WorldClock::default();
    };
    let phase = match c.get("phase").and_then(Value::as_str) {
        Some("night") => Phase::Night,
        _ => Phase::Day,
    };
    let season = match c.get("season").and_then(Value::as_str) {
        Some("long_night") => Season::LongNight,
        Some("thaw") => Season::Thaw,
        Some("harvest") => Season::Harvest,
        _ => Season::Dawn,
    };
    WorldClock {
        day: int_or(c, "day", 1).max(1),
        phase,
        season,
        updated_at: rfc3339_or_epoch(c, "updated_at"),
    }
}

fn sanitize_threat(m: &Map<String, Value>) -> ThreatMap {
    let mut by_town = BTreeMap::new();
    if let Some(t) = m
        .get("threat")
        .and_then(Value::as_object)
        .and_then(|t| t.get("byTown"))
        .and_then(Value::as_object)
    {
        for (town, v) in t {
            if let Some(n) = int(v) {
                by_town.insert(town.clone(), clamp(n, 0, 100));
            }
        }
    }
    ThreatMap { by_town }
}

fn sanitize_moods(m: &Map<String, Value>) -> MoodMap {
    let mut by_town = BTreeMap::new();
    if let Some(t) = m
        .get("moods")
        .and_then(Value::as_object)
        .and_then(|t| t.get("byTown"))
        .and_then(Value::as_object)
    {
        for (town, v) in t {
            let Some(mm) = v.as_object() else { continue };
            by_town.insert(
                town.clone(),
                TownMood {
                    fear: pct(mm, "fear", 0),
                    unrest: pct(mm, "unrest", 0),
                    prosperity: pct(mm, "prosperity", 50),
                },
            );
        }
    }
    MoodMap { by_town }
}

fn sanitize_event_mods(v: Option<&Value>) -> EventMods {
    v.and_then(Value::as_object)
        .map_or_else(EventMods::default, |m| EventMods {
            fear: int_or(m, "fear", 0),
            unrest: int_or(m, "unrest", 0),
            prosperity: int_or(m, "prosperity", 0),
            threat: int_or(m, "threat", 0),
        })
}

fn sanitize_events(m: &Map<String, Value>) -> EventState {
    let Some(e) = m.get("events").and_then(Value::as_object) else {
        return EventState::default();
    };
    let active = list(e, "active")
        .iter()
        .filter_map(|v| {
            let a = v.as_object()?;
            let id = opt_text(a, "id")?;
            Some(ActiveEvent {
                id,
                kind: text_or(a, "type", "unknown"),
                town: text_or(a, "town", ""),
                starts_day: int_or(a, "starts_day", 0).max(0),
                ends_day: int_or(a, "ends_day", 0).max(0),
                mods: sanitize_event_mods(a.get("mods")),
            })
        })
        .collect();
    EventState {
        seed: int_or(e, "seed", 0),
        index: int_or(e, "index", 0).max(0),
        active,
    }
}

fn sanitize_rumors(m: &Map<String, Value>) -> Vec<Rumor> {
    list(m, "rumors")
        .iter()
        .filter_map(|v| {
            let r = v.as_object()?;
            let id = opt_text(r, "id")?;
            let town = opt_text(r, "town")?;
            Some(Rumor {
                id,
                town,
                kind: text_or(r, "kind", "mundane"),
                strength: int_or(r, "strength", 1).max(0),
                detail: text_or(r, "detail", ""),
                expires_day: int_or(r, "expires_day", 0).max(0),
                resolved: boolean(r, "resolved", false),
                quest_id: opt_text(r, "quest_id"),
            })
        })
        .collect()
}

fn sanitize_decisions(m: &Map<String, Value>) -> Vec<Decision> {
    list(m, "decisions")
        .iter()
        .filter_map(|v| {
            let d = v.as_object()?;
            let id = opt_text(d, "id")?;
            let mut seen = BTreeSet::new();
            let options: Vec<DecisionOption> = list(d, "options")
                .iter()
                .filter_map(|ov| {
                    let o = ov.as_object()?;
                    let key = opt_text(o, "key")?;
                    if !seen.insert(key.clone()) {
                        return None; // duplicate option keys keep the first
                    }
                    Some(DecisionOption {
                        key,
                        label: text_or(o, "label", ""),
                        effects: sanitize_decision_effects(o.get("effects")),
                    })
                })
                .collect();
            let status = match d.get("status").and_then(Value::as_str) {
                Some("chosen") => DecisionStatus::Chosen,
                _ => DecisionStatus::Open,
            };
            Some(Decision {
                id,
                town: text_or(d, "town", ""),
                prompt: text_or(d, "prompt", ""),
                options,
                status,
                chosen_key: opt_text(d, "chosen_key"),
                created_day: int_or(d, "created_day", 0).max(0),
            })
        })
        .collect()
}

fn sanitize_decision_effects(v: Option<&Value>) -> DecisionEffects {
    let Some(m) = v.and_then(Value::as_object) else {
        return DecisionEffects::default();
    };
    let rumor_spawn = m.get("rumor_spawn").and_then(Value::as_object).and_then(|r| {
        let town = opt_text(r, "town")?;
        Some(RumorSpawn {
            town,
            kind: text_or(r, "kind", "mundane"),
            strength: int_or(r, "strength", 1).max(0),
            detail: text_or(r, "detail", ""),
            ttl_days: int_or(r, "ttl_days", 1).max(0),
        })
    });
    DecisionEffects {
        fear: int_or(m, "fear", 0),
        unrest: int_or(m, "unrest", 0),
        prosperity: int_or(m, "prosperity", 0),
        threat_delta: int_or(m, "threat_delta", 0),
        rep_delta: string_map(m, "rep_delta"),
        rumor_spawn,
    }
}

fn sanitize_markers(m: &Map<String, Value>) -> Vec<Marker> {
    // Dedupe by name keeping the latest record; non-finite coords drop the
    // marker outright.
    let mut by_name: BTreeMap<String, Marker> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();
    for v in list(m, "markers") {
        let Some(mk) = v.as_object() else { continue };
        let Some(name) = opt_text(mk, "name") else {
            continue;
        };
        let (Some(x), Some(y), Some(z)) = (
            mk.get("x").and_then(float),
            mk.get("y").and_then(float),
            mk.get("z").and_then(float),
        ) else {
            continue;
        };
        if !by_name.contains_key(&name) {
            order.push(name.clone());
        }
        by_name.insert(
            name.clone(),
            Marker {
                name,
                x,
                y,
                z,
                tag: opt_text(mk, "tag"),
                created_at: rfc3339_or_epoch(mk, "created_at"),
            },
        );
    }
    order
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect()
}

fn sanitize_markets(m: &Map<String, Value>) -> Vec<Market> {
    let mut names = BTreeSet::new();
    list(m, "markets")
        .iter()
        .filter_map(|v| {
            let mk = v.as_object()?;
            let name = opt_text(mk, "name")?;
            if !names.insert(name.clone()) {
                return None;
            }
            let mut offer_ids = BTreeSet::new();
            let offers = list(mk, "offers")
                .iter()
                .filter_map(|ov| {
                    let o = ov.as_object()?;
                    let offer_id = opt_text(o, "offer_id")?;
                    if !offer_ids.insert(offer_id.clone()) {
                        return None; // offer_id must be unique within the market
                    }
                    let amount = int_or(o, "amount", 0);
                    let price = int_or(o, "price", 0);
                    if amount <= 0 || price <= 0 {
                        return None;
                    }
                    let side = match o.get("side").and_then(Value::as_str) {
                        Some("buy") => Side::Buy,
                        _ => Side::Sell,
                    };
                    Some(Offer {
                        offer_id,
                        owner: text_or(o, "owner", ""),
                        side,
                        amount,
                        price,
                        active: boolean(o, "active", true),
                    })
                })
                .collect();
            Some(Market {
                name,
                marker: opt_text(mk, "marker"),
                offers,
            })
        })
        .collect()
}

fn sanitize_economy(m: &Map<String, Value>) -> Economy {
    let Some(e) = m.get("economy").and_then(Value::as_object) else {
        return Economy::default();
    };
    let mut ledger = BTreeMap::new();
    if let Some(l) = e.get("ledger").and_then(Value::as_object) {
        for (agent, v) in l {
            // Only finite non-negative integers survive.
            let Some(n) = v.as_i64().or_else(|| {
                v.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            }) else {
                continue;
            };
            if n >= 0 {
                ledger.insert(agent.clone(), n);
            }
        }
    }
    let minted_total = e
        .get("minted_total")
        .and_then(int)
        .filter(|n| *n >= 0);
    Economy {
        currency: text_or(e, "currency", "emerald"),
        ledger,
        minted_total,
    }
}

const RECOGNIZED_QUEST_KINDS: [(&str, QuestKind); 3] = [
    ("trade_n", QuestKind::TradeN),
    ("visit_town", QuestKind::VisitTown),
    ("rumor_task", QuestKind::RumorTask),
];

fn quest_status(s: Option<&str>) -> QuestStatus {
    match s {
        Some("accepted") => QuestStatus::Accepted,
        Some("in_progress") => QuestStatus::InProgress,
        Some("completed") => QuestStatus::Completed,
        Some("cancelled") => QuestStatus::Cancelled,
        _ => QuestStatus::Offered,
    }
}

fn sanitize_quests(m: &Map<String, Value>) -> Vec<Quest> {
    let mut quests: Vec<Quest> = list(m, "quests")
        .iter()
        .filter_map(|v| {
            let q = v.as_object()?;
            let id = opt_text(q, "id")?;
            let kind = q.get("type").and_then(Value::as_str).and_then(|s| {
                RECOGNIZED_QUEST_KINDS
                    .iter()
                    .find(|(label, _)| *label == s)
                    .map(|(_, k)| *k)
            })?;
            let reward = int_or(q, "reward", 0);
            if reward < 0 {
                return None;
            }
            let offered_at = opt_text(q, "offered_at")
                .filter(|s| DateTime::parse_from_rfc3339(s).is_ok())?;
            Some(Quest {
                id,
                kind,
                town: text_or(q, "town", ""),
                owner: opt_text(q, "owner"),
                giver_role: opt_text(q, "giver_role"),
                status: quest_status(q.get("status").and_then(Value::as_str)),
                reward,
                progress: int_or(q, "progress", 0).max(0),
                target: int_or(q, "target", 0).max(0),
                target_town: opt_text(q, "target_town"),
                rumor_id: opt_text(q, "rumor_id"),
                offered_at,
                offered_day: int_or(q, "offered_day", 0).max(0),
            })
        })
        .collect();

    // Townsfolk-originated quests are bounded per town to the most recent 24.
    let mut per_town: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, q) in quests.iter().enumerate() {
        if q.giver_role.as_deref() == Some("townsfolk") {
            per_town.entry(q.town.clone()).or_default().push(i);
        }
    }
    let mut dropped: BTreeSet<usize> = BTreeSet::new();
    for indexes in per_town.values() {
        if indexes.len() > bounds::MAX_TOWNSFOLK_QUESTS_PER_TOWN {
            let excess = indexes.len() - bounds::MAX_TOWNSFOLK_QUESTS_PER_TOWN;
            dropped.extend(indexes.iter().take(excess).copied());
        }
    }
    if !dropped.is_empty() {
        quests = quests
            .into_iter()
            .enumerate()
            .filter_map(|(i, q)| (!dropped.contains(&i)).then_some(q))
            .collect();
    }
    quests
}

fn mission_status(s: Option<&str>) -> MissionStatus {
    match s {
        Some("active") => MissionStatus::Active,
        Some("completed") => MissionStatus::Completed,
        Some("failed") => MissionStatus::Failed,
        _ => MissionStatus::Briefed,
    }
}

/// Collapse multiple `active` missions for one town: the one matching the
/// town's `activeMajorMissionId` survives, the rest demote to `briefed`. The
/// town pointer is then re-pointed at the surviving mission (or cleared).
fn sanitize_missions(
    m: &Map<String, Value>,
    towns: &mut BTreeMap<String, Town>,
) -> Vec<MajorMission> {
    let mut missions: Vec<MajorMission> = list(m, "majorMissions")
        .iter()
        .filter_map(|v| {
            let mm = v.as_object()?;
            let id = opt_text(mm, "id")?;
            Some(MajorMission {
                id,
                town: text_or(mm, "town", ""),
                title: text_or(mm, "title", ""),
                phase: int_or(mm, "phase", 1).max(1),
                status: mission_status(mm.get("status").and_then(Value::as_str)),
            })
        })
        .collect();

    let mut active_by_town: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, mission) in missions.iter().enumerate() {
        if mission.status == MissionStatus::Active {
            active_by_town.entry(mission.town.clone()).or_default().push(i);
        }
    }
    for (town_id, indexes) in &active_by_town {
        let pointer = towns
            .get(town_id)
            .and_then(|t| t.active_major_mission_id.clone());
        let keep = indexes
            .iter()
            .copied()
            .find(|i| Some(missions[*i].id.as_str()) == pointer.as_deref())
            .or_else(|| indexes.first().copied());
        for i in indexes {
            if Some(*i) != keep {
                missions[*i].status = MissionStatus::Briefed;
            }
        }
        if let (Some(keep), Some(town)) = (keep, towns.get_mut(town_id)) {
            town.active_major_mission_id = Some(missions[keep].id.clone());
        }
    }
    // Clear stale pointers at towns with no surviving active mission.
    for (town_id, town) in towns.iter_mut() {
        let has_active = missions
            .iter()
            .any(|mi| mi.town == *town_id && mi.status == MissionStatus::Active);
        if !has_active {
            town.active_major_mission_id = None;
        }
    }
    missions
}

fn work_status(s: Option<&str>) -> WorkStatus {
    match s {
        Some("completed") => WorkStatus::Completed,
        Some("failed") => WorkStatus::Failed,
        _ => WorkStatus::Active,
    }
}

fn sanitize_projects(m: &Map<String, Value>) -> Vec<Project> {
    list(m, "projects")
        .iter()
        .filter_map(|v| {
            let p = v.as_object()?;
            let id = opt_text(p, "id")?;
            Some(Project {
                id,
                town: text_or(p, "town", ""),
                kind: text_or(p, "type", "works"),
                stage: int_or(p, "stage", 1).max(1),
                status: work_status(p.get("status").and_then(Value::as_str)),
                started_day: int_or(p, "started_day", 0).max(0),
            })
        })
        .collect()
}

fn sanitize_salvage(m: &Map<String, Value>) -> Vec<SalvageRun> {
    list(m, "salvageRuns")
        .iter()
        .filter_map(|v| {
            let s = v.as_object()?;
            let id = opt_text(s, "id")?;
            Some(SalvageRun {
                id,
                town: text_or(s, "town", ""),
                focus: text_or(s, "focus", "metal"),
                stage: int_or(s, "stage", 1).max(1),
                status: work_status(s.get("status").and_then(Value::as_str)),
                started_day: int_or(s, "started_day", 0).max(0),
            })
        })
        .collect()
}

fn sanitize_towns(m: &Map<String, Value>) -> BTreeMap<String, Town> {
    let mut out = BTreeMap::new();
    if let Some(map) = m.get("towns").and_then(Value::as_object) {
        for (id, v) in map {
            let Some(t) = v.as_object() else { continue };
            let id = id.trim();
            if id.is_empty() {
                continue;
            }
            let mut crier_queue: Vec<CrierEntry> = list(t, "crierQueue")
                .iter()
                .filter_map(|cv| {
                    let c = cv.as_object()?;
                    let entry_id = opt_text(c, "id")?;
                    Some(CrierEntry {
                        id: entry_id,
                        day: int_or(c, "day", 0).max(0),
                        kind: text_or(c, "kind", "notice"),
                        text: text_or(c, "text", ""),
                    })
                })
                .collect();
            bounds::cap_newest(&mut crier_queue, bounds::MAX_CRIER_QUEUE);
            let mut recent_impacts: Vec<ImpactEntry> = list(t, "recentImpacts")
                .iter()
                .filter_map(|iv| {
                    let i = iv.as_object()?;
                    Some(ImpactEntry {
                        day: int_or(i, "day", 0).max(0),
                        source: text_or(i, "source", ""),
                        delta: int_or(i, "delta", 0),
                        text: text_or(i, "text", ""),
                    })
                })
                .collect();
            bounds::cap_newest(&mut recent_impacts, bounds::MAX_RECENT_IMPACTS);
            out.insert(
                id.to_owned(),
                Town {
                    name: text_or(t, "name", id),
                    status: text_or(t, "status", "standing"),
                    region: opt_text(t, "region"),
                    tags: string_set(t, "tags"),
                    active_major_mission_id: opt_text(t, "activeMajorMissionId"),
                    major_mission_cooldown_until_day: int_or(t, "majorMissionCooldownUntilDay", 0)
                        .max(0),
                    hope: pct(t, "hope", 50),
                    dread: pct(t, "dread", 20),
                    crier_queue,
                    recent_impacts,
                },
            );
        }
    }
    out
}

fn actor_role(s: Option<&str>) -> ActorRole {
    match s {
        Some("mayor") => ActorRole::Mayor,
        Some("captain") => ActorRole::Captain,
        Some("warden") => ActorRole::Warden,
        _ => ActorRole::Townsfolk,
    }
}

fn sanitize_actors(
    m: &Map<String, Value>,
    towns: &BTreeMap<String, Town>,
) -> BTreeMap<String, Actor> {
    let mut out = BTreeMap::new();
    if let Some(map) = m.get("actors").and_then(Value::as_object) {
        for (id, v) in map {
            let Some(a) = v.as_object() else { continue };
            let id = id.trim();
            if id.is_empty() {
                continue;
            }
            let role = actor_role(a.get("role").and_then(Value::as_str));
            let town_id = text_or(a, "townId", "");
            let town_name = towns
                .get(&town_id)
                .map_or_else(|| town_id.clone(), |t| t.name.clone());
            let name = opt_text(a, "name").unwrap_or_else(|| synthetic_name(role, &town_name));
            out.insert(
                id.to_owned(),
                Actor {
                    actor_id: text_or(a, "actorId", id),
                    town_id,
                    name,
                    role,
                    status: text_or(a, "status", "present"),
                },
            );
        }
    }
    out
}

fn sanitize_nether(m: &Map<String, Value>) -> Nether {
    let Some(n) = m.get("nether").and_then(Value::as_object) else {
        return Nether::default();
    };
    let mut event_ledger: Vec<NetherLedgerEntry> = list(n, "eventLedger")
        .iter()
        .filter_map(|v| {
            let e = v.as_object()?;
            Some(NetherLedgerEntry {
                day: int_or(e, "day", 0).max(0),
                card: text_or(e, "card", "unknown"),
                town: text_or(e, "town", ""),
                delta: int_or(e, "delta", 0),
            })
        })
        .collect();
    bounds::cap_newest(&mut event_ledger, bounds::MAX_NETHER_LEDGER);

    let modifiers = n
        .get("modifiers")
        .and_then(Value::as_object)
        .map_or_else(NetherModifiers::default, |md| NetherModifiers {
            long_night: clamp(
                int_or(md, "longNight", 0),
                -bounds::MAX_NETHER_MODIFIER,
                bounds::MAX_NETHER_MODIFIER,
            ),
            omen: clamp(
                int_or(md, "omen", 0),
                -bounds::MAX_NETHER_MODIFIER,
                bounds::MAX_NETHER_MODIFIER,
            ),
            scarcity: clamp(
                int_or(md, "scarcity", 0),
                -bounds::MAX_NETHER_MODIFIER,
                bounds::MAX_NETHER_MODIFIER,
            ),
            threat: clamp(
                int_or(md, "threat", 0),
                -bounds::MAX_NETHER_MODIFIER,
                bounds::MAX_NETHER_MODIFIER,
            ),
        });

    let deck_state = n
        .get("deckState")
        .and_then(Value::as_object)
        .map_or_else(DeckState::default, |d| DeckState {
            seed: int_or(d, "seed", 0),
            cursor: int_or(d, "cursor", 0).max(0),
        });

    // lastTickDay must cover every day the ledger has seen.
    let max_seen = event_ledger.iter().map(|e| e.day).max().unwrap_or(0);
    let last_tick_day = int_or(n, "lastTickDay", 0).max(0).max(max_seen);

    Nether {
        event_ledger,
        modifiers,
        deck_state,
        last_tick_day,
    }
}

fn sanitize_chronicle(m: &Map<String, Value>) -> Vec<ChronicleRecord> {
    let mut out: Vec<ChronicleRecord> = list(m, "chronicle")
        .iter()
        .filter_map(|v| {
            let c = v.as_object()?;
            Some(ChronicleRecord {
                record_id: int_or(c, "recordId", 0).max(0),
                source_id: opt_text(c, "sourceId"),
                town_id: opt_text(c, "townId"),
                faction_id: opt_text(c, "factionId"),
                at: int_or(c, "at", 0).max(0),
                kind: text_or(c, "type", "note"),
                msg: text_or(c, "msg", ""),
                meta: c.get("meta").filter(|v| v.is_object()).cloned(),
            })
        })
        .collect();
    bounds::cap_newest(&mut out, bounds::MAX_CHRONICLE);
    out
}

fn sanitize_news(m: &Map<String, Value>) -> Vec<NewsEntry> {
    let mut out: Vec<NewsEntry> = list(m, "news")
        .iter()
        .filter_map(|v| {
            let n = v.as_object()?;
            let msg = opt_text(n, "msg")?;
            Some(NewsEntry {
                at: rfc3339_or_epoch(n, "at"),
                day: int_or(n, "day", 0).max(0),
                town: opt_text(n, "town"),
                msg,
            })
        })
        .collect();
    bounds::cap_newest(&mut out, bounds::MAX_NEWS);
    out
}

fn sanitize_processed_ids(m: &Map<String, Value>) -> Vec<String> {
    let raw: Vec<String> = list(m, "processedEventIds").iter().filter_map(text).collect();
    // Dedup preserving the last occurrence of each id, then keep the tail.
    let mut seen = BTreeSet::new();
    let mut out: Vec<String> = raw
        .into_iter()
        .rev()
        .filter(|id| seen.insert(id.clone()))
        .collect();
    out.reverse();
    bounds::cap_newest(&mut out, bounds::MAX_PROCESSED_EVENT_IDS);
    out
}

fn sanitize_execution(m: &Map<String, Value>) -> ExecutionLog {
    let Some(e) = m.get("execution").and_then(Value::as_object) else {
        return ExecutionLog::default();
    };
    let mut history: Vec<Value> = list(e, "history")
        .iter()
        .filter(|v| v.is_object())
        .cloned()
        .collect();
    bounds::cap_newest(&mut history, bounds::MAX_EXECUTION_HISTORY);

    let mut pending: Vec<PendingExecution> = list(e, "pending")
        .iter()
        .filter_map(|v| {
            let p = v.as_object()?;
            let handoff_id = opt_text(p, "handoffId")?;
            let idempotency_key = opt_text(p, "idempotencyKey")?;
            Some(PendingExecution {
                handoff_id,
                idempotency_key,
                proposal_type: text_or(p, "proposalType", ""),
                actor_id: opt_text(p, "actorId"),
                town_id: opt_text(p, "townId"),
                authority_commands: string_vec(p, "authorityCommands"),
                completed_command_count: int_or(p, "completedCommandCount", 0).max(0),
                staged_at: int_or(p, "stagedAt", 0).max(0),
                before_snapshot_hash: text_or(p, "beforeSnapshotHash", ""),
            })
        })
        .collect();
    bounds::cap_newest(&mut pending, bounds::MAX_EXECUTION_PENDING);

    let mut event_ledger: Vec<Value> = list(e, "eventLedger")
        .iter()
        .filter(|v| v.is_object())
        .cloned()
        .collect();
    bounds::cap_newest(&mut event_ledger, bounds::MAX_EXECUTION_EVENTS);

    ExecutionLog {
        history,
        pending,
        event_ledger,
    }
}

fn rebuild_id_counters(world: &mut WorldState) {
    world.ids = IdCounters {
        quest: next_ordinal("q", world.quests.iter().map(|q| q.id.as_str())),
        rumor: next_ordinal("r", world.rumors.iter().map(|r| r.id.as_str())),
        decision: next_ordinal("d", world.decisions.iter().map(|d| d.id.as_str())),
        project: next_ordinal("p", world.projects.iter().map(|p| p.id.as_str())),
        mission: next_ordinal("m", world.major_missions.iter().map(|m| m.id.as_str())),
        salvage: next_ordinal("s", world.salvage_runs.iter().map(|s| s.id.as_str())),
        offer: next_ordinal(
            "of",
            world
                .markets
                .iter()
                .flat_map(|m| m.offers.iter().map(|o| o.offer_id.as_str())),
        ),
        crier: next_ordinal(
            "c",
            world
                .towns
                .values()
                .flat_map(|t| t.crier_queue.iter().map(|c| c.id.as_str())),
        ),
        chronicle: world
            .chronicle
            .iter()
            .map(|c| c.record_id)
            .max()
            .unwrap_or(0)
            + 1,
        event: next_ordinal("e", world.events.active.iter().map(|e| e.id.as_str())),
    };
}
