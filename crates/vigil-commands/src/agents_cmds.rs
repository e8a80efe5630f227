// SPDX-License-Identifier: Apache-2.0

//! Agent profile commands: trust, traits, flags, summary.
//!
//! These write the same profile the turn engine reads, so they create the
//! agent record lazily the way memory writes do.

use vigil_world::doc::WorldDoc;

use crate::ctx::CmdCtx;

/// Recognized trait names.
pub const TRAIT_NAMES: [&str; 3] = ["courage", "greed", "faith"];

/// `agent trust <name> <delta>`
pub fn agent_trust(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, name: &str, delta: i64) -> bool {
    if delta == 0 {
        return ctx.refuse("trust delta must be non-zero");
    }
    let profile = &mut doc.agents.entry(name.to_owned()).or_default().profile;
    profile.trust += delta;
    let trust = profile.trust;
    ctx.say(format!("{name} trust now {trust}"));
    true
}

/// `agent trait <name> <courage|greed|faith> <value>`
pub fn agent_trait(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    name: &str,
    trait_name: &str,
    value: i64,
) -> bool {
    if !TRAIT_NAMES.contains(&trait_name) {
        return ctx.refuse(format!("unknown trait: {trait_name}"));
    }
    let traits = &mut doc.agents.entry(name.to_owned()).or_default().profile.traits;
    match trait_name {
        "courage" => traits.courage = value,
        "greed" => traits.greed = value,
        _ => traits.faith = value,
    }
    ctx.say(format!("{name} {trait_name} set to {value}"));
    true
}

/// `agent flag <name> <flag>` — adds the flag once.
pub fn agent_flag(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, name: &str, flag: &str) -> bool {
    let flags = &mut doc.agents.entry(name.to_owned()).or_default().profile.flags;
    if flags.iter().any(|f| f == flag) {
        return ctx.refuse(format!("{name} already carries {flag}"));
    }
    flags.push(flag.to_owned());
    ctx.say(format!("{name} flagged {flag}"));
    true
}

/// `agent mood <name> <mood>`
pub fn agent_mood(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, name: &str, mood: &str) -> bool {
    let profile = &mut doc.agents.entry(name.to_owned()).or_default().profile;
    if profile.mood == mood {
        return ctx.refuse(format!("{name} is already {mood}"));
    }
    profile.mood = mood.to_owned();
    ctx.say(format!("{name} turns {mood}"));
    true
}

/// `agent summary <name> <text…>` — replaces the rolling summary.
pub fn agent_summary(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, name: &str, text: &str) -> bool {
    let memory = doc.agents.entry(name.to_owned()).or_default();
    memory.summary = text.to_owned();
    ctx.say(format!("summary written for {name}"));
    true
}

/// `say <agent> <text…>` — record an utterance and defer its delivery.
pub fn agent_say(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, name: &str, line: &str) -> bool {
    let memory = doc.agents.entry(name.to_owned()).or_default();
    memory.recent_utterances.push(line.to_owned());
    vigil_world::bounds::cap_newest(
        &mut memory.recent_utterances,
        vigil_world::bounds::MAX_RECENT_UTTERANCES,
    );
    memory.last_processed_time = Some(ctx.now_iso.clone());
    ctx.effect(crate::hooks::Effect::Say {
        speaker: name.to_owned(),
        line: line.to_owned(),
    });
    ctx.say(format!("{name}: {line}"));
    true
}

/// `agent status <name>` — read-only.
pub fn agent_status(doc: &WorldDoc, ctx: &mut CmdCtx<'_>, name: &str) -> bool {
    let Some(memory) = doc.agents.get(name) else {
        return ctx.refuse(format!("unknown agent: {name}"));
    };
    let profile = &memory.profile;
    let job = profile
        .job
        .as_ref()
        .map_or_else(|| "idle".to_owned(), |j| j.role.clone());
    ctx.say(format!(
        "{name}: {} trust {} ({job})",
        profile.mood, profile.trust
    ));
    ctx.say(format!(
        "courage {} greed {} faith {}",
        profile.traits.courage, profile.traits.greed, profile.traits.faith
    ));
    if !profile.titles.is_empty() {
        let titles: Vec<&str> = profile.titles.iter().map(String::as_str).collect();
        ctx.say(format!("titles: {}", titles.join(", ")));
    }
    let balance = doc.world.economy.ledger.get(name).copied().unwrap_or(0);
    ctx.say(format!("holds {balance} {}", doc.world.economy.currency));
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{agent_flag, agent_mood, agent_trait, agent_trust};
    use crate::ctx::CmdCtx;
    use vigil_world::doc::WorldDoc;

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    #[test]
    fn profile_writes_create_the_agent() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(agent_trust(&mut doc, &mut c, "Mara", 2));
        assert!(agent_trait(&mut doc, &mut c, "Mara", "courage", 7));
        assert!(agent_flag(&mut doc, &mut c, "Mara", "oathbound"));
        assert!(agent_mood(&mut doc, &mut c, "Mara", "grim"));
        let profile = &doc.agents["Mara"].profile;
        assert_eq!(profile.trust, 2);
        assert_eq!(profile.traits.courage, 7);
        assert_eq!(profile.flags, vec!["oathbound"]);
        assert_eq!(profile.mood, "grim");
    }

    #[test]
    fn duplicate_flag_and_unknown_trait_refused() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(agent_flag(&mut doc, &mut c, "Mara", "oathbound"));
        assert!(!agent_flag(&mut doc, &mut c, "Mara", "oathbound"));
        assert!(!agent_trait(&mut doc, &mut c, "Mara", "luck", 3));
    }
}
