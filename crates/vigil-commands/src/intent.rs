// SPDX-License-Identifier: Apache-2.0

//! Job-driven intent bookkeeping for the external tick loop.
//!
//! The turn engine (an external collaborator) reports each agent's chosen
//! intent through the `agent intent <name> <intent>` command, once per
//! tick. Six consecutive repeats of the same job-driven intent trip the
//! repetition breaker: the agent's world intent reverts to `wander` and
//! the counter resets, after which the next tick may resume the job
//! intent.

use vigil_world::doc::WorldDoc;

use crate::ctx::CmdCtx;

/// Consecutive identical intents that trip the breaker.
pub const REPETITION_LIMIT: i64 = 6;

/// The fallback intent after the breaker trips.
pub const WANDER_INTENT: &str = "wander";

/// Record `intent` for `agent`; returns `true` when the breaker tripped.
pub fn note_agent_intent(doc: &mut WorldDoc, agent: &str, intent: &str) -> bool {
    let profile = &mut doc.agents.entry(agent.to_owned()).or_default().profile;
    if profile.last_intent.as_deref() == Some(intent) {
        profile.repetition_count += 1;
    } else {
        profile.last_intent = Some(intent.to_owned());
        profile.repetition_count = 1;
    }
    profile.world_intent = Some(intent.to_owned());

    if profile.repetition_count >= REPETITION_LIMIT {
        profile.world_intent = Some(WANDER_INTENT.to_owned());
        profile.last_intent = None;
        profile.repetition_count = 0;
        return true;
    }
    false
}

/// `agent intent <name> <intent>` — the tick loop's reporting surface.
pub fn agent_intent(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, name: &str, intent: &str) -> bool {
    if note_agent_intent(doc, name, intent) {
        ctx.say(format!("{name} breaks routine and wanders"));
    } else {
        ctx.say(format!("{name} intends {intent}"));
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{note_agent_intent, REPETITION_LIMIT, WANDER_INTENT};
    use vigil_world::doc::WorldDoc;

    #[test]
    fn breaker_trips_on_the_sixth_repeat_and_resumes() {
        let mut doc = WorldDoc::fresh();
        for _ in 0..(REPETITION_LIMIT - 1) {
            assert!(!note_agent_intent(&mut doc, "Mara", "tend_fields"));
        }
        assert!(note_agent_intent(&mut doc, "Mara", "tend_fields"));
        let profile = &doc.agents["Mara"].profile;
        assert_eq!(profile.world_intent.as_deref(), Some(WANDER_INTENT));
        assert_eq!(profile.repetition_count, 0);

        // next tick resumes the job intent with a fresh streak
        let mut doc2 = doc.clone();
        assert!(!note_agent_intent(&mut doc2, "Mara", "tend_fields"));
        assert_eq!(doc2.agents["Mara"].profile.repetition_count, 1);
    }

    #[test]
    fn changing_intent_resets_the_streak() {
        let mut doc = WorldDoc::fresh();
        assert!(!note_agent_intent(&mut doc, "Mara", "tend_fields"));
        assert!(!note_agent_intent(&mut doc, "Mara", "tend_fields"));
        assert!(!note_agent_intent(&mut doc, "Mara", "patrol"));
        assert_eq!(doc.agents["Mara"].profile.repetition_count, 1);
    }
}
