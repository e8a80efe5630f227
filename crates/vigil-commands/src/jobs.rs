// SPDX-License-Identifier: Apache-2.0

//! Job assignment commands.

use vigil_world::doc::{JobAssignment, WorldDoc};

use crate::ctx::CmdCtx;
use crate::hooks::Effect;

/// Roles an agent may hold.
pub const JOB_ROLES: [&str; 7] = [
    "farmer", "guard", "miner", "trader", "priest", "scout", "healer",
];

/// `job set <agent> <role> [<home_marker>]`
///
/// Creates the agent record lazily; the role must be whitelisted and the
/// home marker, when given, must exist.
pub fn job_set(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    agent: &str,
    role: &str,
    home_marker: Option<&str>,
) -> bool {
    if !JOB_ROLES.contains(&role) {
        return ctx.refuse(format!("unknown role: {role}"));
    }
    if let Some(marker) = home_marker {
        if !doc.world.markers.iter().any(|m| m.name == marker) {
            return ctx.refuse(format!("unknown marker: {marker}"));
        }
    }
    let memory = doc.agents.entry(agent.to_owned()).or_default();
    memory.profile.job = Some(JobAssignment {
        role: role.to_owned(),
        home_marker: home_marker.map(str::to_owned),
    });
    ctx.effect(Effect::JobChanged {
        agent: agent.to_owned(),
        role: Some(role.to_owned()),
    });
    ctx.say(format!("{agent} now works as {role}"));
    true
}

/// `job clear <agent>`
pub fn job_clear(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, agent: &str) -> bool {
    let Some(memory) = doc.agents.get_mut(agent) else {
        return ctx.refuse(format!("unknown agent: {agent}"));
    };
    if memory.profile.job.take().is_none() {
        return ctx.refuse(format!("{agent} has no job"));
    }
    ctx.effect(Effect::JobChanged {
        agent: agent.to_owned(),
        role: None,
    });
    ctx.say(format!("{agent} is out of work"));
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{job_clear, job_set};
    use crate::ctx::CmdCtx;
    use vigil_world::doc::{Marker, WorldDoc};

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    #[test]
    fn whitelist_and_marker_are_enforced() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(!job_set(&mut doc, &mut c, "Mara", "necromancer", None));
        assert!(!job_set(&mut doc, &mut c, "Mara", "guard", Some("nowhere")));
        assert!(doc.agents.is_empty());

        doc.world.markers.push(Marker {
            name: "gate".to_owned(),
            ..Marker::default()
        });
        assert!(job_set(&mut doc, &mut c, "Mara", "guard", Some("gate")));
        assert_eq!(
            doc.agents["Mara"].profile.job.as_ref().unwrap().role,
            "guard"
        );
    }

    #[test]
    fn clear_requires_an_existing_job() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(!job_clear(&mut doc, &mut c, "Mara"));
        assert!(job_set(&mut doc, &mut c, "Mara", "scout", None));
        assert!(job_clear(&mut doc, &mut c, "Mara"));
        assert!(!job_clear(&mut doc, &mut c, "Mara"));
    }
}
