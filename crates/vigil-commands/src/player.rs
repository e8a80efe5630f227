// SPDX-License-Identifier: Apache-2.0

//! Player, rules, and war commands.
//!
//! Lethal outcomes are gated on `rules.allowLethalPolitics`; flipping the
//! rule is itself a command, so a lethal command sequence is auditable in
//! the chronicle.

use vigil_world::doc::WorldDoc;

use crate::ctx::CmdCtx;
use crate::feed;

/// Threat swing applied to every town when war starts or ends.
const WAR_THREAT_SWING: i64 = 10;

/// `player status` — read-only.
pub fn player_status(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    let player = &doc.world.player;
    let state = if player.alive { "alive" } else { "dead" };
    ctx.say(format!(
        "{} is {state}, legitimacy {}",
        player.name, player.legitimacy
    ));
    false
}

/// `player legitimacy <delta>`
pub fn player_legitimacy(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, delta: i64) -> bool {
    if delta == 0 {
        return ctx.refuse("legitimacy delta must be non-zero");
    }
    let player = &mut doc.world.player;
    player.legitimacy = (player.legitimacy + delta).clamp(0, 100);
    let value = player.legitimacy;
    ctx.say(format!("legitimacy now {value}"));
    true
}

/// `player kill` — only under lethal politics.
pub fn player_kill(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if !doc.world.rules.allow_lethal_politics {
        return ctx.refuse("lethal politics are not permitted");
    }
    if !doc.world.player.alive {
        return ctx.refuse("the player is already dead");
    }
    doc.world.player.alive = false;
    doc.world.player.legitimacy = (doc.world.player.legitimacy - 20).clamp(0, 100);
    let name = doc.world.player.name.clone();
    feed::chronicle(
        &mut doc.world,
        ctx,
        "player",
        None,
        None,
        "player",
        format!("{name} has fallen"),
    );
    feed::news(&mut doc.world, ctx, None, format!("{name} is dead"));
    ctx.say("so falls the player");
    true
}

/// `player revive`
pub fn player_revive(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if doc.world.player.alive {
        return ctx.refuse("the player lives already");
    }
    doc.world.player.alive = true;
    let name = doc.world.player.name.clone();
    feed::news(&mut doc.world, ctx, None, format!("{name} walks again"));
    ctx.say("the player returns");
    true
}

/// `rule lethal <on|off>`
pub fn rule_lethal(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, enabled: bool) -> bool {
    if doc.world.rules.allow_lethal_politics == enabled {
        return ctx.refuse("that rule is already so");
    }
    doc.world.rules.allow_lethal_politics = enabled;
    let word = if enabled { "permitted" } else { "forbidden" };
    feed::chronicle(
        &mut doc.world,
        ctx,
        "rule",
        None,
        None,
        "rule",
        format!("lethal politics {word}"),
    );
    ctx.say(format!("lethal politics {word}"));
    true
}

/// `war start`
pub fn war_start(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if doc.world.war_active {
        return ctx.refuse("a war already rages");
    }
    doc.world.war_active = true;
    shift_all_threat(doc, WAR_THREAT_SWING);
    feed::chronicle(&mut doc.world, ctx, "war", None, None, "war", "war is declared");
    feed::news(&mut doc.world, ctx, None, "war has come");
    ctx.say("the banners march");
    true
}

/// `war end`
pub fn war_end(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if !doc.world.war_active {
        return ctx.refuse("there is no war to end");
    }
    doc.world.war_active = false;
    shift_all_threat(doc, -WAR_THREAT_SWING);
    feed::chronicle(&mut doc.world, ctx, "war", None, None, "war", "the war is over");
    feed::news(&mut doc.world, ctx, None, "peace, for now");
    ctx.say("the banners come home");
    true
}

fn shift_all_threat(doc: &mut WorldDoc, delta: i64) {
    for threat in doc.world.threat.by_town.values_mut() {
        *threat = (*threat + delta).clamp(0, 100);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{player_kill, player_legitimacy, player_revive, rule_lethal, war_end, war_start};
    use crate::ctx::CmdCtx;
    use crate::towns::ensure_town;
    use vigil_world::doc::WorldDoc;

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    #[test]
    fn kill_is_gated_on_the_lethal_rule() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(!player_kill(&mut doc, &mut c));
        assert!(doc.world.player.alive);
        assert!(rule_lethal(&mut doc, &mut c, true));
        assert!(player_kill(&mut doc, &mut c));
        assert!(!doc.world.player.alive);
        assert_eq!(doc.world.player.legitimacy, 30);
        assert!(!player_kill(&mut doc, &mut c), "already dead");
        assert!(player_revive(&mut doc, &mut c));
    }

    #[test]
    fn legitimacy_clamps() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(player_legitimacy(&mut doc, &mut c, 90));
        assert_eq!(doc.world.player.legitimacy, 100);
        assert!(player_legitimacy(&mut doc, &mut c, -300));
        assert_eq!(doc.world.player.legitimacy, 0);
        assert!(!player_legitimacy(&mut doc, &mut c, 0));
    }

    #[test]
    fn war_swings_threat_everywhere() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        ensure_town(&mut doc.world, "alpha");
        assert!(war_start(&mut doc, &mut c));
        assert!(doc.world.war_active);
        assert_eq!(doc.world.threat.by_town["alpha"], 10);
        assert!(!war_start(&mut doc, &mut c));
        assert!(war_end(&mut doc, &mut c));
        assert_eq!(doc.world.threat.by_town["alpha"], 0);
    }
}
