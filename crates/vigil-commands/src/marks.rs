// SPDX-License-Identifier: Apache-2.0

//! Marker commands.
//!
//! Duplicate-name policy is overwrite: a second `mark add` with the same
//! name replaces the coordinates/tag and refreshes `created_at`. A replay
//! of the *same* operation is a transaction-level no-op via its event id,
//! so only genuinely new operations touch the record.

use vigil_world::doc::{Marker, WorldDoc};

use crate::ctx::CmdCtx;
use crate::feed;
use crate::hooks::Effect;
use crate::towns::ensure_town;

/// `mark add <name> <x> <y> <z> [<tag>]`
pub fn mark_add(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    name: &str,
    x: f64,
    y: f64,
    z: f64,
    tag: Option<&str>,
) -> bool {
    let world = &mut doc.world;
    let record = Marker {
        name: name.to_owned(),
        x,
        y,
        z,
        tag: tag.map(str::to_owned),
        created_at: ctx.now_iso.clone(),
    };
    let replaced = match world.markers.iter_mut().find(|m| m.name == name) {
        Some(existing) => {
            *existing = record;
            true
        }
        None => {
            world.markers.push(record);
            false
        }
    };

    // A `town:<id>` tag materializes the named town.
    let town_id = tag.and_then(|t| t.strip_prefix("town:")).map(str::to_owned);
    if let Some(town_id) = &town_id {
        ensure_town(world, town_id);
    }

    let verb = if replaced { "moved" } else { "raised" };
    feed::chronicle(
        world,
        ctx,
        "mark",
        town_id.as_deref(),
        None,
        "marker",
        format!("marker {name} {verb} at {x:.0} {y:.0} {z:.0}"),
    );
    feed::news(
        world,
        ctx,
        town_id.as_deref(),
        format!("a marker was {verb}: {name}"),
    );
    ctx.effect(Effect::MarkPlaced {
        name: name.to_owned(),
        x,
        y,
        z,
    });
    ctx.say(format!("marker {name} {verb}"));
    true
}

/// `mark remove <name>`
pub fn mark_remove(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, name: &str) -> bool {
    let world = &mut doc.world;
    let before = world.markers.len();
    world.markers.retain(|m| m.name != name);
    if world.markers.len() == before {
        return ctx.refuse(format!("unknown marker: {name}"));
    }
    feed::chronicle(
        world,
        ctx,
        "mark",
        None,
        None,
        "marker",
        format!("marker {name} torn down"),
    );
    ctx.say(format!("marker {name} removed"));
    true
}

/// `mark list` — read-only.
pub fn mark_list(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if doc.world.markers.is_empty() {
        ctx.say("no markers");
        return false;
    }
    for marker in &doc.world.markers {
        let tag = marker.tag.as_deref().unwrap_or("-");
        ctx.say(format!(
            "{} @ {:.0} {:.0} {:.0} [{}]",
            marker.name, marker.x, marker.y, marker.z, tag
        ));
    }
    false
}
