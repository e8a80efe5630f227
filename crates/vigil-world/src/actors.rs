// SPDX-License-Identifier: Apache-2.0

//! Deterministic actor synthesis.
//!
//! Every town implicitly carries a `{mayor, captain, warden, townsfolk}`
//! set. When no explicit actor record exists, one is synthesized from
//! `(role, town)` — the same input always yields the same id and name, so
//! synthesized actors survive reload and cross-process handoffs without a
//! persisted record.

use crate::doc::{Actor, ActorRole, WorldState};

/// Deterministic actor id for `(role, town)`.
#[must_use]
pub fn actor_id(role: ActorRole, town_id: &str) -> String {
    format!("{}:{}", town_id, role.label())
}

/// Deterministic display name for `(role, townName)`.
///
/// `townsfolk` uses the plain form; every other role is title-cased:
/// `"Warden of Emberfall"`, `"Townsfolk of Emberfall"`.
#[must_use]
pub fn synthetic_name(role: ActorRole, town_name: &str) -> String {
    let title = match role {
        ActorRole::Mayor => "Mayor",
        ActorRole::Captain => "Captain",
        ActorRole::Warden => "Warden",
        ActorRole::Townsfolk => "Townsfolk",
    };
    format!("{title} of {town_name}")
}

/// Look up the actor for `(role, town)`, synthesizing a record when absent.
///
/// The synthesized record is inserted so later lookups and the projection
/// observe the same materialized set.
pub fn ensure_actor<'a>(world: &'a mut WorldState, town_id: &str, role: ActorRole) -> &'a Actor {
    let id = actor_id(role, town_id);
    let town_name = world
        .towns
        .get(town_id)
        .map_or_else(|| town_id.to_owned(), |t| t.name.clone());
    world.actors.entry(id.clone()).or_insert_with(|| Actor {
        actor_id: id,
        town_id: town_id.to_owned(),
        name: synthetic_name(role, &town_name),
        role,
        status: "present".to_owned(),
    })
}

/// Materialize the implicit role set for `town_id`.
pub fn materialize_town_actors(world: &mut WorldState, town_id: &str) {
    for role in ActorRole::ALL {
        ensure_actor(world, town_id, role);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{actor_id, ensure_actor, synthetic_name};
    use crate::doc::{ActorRole, Town, WorldState};

    #[test]
    fn synthesis_is_deterministic() {
        assert_eq!(
            synthetic_name(ActorRole::Warden, "Emberfall"),
            "Warden of Emberfall"
        );
        assert_eq!(
            synthetic_name(ActorRole::Townsfolk, "Emberfall"),
            "Townsfolk of Emberfall"
        );
        assert_eq!(actor_id(ActorRole::Mayor, "alpha"), "alpha:mayor");
    }

    #[test]
    fn ensure_actor_inserts_once() {
        let mut world = WorldState::default();
        world.towns.insert(
            "alpha".to_owned(),
            Town {
                name: "Alphaville".to_owned(),
                ..Town::default()
            },
        );
        let name = ensure_actor(&mut world, "alpha", ActorRole::Captain)
            .name
            .clone();
        assert_eq!(name, "Captain of Alphaville");
        assert_eq!(world.actors.len(), 1);
        // second lookup must not duplicate
        ensure_actor(&mut world, "alpha", ActorRole::Captain);
        assert_eq!(world.actors.len(), 1);
    }
}
