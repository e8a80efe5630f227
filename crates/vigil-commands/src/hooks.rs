// SPDX-License-Identifier: Apache-2.0

//! Runtime side-effect hooks.
//!
//! Mutators never perform I/O. They collect [`Effect`]s inside the
//! transaction; the service flushes them through a [`RuntimeHooks`]
//! implementation strictly after the transaction commits. A rejected or
//! skipped transaction flushes nothing, which is what makes replays
//! trivially side-effect-free.

/// A deferred runtime side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A spoken line attributed to an actor.
    Say {
        /// Speaking actor name.
        speaker: String,
        /// The line.
        line: String,
    },
    /// A marker was placed or moved.
    MarkPlaced {
        /// Marker name.
        name: String,
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
        /// Z coordinate.
        z: f64,
    },
    /// An agent's job changed.
    JobChanged {
        /// Agent name.
        agent: String,
        /// New role, or `None` when cleared.
        role: Option<String>,
    },
    /// A news line was broadcast.
    News {
        /// Town concerned, if any.
        town: Option<String>,
        /// The line.
        line: String,
    },
    /// A direct response line for the invoking caller.
    Respond {
        /// The line.
        line: String,
    },
}

/// Sink for post-commit runtime effects.
pub trait RuntimeHooks: Send + Sync {
    /// A spoken line.
    fn on_say(&self, speaker: &str, line: &str) {
        let _ = (speaker, line);
    }
    /// A marker placement.
    fn on_mark(&self, name: &str, x: f64, y: f64, z: f64) {
        let _ = (name, x, y, z);
    }
    /// A job change.
    fn on_job(&self, agent: &str, role: Option<&str>) {
        let _ = (agent, role);
    }
    /// A news broadcast.
    fn on_news(&self, town: Option<&str>, line: &str) {
        let _ = (town, line);
    }
    /// A direct response.
    fn on_respond(&self, line: &str) {
        let _ = line;
    }

    /// Flush a batch of effects in order.
    fn flush(&self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::Say { speaker, line } => self.on_say(speaker, line),
                Effect::MarkPlaced { name, x, y, z } => self.on_mark(name, *x, *y, *z),
                Effect::JobChanged { agent, role } => self.on_job(agent, role.as_deref()),
                Effect::News { town, line } => self.on_news(town.as_deref(), line),
                Effect::Respond { line } => self.on_respond(line),
            }
        }
    }
}

/// Hooks that drop every effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHooks;

impl RuntimeHooks for NullHooks {}
