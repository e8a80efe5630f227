// SPDX-License-Identifier: Apache-2.0

//! Engine configuration: environment variables with flag overrides.
//!
//! Recognized environment:
//! - `MEMORY_STORE_FILE_PATH` — world file path.
//! - `EXECUTION_PERSISTENCE_BACKEND` — `memory` or `sqlite`. Anything else
//!   is a fatal startup error.
//! - `EXECUTION_PERSISTENCE_SQLITE_PATH` — relational store path.
//! - `LOG_MIN_LEVEL` — `error|warn|info|debug`.
//! - `TOWN_CRIER_*` — parsed for the external crier transport; the engine
//!   itself does not narrate.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Result};

/// Execution store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Receipts inside the world document.
    Memory,
    /// Receipts in a single-file SQLite store.
    Sqlite,
}

/// Town crier transport knobs, recognized and passed through.
#[derive(Debug, Clone)]
pub struct CrierConfig {
    /// Whether the external crier transport should run.
    pub enabled: bool,
    /// Narration interval in milliseconds.
    pub interval_ms: u64,
    /// Maximum lines per tick.
    pub max_per_tick: u64,
    /// Recency window considered per tick.
    pub recent_window: u64,
    /// Dedupe window across ticks.
    pub dedupe_window: u64,
}

impl Default for CrierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 45_000,
            max_per_tick: 2,
            recent_window: 12,
            dedupe_window: 24,
        }
    }
}

/// Resolved engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// World file path.
    pub memory_file: PathBuf,
    /// Execution store backend.
    pub backend: Backend,
    /// SQLite path, used when `backend` is [`Backend::Sqlite`].
    pub sqlite_path: PathBuf,
    /// Minimum log level.
    pub log_min_level: String,
    /// Crier transport knobs.
    pub crier: CrierConfig,
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_string(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_string(key).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

impl EngineConfig {
    /// Resolve from the environment, applying optional flag overrides.
    pub fn resolve(
        memory_file: Option<PathBuf>,
        backend: Option<String>,
        sqlite_path: Option<PathBuf>,
        log_level: Option<String>,
    ) -> Result<Self> {
        let memory_file = memory_file
            .or_else(|| env_string("MEMORY_STORE_FILE_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("memory.json"));

        let backend_label = backend
            .or_else(|| env_string("EXECUTION_PERSISTENCE_BACKEND"))
            .unwrap_or_else(|| "memory".to_owned());
        let backend = match backend_label.as_str() {
            "memory" => Backend::Memory,
            "sqlite" => Backend::Sqlite,
            other => bail!("unknown execution persistence backend: {other}"),
        };

        let sqlite_path = sqlite_path
            .or_else(|| env_string("EXECUTION_PERSISTENCE_SQLITE_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("executions.db"));

        let log_min_level = log_level
            .or_else(|| env_string("LOG_MIN_LEVEL"))
            .unwrap_or_else(|| "info".to_owned());

        let defaults = CrierConfig::default();
        let crier = CrierConfig {
            enabled: env_bool("TOWN_CRIER_ENABLED", defaults.enabled),
            interval_ms: env_u64("TOWN_CRIER_INTERVAL_MS", defaults.interval_ms),
            max_per_tick: env_u64("TOWN_CRIER_MAX_PER_TICK", defaults.max_per_tick),
            recent_window: env_u64("TOWN_CRIER_RECENT_WINDOW", defaults.recent_window),
            dedupe_window: env_u64("TOWN_CRIER_DEDUPE_WINDOW", defaults.dedupe_window),
        };

        Ok(Self {
            memory_file,
            backend,
            sqlite_path,
            log_min_level,
            crier,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{Backend, EngineConfig};

    #[test]
    fn flags_override_defaults() {
        let config = EngineConfig::resolve(
            Some("world.json".into()),
            Some("sqlite".to_owned()),
            Some("exec.db".into()),
            Some("debug".to_owned()),
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.memory_file.to_str(), Some("world.json"));
        assert_eq!(config.log_min_level, "debug");
    }

    #[test]
    fn unknown_backend_is_fatal() {
        let err = EngineConfig::resolve(None, Some("etcd".to_owned()), None, None).unwrap_err();
        assert!(err.to_string().contains("etcd"));
    }
}
