// SPDX-License-Identifier: Apache-2.0

//! vigil-engine: the durable world behind a stdio line protocol.
//!
//! Startup: resolve config (env, then flags), open the world store and the
//! configured execution backend, recover any interrupted executions, print
//! the readiness banner, then serve lines until `exit` or EOF.
//!
//! Exit codes: 0 on normal shutdown, 1 on a fatal startup error.

mod config;
mod repl;

use std::io::{stdin, stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vigil_commands::GodCommandService;
use vigil_exec::{
    DocExecutionStore, ExecutionAdapter, ExecutionStore, SqliteExecutionStore, WorldMemoryService,
};
use vigil_store::{FaultPoint, WorldStore};

use crate::config::{Backend, EngineConfig};
use crate::repl::{serve, Engine};

/// The Vigil world engine.
#[derive(Debug, Parser)]
#[command(name = "vigil-engine", version, about)]
struct Cli {
    /// World file path (overrides MEMORY_STORE_FILE_PATH).
    #[arg(long)]
    memory_file: Option<PathBuf>,

    /// Execution backend: memory or sqlite (overrides
    /// EXECUTION_PERSISTENCE_BACKEND).
    #[arg(long)]
    execution_backend: Option<String>,

    /// SQLite path (overrides EXECUTION_PERSISTENCE_SQLITE_PATH).
    #[arg(long)]
    sqlite_path: Option<PathBuf>,

    /// Minimum log level (overrides LOG_MIN_LEVEL).
    #[arg(long)]
    log_level: Option<String>,

    /// Arm a one-shot persistence fault before the next snapshot rename.
    /// Test instrumentation.
    #[arg(long, hide = true)]
    simulate_crash: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // The subscriber may not be up yet; stderr is the one safe sink.
            eprintln!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::resolve(
        cli.memory_file,
        cli.execution_backend,
        cli.sqlite_path,
        cli.log_level,
    )
    .context("invalid configuration")?;

    // Logs go to stderr; stdout carries the line protocol only.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_min_level.clone()))
        .with_writer(std::io::stderr)
        .init();

    let world = Arc::new(WorldStore::open(&config.memory_file));
    if cli.simulate_crash {
        warn!("simulate-crash armed: next persist will fail before rename");
        world.arm_fault(FaultPoint::BeforeRename);
    }

    let commands = Arc::new(GodCommandService::new(world.clone()));
    let exec: Arc<dyn ExecutionStore> = match config.backend {
        Backend::Memory => Arc::new(DocExecutionStore::new(world.clone())),
        Backend::Sqlite => Arc::new(
            SqliteExecutionStore::open(&config.sqlite_path, world.clone())
                .context("opening sqlite execution store")?,
        ),
    };
    let adapter = ExecutionAdapter::new(commands.clone(), world.clone(), exec.clone());
    let memory = WorldMemoryService::new(world.clone(), exec);

    let recovered = adapter
        .recover_interrupted_executions()
        .context("recovering interrupted executions")?;
    if !recovered.is_empty() {
        info!(count = recovered.len(), "interrupted executions recovered");
    }
    if config.crier.enabled {
        info!(
            interval_ms = config.crier.interval_ms,
            max_per_tick = config.crier.max_per_tick,
            "town crier transport enabled externally"
        );
    }

    let engine = Engine {
        commands,
        adapter,
        memory,
    };
    let stdin = stdin();
    let mut out = stdout().lock();
    serve(&engine, stdin.lock(), &mut out).context("serving line protocol")?;
    info!("world offline");
    Ok(())
}
