// SPDX-License-Identifier: Apache-2.0

//! The stdio line loop.
//!
//! One JSON value per line in, one per line out. Recognized frames
//! (handoffs, world-memory requests) dispatch into the pipeline; a literal
//! `exit` (or EOF) shuts down; anything else is an interactive god command.
//! Legacy `>` prompt characters at the start of a line are stripped before
//! parsing.

use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::{debug, error};

use vigil_commands::{CommandRequest, GodCommandService};
use vigil_exec::{ExecutionAdapter, WorldMemoryService};
use vigil_proto::{encode_line, parse_line, InboundFrame};
use vigil_world::{Clock, SystemClock};

/// Readiness banner printed once after startup.
pub const READY_BANNER: &str = "--- WORLD ONLINE ---";

/// The wired-up engine: command service, adapter, and retrieval surface.
pub struct Engine {
    /// God command service for interactive lines.
    pub commands: Arc<GodCommandService>,
    /// Handoff adapter.
    pub adapter: ExecutionAdapter,
    /// World-memory retrieval.
    pub memory: WorldMemoryService,
}

/// Serve lines from `input` until `exit` or EOF.
pub fn serve<R, W>(engine: &Engine, input: R, output: &mut W) -> std::io::Result<()>
where
    R: BufRead,
    W: Write,
{
    let clock = SystemClock;
    let mut interactive_seq: u64 = 0;

    writeln!(output, "{READY_BANNER}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim_start().trim_start_matches('>').trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" {
            break;
        }

        match parse_line(trimmed) {
            Some(InboundFrame::Handoff(handoff)) => {
                match engine.adapter.execute_handoff(&handoff) {
                    Ok(result) => write_json(output, &result)?,
                    Err(err) => error!(%err, handoff_id = %handoff.handoff_id, "handoff failed"),
                }
            }
            Some(InboundFrame::MemoryRequest(request)) => {
                match engine.memory.get_context(&request) {
                    Ok(context) => write_json(output, &context)?,
                    Err(err) => error!(%err, "world-memory request failed"),
                }
            }
            None if trimmed.starts_with('{') => {
                // Braced but unrecognized: not ours; the framing parser
                // ignores it.
                debug!(line = trimmed, "ignored unrecognized frame");
            }
            None => {
                interactive_seq += 1;
                let request = CommandRequest {
                    agents: Vec::new(),
                    command: trimmed.to_owned(),
                    operation_id: format!("cli-{}-{interactive_seq}", clock.now_millis()),
                };
                match engine.commands.apply(&request) {
                    Ok(outcome) => {
                        for out_line in &outcome.output_lines {
                            writeln!(output, "{out_line}")?;
                        }
                    }
                    Err(err) => writeln!(output, "{err}")?,
                }
            }
        }
        output.flush()?;
    }
    Ok(())
}

fn write_json<W: Write, T: serde::Serialize>(output: &mut W, value: &T) -> std::io::Result<()> {
    match encode_line(value) {
        Ok(line) => writeln!(output, "{line}"),
        Err(err) => {
            error!(%err, "failed to encode response");
            Ok(())
        }
    }
}
