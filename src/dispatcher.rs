//! Reads commands from stdin, fans each out to its own worker task, and funnels every resulting
//! reply into the output channel.

use std::io::BufReader;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::codec::frame::{CommandReader, DecodeOutcome};
use crate::error::AgentError;
use crate::handlers::{self, Context};
use crate::protocol::request::Command;
use crate::protocol::response::Reply;
use crate::watchdog::{self, PingSender};

/// How the dispatcher's input loop ended.
pub enum Shutdown {
    /// Stdin was exhausted; every in-flight worker has already been drained.
    Eof,
    /// An `exit` command arrived. Per the wire contract this is a hard exit: in-flight workers
    /// are abandoned rather than awaited.
    ExitCommand,
}

/// Runs until stdin is exhausted or an `exit` command is seen. `ping` and `exit` are handled
/// here directly rather than in [`handlers::dispatch`]: neither produces a reply, `ping` only
/// resets the watchdog, and `exit` only signals shutdown.
pub async fn run(ctx: Context, output: mpsc::Sender<Reply>, watchdog: PingSender) -> Shutdown {
    let (event_tx, mut event_rx) = mpsc::channel::<DecodeOutcome>(64);

    // Reading stdin is blocking I/O; this thread outlives an early `exit` break below, but it is
    // harmless to leak since the process exits shortly after anyway.
    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let mut reader = CommandReader::new(BufReader::new(stdin.lock()));
        while let Ok(Some(outcome)) = reader.read_next() {
            if event_tx.blocking_send(outcome).is_err() {
                break;
            }
        }
    });

    let mut workers = JoinSet::new();

    while let Some(outcome) = event_rx.recv().await {
        match outcome {
            DecodeOutcome::Command(Command::Ping { .. }) => {
                watchdog::ping(&watchdog);
            }
            DecodeOutcome::Command(Command::Exit { .. }) => {
                return Shutdown::ExitCommand;
            }
            DecodeOutcome::Command(command) => {
                let ctx = ctx.clone();
                let output = output.clone();
                workers.spawn(async move {
                    let reply = handlers::dispatch(command, &ctx).await;
                    let _ = output.send(reply).await;
                });
            }
            DecodeOutcome::UnknownType { id, ty } => {
                let _ = output.send(Reply::error(id, AgentError::unknown_command(&ty))).await;
            }
            DecodeOutcome::Malformed { id, detail } => {
                let _ = output.send(Reply::error(id, AgentError::decode_error(detail))).await;
            }
        }
    }

    while workers.join_next().await.is_some() {}
    Shutdown::Eof
}
