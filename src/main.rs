//! Entry point: parses arguments, brings up logging, and wires the dispatcher, watcher,
//! watchdog, and serializer together for the life of the process.

mod cli;
mod codec;
mod constants;
mod dispatcher;
mod error;
mod fixtures;
mod handlers;
mod lifecycle;
mod protocol;
mod serializer;
mod watch;
mod watchdog;

use std::io::Write;

use clap::Parser;
use tokio::sync::mpsc;

use crate::codec::frame::encode_command;
use crate::constants::STARTUP_ERROR_EXIT_CODE;
use crate::dispatcher::Shutdown;
use crate::handlers::Context;

fn main() {
    let opt = cli::Opt::parse();

    if opt.write {
        run_write(&opt);
        return;
    }

    // Logging must outlive the runtime: dropping the handle flushes and closes the log file.
    let _logger_handle = cli::init_logging(&opt);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            std::process::exit(STARTUP_ERROR_EXIT_CODE);
        }
    };

    runtime.block_on(async_main(opt));
}

/// `--write` never touches logging, the runtime, or the watcher: it is a pure offline capture of
/// the built-in scripted command sequence, run before anything else stands up.
fn run_write(_opt: &cli::Opt) {
    let mut stdout = std::io::stdout();
    for command in fixtures::script() {
        match encode_command(&command) {
            Ok(bytes) => {
                if let Err(err) = stdout.write_all(&bytes) {
                    eprintln!("failed to write command: {err}");
                    std::process::exit(STARTUP_ERROR_EXIT_CODE);
                }
            }
            Err(err) => {
                eprintln!("failed to encode command: {err}");
                std::process::exit(STARTUP_ERROR_EXIT_CODE);
            }
        }
    }
    let _ = stdout.flush();
}

async fn async_main(opt: cli::Opt) {
    let (watcher, watch_events) = watch::spawn();
    let ctx = Context { watcher };

    let (output_tx, output_rx) = mpsc::channel(1024);

    // Watch change events share the same output channel as command replies, so the serializer
    // remains the single writer of framed records regardless of which subsystem produced one.
    // The forwarding task holds its own clone of the sender for as long as the watcher runs, so
    // it must be stopped explicitly on shutdown or the serializer would never see every sender
    // drop and `output_rx` would never close.
    let forward_task = forward_watch_events(watch_events, output_tx.clone());

    let serializer_task = tokio::spawn(serializer::run(output_rx, opt.test));

    // `--test` has no live controller to ping it and runs the scripted sequence directly rather
    // than through the stdin-reading dispatcher loop, so there is nothing for a watchdog to do.
    let (shutdown, watchdog_task) = if opt.test {
        (run_self_test(ctx, output_tx).await, None)
    } else {
        let (watchdog_tx, watchdog_rx) = watchdog::channel();
        let watchdog_task =
            tokio::spawn(watchdog::run(watchdog_rx, opt.watchdog_timeout(), opt.delete_on_exit));
        let shutdown = dispatcher::run(ctx, output_tx, watchdog_tx).await;
        (shutdown, Some(watchdog_task))
    };

    if let Some(watchdog_task) = watchdog_task {
        watchdog_task.abort();
    }

    match shutdown {
        Shutdown::ExitCommand => {
            if opt.delete_on_exit {
                lifecycle::self_delete();
            }
            std::process::exit(0);
        }
        Shutdown::Eof => {
            forward_task.abort();
            let _ = serializer_task.await;
            if opt.delete_on_exit {
                lifecycle::self_delete();
            }
        }
    }
}

/// `--test` replaces stdin with the built-in scripted command sequence and runs it through the
/// exact same dispatch path a real command would take, just without the framed wire format on
/// the output side.
async fn run_self_test(ctx: Context, output: mpsc::Sender<crate::protocol::response::Reply>) -> Shutdown {
    use crate::protocol::request::Command;

    let mut workers = tokio::task::JoinSet::new();
    for command in fixtures::script() {
        match command {
            Command::Ping { .. } => {}
            Command::Exit { .. } => {
                while workers.join_next().await.is_some() {}
                return Shutdown::ExitCommand;
            }
            command => {
                let ctx = ctx.clone();
                let output = output.clone();
                workers.spawn(async move {
                    let reply = handlers::dispatch(command, &ctx).await;
                    let _ = output.send(reply).await;
                });
            }
        }
    }
    while workers.join_next().await.is_some() {}
    Shutdown::Eof
}

fn forward_watch_events(
    mut events: mpsc::Receiver<crate::protocol::response::Reply>,
    output: mpsc::Sender<crate::protocol::response::Reply>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if output.send(event).await.is_err() {
                break;
            }
        }
    })
}
