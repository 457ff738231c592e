//! Exits the process if no `ping` arrives within the configured window.
//!
//! A live controller is expected to send `ping` periodically; if the connection to it is lost
//! (process killed, pipe closed without an orderly `exit`), this is the backstop that keeps the
//! agent from running forever.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::constants::WATCHDOG_EXIT_CODE;
use crate::lifecycle;

/// Non-blocking sender: a burst of pings collapses into a single timer reset because the
/// channel's capacity is 1 and sends that find it full are simply dropped.
pub type PingSender = mpsc::Sender<()>;

pub fn channel() -> (PingSender, mpsc::Receiver<()>) {
    mpsc::channel(crate::constants::WATCHDOG_CHANNEL_CAPACITY)
}

pub fn ping(tx: &PingSender) {
    let _ = tx.try_send(());
}

/// Runs until either the timeout elapses (in which case the process exits with
/// [`WATCHDOG_EXIT_CODE`], honoring `delete_on_exit`) or `pings` closes, signaling an orderly
/// shutdown is already underway.
///
/// This is a hard exit, bypassing the dispatcher's drain of in-flight workers and the
/// serializer's buffered replies, matching the wire contract: a wedged controller gets no more
/// consideration than an `exit` command does.
pub async fn run(mut pings: mpsc::Receiver<()>, timeout: Duration, delete_on_exit: bool) {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => {
                log::warn!("no ping received within {timeout:?}, exiting");
                if delete_on_exit {
                    lifecycle::self_delete();
                }
                std::process::exit(WATCHDOG_EXIT_CODE);
            }
            received = pings.recv() => {
                match received {
                    Some(()) => deadline.as_mut().reset(Instant::now() + timeout),
                    None => return,
                }
            }
        }
    }
}
