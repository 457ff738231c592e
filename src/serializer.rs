//! Output task: the sole writer of framed replies onto stderr.
//!
//! Every reply — whether a normal command result or a watch change event — funnels through one
//! mpsc channel into this task, so frames are never interleaved even though many worker tasks
//! can be producing replies concurrently. The task ends when every sender half of `replies` has
//! been dropped, which happens once the input loop and every in-flight worker have finished.

use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::codec::frame::FrameWriter;
use crate::protocol::response::Reply;

/// Framing and flushing run on a blocking thread since [`std::io::Write`] on stderr/stdout has
/// no async counterpart worth a dependency here.
pub async fn run(replies: mpsc::Receiver<Reply>, pretty: bool) {
    let task = tokio::task::spawn_blocking(move || {
        let mut replies = replies;
        if pretty {
            run_pretty(&mut replies)
        } else {
            run_framed(&mut replies)
        }
    });
    let _ = task.await;
}

fn run_framed(replies: &mut mpsc::Receiver<Reply>) {
    let mut writer = FrameWriter::new(io::stderr());
    while let Some(reply) = replies.blocking_recv() {
        if let Err(err) = writer.write_reply(&reply) {
            log::error!("failed to write reply frame: {err}");
        }
    }
}

fn run_pretty(replies: &mut mpsc::Receiver<Reply>) {
    let mut stdout = io::stdout();
    while let Some(reply) = replies.blocking_recv() {
        let _ = writeln!(stdout, "{reply:#?}");
        let _ = stdout.flush();
    }
}
