//! Recursive filesystem watching.
//!
//! A single task owns every active watch (one [`notify_debouncer_full::Debouncer`] per watch
//! id) and is the only writer to the id → handle map, so registration and teardown can never
//! race with an in-flight debounced event. Everything else talks to it over an mpsc channel,
//! following the same single-owner-task shape as the teacher's `WatcherState`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{RecursiveMode, Watcher as _};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::constants::WATCHER_CHANNEL_CAPACITY;
use crate::error::AgentError;
use crate::protocol::response::Reply;

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);

/// Coarse classification of a filesystem change, independent of the watcher backend's own event
/// taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Modify,
    Remove,
    Rename,
    Access,
    Attribute,
    Unknown,
}

impl From<&notify::EventKind> for ChangeKind {
    fn from(kind: &notify::EventKind) -> Self {
        use notify::event::ModifyKind;
        use notify::EventKind as K;
        match kind {
            K::Create(_) => ChangeKind::Create,
            K::Modify(ModifyKind::Name(_)) => ChangeKind::Rename,
            K::Modify(ModifyKind::Metadata(_)) => ChangeKind::Attribute,
            K::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => ChangeKind::Modify,
            K::Remove(_) => ChangeKind::Remove,
            K::Access(_) => ChangeKind::Access,
            K::Any | K::Other => ChangeKind::Unknown,
        }
    }
}

/// Handle to the watcher task, cloneable so every worker task handling a `watch`/`stopwatch`
/// command can reach it independently.
#[derive(Clone)]
pub struct WatcherHandle {
    tx: mpsc::Sender<WatcherMsg>,
}

enum WatcherMsg {
    Watch {
        watch_id: i64,
        path: PathBuf,
        reply: tokio::sync::oneshot::Sender<Result<(), AgentError>>,
    },
    Unwatch {
        watch_id: i64,
        reply: tokio::sync::oneshot::Sender<Result<(), AgentError>>,
    },
}

struct WatchEntry {
    _debouncer: Debouncer<notify::RecommendedWatcher, FileIdMap>,
}

/// Spawns the watcher task and returns a handle to it plus the channel it publishes
/// [`Reply::ChangeEvent`]s on.
pub fn spawn() -> (WatcherHandle, mpsc::Receiver<Reply>) {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<WatcherMsg>(32);
    let (event_tx, event_rx) = mpsc::channel::<Reply>(WATCHER_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut watches: HashMap<i64, WatchEntry> = HashMap::new();

        while let Some(msg) = cmd_rx.recv().await {
            match msg {
                WatcherMsg::Watch { watch_id, path, reply } => {
                    let result = start_watch(watch_id, &path, event_tx.clone());
                    let outcome = match result {
                        Ok(entry) => {
                            watches.insert(watch_id, entry);
                            Ok(())
                        }
                        Err(err) => Err(err),
                    };
                    let _ = reply.send(outcome);
                }
                WatcherMsg::Unwatch { watch_id, reply } => {
                    watches.remove(&watch_id);
                    let _ = reply.send(Ok(()));
                }
            }
        }
    });

    (WatcherHandle { tx: cmd_tx }, event_rx)
}

fn start_watch(
    watch_id: i64,
    path: &Path,
    event_tx: mpsc::Sender<Reply>,
) -> Result<WatchEntry, AgentError> {
    let mut debouncer = new_debouncer(
        DEBOUNCE_WINDOW,
        None,
        move |result: DebounceEventResult| {
            let events = match result {
                Ok(events) => events,
                Err(errors) => {
                    log::warn!("watch {watch_id} backend error: {errors:?}");
                    return;
                }
            };
            for event in events {
                let kind = ChangeKind::from(&event.event.kind);
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                for path in &event.event.paths {
                    let reply = Reply::ChangeEvent {
                        id: 0,
                        watch_id,
                        kind,
                        path: path.clone(),
                        timestamp,
                    };
                    if event_tx.try_send(reply).is_err() {
                        log::warn!("watch {watch_id}: event channel full, dropping change event");
                    }
                }
            }
        },
    )
    .map_err(|err| AgentError::invalid_input(err.to_string()))?;

    debouncer
        .watch(path, RecursiveMode::Recursive)
        .map_err(AgentError::from)?;

    Ok(WatchEntry { _debouncer: debouncer })
}

impl From<notify::Error> for AgentError {
    fn from(err: notify::Error) -> Self {
        use notify::ErrorKind as K;
        match err.kind {
            K::PathNotFound => AgentError::new(crate::error::ErrorKind::NotFound, err.to_string()),
            K::Generic(_) | K::Io(_) | K::WatchNotFound | K::InvalidConfig(_) | K::MaxFilesWatch => {
                AgentError::invalid_input(err.to_string())
            }
        }
    }
}

impl WatcherHandle {
    pub async fn watch(&self, watch_id: i64, path: PathBuf) -> Result<(), AgentError> {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(WatcherMsg::Watch { watch_id, path, reply: reply_tx })
            .await
            .map_err(|_| AgentError::invalid_input("watcher task is no longer running"))?;
        reply_rx
            .await
            .map_err(|_| AgentError::invalid_input("watcher task is no longer running"))?
    }

    pub async fn unwatch(&self, watch_id: i64) -> Result<(), AgentError> {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(WatcherMsg::Unwatch { watch_id, reply: reply_tx })
            .await
            .map_err(|_| AgentError::invalid_input("watcher task is no longer running"))?;
        reply_rx
            .await
            .map_err(|_| AgentError::invalid_input("watcher task is no longer running"))?
    }
}
