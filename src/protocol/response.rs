use std::path::PathBuf;

use serde::Serialize;

use crate::error::AgentError;
use crate::watch::ChangeKind;

/// Represents one reply record written to the output stream. Replies are only ever constructed
/// in-process and serialized outward — the agent never needs to decode its own replies — so only
/// [`Serialize`] is implemented, mirroring how the teacher's result structs on the wire are
/// one-directional from server to client.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "Type")]
pub enum Reply {
    #[serde(rename = "error")]
    Error {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Error")]
        error: String,
        #[serde(rename = "ErrorType")]
        error_type: &'static str,
        #[serde(rename = "Errno")]
        errno: i32,
    },

    #[serde(rename = "statresult")]
    Stat {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "IsDir")]
        is_dir: bool,
        #[serde(rename = "IsFile")]
        is_file: bool,
        #[serde(rename = "IsSymlink")]
        is_symlink: bool,
        #[serde(rename = "Size")]
        size: u64,
        #[serde(rename = "Readonly")]
        readonly: bool,
        #[serde(rename = "Mode")]
        mode: u32,
        #[serde(rename = "Accessed", skip_serializing_if = "Option::is_none")]
        accessed: Option<u64>,
        #[serde(rename = "Created", skip_serializing_if = "Option::is_none")]
        created: Option<u64>,
        #[serde(rename = "Modified", skip_serializing_if = "Option::is_none")]
        modified: Option<u64>,
        #[serde(rename = "CanonicalizedPath", skip_serializing_if = "Option::is_none")]
        canonicalized_path: Option<PathBuf>,
    },

    #[serde(rename = "findresult")]
    Find {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Entries")]
        entries: Vec<FindEntry>,
    },

    #[serde(rename = "isresult")]
    Is {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Result")]
        result: bool,
    },

    #[serde(rename = "readfileresult")]
    ReadFile {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Data", with = "serde_bytes")]
        data: Vec<u8>,
    },

    #[serde(rename = "execresult")]
    Exec {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "ExitCode")]
        exit_code: Option<i32>,
        #[serde(rename = "Success")]
        success: bool,
        #[serde(rename = "Stdout", with = "serde_bytes")]
        stdout: Vec<u8>,
        #[serde(rename = "Stderr", with = "serde_bytes")]
        stderr: Vec<u8>,
    },

    #[serde(rename = "readlinkresult")]
    ReadLink {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Target")]
        target: PathBuf,
    },

    #[serde(rename = "fileidresult")]
    FileId {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "FileId")]
        file_id: String,
    },

    #[serde(rename = "freespaceresult")]
    FreeSpace {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "FreeSpace")]
        free_space: u64,
    },

    #[serde(rename = "groupresult")]
    Group {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Group")]
        group: String,
    },

    #[serde(rename = "groupidresult")]
    GroupId {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "GroupId")]
        group_id: u32,
    },

    #[serde(rename = "ownerresult")]
    Owner {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Owner")]
        owner: String,
    },

    #[serde(rename = "owneridresult")]
    OwnerId {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "OwnerId")]
        owner_id: u32,
    },

    #[serde(rename = "createtempfileresult")]
    CreateTempFile {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "signalsuccess")]
    SignalSuccess {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "writefileresult")]
    WriteFileResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "removeresult")]
    RemoveResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "removeallresult")]
    RemoveAllResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "ensureexistingfileresult")]
    EnsureExistingFileResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "createdirresult")]
    CreateDirResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "copyfileresult")]
    CopyFileResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "createsymlinkresult")]
    CreateSymLinkResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "renamefileresult")]
    RenameFileResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "setpermissionsresult")]
    SetPermissionsResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "watchresult")]
    WatchResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "stopwatchresult")]
    StopWatchResult {
        #[serde(rename = "Id")]
        id: i64,
    },

    #[serde(rename = "changeevent")]
    ChangeEvent {
        /// Always 0: change events are not replies to a request, they are keyed by `WatchId`
        /// instead.
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "WatchId")]
        watch_id: i64,
        #[serde(rename = "Kind")]
        kind: ChangeKind,
        #[serde(rename = "Path")]
        path: PathBuf,
        #[serde(rename = "Timestamp")]
        timestamp: u64,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct FindEntry {
    #[serde(rename = "Path")]
    pub path: PathBuf,
    #[serde(rename = "IsDir")]
    pub is_dir: bool,
    #[serde(rename = "IsSymlink")]
    pub is_symlink: bool,
    #[serde(rename = "Size")]
    pub size: u64,
}

impl Reply {
    pub fn error(id: i64, err: AgentError) -> Self {
        Reply::Error {
            id,
            error: err.message.clone(),
            error_type: err.error_type(),
            errno: err.errno(),
        }
    }

    /// Correlation id carried by this reply. Change events always carry `0` here; they are
    /// identified by `WatchId` instead.
    pub fn id(&self) -> i64 {
        match self {
            Reply::Error { id, .. }
            | Reply::Stat { id, .. }
            | Reply::Find { id, .. }
            | Reply::Is { id, .. }
            | Reply::ReadFile { id, .. }
            | Reply::Exec { id, .. }
            | Reply::ReadLink { id, .. }
            | Reply::FileId { id, .. }
            | Reply::FreeSpace { id, .. }
            | Reply::Group { id, .. }
            | Reply::GroupId { id, .. }
            | Reply::Owner { id, .. }
            | Reply::OwnerId { id, .. }
            | Reply::CreateTempFile { id, .. }
            | Reply::SignalSuccess { id }
            | Reply::WriteFileResult { id }
            | Reply::RemoveResult { id }
            | Reply::RemoveAllResult { id }
            | Reply::EnsureExistingFileResult { id }
            | Reply::CreateDirResult { id }
            | Reply::CopyFileResult { id }
            | Reply::CreateSymLinkResult { id }
            | Reply::RenameFileResult { id }
            | Reply::SetPermissionsResult { id }
            | Reply::WatchResult { id }
            | Reply::StopWatchResult { id }
            | Reply::ChangeEvent { id, .. } => *id,
        }
    }
}
