use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Mapping of environment variables passed to a spawned process.
pub type Environment = HashMap<String, String>;

fn default_limit() -> i64 {
    -1
}

fn default_true() -> bool {
    true
}

/// Lightweight probe used to recover `Type`/`Id` from a record that failed to deserialize into a
/// [`Command`], so that decode failures and unknown-`Type` failures can still carry a correlation
/// id back to the controller.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommandProbe {
    #[serde(rename = "Type")]
    pub ty: Option<String>,
    #[serde(rename = "Id")]
    pub id: Option<i64>,
}

/// Represents one decoded command read from the input stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum Command {
    #[serde(rename = "ping")]
    Ping {
        #[serde(rename = "Id", default)]
        id: i64,
    },

    #[serde(rename = "stat")]
    Stat {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "exec")]
    Exec {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Cmd")]
        cmd: String,
        #[serde(rename = "Args", default)]
        args: Vec<String>,
        #[serde(rename = "Env", default)]
        env: Option<Environment>,
        #[serde(rename = "Stdin", default, with = "serde_bytes_option")]
        stdin: Option<Vec<u8>>,
        #[serde(rename = "WorkingDir", default)]
        working_dir: Option<PathBuf>,
        #[serde(rename = "TimeoutMs", default)]
        timeout_ms: Option<u64>,
    },

    #[serde(rename = "find")]
    Find {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Directory")]
        directory: PathBuf,
        #[serde(rename = "NamePattern", default)]
        name_pattern: Option<String>,
        #[serde(rename = "MaxDepth", default)]
        max_depth: Option<usize>,
        #[serde(rename = "IncludeDirs", default = "default_true")]
        include_dirs: bool,
        #[serde(rename = "IncludeFiles", default = "default_true")]
        include_files: bool,
        #[serde(rename = "FollowSymlinks", default)]
        follow_symlinks: bool,
    },

    #[serde(rename = "is")]
    Is {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
        #[serde(rename = "Kind")]
        kind: String,
    },

    #[serde(rename = "readfile")]
    ReadFile {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
        #[serde(rename = "Offset", default)]
        offset: u64,
        #[serde(rename = "Limit", default = "default_limit")]
        limit: i64,
    },

    #[serde(rename = "writefile")]
    WriteFile {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
        #[serde(rename = "Data", with = "serde_bytes")]
        data: Vec<u8>,
        #[serde(rename = "Mode", default)]
        mode: Option<u32>,
    },

    #[serde(rename = "readlink")]
    ReadLink {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "fileid")]
    FileId {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "freespace")]
    FreeSpace {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "group")]
    Group {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "groupId")]
    GroupId {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "owner")]
    Owner {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "ownerid")]
    OwnerId {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "remove")]
    Remove {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "removeall")]
    RemoveAll {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "ensureexistingfile")]
    EnsureExistingFile {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "createdir")]
    CreateDir {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "createtempfile")]
    CreateTempFile {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
    },

    #[serde(rename = "copyfile")]
    CopyFile {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "CopyFile")]
        args: CopyFileArgs,
    },

    #[serde(rename = "createsymlink")]
    CreateSymLink {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "CreateSymLink")]
        args: CreateSymLinkArgs,
    },

    #[serde(rename = "renamefile")]
    RenameFile {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "RenameFile")]
        args: RenameFileArgs,
    },

    #[serde(rename = "setpermissions")]
    SetPermissions {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "SetPermissions")]
        args: SetPermissionsArgs,
    },

    #[serde(rename = "signal")]
    Signal {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Signal")]
        args: SignalArgs,
    },

    #[serde(rename = "watch")]
    Watch {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Path")]
        path: PathBuf,
        #[serde(rename = "WatchId")]
        watch_id: i64,
    },

    #[serde(rename = "stopwatch")]
    StopWatch {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "WatchId")]
        watch_id: i64,
    },

    #[serde(rename = "exit")]
    Exit {
        #[serde(rename = "Id", default)]
        id: i64,
    },
}

/// Nested payload for `copyfile`, matching the original's `cmd.CopyFile.{Source,Target}`
/// field-per-kind layout rather than flattening `Source`/`Target` as siblings of `Type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CopyFileArgs {
    #[serde(rename = "Source")]
    pub source: PathBuf,
    #[serde(rename = "Target")]
    pub target: PathBuf,
}

/// Nested payload for `createsymlink`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateSymLinkArgs {
    #[serde(rename = "Source")]
    pub source: PathBuf,
    #[serde(rename = "SymLink")]
    pub sym_link: PathBuf,
}

/// Nested payload for `renamefile`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenameFileArgs {
    #[serde(rename = "Source")]
    pub source: PathBuf,
    #[serde(rename = "Target")]
    pub target: PathBuf,
}

/// Nested payload for `setpermissions`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetPermissionsArgs {
    #[serde(rename = "Path")]
    pub path: PathBuf,
    #[serde(rename = "Mode")]
    pub mode: u32,
}

/// Nested payload for `signal`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalArgs {
    #[serde(rename = "Pid")]
    pub pid: i32,
    #[serde(rename = "Signal")]
    pub signal: String,
}

impl Command {
    /// Correlation id echoed back in the reply. `0` for the internal `error` placeholder when no
    /// id could be recovered.
    pub fn id(&self) -> i64 {
        match self {
            Command::Ping { id }
            | Command::Stat { id, .. }
            | Command::Exec { id, .. }
            | Command::Find { id, .. }
            | Command::Is { id, .. }
            | Command::ReadFile { id, .. }
            | Command::WriteFile { id, .. }
            | Command::ReadLink { id, .. }
            | Command::FileId { id, .. }
            | Command::FreeSpace { id, .. }
            | Command::Group { id, .. }
            | Command::GroupId { id, .. }
            | Command::Owner { id, .. }
            | Command::OwnerId { id, .. }
            | Command::Remove { id, .. }
            | Command::RemoveAll { id, .. }
            | Command::EnsureExistingFile { id, .. }
            | Command::CreateDir { id, .. }
            | Command::CreateTempFile { id, .. }
            | Command::CopyFile { id, .. }
            | Command::CreateSymLink { id, .. }
            | Command::RenameFile { id, .. }
            | Command::SetPermissions { id, .. }
            | Command::Signal { id, .. }
            | Command::Watch { id, .. }
            | Command::StopWatch { id, .. }
            | Command::Exit { id } => *id,
        }
    }

    /// The wire `Type` tag strings this agent recognizes, used to distinguish an unrecognized
    /// command type from a recognized one with a malformed payload.
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "ping",
        "stat",
        "exec",
        "find",
        "is",
        "readfile",
        "writefile",
        "readlink",
        "fileid",
        "freespace",
        "group",
        "groupId",
        "owner",
        "ownerid",
        "remove",
        "removeall",
        "ensureexistingfile",
        "createdir",
        "createtempfile",
        "copyfile",
        "createsymlink",
        "renamefile",
        "setpermissions",
        "signal",
        "watch",
        "stopwatch",
        "exit",
    ];

    pub fn is_known_type(ty: &str) -> bool {
        Self::KNOWN_TYPES.contains(&ty)
    }
}

/// `serde_bytes` only directly supports `Vec<u8>`/`&[u8]`, not `Option<Vec<u8>>`; this small
/// shim gets the same compact binary encoding for the optional `Stdin` payload.
mod serde_bytes_option {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&serde_bytes::Bytes::new(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: Option<serde_bytes::ByteBuf> = Option::deserialize(deserializer)?;
        Ok(bytes.map(serde_bytes::ByteBuf::into_vec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(cmd: &Command) -> Command {
        let mut buf = Vec::new();
        ciborium::into_writer(cmd, &mut buf).unwrap();
        ciborium::from_reader(buf.as_slice()).unwrap()
    }

    #[test]
    fn stat_roundtrips() {
        let cmd = Command::Stat {
            id: 7,
            path: PathBuf::from("/tmp/foo"),
        };
        assert_eq!(roundtrip(&cmd), cmd);
    }

    #[test]
    fn exec_roundtrips_with_optional_fields_absent() {
        let cmd = Command::Exec {
            id: 1,
            cmd: "echo".to_string(),
            args: vec!["hi".to_string()],
            env: None,
            stdin: None,
            working_dir: None,
            timeout_ms: None,
        };
        assert_eq!(roundtrip(&cmd), cmd);
    }

    #[test]
    fn copyfile_roundtrips() {
        let cmd = Command::CopyFile {
            id: 10,
            args: CopyFileArgs {
                source: PathBuf::from("/tmp/src"),
                target: PathBuf::from("/tmp/dst1"),
            },
        };
        assert_eq!(roundtrip(&cmd), cmd);
    }

    #[test]
    fn copyfile_nests_source_and_target_under_the_copyfile_key() {
        let cmd = Command::CopyFile {
            id: 10,
            args: CopyFileArgs {
                source: PathBuf::from("/tmp/src"),
                target: PathBuf::from("/tmp/dst1"),
            },
        };
        let mut buf = Vec::new();
        ciborium::into_writer(&cmd, &mut buf).unwrap();
        let value: ciborium::value::Value = ciborium::de::from_reader(buf.as_slice()).unwrap();
        let ciborium::value::Value::Map(entries) = &value else { panic!("expected a map") };
        let nested = entries
            .iter()
            .find_map(|(k, v)| matches!(k, ciborium::value::Value::Text(t) if t == "CopyFile").then_some(v))
            .expect("CopyFile key");
        assert!(matches!(nested, ciborium::value::Value::Map(_)));
        assert!(entries.iter().all(|(k, _)| !matches!(k, ciborium::value::Value::Text(t) if t == "Source")));
    }

    #[test]
    fn signal_roundtrips() {
        let cmd = Command::Signal {
            id: 3,
            args: SignalArgs { pid: 42, signal: "terminate".to_string() },
        };
        assert_eq!(roundtrip(&cmd), cmd);
    }

    #[test]
    fn watch_roundtrips() {
        let cmd = Command::Watch {
            id: 1,
            path: PathBuf::from("/tmp/w"),
            watch_id: 42,
        };
        assert_eq!(roundtrip(&cmd), cmd);
    }

}
