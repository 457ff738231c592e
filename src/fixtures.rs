//! Built-in scripted command sequence used by `--test` (self-test) and `--write` (offline
//! capture) modes. Exercises one representative command of most kinds so a controller author can
//! capture a sample session without hand-writing CBOR.

use std::path::PathBuf;

use crate::protocol::request::{Command, CopyFileArgs, RenameFileArgs};

pub fn script() -> Vec<Command> {
    let base = PathBuf::from("/tmp/cmdbridge-agent-selftest");
    let file = base.join("hello.txt");
    let copy = base.join("hello-copy.txt");
    let renamed = base.join("hello-renamed.txt");

    vec![
        Command::Ping { id: 1 },
        Command::CreateDir { id: 2, path: base.clone() },
        Command::EnsureExistingFile { id: 3, path: file.clone() },
        Command::WriteFile { id: 4, path: file.clone(), data: b"hello from cmdbridge-agent".to_vec(), mode: None },
        Command::ReadFile { id: 5, path: file.clone(), offset: 0, limit: -1 },
        Command::Stat { id: 6, path: file.clone() },
        Command::Is { id: 7, path: file.clone(), kind: "file".to_string() },
        Command::Find {
            id: 8,
            directory: base.clone(),
            name_pattern: None,
            max_depth: None,
            include_dirs: true,
            include_files: true,
            follow_symlinks: false,
        },
        Command::CopyFile { id: 9, args: CopyFileArgs { source: file.clone(), target: copy.clone() } },
        Command::RenameFile { id: 10, args: RenameFileArgs { source: copy, target: renamed } },
        Command::Watch { id: 11, path: base.clone(), watch_id: 100 },
        Command::StopWatch { id: 12, watch_id: 100 },
        Command::RemoveAll { id: 13, path: base },
        Command::Exit { id: 14 },
    ]
}
