//! Plain filesystem operations: metadata, byte-range reads/writes, and the small directory-entry
//! operations (copy, rename, symlink, permissions, temp files).

use std::fs::Permissions;
use std::io::{self, Read, Seek, SeekFrom};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::constants::CREATE_DIR_MODE;
use crate::error::AgentError;
use crate::protocol::response::Reply;

/// Reports through `lstat`: a symlink is never reported as a dir or a file, only as itself.
/// Callers that want the resolved type should follow up with `readlink`/`is`.
pub fn stat(id: i64, path: &Path) -> Reply {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => Reply::Stat {
            id,
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
            is_symlink: meta.file_type().is_symlink(),
            size: meta.len(),
            readonly: meta.permissions().readonly(),
            mode: meta.permissions().mode(),
            accessed: unix_time(meta.accessed().ok()),
            created: unix_time(meta.created().ok()),
            modified: unix_time(meta.modified().ok()),
            canonicalized_path: std::fs::canonicalize(path).ok(),
        },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}

fn unix_time(time: Option<std::time::SystemTime>) -> Option<u64> {
    time.and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

pub fn is(id: i64, path: &Path, kind: &str) -> Reply {
    let result = match kind {
        "dir" => path.is_dir(),
        "file" => path.is_file(),
        "symlink" => path.symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(false),
        // Raw existence: an `lstat` that succeeds, even for a broken symlink.
        "exist" | "exists" => path.symlink_metadata().is_ok(),
        _ => return Reply::error(id, AgentError::invalid_input(format!("unrecognized is-kind: {kind}"))),
    };
    Reply::Is { id, result }
}

pub fn read_file(id: i64, path: &Path, offset: u64, limit: i64) -> Reply {
    match read_file_inner(path, offset, limit) {
        Ok(data) => Reply::ReadFile { id, data },
        Err(err) => Reply::error(id, err),
    }
}

fn read_file_inner(path: &Path, offset: u64, limit: i64) -> Result<Vec<u8>, AgentError> {
    let mut file = std::fs::File::open(path)?;
    if offset > 0 {
        file.seek(SeekFrom::Start(offset))?;
    }
    let mut data = Vec::new();
    if limit < 0 {
        file.read_to_end(&mut data)?;
    } else {
        let mut limited = file.take(limit as u64);
        limited.read_to_end(&mut data)?;
    }
    Ok(data)
}

pub fn write_file(id: i64, path: &Path, data: &[u8], mode: Option<u32>) -> Reply {
    match write_file_inner(path, data, mode) {
        Ok(()) => Reply::WriteFileResult { id },
        Err(err) => Reply::error(id, err),
    }
}

fn write_file_inner(path: &Path, data: &[u8], mode: Option<u32>) -> Result<(), AgentError> {
    std::fs::write(path, data)?;
    if let Some(mode) = mode {
        std::fs::set_permissions(path, Permissions::from_mode(mode))?;
    }
    Ok(())
}

pub fn read_link(id: i64, path: &Path) -> Reply {
    match std::fs::read_link(path) {
        Ok(target) => Reply::ReadLink { id, target },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}

/// Stable identifier for a file: `<device>:<inode>` on Unix, matching the original's use of the
/// platform file index rather than a path (paths alone can't distinguish hardlinks).
pub fn file_id(id: i64, path: &Path) -> Reply {
    match std::fs::metadata(path) {
        Ok(meta) => Reply::FileId { id, file_id: format!("{}:{}", meta.dev(), meta.ino()) },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}

pub fn free_space(id: i64, path: &Path) -> Reply {
    #[cfg(unix)]
    {
        match nix::sys::statvfs::statvfs(path) {
            Ok(stat) => {
                let free_space = stat.blocks_available() * stat.fragment_size();
                Reply::FreeSpace { id, free_space }
            }
            Err(err) => Reply::error(id, AgentError::from(err)),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Reply::error(id, AgentError::new(crate::error::ErrorKind::Unsupported, "freespace requires a Unix target"))
    }
}

pub fn remove(id: i64, path: &Path) -> Reply {
    let result = if path.is_dir() && !path.is_symlink() {
        std::fs::remove_dir(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => Reply::RemoveResult { id },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}

/// A missing path is not an error here: `os.RemoveAll`-style semantics treat "already gone" as
/// success, matching the idempotence property `removeall` on a non-existent path is expected to
/// uphold.
pub fn remove_all(id: i64, path: &Path) -> Reply {
    match std::fs::remove_dir_all(path).or_else(|_| std::fs::remove_file(path)) {
        Ok(()) => Reply::RemoveAllResult { id },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Reply::RemoveAllResult { id },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}

pub fn ensure_existing_file(id: i64, path: &Path) -> Reply {
    match ensure_existing_file_inner(path) {
        Ok(()) => Reply::EnsureExistingFileResult { id },
        Err(err) => Reply::error(id, err),
    }
}

fn ensure_existing_file_inner(path: &Path) -> Result<(), AgentError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::File::create(path)?;
    Ok(())
}

pub fn create_dir(id: i64, path: &Path) -> Reply {
    match create_dir_inner(path) {
        Ok(()) => Reply::CreateDirResult { id },
        Err(err) => Reply::error(id, err),
    }
}

fn create_dir_inner(path: &Path) -> Result<(), AgentError> {
    std::fs::create_dir_all(path)?;
    std::fs::set_permissions(path, Permissions::from_mode(CREATE_DIR_MODE))?;
    Ok(())
}

pub fn create_temp_file(id: i64, directory: &Path) -> Reply {
    match create_temp_file_inner(directory) {
        Ok(path) => Reply::CreateTempFile { id, path },
        Err(err) => Reply::error(id, err),
    }
}

/// If `path` already exists, it names the destination directory and the temp file gets an
/// unadorned generated name. Otherwise `path` is split into a directory and a base-name
/// template, so `CreateTempFile{Path: "/tmp/foo-"}` creates something like `/tmp/foo-a1b2c3`.
fn create_temp_file_inner(path: &Path) -> Result<PathBuf, AgentError> {
    let (parent, prefix) = if path.as_os_str().is_empty() {
        (Path::new("."), String::new())
    } else if path.exists() {
        (path, String::new())
    } else {
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let prefix = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        (parent, prefix)
    };

    std::fs::create_dir_all(parent)?;

    let file = tempfile::Builder::new().prefix(&prefix).tempfile_in(parent).map_err(AgentError::from)?;
    let (_, path) = file.keep().map_err(|err| AgentError::from(err.error))?;
    Ok(path)
}

/// Streams bytes from `source` into a freshly created `target` rather than `std::fs::copy`,
/// which copies the source's permission bits along with its contents. `target` gets whatever
/// mode `File::create` applies (subject to umask), not the source's.
pub fn copy_file(id: i64, source: &Path, target: &Path) -> Reply {
    match copy_file_inner(source, target) {
        Ok(()) => Reply::CopyFileResult { id },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}

fn copy_file_inner(source: &Path, target: &Path) -> io::Result<()> {
    let mut source = std::fs::File::open(source)?;
    let mut target = std::fs::File::create(target)?;
    io::copy(&mut source, &mut target)?;
    Ok(())
}

pub fn create_sym_link(id: i64, source: &Path, sym_link: &Path) -> Reply {
    match std::os::unix::fs::symlink(source, sym_link) {
        Ok(()) => Reply::CreateSymLinkResult { id },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}

pub fn rename_file(id: i64, source: &Path, target: &Path) -> Reply {
    match std::fs::rename(source, target) {
        Ok(()) => Reply::RenameFileResult { id },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}

pub fn set_permissions(id: i64, path: &Path, mode: u32) -> Reply {
    match std::fs::set_permissions(path, Permissions::from_mode(mode)) {
        Ok(()) => Reply::SetPermissionsResult { id },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}
