//! Recursive directory search with optional name-glob filtering and depth limiting.

use std::path::Path;

use ignore::WalkBuilder;

use crate::error::AgentError;
use crate::protocol::response::{FindEntry, Reply};

#[allow(clippy::too_many_arguments)]
pub fn find(
    id: i64,
    directory: &Path,
    name_pattern: Option<&str>,
    max_depth: Option<usize>,
    include_dirs: bool,
    include_files: bool,
    follow_symlinks: bool,
) -> Reply {
    let pattern = match name_pattern.map(glob::Pattern::new).transpose() {
        Ok(pattern) => pattern,
        Err(err) => return Reply::error(id, AgentError::invalid_input(err.to_string())),
    };

    let mut builder = WalkBuilder::new(directory);
    builder
        .hidden(false)
        .git_ignore(false)
        .git_exclude(false)
        .git_global(false)
        .ignore(false)
        .parents(false)
        .follow_links(follow_symlinks);
    // `0` means unbounded, matching the controller's convention rather than `ignore`'s, where
    // `Some(0)` would visit only `directory` itself and yield an empty listing.
    if let Some(depth) = max_depth.filter(|&depth| depth > 0) {
        builder.max_depth(Some(depth));
    }

    let mut entries = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("find: skipping entry that failed to traverse: {err}");
                continue;
            }
        };
        if entry.path() == directory {
            continue;
        }
        let Some(file_type) = entry.file_type() else { continue };
        let is_dir = file_type.is_dir();
        let is_symlink = file_type.is_symlink();
        if is_dir && !include_dirs {
            continue;
        }
        if !is_dir && !include_files {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches = entry
                .path()
                .file_name()
                .map(|name| pattern.matches(&name.to_string_lossy()))
                .unwrap_or(false);
            if !matches {
                continue;
            }
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        entries.push(FindEntry { path: entry.path().to_path_buf(), is_dir, is_symlink, size });
    }

    Reply::Find { id, entries }
}
