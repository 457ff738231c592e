pub mod find;
pub mod fs;
pub mod ownership;
pub mod process;

use crate::protocol::request::Command;
use crate::protocol::response::Reply;
use crate::watch::WatcherHandle;

/// Shared state every command handler needs. Cloned per in-flight command task; cloning is
/// cheap since `WatcherHandle` is just an mpsc sender.
#[derive(Clone)]
pub struct Context {
    pub watcher: WatcherHandle,
}

/// Executes one command to completion and produces its reply. Runs on its own task per
/// in-flight command, so a long `exec` or `find` never blocks unrelated commands.
///
/// `ping` and `exit` never reach here: the input loop intercepts both before handing a command
/// off to a worker task, since neither produces a reply — the former only resets the watchdog
/// and the latter drives process shutdown.
pub async fn dispatch(command: Command, ctx: &Context) -> Reply {
    match command {
        Command::Ping { .. } | Command::Exit { .. } => {
            unreachable!("dispatcher intercepts ping/exit before spawning a worker")
        }
        Command::Stat { id, path } => fs::stat(id, &path),
        Command::Exec { id, cmd, args, env, stdin, working_dir, timeout_ms } => {
            process::exec(
                id,
                &cmd,
                &args,
                env.as_ref(),
                stdin.as_deref(),
                working_dir.as_deref(),
                timeout_ms,
            )
            .await
        }
        Command::Find { id, directory, name_pattern, max_depth, include_dirs, include_files, follow_symlinks } => {
            find::find(id, &directory, name_pattern.as_deref(), max_depth, include_dirs, include_files, follow_symlinks)
        }
        Command::Is { id, path, kind } => fs::is(id, &path, &kind),
        Command::ReadFile { id, path, offset, limit } => fs::read_file(id, &path, offset, limit),
        Command::WriteFile { id, path, data, mode } => fs::write_file(id, &path, &data, mode),
        Command::ReadLink { id, path } => fs::read_link(id, &path),
        Command::FileId { id, path } => fs::file_id(id, &path),
        Command::FreeSpace { id, path } => fs::free_space(id, &path),
        Command::Group { id, path } => ownership::group(id, &path),
        Command::GroupId { id, path } => ownership::group_id(id, &path),
        Command::Owner { id, path } => ownership::owner(id, &path),
        Command::OwnerId { id, path } => ownership::owner_id(id, &path),
        Command::Remove { id, path } => fs::remove(id, &path),
        Command::RemoveAll { id, path } => fs::remove_all(id, &path),
        Command::EnsureExistingFile { id, path } => fs::ensure_existing_file(id, &path),
        Command::CreateDir { id, path } => fs::create_dir(id, &path),
        Command::CreateTempFile { id, path } => fs::create_temp_file(id, &path),
        Command::CopyFile { id, args } => fs::copy_file(id, &args.source, &args.target),
        Command::CreateSymLink { id, args } => fs::create_sym_link(id, &args.source, &args.sym_link),
        Command::RenameFile { id, args } => fs::rename_file(id, &args.source, &args.target),
        Command::SetPermissions { id, args } => fs::set_permissions(id, &args.path, args.mode),
        Command::Signal { id, args } => process::signal(id, args.pid, &args.signal),
        Command::Watch { id, path, watch_id } => match ctx.watcher.watch(watch_id, path).await {
            Ok(()) => Reply::WatchResult { id },
            Err(err) => Reply::error(id, err),
        },
        Command::StopWatch { id, watch_id } => match ctx.watcher.unwatch(watch_id).await {
            Ok(()) => Reply::StopWatchResult { id },
            Err(err) => Reply::error(id, err),
        },
    }
}
