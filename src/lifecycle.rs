//! Startup wiring and process-exit niceties shared by every shutdown path: clean `exit`,
//! watchdog timeout, and orderly EOF-on-stdin.

/// Unlinks the running executable. Best-effort: failures are logged, never propagated, since a
/// self-delete failing is not a reason to refuse to exit.
pub fn self_delete() {
    match std::env::current_exe() {
        Ok(exe) => {
            if let Err(err) = std::fs::remove_file(&exe) {
                log::warn!("failed to self-delete {}: {err}", exe.display());
            }
        }
        Err(err) => log::warn!("failed to resolve current executable for self-delete: {err}"),
    }
}
