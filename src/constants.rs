use std::time::Duration;

/// Resynchronization marker prefixed to every output frame. Overridden at build time via the
/// `CMDBRIDGE_MAGIC_MARKER` environment variable; falls back to this default otherwise.
pub const MAGIC_PACKET_MARKER: &str = match option_env!("CMDBRIDGE_MAGIC_MARKER") {
    Some(marker) => marker,
    None => "-cmdbridge-packet-marker-",
};

/// Default watchdog window: if no `ping` arrives within this duration, the agent exits.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Exit code used when the watchdog fires.
pub const WATCHDOG_EXIT_CODE: i32 = 100;

/// Exit code used for fatal startup errors.
pub const STARTUP_ERROR_EXIT_CODE: i32 = 1;

/// Capacity of the ping-to-watchdog channel. A non-blocking send against this capacity coalesces
/// bursts of pings into a single timer reset.
pub const WATCHDOG_CHANNEL_CAPACITY: usize = 1;

/// Capacity of the watch subsystem's internal event channel, matching the teacher's watcher
/// channel sizing rationale: small capacities have been observed to deadlock under bursts of
/// watch registrations.
pub const WATCHER_CHANNEL_CAPACITY: usize = 10_000;

/// Mode applied to directories created via `createdir`.
pub const CREATE_DIR_MODE: u32 = 0o755;
