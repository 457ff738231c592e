use std::io;

use derive_more::{Display, Error};

/// General-purpose error type produced by every command handler.
///
/// Unlike a reflection-based classifier, `ErrorKind` is a closed enum: the wire `ErrorType`
/// string and `Errno` value are both derived from it directly, never by inspecting a runtime type
/// name.
#[derive(Clone, Debug, Display, PartialEq, Eq, Error)]
#[display(fmt = "{kind}: {message}")]
pub struct AgentError {
    pub kind: ErrorKind,
    pub message: String,
    /// Raw platform errno, when one was recoverable from the originating error.
    pub errno: Option<i32>,
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    AlreadyExists,
    InvalidInput,
    UnexpectedEof,
    Unsupported,
    TimedOut,
    /// Command input failed to decode off the wire.
    DecodeError,
    /// Command `Type` was not one recognized by the dispatcher.
    UnknownCommand,
    /// Catchall for an OS errno that doesn't map to one of the above.
    Errno,
    Other,
}

impl AgentError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errno: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn decode_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeError, message)
    }

    pub fn unknown_command(ty: &str) -> Self {
        Self::new(ErrorKind::UnknownCommand, format!("unrecognized command type: {ty}"))
    }

    /// Symbolic classifier placed in the wire `ErrorType` field. The two synthetic kinds that
    /// never originate from an OS call (`decode_error`, `unknown_command`) use the lowercase
    /// tag named for them in the wire contract, distinct from the `PascalCase` classifiers
    /// `io::Error`/`nix::Error` map onto.
    pub fn error_type(&self) -> &'static str {
        match self.kind {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::UnexpectedEof => "UnexpectedEof",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::TimedOut => "TimedOut",
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::UnknownCommand => "unknown_command",
            ErrorKind::Errno => "Errno",
            ErrorKind::Other => "Other",
        }
    }

    /// Platform errno placed in the wire `Errno` field, defaulting to EINVAL.
    pub fn errno(&self) -> i32 {
        self.errno.unwrap_or_else(|| {
            #[cfg(unix)]
            {
                nix::errno::Errno::EINVAL as i32
            }
            #[cfg(not(unix))]
            {
                22 // EINVAL on every platform libc defines it for
            }
        })
    }
}

impl From<io::Error> for AgentError {
    fn from(err: io::Error) -> Self {
        let errno = err.raw_os_error();
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => ErrorKind::InvalidInput,
            io::ErrorKind::UnexpectedEof => ErrorKind::UnexpectedEof,
            io::ErrorKind::Unsupported => ErrorKind::Unsupported,
            io::ErrorKind::TimedOut => ErrorKind::TimedOut,
            _ if errno.is_some() => ErrorKind::Errno,
            _ => ErrorKind::Other,
        };

        // Strip the `<operation> <path>: ` wrapper some std::io paths prepend so the message
        // matches the underlying OS message.
        let message = strip_path_prefix(&err.to_string());

        Self { kind, message, errno }
    }
}

#[cfg(unix)]
impl From<nix::Error> for AgentError {
    fn from(err: nix::Error) -> Self {
        let errno = err as i32;
        let kind = match err {
            nix::Error::ENOENT => ErrorKind::NotFound,
            nix::Error::EACCES | nix::Error::EPERM => ErrorKind::PermissionDenied,
            nix::Error::EEXIST => ErrorKind::AlreadyExists,
            nix::Error::EINVAL => ErrorKind::InvalidInput,
            nix::Error::ETIMEDOUT => ErrorKind::TimedOut,
            _ => ErrorKind::Errno,
        };

        Self {
            kind,
            message: err.to_string(),
            errno: Some(errno),
        }
    }
}

/// `io::Error`'s `Display` for path-oriented errors often reads like `No such file or directory
/// (os error 2)` already, but some wrappers (e.g. `std::fs::canonicalize` failures surfaced
/// through walkdir) prepend the path. Keep only the trailing OS message when a colon-separated
/// prefix is present and the tail still looks like a message (non-empty).
fn strip_path_prefix(message: &str) -> String {
    match message.rsplit_once(": ") {
        Some((_prefix, tail)) if !tail.is_empty() => tail.to_string(),
        _ => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_not_found_io_error() {
        let err = AgentError::from(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.error_type(), "NotFound");
    }

    #[test]
    fn defaults_errno_to_einval_when_unknown() {
        let err = AgentError::new(ErrorKind::Other, "boom");
        assert_eq!(err.errno(), 22);
    }

    #[test]
    fn strips_path_prefix_from_wrapped_message() {
        assert_eq!(
            strip_path_prefix("/tmp/foo: No such file or directory (os error 2)"),
            "No such file or directory (os error 2)"
        );
        assert_eq!(strip_path_prefix("No such file or directory (os error 2)"), "No such file or directory (os error 2)");
    }
}
