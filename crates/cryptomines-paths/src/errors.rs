use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures raised while resolving a root path.
#[derive(Debug, Error)]
pub enum RootPathError {
    /// The current user's home directory could not be determined.
    #[error("unable to determine the current user's home directory")]
    HomeUnavailable,
    /// A `~name` prefix referenced an account the system does not know.
    #[error("unknown user '{user}' in home directory expansion")]
    UnknownUser { user: String },
    /// An override variable was present but empty.
    #[error("{var} is set but empty")]
    EmptyOverride { var: &'static str },
    /// The raw value cannot be used as a filesystem path.
    #[error("invalid path '{}': {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: &'static str },
    /// The working directory was needed for a relative path but is unreadable.
    #[error("failed to read current directory: {0}")]
    CurrentDir(#[source] io::Error),
    /// A path reported as a symlink, or a user database lookup, failed to read.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Too many symbolic links were followed.
    #[error("too many levels of symbolic links at {}", .path.display())]
    SymlinkLoop { path: PathBuf },
}
