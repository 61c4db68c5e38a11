use std::io;

#[derive(Debug, thiserror::Error)]
pub enum FsSourceError {
    /// The traversal itself failed; no index is exposed.
    #[error("failed to walk filesystem at {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Info for a single entry could not be read; the walk skips it.
    #[error("unable to get file info for path={path}: {source}")]
    EntryInfo {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("filesystem source is closed")]
    Closed,

    #[error("invalid glob pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, FsSourceError>;

impl FsSourceError {
    pub(crate) fn walk(path: impl Into<String>, source: io::Error) -> Self {
        Self::Walk {
            path: path.into(),
            source,
        }
    }

    /// Returns true for lookup misses (`NotFound`).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
