use std::path::PathBuf;

/// A slide deck, transcript, timecode table or caption file could not be
/// obtained. Always recovered by the caller with a fallback.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The catalog in the configuration is unusable.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate talk key: {0}")]
    DuplicateKey(String),

    #[error("talk {0} has both a video and an audio source")]
    ConflictingPlayback(String),

    #[error("talk key must not be empty")]
    EmptyKey,
}

/// The requested talk is not in the catalog.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Not found: {0}")]
pub struct LookupError(pub String);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TimecodeError {
    #[error("timecode table is not a JSON array of numbers: {0}")]
    Syntax(String),

    #[error("timecode {index} is negative or not finite: {value}")]
    InvalidValue { index: usize, value: f64 },

    #[error("timecode {index} ({value}) is earlier than the one before it ({previous})")]
    NonMonotonic { index: usize, value: f64, previous: f64 },
}

impl From<serde_json::Error> for TimecodeError {
    fn from(error: serde_json::Error) -> Self {
        TimecodeError::Syntax(error.to_string())
    }
}

/// One malformed block in a caption file. Parsing continues after it.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, serde::Serialize)]
#[error("line {line}: {message}")]
pub struct CueError {
    pub line: usize,
    pub message: String,
}

impl CueError {
    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Misuse of the sync engine by its host.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("sync element {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("presentation has no sync elements")]
    Empty,
}
