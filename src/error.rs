use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("collection '{collection}' has an unrecognized shape: {reason}")]
    InvalidShape { collection: String, reason: String },

    #[error("collection '{file}' could not be read: {source}")]
    Unreadable {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("no indexable text for {0}")]
    EmptyText(String),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    /// Whether a rebuild may skip the offending collection and keep going.
    ///
    /// Missing, unreadable or malformed blobs only affect their own
    /// collection. Anything that says the backend itself is unusable aborts
    /// the operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::InvalidShape { .. }
                | Error::Unreadable { .. }
                | Error::Json(_)
                | Error::EmptyText(_)
        )
    }
}
