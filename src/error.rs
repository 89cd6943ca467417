// MIT License - Copyright (c) 2026 Peter Wright
// Error types

/// Reasons an inbound line was rejected by the frame codec.
///
/// These never reach the caller: the codec logs them and drops the line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Line is not valid UTF-8: {bytes:?}")]
    Undecodable { bytes: Vec<u8> },

    #[error("Unknown keyword: {keyword}")]
    UnknownKeyword { keyword: String },

    #[error("{keyword}: expected {expected} fields, found {found}")]
    FieldCount {
        keyword: String,
        expected: usize,
        found: usize,
    },

    #[error("{keyword}: invalid value {value:?} for field {index}")]
    InvalidField {
        keyword: String,
        index: usize,
        value: String,
    },
}

/// All errors that can occur in the homeworks library.
#[derive(Debug, thiserror::Error)]
pub enum HomeworksError {
    #[error("Couldn't connect to '{addr}': {source}")]
    ConnectionFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection lost")]
    ConnectionLost,

    #[error("Controller requires a login but no credentials were provided")]
    NoCredentialsProvided,

    #[error("Controller rejected the provided credentials")]
    InvalidCredentialsProvided,

    #[error("Not connected to the controller")]
    NotConnected,

    #[error("Client has been stopped")]
    Stopped,

    #[error("Client already started")]
    AlreadyStarted,

    #[error("Client is still running, stop it first")]
    StillRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HomeworksError {
    /// Whether the background loop should reconnect after this error.
    ///
    /// Rejected credentials are retried as well, since they may be fixed
    /// on the controller side while the client keeps running.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HomeworksError::ConnectionFailed { .. }
                | HomeworksError::ConnectionLost
                | HomeworksError::InvalidCredentialsProvided
                | HomeworksError::NotConnected
                | HomeworksError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HomeworksError>;
