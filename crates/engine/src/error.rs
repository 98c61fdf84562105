//! Error types for the engine crate.

use thiserror::Error;

/// Errors the Engine can raise during setup, control, or teardown.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: spider id is required")]
    MissingSpider,

    #[error("an engine for spider '{spider}' is already running")]
    DuplicateSpider { spider: String },

    #[error("invalid requester specification: {message}")]
    InvalidRequesterSpec { message: String },

    #[error("invalid storage specification: {message}")]
    InvalidStorageSpec { message: String },

    #[error("failed to read table file '{path}': {source}")]
    LoadIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("integrity check failed for table file '{path}'")]
    LoadIntegrity { path: String },

    #[error("stage '{stage}' failed to start: {message}")]
    StageStartFailed { stage: String, message: String },

    #[error("stage '{stage}' violated the control contract: expected ok, got {got}")]
    ControlContractViolation { stage: String, got: String },

    #[error("engine is not suspended")]
    StatusError,

    /// The "unknown control message" tag a duck-typed control endpoint would
    /// need. The typed `Command` mailbox gives every caller-reachable
    /// message its own variant, so nothing here ever constructs this — it
    /// documents the contract rather than backing live behavior.
    #[error("unsupported control message: {0}")]
    Unsupported(String),

    #[error("engine mailbox closed")]
    MailboxClosed,

    #[error("timed out waiting for engine reply")]
    Timeout,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] Box<bincode::ErrorKind>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
