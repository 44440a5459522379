use thiserror::Error;

// ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockConnError {
    // ---
    #[error("endpoint is not established")]
    NotEstablished,

    #[error("connection is closed")]
    Closed,

    #[error("direction is paused")]
    Paused,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("zero length write")]
    ZeroLength,

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

// ---

pub type Result<T> = std::result::Result<T, MockConnError>;
