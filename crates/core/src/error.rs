use thiserror::Error;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Host unavailable: {0}")]
    HostUnavailable(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
