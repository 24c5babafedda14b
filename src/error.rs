use thiserror::Error;

/// Failures of the transport session, reported to the caller and through
/// [`SessionCallbacks::on_error`](crate::SessionCallbacks::on_error).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("missing or invalid credential: {0}")]
    Credential(String),

    #[error("microphone unavailable: {0}")]
    MediaAcquisition(String),

    #[error("session negotiation failed: {0}")]
    Negotiation(String),

    #[error("control channel not ready")]
    ChannelNotReady,

    #[error("control channel error: {0}")]
    Channel(String),

    #[error("session closed")]
    Closed,

    #[error("failed to serialize directive: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}
