use thiserror::Error;

/// Errors that can occur when interacting with Azure Resource Manager.
#[derive(Error, Debug)]
pub enum ArmError {
    /// The request failed due to an HTTP error.
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// The service returned an ARM error envelope.
    #[error("ARM error ({code}): {message}")]
    Api { code: String, message: String },

    /// A long-running operation finished in a non-success state.
    #[error("operation ended with status {status} ({code}): {message}")]
    Operation {
        status: String,
        code: String,
        message: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The request or response payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// A request builder was given invalid or incomplete input.
    #[error("Builder error: {0}")]
    Builder(String),
}

/// Result type alias for ARM operations.
pub type ArmResult<T> = std::result::Result<T, ArmError>;
