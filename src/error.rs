use serde::Serialize;
use thiserror::Error;

/// Machine-readable view of a [`ClientError`], suitable for handing to a UI layer.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    /// Error type identifier
    pub error: &'static str,
    /// Human-readable error message
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request failed with status {status}: {message}")]
    Resource { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "validation_error",
            ClientError::Authentication(_) => "authentication_error",
            ClientError::Network(_) => "network_error",
            ClientError::Resource { .. } => "resource_error",
            ClientError::Storage(_) => "storage_error",
            ClientError::Decode(_) => "decode_error",
            ClientError::Config(_) => "config_error",
        }
    }

    /// Returns true when the caller should drop back to the login view.
    pub fn is_authentication(&self) -> bool {
        matches!(self, ClientError::Authentication(_))
    }

    /// Message shown inline to the user. Server-provided messages win over
    /// the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(message) => message.clone(),
            ClientError::Authentication(_) => "Your session has expired. Please log in again.".into(),
            ClientError::Network(_) => "Unable to reach the server. Please try again.".into(),
            ClientError::Resource { message, .. } if !message.is_empty() => message.clone(),
            ClientError::Resource { .. } => "The request failed. Please try again.".into(),
            ClientError::Storage(_) | ClientError::Decode(_) | ClientError::Config(_) => {
                "Something went wrong. Please try again.".into()
            }
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error: self.code(),
            message: self.user_message(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
