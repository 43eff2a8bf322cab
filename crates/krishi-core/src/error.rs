//! Centralized error types for Krishi Sewa.
//!
//! Every domain crate has its own error enum; each one converts into
//! [`AppError`], which is what the tool-call boundary hands back to the
//! orchestrator. Use `user_message()` for text that can be relayed to a farmer.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Geocoding found no match, or a crop/month/tool/file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failure talking to a third-party API (HTTP error, network error, timeout).
    #[error("Upstream error: {0}")]
    Upstream(#[from] NetworkError),

    /// The requested weather variable is not part of the forecast table.
    #[error("Unknown weather variable: {0}")]
    UnknownVariable(String),

    /// Malformed arguments: empty names, out-of-range months or coordinates.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a short message suitable for relaying to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "Nothing matched that request. Check the name and try again.",
            AppError::Upstream(e) => e.user_message(),
            AppError::UnknownVariable(_) => "That weather variable is not available.",
            AppError::InvalidInput(_) => "The request was not understood. Please rephrase it.",
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A local file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// Machine-readable kind, used in structured tool failures.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Upstream(_) => "upstream",
            AppError::UnknownVariable(_) => "unknown_variable",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Other(_) => "other",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to reach the data service. Check the internet connection."
            }
            NetworkError::Timeout => "The data service took too long to answer. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The data service is having trouble. Please try again later."
            }
            NetworkError::ServerError { .. } => "The data service rejected the request.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response from the data service."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let errors = vec![
            AppError::NotFound("x".into()),
            AppError::Upstream(NetworkError::Timeout),
            AppError::UnknownVariable("x".into()),
            AppError::InvalidInput("x".into()),
            AppError::Config(ConfigError::Invalid("x".into())),
        ];

        for e in errors {
            assert!(!e.user_message().is_empty(), "{e:?} has an empty message");
        }
    }

    #[test]
    fn test_network_error_conversion() {
        let app_err: AppError = NetworkError::Timeout.into();
        assert!(matches!(app_err, AppError::Upstream(NetworkError::Timeout)));
        assert_eq!(app_err.kind(), "upstream");
    }

    #[test]
    fn test_server_error_message_by_status() {
        let unavailable = NetworkError::ServerError {
            status: 503,
            message: "busy".into(),
        };
        let rejected = NetworkError::ServerError {
            status: 400,
            message: "bad".into(),
        };
        assert_ne!(unavailable.user_message(), rejected.user_message());
    }
}
