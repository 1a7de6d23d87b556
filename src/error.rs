//! Error types for tstack

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::resource::Operation;

/// Result type alias using the tstack [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// tstack error types
#[derive(Error, Debug)]
pub enum Error {
    /// An attribute value was rejected while encoding a request body
    #[error("Invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The resource type does not declare the requested operation
    #[error("{resource} does not support {operation}")]
    UnsupportedOperation {
        resource: String,
        operation: Operation,
    },

    /// The backend answered 404
    #[error("Resource not found: {resource} {id}")]
    NotFound { resource: String, id: String },

    /// Polling observed one of the declared failure statuses
    #[error("{resource} {id} transitioned to failure status {status}")]
    ResourceFailure {
        resource: String,
        id: String,
        status: String,
    },

    /// Polling ran out of time
    #[error("Timed out after {}s waiting on {resource} {id} (last status: {})", .elapsed.as_secs(), .last_status.as_deref().unwrap_or("-"))]
    ResourceTimeout {
        resource: String,
        id: String,
        last_status: Option<String>,
        elapsed: Duration,
    },

    /// The call cannot proceed for this resource type
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Non-success reply other than 404
    #[error("API request failed: {status} ({message})")]
    Api { status: StatusCode, message: String },

    /// Network or TLS failure while talking to the backend
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Attach the resource type and id to a bare 404 from the HTTP layer
    pub(crate) fn for_resource(self, resource: &str, id: &str) -> Self {
        match self {
            Self::NotFound { .. } => Self::NotFound {
                resource: resource.to_string(),
                id: id.to_string(),
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status carried by the error, if it came from a backend reply
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Api { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Format an error for display
/// Security: API replies are summarised by status so backend details are not echoed
pub fn format_error(error: &Error) -> String {
    match error.status().map(|s| s.as_u16()) {
        Some(401) => return "Authentication failed. Check OS_AUTH_TOKEN.".to_string(),
        Some(403) => return "Permission denied. Check your project role assignments.".to_string(),
        Some(404) => return "Resource not found.".to_string(),
        Some(409) => {
            return "Resource conflict. The resource may be in a transitional state.".to_string()
        },
        Some(413) | Some(429) => return "Rate or quota limit exceeded. Please try again later.".to_string(),
        Some(400) => return "Invalid request. Check your parameters.".to_string(),
        Some(500) | Some(503) => {
            return "Storage service temporarily unavailable. Please try again.".to_string()
        },
        _ => {},
    }

    if let Error::Transport { .. } = error {
        return "Request failed. Check your network connection and try again.".to_string();
    }

    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
