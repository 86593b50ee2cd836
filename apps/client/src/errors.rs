use serde::Deserialize;
use thiserror::Error;

/// Fallback text when neither the server nor the transport explains a failure.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Client-level error type.
/// Every variant can be rendered for the user through `user_message`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Builds an `Api` error from a non-2xx response body, preferring the
    /// message the server put in it.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        ClientError::Api {
            status,
            message: extract_server_message(body).unwrap_or_default(),
        }
    }

    /// Normalizes the error into the text shown in a notification:
    /// server message, then transport message (for a bare non-2xx, the
    /// status line), then a generic fallback.
    pub fn user_message(&self) -> String {
        let message = match self {
            ClientError::Validation(msg)
            | ClientError::Settings(msg)
            | ClientError::InvalidUrl(msg) => msg.clone(),
            ClientError::Api { status, message } if message.trim().is_empty() => {
                format!("Request failed with status code {status}")
            }
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Http(e) if e.is_timeout() => "Request timed out".to_string(),
            ClientError::Http(e) => e.to_string(),
            ClientError::Parse(e) => e.to_string(),
            ClientError::Io(e) => e.to_string(),
        };

        if message.trim().is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Message { message: String },
    Nested { error: NestedError },
    Plain { error: String },
}

#[derive(Deserialize)]
struct NestedError {
    message: String,
}

/// Pulls a human-readable message out of an error body. Accepts
/// `{message}`, `{error: {message}}`, `{error: "..."}` or plain text.
pub fn extract_server_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Message { message }) => message,
        Ok(ErrorBody::Nested { error }) => error.message,
        Ok(ErrorBody::Plain { error }) => error,
        Err(_) if body.starts_with('{') || body.starts_with('<') => return None,
        Err(_) => body.to_string(),
    };

    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

pub type Result<T> = std::result::Result<T, ClientError>;
