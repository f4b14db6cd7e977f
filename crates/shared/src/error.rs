use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400 | 409 | 422 => Self::Validation,
            429 => Self::RateLimited,
            _ => Self::Internal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

/// Error body shape some backend handlers return.
#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Builds the user-facing error for a failed response: the JSON `message`
    /// field when present, otherwise the raw body, otherwise the status line.
    pub fn from_response(status: u16, body: &str) -> Self {
        let fallback = format!("HTTP error! status: {status}");
        let body = body.trim();
        let message = match serde_json::from_str::<MessageBody>(body) {
            Ok(MessageBody {
                message: Some(message),
            }) if !message.trim().is_empty() => message,
            _ if !body.is_empty() => body.to_string(),
            _ => fallback,
        };
        Self::new(ErrorCode::from_status(status), message)
    }
}
