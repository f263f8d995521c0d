use thiserror::Error;

use crate::constants::rsp_code_description;

#[derive(Error, Debug)]
pub enum ReolinkError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Camera returned code {code} ({})", describe(.rsp_code, .detail))]
    ApiError {
        code: i64,
        rsp_code: Option<i64>,
        detail: Option<String>,
    },

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid recording: {0}")]
    InvalidRecording(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

fn describe(rsp_code: &Option<i64>, detail: &Option<String>) -> String {
    let known = rsp_code.and_then(rsp_code_description);
    match (*rsp_code, known, detail.as_deref()) {
        (Some(rsp), Some(text), Some(detail)) => format!("rspCode {rsp}: {text}, {detail}"),
        (Some(rsp), Some(text), None) => format!("rspCode {rsp}: {text}"),
        (Some(rsp), None, Some(detail)) => format!("rspCode {rsp}: {detail}"),
        (Some(rsp), None, None) => format!("rspCode {rsp}"),
        (None, _, Some(detail)) => detail.to_string(),
        (None, _, None) => "no error details".to_string(),
    }
}

impl From<reqwest::Error> for ReolinkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ReolinkError::ProtocolError(e.to_string())
        } else {
            ReolinkError::ConnectionError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ReolinkError {
    fn from(e: serde_json::Error) -> Self {
        ReolinkError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReolinkError>;
