//! Error types shared across the crate
//!
//! All failures propagate to the caller unmodified; the only local recovery
//! anywhere in the crate is the 404-to-`None` translation in key lookups.

use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Non-success HTTP status with the response body preserved for
    /// diagnosability.
    #[error("request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    /// Non-success HTTP status whose body carried a structured API error
    /// envelope; the human-readable message is extracted.
    #[error("api rejected the request ({status}): {message}")]
    InvalidResponse { status: u16, message: String },

    /// Local pre-flight guard failure; no network call was made.
    #[error("{0}")]
    Precondition(String),

    /// Unresolvable reference or unmappable type in a metadata document.
    #[error("schema error: {0}")]
    Schema(String),

    /// Unsupported filter shape (array operator combinations, empty arrays).
    #[error("filter error: {0}")]
    Filter(String),

    /// Read of an undeclared property, or a plain-path read of a declared
    /// relation.
    #[error("property error: {0}")]
    Property(String),

    #[error("http transport failure: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid metadata document: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build the error for a non-success response, preferring the structured
    /// OData error envelope (`{"error": {"code": ..., "message": ...}}`) when
    /// the body parses as one.
    pub fn from_status_body(status: u16, body: &str) -> Self {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body)
            && let Some(Value::Object(err)) = map.get("error")
            && let Some(Value::String(message)) = err.get("message")
        {
            return Error::InvalidResponse {
                status,
                message: message.clone(),
            };
        }
        Error::Transport {
            status,
            body: body.to_string(),
        }
    }

    /// HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } | Error::InvalidResponse { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
