use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error type covering the different failure cases that can occur when the
/// library ingests, transforms, or pushes group data.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Wrapper for IO failures such as reading or writing snapshot files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the inbound group payload is not valid base64 or UTF-8.
    #[error("invalid group payload: {0}")]
    Payload(String),

    /// Raised when the group markup is structurally malformed.
    #[error("malformed group markup at byte {offset}: {reason}")]
    Markup { offset: usize, reason: String },

    /// Raised when a snapshot record cannot be turned back into a group.
    #[error("invalid snapshot record: {0}")]
    Snapshot(String),

    /// A nonzero result code returned by the remote platform.
    #[error("remote call failed with code {code}: {message}")]
    Remote { code: i32, message: String },

    /// Raised before any remote call when a local rule rejects the request.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Raised when an operation needs the group tree but nothing is loaded.
    #[error("group tree is not loaded")]
    NotLoaded,

    /// Raised when a group handle does not resolve in the current tree.
    #[error("unknown group handle {0}")]
    UnknownGroup(usize),

    /// Raised when the group policy is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Lookup table translating remote result codes into readable messages.
///
/// The platform publishes the table as a JSON object keyed by the decimal
/// code, e.g. `{"19": "no accounts found"}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorCatalog {
    messages: HashMap<i32, String>,
}

impl ErrorCatalog {
    /// Parses the JSON table returned by the remote platform.
    pub fn from_json(source: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(source)?;
        let Value::Object(entries) = value else {
            return Err(ApiError::Config(
                "error code table must be a JSON object".into(),
            ));
        };

        let mut messages = HashMap::with_capacity(entries.len());
        for (key, message) in entries {
            let Ok(code) = key.trim().parse::<i32>() else {
                tracing::warn!(key = %key, "skipping non-numeric error code");
                continue;
            };
            let text = match message {
                Value::String(text) => text,
                other => other.to_string(),
            };
            messages.insert(code, text);
        }

        Ok(Self { messages })
    }

    /// Returns the message for `code`, or a generic text when unknown.
    pub fn message(&self, code: i32) -> String {
        self.messages
            .get(&code)
            .cloned()
            .unwrap_or_else(|| format!("unknown error code {code}"))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
