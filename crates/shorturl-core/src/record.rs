use crate::error::Result;
use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// The unit every durable backend persists and replays.
///
/// The same JSON encoding is used for durable log lines and for the
/// relational backend's payload column, so one decoder serves both sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Namespace the record belongs to.
    pub owner: String,
    /// Short code, unique within `owner`.
    pub key: ShortCode,
    /// Sequence number assigned at creation.
    pub sequence: u64,
    /// The original long URL.
    pub value: String,
    /// Per-caller token used to scope listing and deletion.
    pub owner_token: String,
    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,
}

impl Record {
    /// Encodes the record as a single newline-terminated JSON line.
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decodes a record from one JSON document, ignoring surrounding whitespace.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload.trim())?)
    }

    /// Returns a copy of this record flagged as deleted.
    pub fn as_deleted(&self) -> Self {
        Self {
            deleted: true,
            ..self.clone()
        }
    }
}

/// One entry of a per-token URL listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

/// One URL of a batch shorten request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Caller-chosen identifier echoed back in the matching [`BatchResult`].
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub correlation_id: String,
    pub short_url: String,
}
