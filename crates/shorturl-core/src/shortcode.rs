use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::Display;

/// The compact key a client uses to retrieve an original URL.
///
/// Store-issued codes are the decimal rendering of the record's sequence
/// number. Codes handed back by a relational backend on conflict are taken
/// as-is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Creates the short code for a freshly allocated sequence number.
    pub fn from_sequence(sequence: u64) -> Self {
        Self(sequence.to_string())
    }

    /// Creates a `ShortCode` from caller input, rejecting empty codes.
    pub fn new(code: impl Into<String>) -> Result<Self, StoreError> {
        let code = code.into();
        if code.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (replayed records, relational backend answers).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ShortCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
