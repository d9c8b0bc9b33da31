//! Outcomes handed to transport layers.
//!
//! Each status knows the HTTP code a transport is expected to answer with, so
//! HTTP and RPC front ends map store results the same way.

/// Outcome of shortening a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutStatus {
    /// A new record was created.
    Created,
    /// The URL had already been shortened; the existing code was returned.
    AlreadyExists,
}

impl PutStatus {
    pub fn http_status(self) -> u16 {
        match self {
            PutStatus::Created => 201,
            PutStatus::AlreadyExists => 409,
        }
    }

    /// Folds per-item outcomes of a batch: any conflict makes the batch a conflict.
    pub fn merge(self, other: PutStatus) -> PutStatus {
        match (self, other) {
            (PutStatus::Created, PutStatus::Created) => PutStatus::Created,
            _ => PutStatus::AlreadyExists,
        }
    }
}

/// Result of resolving a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The code resolves to a live URL.
    Active(String),
    /// The code existed but was soft-deleted. The original URL is preserved.
    Deleted(String),
    /// No record exists for the code.
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Resolution::Deleted(_))
    }

    /// The stored URL, whether or not the record was deleted.
    pub fn original_url(&self) -> Option<&str> {
        match self {
            Resolution::Active(url) | Resolution::Deleted(url) => Some(url),
            Resolution::NotFound => None,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Resolution::Active(_) => 307,
            Resolution::Deleted(_) => 410,
            Resolution::NotFound => 404,
        }
    }
}

/// Acknowledgement for a batch of delete requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDeleteStatus {
    /// Every delete was queued.
    Accepted,
    /// At least one delete could not be queued.
    Failed,
}

impl BatchDeleteStatus {
    pub fn http_status(self) -> u16 {
        match self {
            BatchDeleteStatus::Accepted => 202,
            BatchDeleteStatus::Failed => 500,
        }
    }
}
