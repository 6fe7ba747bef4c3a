/// Error types for the photo feature
///
/// Every failure here is scoped to the photo feature. Callers surface it
/// to the user (or hide the feature) but never abort the host application.
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, PhotoError>;

#[derive(Debug, Error)]
pub enum PhotoError {
    /// The storage backend could not be opened (missing permissions,
    /// unwritable directory, corrupt database file).
    #[error("photo storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A save or delete was rejected. Nothing was committed.
    #[error("photo write rejected: {0}")]
    WriteFailure(String),

    /// A query against an open store failed.
    #[error("photo query failed: {0}")]
    ReadFailure(String),

    /// The captured bytes are not an image we can store.
    #[error("failed to encode captured image: {0}")]
    Encode(String),

    /// The platform image source failed (as opposed to the user cancelling).
    #[error("image acquisition failed: {0}")]
    Acquisition(String),

    /// Writing an export file failed.
    #[error("photo export failed: {0}")]
    Export(String),

    /// A stored row could not be turned back into a photo.
    #[error("corrupt photo record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },
}

impl PhotoError {
    /// True when the whole feature should be hidden rather than retried.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, PhotoError::StorageUnavailable(_))
    }
}

/// Outcome of a bounded location fix that did not produce coordinates.
///
/// Not an error for the capture: the photo is stored without coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationUnavailable {
    #[error("location fix timed out")]
    TimedOut,
    #[error("location unavailable: {0}")]
    Unavailable(String),
}
