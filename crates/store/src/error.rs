//! Error taxonomy for the streaming value retrieval layer.
//!
//! Storage trouble is deliberately uniform: every session, cursor, and row
//! failure surfaces as the single [`StorageError`] kind so the protocol
//! layer maps all persistence failures to one fault class. Projection and
//! modifier failures stay distinct — callers must be able to tell
//! "storage unavailable" from "bad data".

use observatory_core::{ModifierError, ResponseFormat};
use thiserror::Error;

/// HTTP-equivalent severity a service fault response should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSeverity {
    /// Caller-side defect in the request.
    BadRequest,
    /// Server-side failure; nothing the caller can fix.
    InternalServerError,
}

/// Uniform storage-layer failure.
///
/// Carries the underlying cause chain; message and severity are fixed
/// regardless of whether the session acquire, cursor open, advance, or row
/// read failed. By the time this error reaches the caller the session has
/// been released.
#[derive(Debug, Error)]
#[error("Error while querying observation data!")]
pub struct StorageError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StorageError {
    /// Wrap any storage-layer failure.
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self { source: source.into() }
    }

    /// Fixed severity: every persistence failure is an internal fault.
    #[must_use]
    pub fn severity(&self) -> FaultSeverity {
        FaultSeverity::InternalServerError
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(err)
    }
}

/// A structurally incomplete record for the requested output shape.
///
/// Indicates a data or configuration defect, not storage unavailability.
/// Never retried and never silently defaulted.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The record carries no result value at all.
    #[error("record {record_id} has no result value")]
    MissingValue { record_id: i64 },

    /// The record lacks a unit of measure required by the response format.
    #[error("record {record_id} has no unit of measure, required for {format}")]
    MissingUnit {
        record_id: i64,
        format: ResponseFormat,
    },
}

impl ProjectionError {
    /// Malformed stored data is a server-side defect.
    #[must_use]
    pub fn severity(&self) -> FaultSeverity {
        FaultSeverity::InternalServerError
    }
}

/// Any failure surfaced by `StreamingValueReader` read operations.
///
/// Whatever the variant, the reader has already released its session and
/// is terminal when this reaches the caller.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Modifier(#[from] ModifierError),
}

impl ReadError {
    #[must_use]
    pub fn severity(&self) -> FaultSeverity {
        match self {
            Self::Storage(e) => e.severity(),
            Self::Projection(e) => e.severity(),
            Self::Modifier(_) => FaultSeverity::InternalServerError,
        }
    }
}
