//! Data-access layer for streaming sensor-observation values.
//!
//! Pull-based retrieval: a [`StreamingValueReader`] drives a forward-only
//! cursor over a pooled database session and hands records to the protocol
//! encoder one at a time, never materializing the full result set. The
//! session is acquired lazily and released exactly once on every exit path
//! (exhaustion, failure, early abandonment).

mod cursor;
mod error;
#[cfg(feature = "postgres")]
pub mod pg;
mod record;
mod session;
mod streaming;
#[cfg(test)]
mod tests;

pub use cursor::{OpenError, ValueCursor, ValueQueryProvider};
pub use error::{FaultSeverity, ProjectionError, ReadError, StorageError};
pub use record::RawValueRecord;
pub use session::SessionPool;
pub use streaming::StreamingValueReader;
