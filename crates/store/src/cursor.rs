//! Query provider and cursor collaborator contracts.

use async_trait::async_trait;
use observatory_core::ValueQuery;

use crate::error::StorageError;
use crate::record::RawValueRecord;

/// Failed cursor open.
///
/// The provider hands the session back alongside the cause so the caller
/// can release it: a session is held iff a cursor is open or about to be.
#[derive(Debug)]
pub struct OpenError<S> {
    pub session: S,
    pub error: StorageError,
}

/// Forward-only cursor over one query's value records.
///
/// Bound to exactly one session, which it owns until torn down via
/// [`ValueCursor::into_session`]. Consumption is strictly sequential in
/// the store's native order; implementations may batch fetches internally
/// but never reorder.
#[async_trait]
pub trait ValueCursor: Send {
    type Session: Send;

    /// Advance one position. `Ok(false)` means the cursor is exhausted.
    async fn advance(&mut self) -> Result<bool, StorageError>;

    /// Materialize the record at the current position, detaching it from
    /// any session-level cache.
    ///
    /// Call only after `advance` returned `true`, once per position.
    fn take_current(&mut self) -> Result<RawValueRecord, StorageError>;

    /// Tear the cursor down and recover the session for release.
    fn into_session(self) -> Self::Session;
}

/// Builds cursors for value queries.
#[async_trait]
pub trait ValueQueryProvider<S: Send>: Send + Sync {
    type Cursor: ValueCursor<Session = S>;

    /// Open a cursor bound to `session`.
    ///
    /// The temporally filtered query shape is selected iff the descriptor
    /// carries a temporal filter.
    async fn open_cursor(
        &self,
        query: &ValueQuery,
        session: S,
    ) -> Result<Self::Cursor, OpenError<S>>;
}
