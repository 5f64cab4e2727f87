//! Streaming cursor adapter: pull-based value retrieval with guaranteed
//! session release.

use std::mem;
use std::sync::Arc;

use observatory_core::{
    ModifierKey, ModifierRegistry, Observation, RequestKind, ResponseKind, TimeValuePair,
    ValueQuery,
};

use crate::cursor::{ValueCursor, ValueQueryProvider};
use crate::error::{ReadError, StorageError};
use crate::record::RawValueRecord;
use crate::session::SessionPool;

/// Lifecycle of the one cursor a reader may hold.
enum CursorState<C> {
    /// No session acquired yet; the first `has_next_value` opens lazily.
    Unopened,
    /// Cursor open, session held by the cursor. `positioned` is true
    /// between a successful advance and the read that consumes the record.
    Open { cursor: C, positioned: bool },
    /// Exhausted, failed, or closed. The session has been released and
    /// no transition leaves this state.
    Closed,
}

/// Pull-based reader streaming one query's values out of the store.
///
/// Drives a forward-only cursor over a pooled session: the session is
/// acquired lazily on the first [`has_next_value`](Self::has_next_value)
/// and released exactly once on every exit path (exhaustion, storage
/// failure, explicit [`close`](Self::close), or drop). One consumer per
/// reader; calls are strictly sequential and records come back in the
/// cursor's native order.
pub struct StreamingValueReader<P, Q>
where
    P: SessionPool,
    Q: ValueQueryProvider<P::Session>,
{
    pool: Arc<P>,
    provider: Arc<Q>,
    modifiers: Arc<ModifierRegistry>,
    query: ValueQuery,
    state: CursorState<Q::Cursor>,
}

impl<P, Q> StreamingValueReader<P, Q>
where
    P: SessionPool,
    Q: ValueQueryProvider<P::Session>,
{
    pub fn new(
        pool: Arc<P>,
        provider: Arc<Q>,
        modifiers: Arc<ModifierRegistry>,
        query: ValueQuery,
    ) -> Self {
        Self { pool, provider, modifiers, query, state: CursorState::Unopened }
    }

    /// The descriptor this reader streams values for.
    #[must_use]
    pub fn query(&self) -> &ValueQuery {
        &self.query
    }

    /// Advance to the next value.
    ///
    /// The first call acquires a session and opens the cursor. Once this
    /// returns `Ok(false)` the session has been released and every further
    /// call returns `Ok(false)` without touching the pool. On an open or
    /// advance failure the session is released before the error returns;
    /// the reader is then terminal.
    pub async fn has_next_value(&mut self) -> Result<bool, StorageError> {
        if matches!(self.state, CursorState::Unopened) {
            self.open_cursor().await?;
        }
        match mem::replace(&mut self.state, CursorState::Closed) {
            CursorState::Open { mut cursor, .. } => match cursor.advance().await {
                Ok(true) => {
                    self.state = CursorState::Open { cursor, positioned: true };
                    Ok(true)
                },
                Ok(false) => {
                    tracing::debug!(procedure = %self.query.procedure, "value cursor exhausted");
                    self.release(cursor.into_session());
                    Ok(false)
                },
                Err(err) => {
                    self.release(cursor.into_session());
                    Err(err)
                },
            },
            CursorState::Unopened | CursorState::Closed => Ok(false),
        }
    }

    /// The record at the cursor's current position, detached from any
    /// session-level cache.
    ///
    /// On a read failure the session is released and the reader is
    /// terminal.
    ///
    /// # Panics
    ///
    /// Panics if the immediately preceding [`has_next_value`](Self::has_next_value)
    /// call did not return `true`; that is a programming error, not a
    /// recoverable runtime condition.
    pub fn next_raw_record(&mut self) -> Result<RawValueRecord, StorageError> {
        assert!(
            matches!(self.state, CursorState::Open { positioned: true, .. }),
            "next_raw_record called without a preceding successful has_next_value"
        );
        match mem::replace(&mut self.state, CursorState::Closed) {
            CursorState::Open { mut cursor, .. } => match cursor.take_current() {
                Ok(record) => {
                    self.state = CursorState::Open { cursor, positioned: false };
                    Ok(record)
                },
                Err(err) => {
                    self.release(cursor.into_session());
                    Err(err)
                },
            },
            CursorState::Unopened | CursorState::Closed => unreachable!("state checked above"),
        }
    }

    /// Read the current record and project it to a timestamp/value pair.
    ///
    /// Same precondition and failure semantics as
    /// [`next_raw_record`](Self::next_raw_record); a projection failure
    /// also releases the session and leaves the reader terminal.
    pub fn next_value_pair(&mut self) -> Result<TimeValuePair, ReadError> {
        let record = self.next_raw_record()?;
        match record.to_time_value() {
            Ok(pair) => Ok(pair),
            Err(err) => {
                self.abort();
                Err(err.into())
            },
        }
    }

    /// Read the current record and assemble a full observation from the
    /// caller's template.
    ///
    /// Clones `template` (never mutates it), merges the record per the
    /// query's response format, and applies the response modifier declared
    /// for this service/version/request pair, if any. Same precondition
    /// and failure semantics as [`next_value_pair`](Self::next_value_pair).
    pub fn next_observation(&mut self, template: &Observation) -> Result<Observation, ReadError> {
        let record = self.next_raw_record()?;
        let mut observation = template.clone_template();
        if let Err(err) = record.merge_into(&mut observation, self.query.response_format) {
            self.abort();
            return Err(err.into());
        }
        let key = ModifierKey::new(
            self.query.service.as_str(),
            self.query.version.as_str(),
            RequestKind::GetObservation,
        )
        .with_response(ResponseKind::GetObservation);
        if let Some(modifier) = self.modifiers.lookup(&key) {
            if let Err(err) = modifier.modify(&mut observation) {
                self.abort();
                return Err(err.into());
            }
        }
        Ok(observation)
    }

    /// Release the session without consuming the remaining values.
    ///
    /// The mandatory early-abandonment path; idempotent. Dropping the
    /// reader does the same, so a forgotten `close` cannot leak a pooled
    /// session.
    pub fn close(&mut self) {
        if let CursorState::Open { cursor, .. } = mem::replace(&mut self.state, CursorState::Closed)
        {
            tracing::debug!(procedure = %self.query.procedure, "value stream abandoned before exhaustion");
            self.release(cursor.into_session());
        }
    }

    /// Acquire a session and open the cursor for the stored descriptor.
    ///
    /// An acquire failure leaves the reader `Unopened` (nothing is held;
    /// the caller may retry). A provider failure releases the recovered
    /// session and is terminal.
    async fn open_cursor(&mut self) -> Result<(), StorageError> {
        let session = self.pool.acquire().await?;
        tracing::debug!(
            procedure = %self.query.procedure,
            observable_property = %self.query.observable_property,
            feature = %self.query.feature_of_interest,
            filtered = self.query.temporal_filter.is_some(),
            "opening value cursor"
        );
        match self.provider.open_cursor(&self.query, session).await {
            Ok(cursor) => {
                self.state = CursorState::Open { cursor, positioned: false };
                Ok(())
            },
            Err(open) => {
                self.state = CursorState::Closed;
                self.release(open.session);
                Err(open.error)
            },
        }
    }

    /// Tear down after a post-read failure: forfeit the cursor, release
    /// the session, go terminal.
    fn abort(&mut self) {
        if let CursorState::Open { cursor, .. } = mem::replace(&mut self.state, CursorState::Closed)
        {
            self.release(cursor.into_session());
        }
    }

    /// Hand the session back. Every exit path funnels through here, and
    /// the state machine guarantees it runs at most once per reader.
    fn release(&self, session: P::Session) {
        self.pool.release(session);
        tracing::debug!(procedure = %self.query.procedure, "session released");
    }
}

impl<P, Q> Drop for StreamingValueReader<P, Q>
where
    P: SessionPool,
    Q: ValueQueryProvider<P::Session>,
{
    fn drop(&mut self) {
        self.close();
    }
}
