//! PostgreSQL backend using sqlx.
//!
//! Implements the session-pool and query-provider contracts on a sqlx
//! `PgPool`. Server-side scrolling is emulated with keyset-batched
//! fetches on a dedicated pooled connection: `DECLARE ... FETCH` cannot
//! be parameterized through the prepared-statement path, and a stable
//! `(phenomenon_time_start, observation_id)` ordering gives the same
//! forward-only, bounded-memory contract.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use observatory_core::{
    env_parse_or, ObservationValue, TemporalFilter, ValueQuery, DEFAULT_FETCH_SIZE,
    PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_IDLE_TIMEOUT_SECS, PG_POOL_MAX_SESSIONS,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Executor, PgPool, Row};

use crate::cursor::{OpenError, ValueCursor, ValueQueryProvider};
use crate::error::StorageError;
use crate::record::RawValueRecord;
use crate::session::SessionPool;

/// One borrowed pooled connection.
pub struct PgSession {
    conn: sqlx::pool::PoolConnection<sqlx::Postgres>,
}

/// Session pool backed by a sqlx `PgPool`.
#[derive(Clone, Debug)]
pub struct PgSessionPool {
    pool: PgPool,
}

impl PgSessionPool {
    /// Connect with env-tunable limits (`OBSERVATORY_PG_MAX_SESSIONS`,
    /// `OBSERVATORY_PG_ACQUIRE_TIMEOUT_SECS`, `OBSERVATORY_PG_IDLE_TIMEOUT_SECS`).
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let max_sessions = env_parse_or("OBSERVATORY_PG_MAX_SESSIONS", PG_POOL_MAX_SESSIONS);
        let acquire_timeout =
            env_parse_or("OBSERVATORY_PG_ACQUIRE_TIMEOUT_SECS", PG_POOL_ACQUIRE_TIMEOUT_SECS);
        let idle_timeout =
            env_parse_or("OBSERVATORY_PG_IDLE_TIMEOUT_SECS", PG_POOL_IDLE_TIMEOUT_SECS);
        let pool = PgPoolOptions::new()
            .max_connections(max_sessions)
            .acquire_timeout(Duration::from_secs(acquire_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        tracing::info!(max_sessions, "PgSessionPool initialized");
        Ok(Self { pool })
    }

    /// Wrap an already-configured pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionPool for PgSessionPool {
    type Session = PgSession;

    async fn acquire(&self) -> Result<PgSession, StorageError> {
        let conn = self.pool.acquire().await?;
        Ok(PgSession { conn })
    }

    fn release(&self, session: PgSession) {
        // PoolConnection hands itself back on drop.
        drop(session);
    }
}

const VALUE_COLUMNS: &str = "o.observation_id, o.procedure_id, o.observable_property_id, \
     o.feature_of_interest_id, o.phenomenon_time_start, o.result_time, \
     o.numeric_value, o.count_value, o.text_value, o.boolean_value, o.category_value, o.unit";

/// Query shape for one descriptor: the SQL text plus whether the cursor
/// is single-shot (latest/first markers return at most one row).
fn build_sql(query: &ValueQuery, batch_size: i64) -> (String, bool) {
    let base = format!(
        "SELECT {VALUE_COLUMNS} FROM observations o \
         WHERE o.procedure_id = $1 AND o.observable_property_id = $2 \
           AND o.feature_of_interest_id = $3"
    );
    match query.temporal_filter {
        None => (
            format!(
                "{base} AND (o.phenomenon_time_start, o.observation_id) > ($4, $5) \
                 ORDER BY o.phenomenon_time_start, o.observation_id LIMIT {batch_size}"
            ),
            false,
        ),
        Some(TemporalFilter::Range { .. }) => (
            format!(
                "{base} AND o.phenomenon_time_start >= $4 AND o.phenomenon_time_start <= $5 \
                 AND (o.phenomenon_time_start, o.observation_id) > ($6, $7) \
                 ORDER BY o.phenomenon_time_start, o.observation_id LIMIT {batch_size}"
            ),
            false,
        ),
        Some(TemporalFilter::Latest) => (
            format!(
                "{base} ORDER BY o.phenomenon_time_start DESC, o.observation_id DESC LIMIT 1"
            ),
            true,
        ),
        Some(TemporalFilter::First) => (
            format!("{base} ORDER BY o.phenomenon_time_start, o.observation_id LIMIT 1"),
            true,
        ),
    }
}

/// Builds keyset-batched value cursors over the observations table.
#[derive(Clone, Debug)]
pub struct PgValueQueryProvider {
    batch_size: i64,
}

impl PgValueQueryProvider {
    /// Batch size from `OBSERVATORY_FETCH_SIZE`, default
    /// [`DEFAULT_FETCH_SIZE`].
    #[must_use]
    pub fn new() -> Self {
        let batch = env_parse_or("OBSERVATORY_FETCH_SIZE", DEFAULT_FETCH_SIZE);
        Self { batch_size: i64::try_from(batch).unwrap_or(DEFAULT_FETCH_SIZE as i64) }
    }
}

impl Default for PgValueQueryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValueQueryProvider<PgSession> for PgValueQueryProvider {
    type Cursor = PgValueCursor;

    async fn open_cursor(
        &self,
        query: &ValueQuery,
        mut session: PgSession,
    ) -> Result<PgValueCursor, OpenError<PgSession>> {
        let (sql, single_shot) = build_sql(query, self.batch_size);
        // Prepare server-side now so a bad query surfaces at open, not on
        // the first advance.
        if let Err(err) = (&mut *session.conn).prepare(sql.as_str()).await {
            return Err(OpenError { session, error: err.into() });
        }
        Ok(PgValueCursor {
            session,
            query: query.clone(),
            sql,
            batch_size: self.batch_size,
            single_shot,
            last_key: (DateTime::<Utc>::MIN_UTC, 0),
            buffer: VecDeque::new(),
            current: None,
            fetched_all: false,
        })
    }
}

/// Forward-only cursor over one query's rows, batching fetches by keyset.
///
/// Rows are decoded lazily: `advance` only tracks the keyset position,
/// `take_current` materializes the domain record. Holds at most one batch
/// of undecoded rows.
pub struct PgValueCursor {
    session: PgSession,
    query: ValueQuery,
    sql: String,
    batch_size: i64,
    single_shot: bool,
    last_key: (DateTime<Utc>, i64),
    buffer: VecDeque<PgRow>,
    current: Option<PgRow>,
    fetched_all: bool,
}

impl PgValueCursor {
    async fn fetch_batch(&mut self) -> Result<(), StorageError> {
        let mut q = sqlx::query(&self.sql)
            .bind(self.query.procedure.0)
            .bind(self.query.observable_property.0)
            .bind(self.query.feature_of_interest.0);
        if let Some(TemporalFilter::Range { start, end }) = self.query.temporal_filter {
            q = q.bind(start).bind(end);
        }
        if !self.single_shot {
            q = q.bind(self.last_key.0).bind(self.last_key.1);
        }
        let rows = q.fetch_all(&mut *self.session.conn).await?;
        self.fetched_all = self.single_shot || (rows.len() as i64) < self.batch_size;
        self.buffer = rows.into();
        Ok(())
    }
}

#[async_trait]
impl ValueCursor for PgValueCursor {
    type Session = PgSession;

    async fn advance(&mut self) -> Result<bool, StorageError> {
        if self.buffer.is_empty() && !self.fetched_all {
            self.fetch_batch().await?;
        }
        match self.buffer.pop_front() {
            Some(row) => {
                self.last_key =
                    (row.try_get("phenomenon_time_start")?, row.try_get("observation_id")?);
                self.current = Some(row);
                Ok(true)
            },
            None => {
                self.current = None;
                Ok(false)
            },
        }
    }

    fn take_current(&mut self) -> Result<RawValueRecord, StorageError> {
        let row = self
            .current
            .take()
            .ok_or_else(|| StorageError::new("cursor is not positioned on a row"))?;
        row_to_value_record(&row)
    }

    fn into_session(self) -> PgSession {
        self.session
    }
}

pub(crate) fn row_to_value_record(row: &PgRow) -> Result<RawValueRecord, StorageError> {
    Ok(RawValueRecord {
        observation_id: row.try_get("observation_id")?,
        procedure_id: row.try_get("procedure_id")?,
        observable_property_id: row.try_get("observable_property_id")?,
        feature_of_interest_id: row.try_get("feature_of_interest_id")?,
        phenomenon_time: row.try_get("phenomenon_time_start")?,
        result_time: row.try_get("result_time")?,
        value: decode_value(row)?,
        unit: row.try_get("unit")?,
    })
}

/// Decode the typed value columns, first present wins.
///
/// A row with every value column NULL decodes to `None`; projections
/// report it rather than defaulting.
fn decode_value(row: &PgRow) -> Result<Option<ObservationValue>, StorageError> {
    if let Some(v) = row.try_get::<Option<f64>, _>("numeric_value")? {
        return Ok(Some(ObservationValue::Quantity(v)));
    }
    if let Some(v) = row.try_get::<Option<i64>, _>("count_value")? {
        return Ok(Some(ObservationValue::Count(v)));
    }
    if let Some(v) = row.try_get::<Option<String>, _>("text_value")? {
        return Ok(Some(ObservationValue::Text(v)));
    }
    if let Some(v) = row.try_get::<Option<bool>, _>("boolean_value")? {
        return Ok(Some(ObservationValue::Boolean(v)));
    }
    if let Some(v) = row.try_get::<Option<String>, _>("category_value")? {
        return Ok(Some(ObservationValue::Category(v)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use observatory_core::{FeatureId, ObservablePropertyId, ProcedureId};

    fn query() -> ValueQuery {
        ValueQuery::new(ProcedureId(1), ObservablePropertyId(2), FeatureId(3))
    }

    #[test]
    fn unfiltered_shape_uses_keyset_batching() {
        let (sql, single_shot) = build_sql(&query(), 200);
        assert!(sql.contains("(o.phenomenon_time_start, o.observation_id) > ($4, $5)"));
        assert!(sql.contains("LIMIT 200"));
        assert!(!single_shot);
    }

    #[test]
    fn range_shape_adds_time_bounds_before_keyset() {
        let filtered = query().with_temporal_filter(TemporalFilter::Range {
            start: DateTime::<Utc>::MIN_UTC,
            end: Utc::now(),
        });
        let (sql, single_shot) = build_sql(&filtered, 50);
        assert!(sql.contains("o.phenomenon_time_start >= $4"));
        assert!(sql.contains("o.phenomenon_time_start <= $5"));
        assert!(sql.contains("> ($6, $7)"));
        assert!(!single_shot);
    }

    #[test]
    fn latest_shape_is_single_shot_descending() {
        let latest = query().with_temporal_filter(TemporalFilter::Latest);
        let (sql, single_shot) = build_sql(&latest, 200);
        assert!(sql.contains("ORDER BY o.phenomenon_time_start DESC"));
        assert!(sql.contains("LIMIT 1"));
        assert!(single_shot);
    }

    #[test]
    fn first_shape_is_single_shot_ascending() {
        let first = query().with_temporal_filter(TemporalFilter::First);
        let (sql, single_shot) = build_sql(&first, 200);
        assert!(sql.ends_with("LIMIT 1"));
        assert!(!sql.contains("DESC"));
        assert!(single_shot);
    }
}
