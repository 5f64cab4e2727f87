//! Test doubles and module declarations for streaming tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use observatory_core::{
    FeatureId, ModifierRegistry, ObservablePropertyId, ObservationValue, ProcedureId, ValueQuery,
};

use crate::cursor::{OpenError, ValueCursor, ValueQueryProvider};
use crate::error::StorageError;
use crate::record::RawValueRecord;
use crate::session::SessionPool;
use crate::streaming::StreamingValueReader;


/// Where an injected storage failure fires. Call counts are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Open,
    Advance(usize),
    Read(usize),
}

pub struct MockSession;

/// Pool double counting acquires and releases.
#[derive(Default)]
pub struct MockPool {
    fail_acquire: bool,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl MockPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail_acquire: true, ..Self::default() })
    }

    /// Sessions handed out and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.acquired.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionPool for MockPool {
    type Session = MockSession;

    async fn acquire(&self) -> Result<MockSession, StorageError> {
        if self.fail_acquire {
            return Err(StorageError::new("injected acquire failure"));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession)
    }

    fn release(&self, _session: MockSession) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Provider double replaying canned records through a `VecCursor`.
#[derive(Default)]
pub struct MockProvider {
    pub records: Vec<RawValueRecord>,
    pub fail_at: Option<FailAt>,
    /// Whether the last open saw a temporal filter on the descriptor.
    pub last_open_filtered: Mutex<Option<bool>>,
}

impl MockProvider {
    pub fn with_records(records: Vec<RawValueRecord>) -> Arc<Self> {
        Arc::new(Self { records, ..Self::default() })
    }

    pub fn failing(records: Vec<RawValueRecord>, fail_at: FailAt) -> Arc<Self> {
        Arc::new(Self { records, fail_at: Some(fail_at), ..Self::default() })
    }
}

#[async_trait]
impl ValueQueryProvider<MockSession> for MockProvider {
    type Cursor = VecCursor;

    async fn open_cursor(
        &self,
        query: &ValueQuery,
        session: MockSession,
    ) -> Result<VecCursor, OpenError<MockSession>> {
        *self.last_open_filtered.lock().unwrap() = Some(query.temporal_filter.is_some());
        if self.fail_at == Some(FailAt::Open) {
            return Err(OpenError { session, error: StorageError::new("injected open failure") });
        }
        Ok(VecCursor {
            session,
            records: self.records.clone(),
            advances: 0,
            current: None,
            fail_at: self.fail_at,
        })
    }
}

pub struct VecCursor {
    session: MockSession,
    records: Vec<RawValueRecord>,
    advances: usize,
    current: Option<RawValueRecord>,
    fail_at: Option<FailAt>,
}

#[async_trait]
impl ValueCursor for VecCursor {
    type Session = MockSession;

    async fn advance(&mut self) -> Result<bool, StorageError> {
        self.advances += 1;
        if self.fail_at == Some(FailAt::Advance(self.advances)) {
            return Err(StorageError::new("injected advance failure"));
        }
        if let Some(record) = self.records.get(self.advances - 1) {
            self.current = Some(record.clone());
            Ok(true)
        } else {
            self.current = None;
            Ok(false)
        }
    }

    fn take_current(&mut self) -> Result<RawValueRecord, StorageError> {
        if self.fail_at == Some(FailAt::Read(self.advances)) {
            return Err(StorageError::new("injected read failure"));
        }
        self.current.take().ok_or_else(|| StorageError::new("no current record"))
    }

    fn into_session(self) -> MockSession {
        self.session
    }
}

pub fn quantity_record(id: i64, epoch_secs: i64, value: f64) -> RawValueRecord {
    RawValueRecord {
        observation_id: id,
        procedure_id: 1,
        observable_property_id: 2,
        feature_of_interest_id: 3,
        phenomenon_time: Utc.timestamp_opt(epoch_secs, 0).unwrap(),
        result_time: None,
        value: Some(ObservationValue::Quantity(value)),
        unit: Some("degC".to_owned()),
    }
}

pub fn test_query() -> ValueQuery {
    ValueQuery::new(ProcedureId(1), ObservablePropertyId(2), FeatureId(3))
}

pub fn reader(
    pool: Arc<MockPool>,
    provider: Arc<MockProvider>,
    query: ValueQuery,
) -> StreamingValueReader<MockPool, MockProvider> {
    StreamingValueReader::new(pool, provider, Arc::new(ModifierRegistry::new()), query)
}
