//! Shared constants for the observatory data-access layer.
//!
//! Centralizes tuning values that would otherwise be duplicated across crates.

/// Default service identifier carried on value queries.
pub const SERVICE_SOS: &str = "SOS";

/// Default service version carried on value queries.
pub const SERVICE_VERSION: &str = "2.0.0";

/// PostgreSQL session pool: maximum pooled connections.
pub const PG_POOL_MAX_SESSIONS: u32 = 20;

/// PostgreSQL session pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL session pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Rows fetched per cursor batch.
///
/// Bounds per-reader memory: a streaming reader never holds more than one
/// batch of undecoded rows regardless of result-set size. Larger batches
/// reduce round trips at the cost of latency for the first value.
pub const DEFAULT_FETCH_SIZE: usize = 200;
