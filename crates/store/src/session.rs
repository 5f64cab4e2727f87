//! Session pool collaborator contract.

use async_trait::async_trait;

use crate::error::StorageError;

/// Pool of scoped database sessions.
///
/// The streaming reader acquires at most one session per instance and
/// hands it back exactly once. `release` is synchronous so every teardown
/// path, `Drop` included, can call it without an executor at hand;
/// implementations that need I/O to reclaim a connection must defer it
/// internally. Must be safe for concurrent use by many readers; a session
/// itself is never shared between readers.
#[async_trait]
pub trait SessionPool: Send + Sync {
    /// Opaque handle to one pooled connection.
    type Session: Send;

    /// Borrow a session from the pool.
    async fn acquire(&self) -> Result<Self::Session, StorageError>;

    /// Hand a session back. Non-blocking.
    fn release(&self, session: Self::Session);
}
