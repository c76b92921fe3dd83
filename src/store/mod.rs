//! Session store contract and backends.
//!
//! The store is the only place shared state is mutated. Correctness under
//! concurrent swipers depends on the append operations being atomic at the
//! store; callers never read-modify-write whole documents.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::error::Result;
use crate::models::{MovieId, Session, SwipeRecord};

/// Live push stream of full-session snapshots.
///
/// Delivery is at-least-once and not strictly ordered against the other
/// member's writes; consumers must treat snapshots idempotently. Dropping the
/// stream cancels the backing pump task.
pub struct SessionEvents {
    rx: mpsc::Receiver<Session>,
    abort: AbortHandle,
}

impl SessionEvents {
    pub(crate) fn new(rx: mpsc::Receiver<Session>, abort: AbortHandle) -> Self {
        Self { rx, abort }
    }

    /// Next snapshot, or `None` once the subscription is cancelled.
    pub async fn recv(&mut self) -> Option<Session> {
        self.rx.recv().await
    }

    /// Handle that cancels this subscription remotely. Aborting twice is a
    /// no-op.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }
}

impl Drop for SessionEvents {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// Real-time document store holding session state.
///
/// Backends must provide atomic array appends and push-based change
/// notification; see [`MemoryStore`] and [`RedisStore`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a fresh session. Fails with [`crate::Error::CodeTaken`] when
    /// the join code is already claimed by a live session.
    async fn create_session(&self, session: &Session) -> Result<()>;

    async fn read_session(&self, id: &str) -> Result<Option<Session>>;

    /// Resolves a human-shareable join code to its session.
    async fn find_by_code(&self, code: &str) -> Result<Option<Session>>;

    /// Atomically appends a member. Idempotent for members already present;
    /// fails with [`crate::Error::SessionFull`] when two other members exist.
    async fn append_member(&self, id: &str, member_id: &str) -> Result<Session>;

    /// Atomically appends one swipe record to the member's history log.
    async fn append_swipe(&self, id: &str, member_id: &str, record: &SwipeRecord) -> Result<()>;

    /// Appends `movie_id` to the matches log unless it is already present.
    /// Returns whether this call performed the append, so two concurrent
    /// detections of the same mutual like produce exactly one entry.
    async fn append_match_if_absent(&self, id: &str, movie_id: MovieId) -> Result<bool>;

    /// Opens a change subscription delivering the current snapshot
    /// immediately and a fresh snapshot after every observed write.
    async fn subscribe(&self, id: &str) -> Result<SessionEvents>;
}
