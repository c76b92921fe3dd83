use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, RwLock};

use super::{SessionEvents, SessionStore};
use crate::error::{Error, Result};
use crate::models::{MovieId, Session, SwipeRecord, MAX_MEMBERS};

/// Snapshots buffered per subscriber before the pump applies backpressure.
const SUBSCRIBER_BUFFER: usize = 16;

struct Entry {
    session: Session,
    updates: broadcast::Sender<Session>,
}

impl Entry {
    fn notify(&self) {
        // No subscribers is fine.
        let _ = self.updates.send(self.session.clone());
    }
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Entry>,
    codes: HashMap<String, String>,
}

/// In-process session store.
///
/// Atomicity comes from the single write lock; change push fans out through
/// a per-session broadcast channel. Used by tests and local development.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.codes.contains_key(&session.code) {
            return Err(Error::CodeTaken);
        }
        inner
            .codes
            .insert(session.code.clone(), session.id.clone());
        let (updates, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        inner.sessions.insert(
            session.id.clone(),
            Entry {
                session: session.clone(),
                updates,
            },
        );
        Ok(())
    }

    async fn read_session(&self, id: &str) -> Result<Option<Session>> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(id).map(|e| e.session.clone()))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Session>> {
        let inner = self.inner.read().await;
        let Some(id) = inner.codes.get(code) else {
            return Ok(None);
        };
        Ok(inner.sessions.get(id).map(|e| e.session.clone()))
    }

    async fn append_member(&self, id: &str, member_id: &str) -> Result<Session> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {id}")))?;
        if entry.session.members.iter().any(|m| m == member_id) {
            return Ok(entry.session.clone());
        }
        if entry.session.members.len() >= MAX_MEMBERS {
            return Err(Error::SessionFull);
        }
        entry.session.members.push(member_id.to_string());
        entry.notify();
        Ok(entry.session.clone())
    }

    async fn append_swipe(&self, id: &str, member_id: &str, record: &SwipeRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {id}")))?;
        entry
            .session
            .user_history
            .entry(member_id.to_string())
            .or_default()
            .push(record.clone());
        entry.notify();
        Ok(())
    }

    async fn append_match_if_absent(&self, id: &str, movie_id: MovieId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session {id}")))?;
        if entry.session.matches.contains(&movie_id) {
            return Ok(false);
        }
        entry.session.matches.push(movie_id);
        entry.notify();
        Ok(true)
    }

    async fn subscribe(&self, id: &str) -> Result<SessionEvents> {
        let (initial, mut updates) = {
            let inner = self.inner.read().await;
            let entry = inner
                .sessions
                .get(id)
                .ok_or_else(|| Error::NotFound(format!("session {id}")))?;
            (entry.session.clone(), entry.updates.subscribe())
        };

        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let task = tokio::spawn(async move {
            if tx.send(initial).await.is_err() {
                return;
            }
            loop {
                match updates.recv().await {
                    Ok(snapshot) => {
                        if tx.send(snapshot).await.is_err() {
                            break;
                        }
                    }
                    // Skipped snapshots are fine; the next one carries the
                    // full state.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        let abort = task.abort_handle();
        Ok(SessionEvents::new(rx, abort))
    }
}
