use std::sync::Arc;

use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::Session;
use crate::store::{SessionEvents, SessionStore};

/// Unambiguous alphabet for join codes: no 0/O, 1/I/L.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;
const MAX_CODE_ATTEMPTS: u32 = 5;

/// Creates and joins sessions and owns the live subscription lifecycle.
///
/// Holds no session state of its own; every call reads or writes through the
/// store. At most one subscription is active per coordinator instance.
pub struct SessionCoordinator {
    store: Arc<dyn SessionStore>,
    active: Option<AbortHandle>,
}

impl SessionCoordinator {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            active: None,
        }
    }

    /// Creates a session with a fresh id and join code, regenerating the code
    /// on collision.
    pub async fn create(&self) -> Result<Session> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let session = Session::new(Uuid::new_v4().to_string(), generate_code());
            match self.store.create_session(&session).await {
                Ok(()) => {
                    tracing::info!(session_id = %session.id, code = %session.code, "session created");
                    return Ok(session);
                }
                Err(Error::CodeTaken) => {
                    tracing::debug!(attempt, "join code collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Internal(
            "exhausted join code generation attempts".to_string(),
        ))
    }

    /// Joins a session by code or id. Idempotent for members already present;
    /// a third distinct member gets [`Error::SessionFull`] and the session is
    /// unchanged. Returns the current snapshot.
    pub async fn join(&self, code_or_id: &str, member_id: &str) -> Result<Session> {
        let session = self.resolve(code_or_id).await?;
        if session.members.iter().any(|m| m == member_id) {
            return Ok(session);
        }
        let session = self.store.append_member(&session.id, member_id).await?;
        tracing::info!(
            session_id = %session.id,
            member_id = %member_id,
            members = session.members.len(),
            "member joined session"
        );
        Ok(session)
    }

    /// Opens a live snapshot subscription. Any previously active subscription
    /// is cancelled first, so exactly one is live per coordinator.
    pub async fn subscribe(&mut self, code_or_id: &str) -> Result<SessionEvents> {
        let session = self.resolve(code_or_id).await?;
        self.unsubscribe();
        let events = self.store.subscribe(&session.id).await?;
        self.active = Some(events.abort_handle());
        tracing::debug!(session_id = %session.id, "subscription opened");
        Ok(events)
    }

    /// Cancels the active subscription. Calling with none active is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.abort();
            tracing::debug!("subscription cancelled");
        }
    }

    async fn resolve(&self, code_or_id: &str) -> Result<Session> {
        if let Some(session) = self.store.read_session(code_or_id).await? {
            return Ok(session);
        }
        self.store
            .find_by_code(code_or_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {code_or_id}")))
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Derives a short join code from fresh UUID entropy.
fn generate_code() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(CODE_LEN)
        .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_shape() {
        for _ in 0..64 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generate_code_varies() {
        let codes: std::collections::HashSet<String> =
            (0..32).map(|_| generate_code()).collect();
        assert!(codes.len() > 1);
    }
}
