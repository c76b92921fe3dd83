use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{MovieId, SwipeRecord};
use crate::store::SessionStore;

/// Appends swipe decisions to the shared history and performs mutual-like
/// bookkeeping.
///
/// Both members' clients run this independently with no cross-client locking:
/// the store's atomic appends make concurrent swipes safe, and the
/// append-if-absent guard keeps two simultaneous detections of the same
/// mutual like from double-writing the matches log.
pub struct SwipeProcessor {
    store: Arc<dyn SessionStore>,
}

impl SwipeProcessor {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Records one swipe and, on a like, appends the movie to the matches log
    /// when the session now holds a mutual like.
    pub async fn record_swipe(
        &self,
        session_id: &str,
        member_id: &str,
        movie_id: MovieId,
        decision: bool,
    ) -> Result<()> {
        let record = SwipeRecord::new(movie_id, decision);
        self.store
            .append_swipe(session_id, member_id, &record)
            .await?;
        tracing::debug!(
            session_id = %session_id,
            member_id = %member_id,
            movie_id,
            decision,
            "swipe recorded"
        );

        if !decision {
            return Ok(());
        }

        // Re-read after our own append: whichever member's check runs last
        // is guaranteed to observe both likes, so a mutual like is never
        // missed even when the two swipes interleave.
        let session = self
            .store
            .read_session(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))?;

        if session.has_mutual_like(movie_id) {
            let appended = self
                .store
                .append_match_if_absent(session_id, movie_id)
                .await?;
            if appended {
                tracing::info!(session_id = %session_id, movie_id, "mutual like recorded");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;
    use crate::store::MemoryStore;

    async fn paired_session(store: &MemoryStore) -> Session {
        let session = Session::new("s1".to_string(), "AB12CD".to_string());
        store.create_session(&session).await.unwrap();
        store.append_member("s1", "alice").await.unwrap();
        store.append_member("s1", "bob").await.unwrap()
    }

    #[tokio::test]
    async fn test_mutual_like_appends_match() {
        let store = Arc::new(MemoryStore::new());
        paired_session(&store).await;
        let processor = SwipeProcessor::new(store.clone());

        processor.record_swipe("s1", "alice", 7, true).await.unwrap();
        let session = store.read_session("s1").await.unwrap().unwrap();
        assert!(session.matches.is_empty());

        processor.record_swipe("s1", "bob", 7, true).await.unwrap();
        let session = store.read_session("s1").await.unwrap().unwrap();
        assert_eq!(session.matches, vec![7]);
    }

    #[tokio::test]
    async fn test_like_dislike_is_not_a_match() {
        let store = Arc::new(MemoryStore::new());
        paired_session(&store).await;
        let processor = SwipeProcessor::new(store.clone());

        processor.record_swipe("s1", "alice", 7, true).await.unwrap();
        processor.record_swipe("s1", "bob", 7, false).await.unwrap();

        let session = store.read_session("s1").await.unwrap().unwrap();
        assert!(session.matches.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_likes_append_once() {
        let store = Arc::new(MemoryStore::new());
        paired_session(&store).await;
        let processor = Arc::new(SwipeProcessor::new(store.clone()));

        let a = {
            let p = processor.clone();
            tokio::spawn(async move { p.record_swipe("s1", "alice", 42, true).await })
        };
        let b = {
            let p = processor.clone();
            tokio::spawn(async move { p.record_swipe("s1", "bob", 42, true).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let session = store.read_session("s1").await.unwrap().unwrap();
        assert_eq!(session.matches, vec![42]);
    }

    #[tokio::test]
    async fn test_later_dislike_revokes_like() {
        let store = Arc::new(MemoryStore::new());
        paired_session(&store).await;
        let processor = SwipeProcessor::new(store.clone());

        processor.record_swipe("s1", "alice", 9, true).await.unwrap();
        processor.record_swipe("s1", "alice", 9, false).await.unwrap();
        processor.record_swipe("s1", "bob", 9, true).await.unwrap();

        let session = store.read_session("s1").await.unwrap().unwrap();
        assert!(session.matches.is_empty());
        // The log kept every entry.
        assert_eq!(session.user_history["alice"].len(), 2);
    }

    #[tokio::test]
    async fn test_solo_member_like_is_not_a_match() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new("s1".to_string(), "AB12CD".to_string());
        store.create_session(&session).await.unwrap();
        store.append_member("s1", "alice").await.unwrap();
        let processor = SwipeProcessor::new(store.clone());

        processor.record_swipe("s1", "alice", 7, true).await.unwrap();
        let session = store.read_session("s1").await.unwrap().unwrap();
        assert!(session.matches.is_empty());
    }
}
