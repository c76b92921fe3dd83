use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_test::assert_ok;

use moviematch::services::{detector, SessionCoordinator, SwipeProcessor};
use moviematch::store::{MemoryStore, SessionStore};
use moviematch::Error;

const RECV_TIMEOUT: Duration = Duration::from_secs(1);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn coordinator() -> (SessionCoordinator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (SessionCoordinator::new(store.clone()), store)
}

#[tokio::test]
async fn test_create_join_and_capacity() {
    init_tracing();
    let (coordinator, _store) = coordinator();
    let session = assert_ok!(coordinator.create().await);
    assert_eq!(session.code.len(), 6);
    assert!(session.members.is_empty());

    // Both members join by code.
    let session = assert_ok!(coordinator.join(&session.code, "alice").await);
    assert_eq!(session.members, vec!["alice"]);
    let session = assert_ok!(coordinator.join(&session.code, "bob").await);
    assert_eq!(session.members, vec!["alice", "bob"]);
    assert!(session.is_ready());

    // A third distinct member is rejected and the session is unchanged.
    let err = coordinator.join(&session.code, "carol").await.unwrap_err();
    assert!(matches!(err, Error::SessionFull));
    let session = coordinator.join(&session.code, "alice").await.unwrap();
    assert_eq!(session.members, vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_join_is_idempotent() {
    let (coordinator, _store) = coordinator();
    let session = coordinator.create().await.unwrap();

    coordinator.join(&session.code, "alice").await.unwrap();
    let snapshot = coordinator.join(&session.code, "alice").await.unwrap();
    assert_eq!(snapshot.members, vec!["alice"]);

    // Joining by id instead of code is also idempotent.
    let snapshot = coordinator.join(&session.id, "alice").await.unwrap();
    assert_eq!(snapshot.members, vec!["alice"]);
}

#[tokio::test]
async fn test_join_unknown_session() {
    let (coordinator, _store) = coordinator();
    let err = coordinator.join("ZZZZZZ", "alice").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_subscription_sees_partner_join() {
    let (mut coordinator, _store) = coordinator();
    let session = coordinator.create().await.unwrap();
    coordinator.join(&session.code, "alice").await.unwrap();

    let mut events = coordinator.subscribe(&session.code).await.unwrap();
    let snapshot = timeout(RECV_TIMEOUT, events.recv()).await.unwrap().unwrap();
    assert_eq!(snapshot.members, vec!["alice"]);

    coordinator.join(&session.code, "bob").await.unwrap();
    let snapshot = timeout(RECV_TIMEOUT, events.recv()).await.unwrap().unwrap();
    assert_eq!(snapshot.members, vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_resubscribe_cancels_previous_stream() {
    let (mut coordinator, _store) = coordinator();
    let first = coordinator.create().await.unwrap();
    let second = coordinator.create().await.unwrap();

    let mut events_first = coordinator.subscribe(&first.code).await.unwrap();
    // Drain the initial snapshot.
    timeout(RECV_TIMEOUT, events_first.recv())
        .await
        .unwrap()
        .unwrap();

    let mut events_second = coordinator.subscribe(&second.code).await.unwrap();

    // The first stream ends; the second is live.
    let ended = timeout(RECV_TIMEOUT, events_first.recv()).await.unwrap();
    assert!(ended.is_none());
    let snapshot = timeout(RECV_TIMEOUT, events_second.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.id, second.id);

    // Unsubscribe is idempotent.
    coordinator.unsubscribe();
    coordinator.unsubscribe();
    let ended = timeout(RECV_TIMEOUT, events_second.recv()).await.unwrap();
    assert!(ended.is_none());
}

#[tokio::test]
async fn test_swipes_surface_matches_on_both_clients() {
    init_tracing();
    let (coordinator, store) = coordinator();
    let session = coordinator.create().await.unwrap();
    coordinator.join(&session.code, "alice").await.unwrap();
    coordinator.join(&session.code, "bob").await.unwrap();

    let swipes = SwipeProcessor::new(store.clone() as Arc<dyn SessionStore>);
    swipes
        .record_swipe(&session.id, "alice", 7, true)
        .await
        .unwrap();
    swipes
        .record_swipe(&session.id, "bob", 3, false)
        .await
        .unwrap();
    swipes
        .record_swipe(&session.id, "bob", 7, true)
        .await
        .unwrap();

    let snapshot = store.read_session(&session.id).await.unwrap().unwrap();
    assert_eq!(snapshot.matches, vec![7]);

    // Each client detects independently with its own surfaced set.
    let mut surfaced_alice = HashSet::new();
    let found = detector::detect(&snapshot, "alice", &surfaced_alice).unwrap();
    assert_eq!(found, 7);
    surfaced_alice.insert(found);
    assert_eq!(detector::detect(&snapshot, "alice", &surfaced_alice), None);

    assert_eq!(
        detector::detect(&snapshot, "bob", &HashSet::new()),
        Some(7)
    );
}

#[tokio::test]
async fn test_opposing_swipes_never_match() {
    let (coordinator, store) = coordinator();
    let session = coordinator.create().await.unwrap();
    coordinator.join(&session.code, "alice").await.unwrap();
    coordinator.join(&session.code, "bob").await.unwrap();

    let swipes = Arc::new(SwipeProcessor::new(store.clone() as Arc<dyn SessionStore>));
    let id = session.id.clone();

    // Near-simultaneous opposing swipes on the same movie.
    let like = {
        let swipes = swipes.clone();
        let id = id.clone();
        tokio::spawn(async move { swipes.record_swipe(&id, "alice", 7, true).await })
    };
    let dislike = {
        let swipes = swipes.clone();
        let id = id.clone();
        tokio::spawn(async move { swipes.record_swipe(&id, "bob", 7, false).await })
    };
    like.await.unwrap().unwrap();
    dislike.await.unwrap().unwrap();

    let snapshot = store.read_session(&session.id).await.unwrap().unwrap();
    assert!(!snapshot.matches.contains(&7));
}

#[tokio::test]
async fn test_matches_grow_monotonically() {
    let (coordinator, store) = coordinator();
    let session = coordinator.create().await.unwrap();
    coordinator.join(&session.code, "alice").await.unwrap();
    coordinator.join(&session.code, "bob").await.unwrap();

    let swipes = SwipeProcessor::new(store.clone() as Arc<dyn SessionStore>);
    let mut previous_len = 0;
    for movie in [1, 2, 3] {
        swipes
            .record_swipe(&session.id, "alice", movie, true)
            .await
            .unwrap();
        swipes
            .record_swipe(&session.id, "bob", movie, true)
            .await
            .unwrap();
        let snapshot = store.read_session(&session.id).await.unwrap().unwrap();
        assert!(snapshot.matches.len() >= previous_len);
        previous_len = snapshot.matches.len();
    }
    let snapshot = store.read_session(&session.id).await.unwrap().unwrap();
    assert_eq!(snapshot.matches, vec![1, 2, 3]);
}
