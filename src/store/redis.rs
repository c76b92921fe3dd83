use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use redis::{AsyncCommands, Client as RedisClient, Script};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{SessionEvents, SessionStore};
use crate::error::{Error, Result};
use crate::models::{MovieId, Session, SwipeRecord, MAX_MEMBERS};

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);
const SUBSCRIBER_BUFFER: usize = 16;

/// Joins a member unless already present or the session is full.
/// Returns 1 on append, 0 when already a member, -1 when full.
const APPEND_MEMBER_SCRIPT: &str = r#"
local existing = redis.call('LRANGE', KEYS[1], 0, -1)
for _, m in ipairs(existing) do
    if m == ARGV[1] then return 0 end
end
if #existing >= tonumber(ARGV[2]) then return -1 end
redis.call('RPUSH', KEYS[1], ARGV[1])
return 1
"#;

/// Appends a movie id to the matches log only on first sight, using a set as
/// the uniqueness guard. Returns 1 when this call appended.
const APPEND_MATCH_SCRIPT: &str = r#"
if redis.call('SADD', KEYS[1], ARGV[1]) == 1 then
    redis.call('RPUSH', KEYS[2], ARGV[1])
    return 1
end
return 0
"#;

/// Immutable part of the session document, stored as one JSON string.
/// Members, histories and matches live in their own list keys so appends
/// stay atomic.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionMeta {
    id: String,
    code: String,
    created_at: DateTime<Utc>,
}

/// Redis-backed session store.
///
/// Key layout per session:
/// - `mm:session:{id}` meta JSON
/// - `mm:session:{id}:members` list
/// - `mm:session:{id}:history:{member}` list of swipe-record JSON
/// - `mm:session:{id}:matches` list, guarded by `mm:session:{id}:matchset`
/// - `mm:code:{code}` join-code index, claimed with SET NX
///
/// Every write publishes on `mm:session:{id}:events`; subscribers re-read the
/// full session on each notification, so delivery is at-least-once full
/// snapshots.
#[derive(Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = RedisClient::open(redis_url)?;
        Ok(Self { client })
    }

    fn meta_key(id: &str) -> String {
        format!("mm:session:{id}")
    }

    fn members_key(id: &str) -> String {
        format!("mm:session:{id}:members")
    }

    fn history_key(id: &str, member: &str) -> String {
        format!("mm:session:{id}:history:{member}")
    }

    fn matches_key(id: &str) -> String {
        format!("mm:session:{id}:matches")
    }

    fn matchset_key(id: &str) -> String {
        format!("mm:session:{id}:matchset")
    }

    fn code_key(code: &str) -> String {
        format!("mm:code:{code}")
    }

    fn events_channel(id: &str) -> String {
        format!("mm:session:{id}:events")
    }

    /// Runs a store operation, retrying transient connectivity failures with
    /// exponential backoff. Connectivity trouble here never surfaces as a
    /// mode change anywhere else; it is either absorbed or returned as a
    /// store error.
    async fn with_retry<T, F, Fut>(&self, op: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = RETRY_BASE_DELAY;
        for attempt in 1..=RETRY_ATTEMPTS {
            match f().await {
                Ok(value) => return Ok(value),
                Err(Error::Store(e))
                    if attempt < RETRY_ATTEMPTS
                        && (e.is_io_error() || e.is_connection_refusal() || e.is_timeout()) =>
                {
                    tracing::warn!(op, attempt, error = %e, "store connectivity error, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Internal(format!("retries exhausted for {op}")))
    }

    async fn read_session_inner(client: &RedisClient, id: &str) -> Result<Option<Session>> {
        let mut conn = client.get_multiplexed_async_connection().await?;

        let meta: Option<String> = conn.get(Self::meta_key(id)).await?;
        let Some(meta) = meta else {
            return Ok(None);
        };
        let meta: SessionMeta = serde_json::from_str(&meta)
            .map_err(|e| Error::Internal(format!("corrupt session meta: {e}")))?;

        let members: Vec<String> = conn.lrange(Self::members_key(id), 0, -1).await?;

        let mut user_history = std::collections::HashMap::new();
        for member in &members {
            let raw: Vec<String> = conn.lrange(Self::history_key(id, member), 0, -1).await?;
            let mut records = Vec::with_capacity(raw.len());
            for entry in raw {
                let record: SwipeRecord = serde_json::from_str(&entry)
                    .map_err(|e| Error::Internal(format!("corrupt swipe record: {e}")))?;
                records.push(record);
            }
            user_history.insert(member.clone(), records);
        }

        let matches: Vec<MovieId> = conn.lrange(Self::matches_key(id), 0, -1).await?;

        Ok(Some(Session {
            id: meta.id,
            code: meta.code,
            members,
            user_history,
            matches,
            created_at: meta.created_at,
        }))
    }

    async fn publish_change(client: &RedisClient, id: &str) -> Result<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.publish(Self::events_channel(id), "updated").await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        let meta = serde_json::to_string(&SessionMeta {
            id: session.id.clone(),
            code: session.code.clone(),
            created_at: session.created_at,
        })
        .map_err(|e| Error::Internal(format!("meta serialization: {e}")))?;

        self.with_retry("create_session", || {
            let client = self.client.clone();
            let session = session.clone();
            let meta = meta.clone();
            async move {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let claimed: bool = conn.set_nx(Self::code_key(&session.code), &session.id).await?;
                if !claimed {
                    return Err(Error::CodeTaken);
                }
                let _: () = conn.set(Self::meta_key(&session.id), &meta).await?;
                Ok(())
            }
        })
        .await?;

        tracing::info!(session_id = %session.id, code = %session.code, "session created");
        Ok(())
    }

    async fn read_session(&self, id: &str) -> Result<Option<Session>> {
        self.with_retry("read_session", || {
            let client = self.client.clone();
            let id = id.to_string();
            async move { Self::read_session_inner(&client, &id).await }
        })
        .await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Session>> {
        let id: Option<String> = self
            .with_retry("find_by_code", || {
                let client = self.client.clone();
                let code = code.to_string();
                async move {
                    let mut conn = client.get_multiplexed_async_connection().await?;
                    Ok(conn.get(Self::code_key(&code)).await?)
                }
            })
            .await?;
        match id {
            Some(id) => self.read_session(&id).await,
            None => Ok(None),
        }
    }

    async fn append_member(&self, id: &str, member_id: &str) -> Result<Session> {
        let status: i64 = self
            .with_retry("append_member", || {
                let client = self.client.clone();
                let id = id.to_string();
                let member_id = member_id.to_string();
                async move {
                    let mut conn = client.get_multiplexed_async_connection().await?;
                    let exists: bool = conn.exists(Self::meta_key(&id)).await?;
                    if !exists {
                        return Err(Error::NotFound(format!("session {id}")));
                    }
                    let status: i64 = Script::new(APPEND_MEMBER_SCRIPT)
                        .key(Self::members_key(&id))
                        .arg(&member_id)
                        .arg(MAX_MEMBERS)
                        .invoke_async(&mut conn)
                        .await?;
                    Ok(status)
                }
            })
            .await?;

        if status < 0 {
            return Err(Error::SessionFull);
        }
        if status > 0 {
            Self::publish_change(&self.client, id).await?;
            tracing::info!(session_id = %id, member_id = %member_id, "member joined");
        }
        self.read_session(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {id}")))
    }

    async fn append_swipe(&self, id: &str, member_id: &str, record: &SwipeRecord) -> Result<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| Error::Internal(format!("swipe serialization: {e}")))?;

        self.with_retry("append_swipe", || {
            let client = self.client.clone();
            let key = Self::history_key(id, member_id);
            let json = json.clone();
            async move {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let _: () = conn.rpush(key, json).await?;
                Ok(())
            }
        })
        .await?;

        Self::publish_change(&self.client, id).await
    }

    async fn append_match_if_absent(&self, id: &str, movie_id: MovieId) -> Result<bool> {
        let appended: i64 = self
            .with_retry("append_match_if_absent", || {
                let client = self.client.clone();
                let id = id.to_string();
                async move {
                    let mut conn = client.get_multiplexed_async_connection().await?;
                    let appended: i64 = Script::new(APPEND_MATCH_SCRIPT)
                        .key(Self::matchset_key(&id))
                        .key(Self::matches_key(&id))
                        .arg(movie_id)
                        .invoke_async(&mut conn)
                        .await?;
                    Ok(appended)
                }
            })
            .await?;

        if appended == 1 {
            Self::publish_change(&self.client, id).await?;
        }
        Ok(appended == 1)
    }

    async fn subscribe(&self, id: &str) -> Result<SessionEvents> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(Self::events_channel(id)).await?;

        let client = self.client.clone();
        let id = id.to_string();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let task = tokio::spawn(async move {
            match Self::read_session_inner(&client, &id).await {
                Ok(Some(initial)) => {
                    if tx.send(initial).await.is_err() {
                        return;
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "initial snapshot read failed");
                    return;
                }
            }

            let mut messages = pubsub.on_message();
            while messages.next().await.is_some() {
                match Self::read_session_inner(&client, &id).await {
                    Ok(Some(snapshot)) => {
                        if tx.send(snapshot).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(session_id = %id, error = %e, "snapshot read failed");
                    }
                }
            }
        });
        let abort = task.abort_handle();
        Ok(SessionEvents::new(rx, abort))
    }
}
