use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::MovieId;

/// Maximum number of members in a session.
pub const MAX_MEMBERS: usize = 2;

/// One member's decision on one candidate movie.
///
/// Swipes are an append-only log: a later swipe on the same movie appends a
/// new record instead of replacing the old one, and the latest record wins
/// for match detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRecord {
    pub movie_id: MovieId,
    pub decision: bool,
    pub timestamp: DateTime<Utc>,
}

impl SwipeRecord {
    pub fn new(movie_id: MovieId, decision: bool) -> Self {
        Self {
            movie_id,
            decision,
            timestamp: Utc::now(),
        }
    }
}

/// Shared real-time state for one pair of users.
///
/// Field names are camelCase on the wire to match the session documents as
/// stored. `user_history` and `matches` only ever grow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Short human-shareable join token, unique across live sessions.
    pub code: String,
    /// Members in join order, at most [`MAX_MEMBERS`].
    pub members: Vec<String>,
    #[serde(default)]
    pub user_history: HashMap<String, Vec<SwipeRecord>>,
    #[serde(default)]
    pub matches: Vec<MovieId>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, code: String) -> Self {
        Self {
            id,
            code,
            members: Vec::new(),
            user_history: HashMap::new(),
            matches: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Both members have joined.
    pub fn is_ready(&self) -> bool {
        self.members.len() == MAX_MEMBERS
    }

    /// The member paired with `member_id`, if one has joined.
    pub fn other_member(&self, member_id: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.as_str() != member_id)
            .map(String::as_str)
    }

    /// The member's most recent decision on `movie_id`, if any.
    ///
    /// The history log is append-only, so the last entry for the movie is
    /// authoritative.
    pub fn latest_decision(&self, member_id: &str, movie_id: MovieId) -> Option<bool> {
        self.user_history
            .get(member_id)?
            .iter()
            .rev()
            .find(|r| r.movie_id == movie_id)
            .map(|r| r.decision)
    }

    /// Both members are present and their latest decision on `movie_id` is a
    /// like.
    pub fn has_mutual_like(&self, movie_id: MovieId) -> bool {
        self.is_ready()
            && self
                .members
                .iter()
                .all(|m| self.latest_decision(m, movie_id) == Some(true))
    }
}
