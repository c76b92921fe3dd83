use std::collections::HashSet;

use crate::models::{MovieId, Session};

/// Decides whether a new match should be surfaced to this member.
///
/// Pure over the session snapshot: each client runs it independently against
/// its own `already_surfaced` set, and because the matches log is append-only
/// and re-verification is idempotent, duplicate or re-ordered snapshot
/// delivery converges on the same answer.
///
/// Entries in `matches` are not trusted blindly; the movie is surfaced only
/// when both members' history independently confirms a current like.
pub fn detect(
    session: &Session,
    member_id: &str,
    already_surfaced: &HashSet<MovieId>,
) -> Option<MovieId> {
    let other = session.other_member(member_id)?;
    session
        .matches
        .iter()
        .rev()
        .filter(|id| !already_surfaced.contains(*id))
        .find(|&&id| {
            session.latest_decision(member_id, id) == Some(true)
                && session.latest_decision(other, id) == Some(true)
        })
        .copied()
}
