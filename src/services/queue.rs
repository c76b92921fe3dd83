use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use super::catalog::MovieSource;
use super::recommendations::RecommendationProvider;
use crate::models::{MovieCandidate, MovieId, SwipeFeedback};

/// Where queue refills come from.
///
/// `Uninitialized` becomes `Algorithmic` on the first successful matching
/// session creation. Any recommendation-service error drops the queue to
/// `Degraded` for the rest of the session; there is no re-promotion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueMode {
    Uninitialized,
    Algorithmic { matching_session_id: String },
    Degraded,
}

/// Per-client ordered candidate queue.
///
/// Pops the consumed movie on each swipe and replenishes from the
/// recommendation service or, in degraded mode, the random catalog feed.
/// Candidates already enqueued once are never re-enqueued across refills.
pub struct MovieQueueManager {
    recommendations: Arc<dyn RecommendationProvider>,
    fallback: Arc<dyn MovieSource>,
    member_id: String,
    batch_size: usize,
    queue: VecDeque<MovieCandidate>,
    seen: HashSet<MovieId>,
    mode: QueueMode,
}

impl MovieQueueManager {
    pub fn new(
        recommendations: Arc<dyn RecommendationProvider>,
        fallback: Arc<dyn MovieSource>,
        member_id: String,
        batch_size: usize,
    ) -> Self {
        Self {
            recommendations,
            fallback,
            member_id,
            batch_size,
            queue: VecDeque::new(),
            seen: HashSet::new(),
            mode: QueueMode::Uninitialized,
        }
    }

    pub fn mode(&self) -> &QueueMode {
        &self.mode
    }

    pub fn matching_session_id(&self) -> Option<&str> {
        match &self.mode {
            QueueMode::Algorithmic {
                matching_session_id,
            } => Some(matching_session_id),
            _ => None,
        }
    }

    /// Lazily opens the service-side matching session once both members are
    /// known. A failure drops to degraded mode permanently; later calls are
    /// no-ops in every state but `Uninitialized`, so a failed creation is
    /// never retried.
    pub async fn initialize(&mut self, other_member_id: &str) {
        if self.mode != QueueMode::Uninitialized {
            return;
        }
        match self
            .recommendations
            .create_matching_session(&self.member_id, other_member_id)
            .await
        {
            Ok(id) => {
                tracing::info!(matching_session_id = %id, "queue running in algorithmic mode");
                self.mode = QueueMode::Algorithmic {
                    matching_session_id: id,
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, "recommendation service unavailable, serving random movies");
                self.mode = QueueMode::Degraded;
            }
        }
    }

    /// The candidate currently offered to the member.
    pub fn current(&self) -> Option<&MovieCandidate> {
        self.queue.front()
    }

    /// Consumes the current candidate: reports feedback in algorithmic mode,
    /// refills if the queue ran dry, and returns the new front. A feedback
    /// failure degrades the mode but never blocks advancement.
    pub async fn advance(&mut self, decision: bool, time_spent_ms: u64) -> Option<&MovieCandidate> {
        let Some(consumed) = self.queue.pop_front() else {
            self.refill().await;
            return self.queue.front();
        };

        if let QueueMode::Algorithmic {
            matching_session_id,
        } = self.mode.clone()
        {
            let feedback = SwipeFeedback {
                user_id: self.member_id.clone(),
                movie_id: consumed.id,
                feedback_type: decision.into(),
                time_spent_ms,
            };
            if let Err(e) = self
                .recommendations
                .submit_feedback(&matching_session_id, feedback)
                .await
            {
                tracing::warn!(
                    error = %e,
                    movie_id = consumed.id,
                    "feedback submission failed, degrading"
                );
                self.mode = QueueMode::Degraded;
            }
        }

        if self.queue.is_empty() {
            self.refill().await;
        }
        self.queue.front()
    }

    /// Replenishes the queue from the mode's source. In algorithmic mode a
    /// fetch error degrades permanently and falls through to the random feed
    /// in the same call.
    pub async fn refill(&mut self) {
        if let QueueMode::Algorithmic {
            matching_session_id,
        } = self.mode.clone()
        {
            match self
                .recommendations
                .get_recommendations(&matching_session_id, self.batch_size)
                .await
            {
                Ok(batch) => {
                    let added = self.extend_queue(batch.movies);
                    tracing::debug!(
                        added,
                        stage = ?batch.session_stage,
                        "queue refilled from recommendations"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "recommendation refill failed, degrading");
                    self.mode = QueueMode::Degraded;
                }
            }
        }

        match self.fallback.random_movies(self.batch_size).await {
            Ok(movies) => {
                let added = self.extend_queue(movies);
                tracing::debug!(added, "queue refilled from random fallback");
            }
            Err(e) => {
                tracing::warn!(error = %e, "fallback refill failed, queue stays empty");
            }
        }
    }

    fn extend_queue(&mut self, movies: Vec<MovieCandidate>) -> usize {
        let mut added = 0;
        for movie in movies {
            if self.seen.insert(movie.id) {
                self.queue.push_back(movie);
                added += 1;
            }
        }
        added
    }
}
