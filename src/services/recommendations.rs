use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    MatchExplanation, MovieId, RecommendationBatch, SessionStats, SwipeFeedback, UserPreferences,
};

/// Recommendation service operations, behind a trait so queue and poller
/// logic can run against test doubles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    /// Opens the service-side matching session for a member pair. Any
    /// network or service failure is `ServiceUnavailable`; callers degrade
    /// instead of blocking the pairing flow.
    async fn create_matching_session(&self, user1_id: &str, user2_id: &str) -> Result<String>;

    /// Fetches up to `count` personalized candidates. Safe to call
    /// repeatedly; a malformed body yields an empty batch, not an error.
    async fn get_recommendations(
        &self,
        session_id: &str,
        count: usize,
    ) -> Result<RecommendationBatch>;

    /// Reports one swipe to the personalization model. Call sites treat this
    /// as fire-and-forget.
    async fn submit_feedback(&self, session_id: &str, feedback: SwipeFeedback) -> Result<()>;

    async fn get_session_stats(&self, session_id: &str) -> Result<SessionStats>;

    async fn get_user_preferences(&self, member_id: &str) -> Result<UserPreferences>;

    /// Why a matched movie suits both members. `None` when the service has
    /// no explanation for it.
    async fn explain_match(
        &self,
        session_id: &str,
        movie_id: MovieId,
        user1_id: &str,
        user2_id: &str,
    ) -> Result<Option<MatchExplanation>>;
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    user1_id: &'a str,
    user2_id: &'a str,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

/// HTTP client for the recommendation service.
pub struct RecommendationClient {
    http: HttpClient,
    base_url: String,
}

impl RecommendationClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.matching_api_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Transport failures, including timeouts, all read as an unavailable
/// service for degradation purposes.
fn unavailable(e: reqwest::Error) -> Error {
    Error::ServiceUnavailable(e.to_string())
}

#[async_trait]
impl RecommendationProvider for RecommendationClient {
    async fn create_matching_session(&self, user1_id: &str, user2_id: &str) -> Result<String> {
        let response = self
            .http
            .post(self.url("/sessions"))
            .json(&CreateSessionRequest { user1_id, user2_id })
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "session creation returned {}",
                response.status()
            )));
        }

        let body: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("bad session response: {e}")))?;
        tracing::info!(matching_session_id = %body.session_id, "matching session created");
        Ok(body.session_id)
    }

    async fn get_recommendations(
        &self,
        session_id: &str,
        count: usize,
    ) -> Result<RecommendationBatch> {
        let response = self
            .http
            .get(self.url(&format!("/sessions/{session_id}/recommendations")))
            .query(&[("count", count)])
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "recommendations returned {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(unavailable)?;
        match serde_json::from_str::<RecommendationBatch>(&body) {
            Ok(batch) => {
                tracing::debug!(
                    matching_session_id = %session_id,
                    movies = batch.movies.len(),
                    stage = ?batch.session_stage,
                    "recommendations fetched"
                );
                Ok(batch)
            }
            Err(e) => {
                // A garbled batch is served as empty rather than crashing the
                // queue flow.
                tracing::warn!(
                    matching_session_id = %session_id,
                    error = %e,
                    "malformed recommendations body, treating as empty"
                );
                Ok(RecommendationBatch::default())
            }
        }
    }

    async fn submit_feedback(&self, session_id: &str, feedback: SwipeFeedback) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/sessions/{session_id}/feedback")))
            .json(&feedback)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "feedback returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn get_session_stats(&self, session_id: &str) -> Result<SessionStats> {
        let response = self
            .http
            .get(self.url(&format!("/sessions/{session_id}/stats")))
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "stats returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("stats: {e}")))
    }

    async fn get_user_preferences(&self, member_id: &str) -> Result<UserPreferences> {
        let response = self
            .http
            .get(self.url(&format!("/users/{member_id}/preferences")))
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "preferences returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("preferences: {e}")))
    }

    async fn explain_match(
        &self,
        session_id: &str,
        movie_id: MovieId,
        user1_id: &str,
        user2_id: &str,
    ) -> Result<Option<MatchExplanation>> {
        let response = self
            .http
            .get(self.url(&format!("/matching/explain/{session_id}/{movie_id}")))
            .query(&[("user1_id", user1_id), ("user2_id", user2_id)])
            .send()
            .await
            .map_err(unavailable)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "explanation returned {}",
                response.status()
            )));
        }
        let explanation = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("explanation: {e}")))?;
        Ok(Some(explanation))
    }
}
