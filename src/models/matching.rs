use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{MovieCandidate, MovieId};

/// Server-defined personalization stage of a matching session.
///
/// The service may grow new stages; unrecognized values fold into `Unknown`
/// instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStage {
    #[default]
    Exploration,
    Convergence,
    #[serde(other)]
    Unknown,
}

/// One batch of personalized recommendations
/// (`GET /sessions/{id}/recommendations`).
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct RecommendationBatch {
    #[serde(default)]
    pub movies: Vec<MovieCandidate>,
    #[serde(default)]
    pub session_stage: SessionStage,
    #[serde(default)]
    pub total_interactions: u32,
    #[serde(default)]
    pub mutual_likes: u32,
}

/// Aggregate stats for a matching session (`GET /sessions/{id}/stats`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(default)]
    pub session_stage: SessionStage,
    #[serde(default)]
    pub total_interactions: u32,
    #[serde(default)]
    pub mutual_likes: u32,
}

/// Read-only taste snapshot for one member
/// (`GET /users/{id}/preferences`).
///
/// Only `confidence_score` is interpreted here; everything else the service
/// reports is carried opaquely so value-equality gating sees the whole
/// snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub total_interactions: u32,
    #[serde(default)]
    pub genre_preferences: HashMap<String, f64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Like,
    Dislike,
}

impl From<bool> for FeedbackType {
    fn from(liked: bool) -> Self {
        if liked {
            FeedbackType::Like
        } else {
            FeedbackType::Dislike
        }
    }
}

/// Feedback payload for `POST /sessions/{id}/feedback`.
#[derive(Debug, Clone, Serialize)]
pub struct SwipeFeedback {
    pub user_id: String,
    pub movie_id: MovieId,
    pub feedback_type: FeedbackType,
    pub time_spent_ms: u64,
}

/// Why the service believes a matched movie suits both members
/// (`GET /matching/explain/{session}/{movie}`).
#[derive(Debug, Clone, Deserialize)]
pub struct MatchExplanation {
    pub movie_id: MovieId,
    #[serde(default)]
    pub movie_title: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stage_unknown_variant() {
        let stage: SessionStage = serde_json::from_str(r#""exploitation""#).unwrap();
        assert_eq!(stage, SessionStage::Unknown);

        let stage: SessionStage = serde_json::from_str(r#""convergence""#).unwrap();
        assert_eq!(stage, SessionStage::Convergence);
    }

    #[test]
    fn test_feedback_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&FeedbackType::Like).unwrap(),
            r#""like""#
        );
        assert_eq!(
            serde_json::to_string(&FeedbackType::from(false)).unwrap(),
            r#""dislike""#
        );
    }

    #[test]
    fn test_preferences_carry_opaque_fields() {
        let prefs: UserPreferences = serde_json::from_str(
            r#"{
                "confidence_score": 0.72,
                "total_interactions": 14,
                "genre_preferences": {"Drama": 0.9},
                "embedding_version": 3
            }"#,
        )
        .unwrap();
        assert_eq!(prefs.confidence_score, 0.72);
        assert_eq!(prefs.genre_preferences["Drama"], 0.9);
        assert_eq!(prefs.extra["embedding_version"], 3);

        // Value equality must see opaque fields too.
        let mut other = prefs.clone();
        other
            .extra
            .insert("embedding_version".to_string(), serde_json::json!(4));
        assert_ne!(prefs, other);
    }

    #[test]
    fn test_recommendation_batch_defaults() {
        let batch: RecommendationBatch = serde_json::from_str(r#"{}"#).unwrap();
        assert!(batch.movies.is_empty());
        assert_eq!(batch.session_stage, SessionStage::Exploration);
    }
}
