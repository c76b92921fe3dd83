mod matching;
mod movie;
mod session;

pub use matching::{
    FeedbackType, MatchExplanation, RecommendationBatch, SessionStage, SessionStats,
    SwipeFeedback, UserPreferences,
};
pub use movie::{MovieCandidate, MovieList};
pub use session::{Session, SwipeRecord, MAX_MEMBERS};

/// Catalog-assigned movie identifier.
pub type MovieId = i64;
