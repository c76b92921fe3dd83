use serde::{Deserialize, Deserializer, Serialize};

use super::MovieId;

/// A candidate movie streamed to a client's swipe queue.
///
/// Owned by the external catalog; sessions only reference ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieCandidate {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_genres")]
    pub genres: Vec<String>,
    #[serde(default)]
    pub runtime_minutes: Option<u32>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// The catalog has historically served `genres` both as a JSON array and as a
/// JSON-encoded string. Normalize to a plain list here, once, so no consumer
/// parses it again.
fn deserialize_genres<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawGenres {
        List(Vec<String>),
        Encoded(String),
    }

    match Option::<RawGenres>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(RawGenres::List(genres)) => Ok(genres),
        Some(RawGenres::Encoded(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(RawGenres::Encoded(s)) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
    }
}

/// Wrapper for catalog list responses (`GET /movies/random`).
#[derive(Debug, Clone, Deserialize)]
pub struct MovieList {
    #[serde(default)]
    pub movies: Vec<MovieCandidate>,
}
