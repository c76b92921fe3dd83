use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{MovieCandidate, MovieId, MovieList};

/// Movie catalog operations: the random fallback feed and direct lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieSource: Send + Sync {
    /// Random, non-personalized candidates for degraded-mode queue fill.
    async fn random_movies(&self, limit: usize) -> Result<Vec<MovieCandidate>>;

    /// Single movie lookup, used when surfacing a match whose details are no
    /// longer in the local queue. `None` when the catalog does not know it.
    async fn get_movie(&self, movie_id: MovieId) -> Result<Option<MovieCandidate>>;
}

/// HTTP client for the movie catalog service.
pub struct CatalogClient {
    http: HttpClient,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.catalog_api_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn unavailable(e: reqwest::Error) -> Error {
    Error::ServiceUnavailable(e.to_string())
}

#[async_trait]
impl MovieSource for CatalogClient {
    async fn random_movies(&self, limit: usize) -> Result<Vec<MovieCandidate>> {
        let response = self
            .http
            .get(self.url("/movies/random"))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "random movies returned {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(unavailable)?;
        match serde_json::from_str::<MovieList>(&body) {
            Ok(list) => {
                tracing::debug!(movies = list.movies.len(), "random movies fetched");
                Ok(list.movies)
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed random movies body, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn get_movie(&self, movie_id: MovieId) -> Result<Option<MovieCandidate>> {
        let response = self
            .http
            .get(self.url(&format!("/movies/{movie_id}")))
            .send()
            .await
            .map_err(unavailable)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "movie lookup returned {}",
                response.status()
            )));
        }
        let movie = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("movie: {e}")))?;
        Ok(Some(movie))
    }
}
