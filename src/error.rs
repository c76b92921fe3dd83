/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A third distinct member tried to join a two-member session.
    #[error("session is full")]
    SessionFull,

    /// Join-code collision at session creation; the caller regenerates.
    #[error("join code already in use")]
    CodeTaken,

    #[error("not found: {0}")]
    NotFound(String),

    /// Recommendation service unreachable, timed out, or returned a server
    /// error. Callers degrade to the random fallback and keep going.
    #[error("recommendation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
