//! Session pairing and mutual-like matching core for two-person movie
//! swiping.
//!
//! Exactly two members share a live session: each swipes through a queue of
//! candidate movies, every decision lands in an append-only shared history,
//! and a movie both members like surfaces as a match on both clients. The
//! candidate queue is fed by a personalized recommendation service and falls
//! back to a random catalog feed when that service is unreachable.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
