//! AI Advisory Client
//!
//! Delegates harvest, sell/wait and yield questions to a generative text
//! service with a JSON-only contract. Mock mode and every failure path
//! resolve to the deterministic answers of the `fallback` crate.

mod client;
mod engine;
mod prompt;

pub use client::{AdvisorConfig, GeminiClient};
pub use engine::{Advice, AdviceSource, Advisor};
pub use prompt::extract_json_object;

use thiserror::Error;

/// Errors talking to the generative service
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("No API key configured for the generative service")]
    MissingCredential,
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Generative service returned status {0}")]
    Status(u16),
    #[error("Advisor timeout after {0}ms")]
    Timeout(u64),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
