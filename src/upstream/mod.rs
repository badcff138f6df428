//! Upstream generative-model client
//!
//! The relay only ever talks to the model through [`GenerativeBackend`],
//! so handlers and the stream relay can be exercised against an in-memory
//! stub with no network.

mod gemini;
mod types;

pub use gemini::GeminiClient;
pub use types::{
    Content, GenerateContentChunk, GenerateContentRequest, HarmCategory, Part, SafetySetting,
};

use async_trait::async_trait;
use futures::stream::BoxStream;

/// One incremental chunk of generated text.
///
/// The upstream occasionally yields chunks that carry no extractable text
/// (safety annotations, final usage metadata). The decoder classifies those
/// as [`Fragment::Empty`] so downstream code never has to shape-probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Empty,
}

/// A lazy, finite, non-restartable sequence of fragments from one
/// in-flight generation call.
pub type FragmentStream = BoxStream<'static, Result<Fragment, UpstreamError>>;

/// Streaming generation interface to the model backend.
///
/// Both operations initiate exactly one upstream call; sessions are never
/// reused or pooled. Errors returned here occur at initiation, before any
/// fragment has been produced; later failures surface through the stream.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// One-shot streaming generation from a single prompt.
    async fn stream_generate(&self, prompt: &str) -> Result<FragmentStream, UpstreamError>;

    /// Streaming generation in a fresh conversational session seeded with
    /// `prior` turns, sending `message` as the new user message.
    async fn stream_chat(
        &self,
        prior: Vec<Content>,
        message: &str,
    ) -> Result<FragmentStream, UpstreamError>;
}

/// Failures from the upstream model service
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed stream payload: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// True when the upstream rejected the shape of a conversation history.
    ///
    /// The API reports these as plain-text messages, e.g. "First content
    /// should be with role 'user'" or "Please ensure that multiturn requests
    /// alternate between user and model". They stem from caller-supplied
    /// history, so handlers treat them as client errors.
    pub fn is_history_rejection(&self) -> bool {
        match self {
            UpstreamError::Api { message, .. } => {
                let msg = message.to_lowercase();
                msg.contains("should be with role")
                    || msg.contains("alternate between user and model")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_rejection_by_message() {
        let err = UpstreamError::Api {
            status: 400,
            message: "First content should be with role 'user', got model".to_string(),
        };
        assert!(err.is_history_rejection());

        let err = UpstreamError::Api {
            status: 400,
            message: "Please ensure that multiturn requests alternate between user and model."
                .to_string(),
        };
        assert!(err.is_history_rejection());
    }

    #[test]
    fn test_other_api_errors_are_not_history_rejection() {
        let err = UpstreamError::Api {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        };
        assert!(!err.is_history_rejection());

        let err = UpstreamError::Decode("truncated event".to_string());
        assert!(!err.is_history_rejection());
    }
}
