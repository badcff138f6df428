//! Gemini generateContent wire types
//!
//! Only the fields the relay actually reads or writes are modeled; the
//! upstream is free to send more and serde ignores it.

use serde::{Deserialize, Serialize};

use super::Fragment;
use crate::config::{BlockThreshold, SafetyConfig};

/// One conversational turn in the upstream's format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// A single text part of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// Request body for `models/{model}:streamGenerateContent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    pub fn new(contents: Vec<Content>, safety: &SafetyConfig) -> Self {
        Self {
            contents,
            safety_settings: SafetySetting::from_config(safety),
        }
    }
}

/// One harm-category threshold entry
#[derive(Debug, Clone, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: BlockThreshold,
}

impl SafetySetting {
    /// Expand the configured thresholds into the per-category list the
    /// API expects, covering all four categories.
    pub fn from_config(safety: &SafetyConfig) -> Vec<Self> {
        vec![
            Self {
                category: HarmCategory::Harassment,
                threshold: safety.harassment,
            },
            Self {
                category: HarmCategory::HateSpeech,
                threshold: safety.hate_speech,
            },
            Self {
                category: HarmCategory::SexuallyExplicit,
                threshold: safety.sexually_explicit,
            },
            Self {
                category: HarmCategory::DangerousContent,
                threshold: safety.dangerous_content,
            },
        ]
    }
}

/// Gemini harm categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

/// One streamed response chunk from the upstream
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentChunk {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl GenerateContentChunk {
    /// Extract the chunk's text, if any.
    ///
    /// Chunks without a candidate, without content, or with no text parts
    /// (safety feedback, usage metadata) classify as [`Fragment::Empty`];
    /// they are valid stream items, not errors.
    pub fn into_fragment(self) -> Fragment {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            Fragment::Empty
        } else {
            Fragment::Text(text)
        }
    }
}

/// Error envelope the API returns on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let req = GenerateContentRequest::new(
            vec![Content::user("hello")],
            &SafetyConfig::default(),
        );
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(
            value["safetySettings"][0]["category"],
            "HARM_CATEGORY_HARASSMENT"
        );
        assert_eq!(
            value["safetySettings"][0]["threshold"],
            "BLOCK_MEDIUM_AND_ABOVE"
        );
    }

    #[test]
    fn test_chunk_with_text() {
        let chunk: GenerateContentChunk = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "The sun "}], "role": "model"}}]
        }))
        .unwrap();
        assert_eq!(chunk.into_fragment(), Fragment::Text("The sun ".to_string()));
    }

    #[test]
    fn test_chunk_concatenates_parts() {
        let chunk: GenerateContentChunk = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "a"}, {"text": "b"}]}}]
        }))
        .unwrap();
        assert_eq!(chunk.into_fragment(), Fragment::Text("ab".to_string()));
    }

    #[test]
    fn test_chunk_without_text_is_empty() {
        let chunk: GenerateContentChunk = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert_eq!(chunk.into_fragment(), Fragment::Empty);

        let chunk: GenerateContentChunk = serde_json::from_value(json!({
            "usageMetadata": {"totalTokenCount": 12}
        }))
        .unwrap();
        assert_eq!(chunk.into_fragment(), Fragment::Empty);
    }
}
