//! Gemini streaming client
//!
//! Talks to `models/{model}:streamGenerateContent?alt=sse` and decodes the
//! SSE `data:` lines into a [`FragmentStream`]. Transport chunks do not
//! align with event boundaries, so decoding buffers partial lines across
//! chunks.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::time::Duration;

use super::types::{ApiErrorBody, GenerateContentChunk, GenerateContentRequest};
use super::{Content, Fragment, FragmentStream, GenerativeBackend, UpstreamError};
use crate::config::UpstreamConfig;

/// HTTP client for the Gemini API
pub struct GeminiClient {
    http: reqwest::Client,
    config: UpstreamConfig,
    api_key: String,
}

impl GeminiClient {
    /// Build a client from process-wide configuration.
    ///
    /// The timeout applies to connection establishment only; an open
    /// stream is never cut off by the client.
    pub fn new(config: UpstreamConfig, api_key: String) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url(),
            self.config.model
        )
    }

    /// Initiate one streaming generation call with the given turns.
    ///
    /// A non-2xx status is an initiation failure: the error body is read
    /// and surfaced before any fragment is produced. After a 2xx, failures
    /// only appear as stream items.
    async fn start_stream(&self, contents: Vec<Content>) -> Result<FragmentStream, UpstreamError> {
        let body = GenerateContentRequest::new(contents, &self.config.safety);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(body) => body.error.message,
                Err(_) => text,
            };
            tracing::debug!(status = %status, message = %message, "Upstream rejected generation call");
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut decoder = SseDecoder::new();
        let fragments = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => Ok(decoder.push(&bytes)),
                Err(e) => Err(UpstreamError::Http(e)),
            })
            .flat_map(|result| match result {
                Ok(items) => stream::iter(items),
                Err(e) => stream::iter(vec![Err(e)]),
            })
            .boxed();

        Ok(fragments)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn stream_generate(&self, prompt: &str) -> Result<FragmentStream, UpstreamError> {
        self.start_stream(vec![Content::user(prompt)]).await
    }

    async fn stream_chat(
        &self,
        prior: Vec<Content>,
        message: &str,
    ) -> Result<FragmentStream, UpstreamError> {
        let mut contents = prior;
        contents.push(Content::user(message));
        self.start_stream(contents).await
    }
}

/// Incremental SSE decoder.
///
/// Keeps the trailing partial line between pushes as raw bytes; transport
/// chunks can split anywhere, including inside a multi-byte character, so
/// UTF-8 decoding happens only on complete lines. Complete `data:` lines
/// decode to one fragment each. Other SSE framing (blank lines, comments)
/// carries nothing for this API and is dropped.
struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn push(&mut self, bytes: &[u8]) -> Vec<Result<Fragment, UpstreamError>> {
        self.buf.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(newline) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };

            match serde_json::from_str::<GenerateContentChunk>(data) {
                Ok(chunk) => out.push(Ok(chunk.into_fragment())),
                Err(e) => {
                    out.push(Err(UpstreamError::Decode(format!(
                        "bad event payload: {}",
                        e
                    ))));
                }
            }
        }

        out
    }
}
