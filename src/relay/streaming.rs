//! Fragment-to-response streaming
//!
//! Copies upstream fragments into the outbound HTTP body as they arrive.
//! The client observes output growing incrementally; nothing is buffered
//! beyond the channel backing the body. Once the 200 and headers are out,
//! a later upstream failure can only truncate the body, never change the
//! status, so the relay's job on any exit path is the same: stop pulling
//! and close the sink exactly once.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use std::convert::Infallible;

use crate::upstream::{Fragment, FragmentStream};

/// The response body is no longer accepting writes.
#[derive(Debug)]
pub struct SinkClosed;

/// Outbound response body, reduced to the two things the relay needs.
///
/// `close` must be idempotent: the relay closes on every exit path, and an
/// error path may already have closed before it.
#[async_trait]
pub trait ResponseSink: Send {
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed>;
    fn close(&mut self);
}

/// Sink feeding the channel that backs a streaming [`Body`].
///
/// Dropping the sender is what terminates the body, so `close` takes it;
/// a second close finds nothing and is a no-op.
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Result<Bytes, Infallible>>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Result<Bytes, Infallible>>) -> Self {
        Self { tx: Some(tx) }
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        match self.tx.as_mut() {
            Some(tx) => match tx.send(Ok(chunk)).await {
                Ok(()) => Ok(()),
                Err(_) => {
                    // Receiver gone: the client disconnected.
                    self.tx = None;
                    Err(SinkClosed)
                }
            },
            None => Err(SinkClosed),
        }
    }

    fn close(&mut self) {
        self.tx = None;
    }
}

/// Copy fragments to the sink in yield order.
///
/// Text fragments are written immediately; textless fragments are skipped.
/// Consumption stops on the first stream error or failed write, and the
/// sink is closed on every exit path. The next fragment is not pulled
/// until the current write completes, so a slow or disconnected client
/// naturally stops the upstream pull.
pub async fn relay(sink: &mut dyn ResponseSink, mut fragments: FragmentStream) {
    while let Some(item) = fragments.next().await {
        match item {
            Ok(Fragment::Text(text)) => {
                if sink.write(Bytes::from(text)).await.is_err() {
                    tracing::debug!("Client disconnected, releasing upstream stream");
                    break;
                }
            }
            Ok(Fragment::Empty) => continue,
            Err(e) => {
                // Headers already went out; the truncated body is all the
                // client can observe of this failure.
                tracing::error!(error = %e, "Upstream stream failed mid-response");
                break;
            }
        }
    }

    sink.close();
}

/// Build the streaming 200 response for an accepted generation call.
///
/// Content type is set once, before any body bytes. The relay loop runs in
/// its own task and owns the upstream stream for the rest of the request.
pub fn streamed_response(fragments: FragmentStream) -> Response {
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(16);

    tokio::spawn(async move {
        let mut sink = ChannelSink::new(tx);
        relay(&mut sink, fragments).await;
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(rx))
        .unwrap()
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::UpstreamError;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// In-memory sink recording writes and close calls.
    struct RecordingSink {
        written: Vec<u8>,
        closes: usize,
        reject_writes: bool,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                written: Vec::new(),
                closes: 0,
                reject_writes: false,
            }
        }
    }

    #[async_trait]
    impl ResponseSink for RecordingSink {
        async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
            if self.reject_writes {
                return Err(SinkClosed);
            }
            self.written.extend_from_slice(&chunk);
            Ok(())
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }

    fn fragments(items: Vec<Result<Fragment, UpstreamError>>) -> FragmentStream {
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn test_relay_concatenates_in_order() {
        let mut sink = RecordingSink::new();
        relay(
            &mut sink,
            fragments(vec![
                Ok(Fragment::Text("The sun ".to_string())),
                Ok(Fragment::Text("is a star.".to_string())),
            ]),
        )
        .await;

        assert_eq!(sink.written, b"The sun is a star.");
        assert_eq!(sink.closes, 1);
    }

    #[tokio::test]
    async fn test_relay_skips_textless_fragments() {
        let mut sink = RecordingSink::new();
        relay(
            &mut sink,
            fragments(vec![
                Ok(Fragment::Text("a".to_string())),
                Ok(Fragment::Empty),
                Ok(Fragment::Text("b".to_string())),
            ]),
        )
        .await;

        assert_eq!(sink.written, b"ab");
        assert_eq!(sink.closes, 1);
    }

    #[tokio::test]
    async fn test_relay_empty_stream_still_closes_once() {
        let mut sink = RecordingSink::new();
        relay(&mut sink, fragments(vec![])).await;

        assert!(sink.written.is_empty());
        assert_eq!(sink.closes, 1);
    }

    #[tokio::test]
    async fn test_relay_mid_stream_failure_truncates_and_closes_once() {
        let mut sink = RecordingSink::new();
        relay(
            &mut sink,
            fragments(vec![
                Ok(Fragment::Text("partial ".to_string())),
                Err(UpstreamError::Api {
                    status: 500,
                    message: "internal".to_string(),
                }),
                Ok(Fragment::Text("never sent".to_string())),
            ]),
        )
        .await;

        assert_eq!(sink.written, b"partial ");
        assert_eq!(sink.closes, 1);
    }

    #[tokio::test]
    async fn test_relay_stops_pulling_after_client_disconnect() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let pulled_clone = pulled.clone();

        let counted = stream::iter(vec![
            Ok(Fragment::Text("a".to_string())),
            Ok(Fragment::Text("b".to_string())),
            Ok(Fragment::Text("c".to_string())),
        ])
        .inspect(move |_| {
            pulled_clone.fetch_add(1, Ordering::SeqCst);
        })
        .boxed();

        let mut sink = RecordingSink::new();
        sink.reject_writes = true;
        relay(&mut sink, counted).await;

        // First write fails, so only one fragment was ever pulled.
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
        assert!(sink.written.is_empty());
        assert_eq!(sink.closes, 1);
    }

    #[tokio::test]
    async fn test_double_close_is_noop() {
        let mut sink = RecordingSink::new();
        relay(
            &mut sink,
            fragments(vec![Ok(Fragment::Text("body".to_string()))]),
        )
        .await;
        // A second close from an outer error path must not fault or
        // disturb what was written.
        sink.close();

        assert_eq!(sink.written, b"body");
        assert_eq!(sink.closes, 2);
    }

    #[tokio::test]
    async fn test_channel_sink_double_close_is_noop() {
        let (tx, mut rx) = mpsc::channel::<Result<Bytes, Infallible>>(4);
        let mut sink = ChannelSink::new(tx);

        sink.write(Bytes::from_static(b"x")).await.unwrap();
        sink.close();
        sink.close();

        assert_eq!(rx.next().await.unwrap().unwrap(), Bytes::from_static(b"x"));
        // Sender dropped on first close; the channel terminates cleanly.
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_channel_sink_write_after_close_fails() {
        let (tx, _rx) = mpsc::channel::<Result<Bytes, Infallible>>(4);
        let mut sink = ChannelSink::new(tx);
        sink.close();

        assert!(sink.write(Bytes::from_static(b"x")).await.is_err());
    }
}
