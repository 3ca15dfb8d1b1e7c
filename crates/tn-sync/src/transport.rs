//! Broadcast transport
//!
//! The host exposes a persistent event stream per named channel at
//! `GET /es/broadcast/subscribe?channel=<name>`; each event's `data` payload
//! is one JSON broadcast message. Publishing posts the same JSON back to the
//! mirrored `/es/broadcast/publish` path.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::error::SyncError;

/// Wire seam for the refresh-broadcast channel
///
/// Implementations deliver raw event payload strings; message parsing and
/// filtering happen in the client.
#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    /// Open a persistent subscription to the named channel
    ///
    /// The receiver yields one string per event. It closes when the
    /// subscription is irrecoverably lost.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, SyncError>;

    /// Send a payload to every subscriber of the named channel
    async fn publish(&self, channel: &str, payload: String) -> Result<(), SyncError>;
}

/// Server-sent-events transport over the host's HTTP API
pub struct SseTransport {
    client: reqwest::Client,
    base_url: String,
    max_consecutive_failures: u32,
}

impl SseTransport {
    /// Capacity of the decoded-event channel handed to subscribers
    const EVENT_BUFFER: usize = 64;

    /// Create a transport against the host at `base_url` (no trailing slash)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            max_consecutive_failures: 5,
        }
    }

    /// Override how many consecutive reconnect failures are tolerated before
    /// the subscription is abandoned
    #[inline]
    #[must_use]
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    fn subscribe_url(&self, channel: &str) -> String {
        format!("{}/es/broadcast/subscribe?channel={channel}", self.base_url)
    }

    fn publish_url(&self, channel: &str) -> String {
        format!("{}/es/broadcast/publish?channel={channel}", self.base_url)
    }

    async fn open_stream(&self, url: &str) -> Result<reqwest::Response, SyncError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response)
    }

    /// Pump one opened stream into the channel; returns when the stream ends
    async fn pump(
        response: reqwest::Response,
        decoder: &mut SseDecoder,
        tx: &mpsc::Sender<String>,
    ) -> Result<(), SyncError> {
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                if tx.send(event).await.is_err() {
                    // subscriber dropped the receiver; stop pumping
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BroadcastTransport for SseTransport {
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, SyncError> {
        let url = self.subscribe_url(channel);
        // surface the initial connection failure to the caller; reconnects
        // after that are best-effort
        let first = self.open_stream(&url).await?;
        tracing::info!(channel, "broadcast subscription opened");

        let (tx, rx) = mpsc::channel(Self::EVENT_BUFFER);
        let client = self.client.clone();
        let max_failures = self.max_consecutive_failures;
        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();
            let mut response = Some(first);
            let mut failures: u32 = 0;

            loop {
                if let Some(stream) = response.take() {
                    match Self::pump(stream, &mut decoder, &tx).await {
                        Ok(()) => {}
                        Err(err) => tracing::debug!(%err, "broadcast stream interrupted"),
                    }
                    if tx.is_closed() {
                        return;
                    }
                    failures = 0;
                }

                // reconnect with capped exponential backoff
                let delay = Duration::from_secs(1 << failures.min(5));
                tokio::time::sleep(delay).await;
                match client.get(&url).send().await.and_then(reqwest::Response::error_for_status) {
                    Ok(reopened) => {
                        tracing::info!(%url, "broadcast subscription reopened");
                        response = Some(reopened);
                    }
                    Err(err) => {
                        failures += 1;
                        if failures >= max_failures {
                            tracing::warn!(
                                %err,
                                failures,
                                "broadcast subscription lost, continuing in local-only mode"
                            );
                            return;
                        }
                        tracing::debug!(%err, failures, "broadcast reconnect failed");
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<(), SyncError> {
        self.client
            .post(self.publish_url(channel))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Incremental `text/event-stream` decoder
///
/// Collects `data:` lines and emits one joined payload per blank-line event
/// boundary. Comment lines and non-`data` fields are ignored; CRLF line
/// endings are tolerated.
#[derive(Debug, Default)]
struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed a chunk of bytes; returns every event completed by it
    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let mut line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            } else if !line.starts_with(':') {
                // event/id/retry fields are irrelevant for this channel
                tracing::trace!(line = %line, "ignoring non-data SSE field");
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decoder_emits_on_blank_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: {\"sid\":\"a\"}\n").is_empty());
        assert_eq!(decoder.feed(b"\n"), vec!["{\"sid\":\"a\"}".to_string()]);
    }

    #[test]
    fn decoder_joins_multi_line_data() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"data: line one\ndata: line two\n\n");
        assert_eq!(events, vec!["line one\nline two".to_string()]);
    }

    #[test]
    fn decoder_ignores_comments_and_other_fields() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b": keepalive\nevent: message\nid: 7\ndata: x\n\n");
        assert_eq!(events, vec!["x".to_string()]);
    }

    #[test]
    fn decoder_handles_crlf_and_split_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: par").is_empty());
        assert!(decoder.feed(b"tial\r\n").is_empty());
        assert_eq!(decoder.feed(b"\r\n"), vec!["partial".to_string()]);
    }

    #[test]
    fn decoder_data_without_space() {
        let mut decoder = SseDecoder::default();
        assert_eq!(decoder.feed(b"data:tight\n\n"), vec!["tight".to_string()]);
    }

    #[test]
    fn blank_lines_without_data_emit_nothing() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"\n\n: ping\n\n").is_empty());
    }

    #[test]
    fn transport_urls() {
        let transport = SseTransport::new("http://127.0.0.1:6806");
        assert_eq!(
            transport.subscribe_url("task-note-sync"),
            "http://127.0.0.1:6806/es/broadcast/subscribe?channel=task-note-sync"
        );
        assert_eq!(
            transport.publish_url("task-note-sync"),
            "http://127.0.0.1:6806/es/broadcast/publish?channel=task-note-sync"
        );
    }
}
