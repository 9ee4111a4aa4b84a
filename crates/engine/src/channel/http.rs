//! NDJSON event stream transport.
//!
//! The backend holds a long-lived HTTP response open and writes one
//! `{"event": ..., "data": ...}` envelope per line. Each decoded event is
//! published into an [`EventHub`].

use std::time::Duration;

use futures::StreamExt;
use storefront_sync_core::PushEvent;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::EventHub;
use crate::error::report;
use crate::remote::RemoteError;

/// Delay between a dropped stream and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Longest line accepted from the stream. A longer pending line fails the
/// connection, which then reconnects.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Owns the background stream task. Dropping it stops the task.
#[derive(Debug)]
pub struct EventStreamHandle {
    task: JoinHandle<()>,
}

impl EventStreamHandle {
    /// Stop the stream task.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Whether the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for EventStreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Connect to `url` in the background and publish every event into `hub`.
///
/// The connection is re-established after [`RECONNECT_DELAY`] whenever it
/// ends or fails. `client` should not carry a total request timeout, since the
/// response is expected to stay open indefinitely.
#[must_use]
pub fn spawn_event_stream(client: reqwest::Client, url: Url, hub: EventHub) -> EventStreamHandle {
    let task = tokio::spawn(async move {
        loop {
            match stream_once(&client, &url, &hub).await {
                Ok(published) => info!(published, "Event stream closed by server"),
                Err(e) => report("event stream", &e),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    });
    EventStreamHandle { task }
}

/// Read one connection to completion. Returns how many events were published.
#[instrument(skip(client, hub), fields(url = %url))]
async fn stream_once(
    client: &reqwest::Client,
    url: &Url,
    hub: &EventHub,
) -> Result<usize, RemoteError> {
    let response = client
        .get(url.clone())
        .header(reqwest::header::ACCEPT, "application/x-ndjson")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(RemoteError::Api {
            status: status.as_u16(),
            message,
        });
    }
    info!("Event stream connected");

    let mut body = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut published = 0;

    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
        for line in drain_lines(&mut buffer) {
            if let Some(event) = decode_line(&line) {
                hub.publish(event);
                published += 1;
            }
        }
        check_pending(&buffer)?;
    }

    if let Some(event) = decode_line(&buffer) {
        hub.publish(event);
        published += 1;
    }

    Ok(published)
}

/// Remove every complete line from the front of `buffer`.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let mut line: Vec<u8> = buffer.drain(..=pos).collect();
        line.pop();
        lines.push(line);
    }
    lines
}

/// Reject a partial line that has outgrown [`MAX_LINE_BYTES`].
fn check_pending(buffer: &[u8]) -> Result<(), RemoteError> {
    if buffer.len() > MAX_LINE_BYTES {
        return Err(RemoteError::Parse(format!(
            "event line exceeds {MAX_LINE_BYTES} bytes without a newline"
        )));
    }
    Ok(())
}

/// Decode one line. Blank and malformed lines yield `None`.
fn decode_line(line: &[u8]) -> Option<PushEvent> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_slice(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "Skipping malformed event line");
            debug!(line = %String::from_utf8_lossy(line), "Malformed event line");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storefront_sync_core::ProductId;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::channel::PushChannel;

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buffer = b"one\ntwo\r\nthr".to_vec();
        let lines = drain_lines(&mut buffer);
        assert_eq!(lines, vec![b"one".to_vec(), b"two\r".to_vec()]);
        assert_eq!(buffer, b"thr".to_vec());
    }

    #[test]
    fn test_decode_line_skips_blank_and_garbage() {
        assert!(decode_line(b"   \r").is_none());
        assert!(decode_line(b"{\"event\":\"nope\"}").is_none());
        assert_eq!(
            decode_line(br#"{"event":"product_deleted","data":"p1"}"#),
            Some(PushEvent::ProductDeleted(ProductId::new("p1")))
        );
    }

    /// Serve one NDJSON response with `body`, then close. Returns the stream URL.
    async fn serve_once(body: Vec<u8>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            // The client may hang up early once it rejects the body.
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });

        Url::parse(&format!("http://{addr}/events")).unwrap()
    }

    #[test]
    fn test_check_pending_caps_line_length() {
        assert!(check_pending(&vec![b'x'; MAX_LINE_BYTES]).is_ok());
        assert!(matches!(
            check_pending(&vec![b'x'; MAX_LINE_BYTES + 1]),
            Err(RemoteError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_publishes_each_line() {
        let body = concat!(
            "{\"event\":\"product_deleted\",\"data\":\"p1\"}\n",
            "garbage\n",
            "{\"event\":\"stock_updated\",\"data\":{\"productId\":\"p2\",\"size\":\"S\",\"newStock\":4}}\n",
        );
        let url = serve_once(body.as_bytes().to_vec()).await;

        let hub = EventHub::default();
        let mut sub = hub.subscribe();
        let _handle = spawn_event_stream(reqwest::Client::new(), url, hub.clone());

        assert_eq!(
            sub.recv().await,
            Some(PushEvent::ProductDeleted(ProductId::new("p1")))
        );
        assert_eq!(
            sub.recv().await,
            Some(PushEvent::StockUpdated {
                product_id: ProductId::new("p2"),
                size: "S".to_string(),
                new_stock: 4,
            })
        );
    }

    #[tokio::test]
    async fn test_endless_line_fails_connection() {
        let mut body = b"{\"event\":\"product_deleted\",\"data\":\"p1\"}\n".to_vec();
        body.resize(body.len() + MAX_LINE_BYTES + 1, b' ');
        let url = serve_once(body).await;

        let hub = EventHub::default();
        let mut sub = hub.subscribe();
        let result = stream_once(&reqwest::Client::new(), &url, &hub).await;

        assert!(matches!(result, Err(RemoteError::Parse(_))));
        // Lines before the oversized one were still delivered.
        assert_eq!(
            sub.recv().await,
            Some(PushEvent::ProductDeleted(ProductId::new("p1")))
        );
    }

    #[tokio::test]
    async fn test_abort_stops_task() {
        let url = Url::parse("http://127.0.0.1:9/events").unwrap();
        let handle = spawn_event_stream(reqwest::Client::new(), url, EventHub::default());
        handle.abort();

        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
