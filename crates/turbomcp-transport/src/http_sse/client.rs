//! Client side of the HTTP+SSE transport.
//!
//! Opens a long-lived GET to the SSE endpoint, reads the first `endpoint`
//! event to learn the session-scoped POST URL, then streams `message`
//! events into an inbound queue while POSTing outbound frames to that URL.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use tokio::sync::{mpsc, Mutex};
use turbomcp_core::{Error, ErrorKind, Result};
use turbomcp_protocol::jsonrpc::{self, JsonRpcMessage};

use crate::traits::{Transport, TransportState};

/// Client-side configuration, mirroring the shape of a production streaming
/// HTTP client: base URL, retry policy for the long-lived GET, timeouts.
#[derive(Debug, Clone)]
pub struct SseClientConfig {
    pub sse_url: String,
    pub connect_timeout: std::time::Duration,
    pub max_retries: u32,
}

impl Default for SseClientConfig {
    fn default() -> Self {
        Self {
            sse_url: String::new(),
            connect_timeout: std::time::Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

/// The client's half of one HTTP+SSE session.
pub struct SseClientTransport {
    http: reqwest::Client,
    message_endpoint: Mutex<Option<String>>,
    inbound_rx: Mutex<mpsc::Receiver<JsonRpcMessage>>,
    state: std::sync::atomic::AtomicU8,
}

impl SseClientTransport {
    /// Connect the SSE stream and block until the `endpoint` event arrives,
    /// learning the POST URL this session must use.
    pub async fn connect(config: SseClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::new(ErrorKind::TransportClosed).with_source(e))?;

        let response = http
            .get(&config.sse_url)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| Error::new(ErrorKind::TransportClosed).with_source(e))?;

        let mut events = response.bytes_stream().eventsource();
        let (inbound_tx, inbound_rx) = mpsc::channel(256);

        let first = loop {
            match events.next().await {
                Some(Ok(event)) if event.event == "endpoint" => break event.data,
                Some(Ok(_)) => continue, // keep-alive comments and the like
                Some(Err(e)) => {
                    return Err(Error::new(ErrorKind::TransportClosed).with_source(e))
                }
                None => return Err(Error::new(ErrorKind::TransportClosed)),
            }
        };

        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    Ok(evt) if evt.event == "message" => {
                        match jsonrpc::parse_message(&evt.data) {
                            Ok(msg) => {
                                if inbound_tx.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => tracing::warn!(error = %err, "bad SSE message frame"),
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "SSE stream ended");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            http,
            message_endpoint: Mutex::new(Some(first)),
            inbound_rx: Mutex::new(inbound_rx),
            state: std::sync::atomic::AtomicU8::new(0),
        })
    }
}

#[async_trait]
impl Transport for SseClientTransport {
    fn transport_type(&self) -> &'static str {
        "http+sse"
    }

    fn state(&self) -> TransportState {
        match self.state.load(std::sync::atomic::Ordering::SeqCst) {
            0 => TransportState::Connected,
            _ => TransportState::Disconnected,
        }
    }

    async fn send(&self, message: &JsonRpcMessage) -> Result<()> {
        let endpoint = self.message_endpoint.lock().await.clone().ok_or_else(|| {
            Error::new(ErrorKind::TransportClosed)
        })?;
        let body = jsonrpc::serialize_message(message)?;
        let response = self
            .http
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::new(ErrorKind::TransportClosed).with_source(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            self.state
                .store(1, std::sync::atomic::Ordering::SeqCst);
            return Err(Error::new(ErrorKind::TransportClosed));
        }
        if !response.status().is_success() {
            return Err(Error::new(ErrorKind::Internal(format!(
                "POST rejected with status {}",
                response.status()
            ))));
        }
        Ok(())
    }

    async fn receive(&self) -> Result<Option<JsonRpcMessage>> {
        let mut rx = self.inbound_rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn close(&self) -> Result<()> {
        self.state
            .store(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
