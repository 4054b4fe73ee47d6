//! Line-delimited stdio transport.
//!
//! Frames are separated by a single `\n`; a `\r` immediately preceding it is
//! tolerated on input and stripped, but never emitted. Partial bytes left
//! over at EOF (no terminating `\n` ever arrived) are discarded rather than
//! surfaced as a frame or an error. Concurrent writers are serialized behind
//! a `tokio::sync::Mutex` around the write half, since writes cross an
//! `.await` boundary and must not interleave mid-frame.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use turbomcp_core::{Error, ErrorKind, Result};
use turbomcp_protocol::jsonrpc::{self, JsonRpcMessage};

use crate::traits::{Transport, TransportState};

/// A duplex stdio transport generic over its underlying byte streams so
/// tests can substitute in-memory pipes instead of real stdin/stdout.
pub struct StdioTransport<R, W> {
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
    state: std::sync::atomic::AtomicU8,
}

const CONNECTED: u8 = 0;
const DISCONNECTED: u8 = 1;

impl<R, W> StdioTransport<R, W>
where
    R: tokio::io::AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(read_half: R, write_half: W) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(read_half)),
            writer: Mutex::new(write_half),
            state: std::sync::atomic::AtomicU8::new(CONNECTED),
        }
    }

    fn mark_disconnected(&self) {
        self.state
            .store(DISCONNECTED, std::sync::atomic::Ordering::SeqCst);
    }
}

impl StdioTransport<tokio::io::Stdin, tokio::io::Stdout> {
    /// The transport an MCP server typically runs over: process stdin/stdout.
    pub fn standard() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

/// Strip exactly one trailing `\n`, then one trailing `\r` if still present.
fn strip_line_ending(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
    }
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

/// Reject frames that would corrupt line-delimited framing: a literal `\n`
/// or `\r` byte in the serialized output (as opposed to an *escaped* `\n`
/// inside a JSON string, which `serde_json` already renders as the two
/// characters `\` and `n` and is therefore harmless here).
fn has_embedded_newline(serialized: &str) -> bool {
    serialized.contains('\n') || serialized.contains('\r')
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: tokio::io::AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn transport_type(&self) -> &'static str {
        "stdio"
    }

    fn state(&self) -> TransportState {
        match self.state.load(std::sync::atomic::Ordering::SeqCst) {
            CONNECTED => TransportState::Connected,
            _ => TransportState::Disconnected,
        }
    }

    #[tracing::instrument(level = "debug", skip(self, message))]
    async fn send(&self, message: &JsonRpcMessage) -> Result<()> {
        let serialized = jsonrpc::serialize_message(message)?;
        if has_embedded_newline(&serialized) {
            return Err(Error::new(ErrorKind::Internal(
                "serialized frame contains an embedded literal newline".into(),
            )));
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(serialized.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn receive(&self) -> Result<Option<JsonRpcMessage>> {
        let mut reader = self.reader.lock().await;
        loop {
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                self.mark_disconnected();
                return Ok(None);
            }
            if !line.ends_with('\n') {
                // Partial frame at EOF: discard per spec, do not surface.
                tracing::debug!("discarding partial frame at EOF");
                self.mark_disconnected();
                return Ok(None);
            }
            let frame = strip_line_ending(line);
            if frame.is_empty() {
                // Blank lines between frames are not themselves frames.
                continue;
            }
            return match jsonrpc::parse_message(&frame) {
                Ok(msg) => Ok(Some(msg)),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to parse stdio frame");
                    Err(err)
                }
            };
        }
    }

    async fn close(&self) -> Result<()> {
        self.mark_disconnected();
        let mut writer = self.writer.lock().await;
        writer.shutdown().await.ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbomcp_core::RequestId;
    use turbomcp_protocol::jsonrpc::JsonRpcRequest;

    fn make_transport(input: &str) -> StdioTransport<std::io::Cursor<Vec<u8>>, Vec<u8>> {
        StdioTransport::new(std::io::Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[tokio::test]
    async fn reads_one_frame_per_line() {
        let t = make_transport("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
        let msg = t.receive().await.unwrap().unwrap();
        assert_eq!(msg.id(), Some(&RequestId::number(1)));
        assert!(t.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn strips_trailing_cr() {
        let t = make_transport("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\r\n");
        let msg = t.receive().await.unwrap().unwrap();
        assert_eq!(msg.id(), Some(&RequestId::number(1)));
    }

    #[tokio::test]
    async fn discards_partial_frame_at_eof() {
        let t = make_transport("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}");
        assert!(t.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn send_appends_exactly_one_newline() {
        let t = make_transport("");
        let req = JsonRpcRequest::new(RequestId::number(1), "ping", None);
        t.send(&JsonRpcMessage::Request(req)).await.unwrap();
        let written = t.writer.into_inner();
        assert_eq!(written.iter().filter(|&&b| b == b'\n').count(), 1);
        assert!(written.ends_with(b"\n"));
    }

    #[test]
    fn escaped_newline_inside_json_string_is_not_embedded_newline() {
        let serialized = r#"{"jsonrpc":"2.0","id":"1","result":{"text":"line1\nline2"}}"#;
        assert!(!has_embedded_newline(serialized));
    }

    #[test]
    fn literal_newline_byte_is_rejected() {
        let serialized = "{\"jsonrpc\":\"2.0\"}\nextra";
        assert!(has_embedded_newline(serialized));
    }

    proptest::proptest! {
        #[test]
        fn fragmented_read_still_yields_one_frame(split_at in 1usize..40) {
            let frame = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n";
            if split_at < frame.len() {
                let (first, second) = frame.split_at(split_at);
                let combined = format!("{first}{second}");
                let t = make_transport(&combined);
                let msg = tokio_test::block_on(t.receive()).unwrap().unwrap();
                prop_assert_eq!(msg.method(), Some("ping"));
            }
        }
    }
}
