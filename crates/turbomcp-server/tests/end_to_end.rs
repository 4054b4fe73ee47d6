//! End-to-end scenarios from the protocol core's testable properties:
//! the initialize handshake and a tool call with numeric arguments.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use turbomcp_core::Result;
use turbomcp_protocol::jsonrpc::{self, JsonRpcMessage};
use turbomcp_protocol::types::ToolDescriptor;
use turbomcp_server::builder::ServerBuilder;
use turbomcp_server::session::Session;
use turbomcp_transport::{Transport, TransportState};

/// An in-memory transport: `inbound` feeds what the dispatcher will
/// `receive`, `outbound` records what it `send`s, for assertions.
struct ChannelTransport {
    inbound: Mutex<mpsc::Receiver<JsonRpcMessage>>,
    outbound: mpsc::Sender<JsonRpcMessage>,
}

#[async_trait]
impl Transport for ChannelTransport {
    fn transport_type(&self) -> &'static str {
        "test"
    }
    fn state(&self) -> TransportState {
        TransportState::Connected
    }
    async fn send(&self, message: &JsonRpcMessage) -> Result<()> {
        let _ = self.outbound.send(message.clone()).await;
        Ok(())
    }
    async fn receive(&self) -> Result<Option<JsonRpcMessage>> {
        Ok(self.inbound.lock().await.recv().await)
    }
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn initialize_handshake_then_tool_call() {
    let dispatcher = ServerBuilder::new("demo", "0.1.0")
        .tool(
            ToolDescriptor::new(
                "add",
                json!({
                    "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                    "required": ["a", "b"]
                }),
            ),
            |args: serde_json::Value, _ctx| async move {
                let a = args["a"].as_i64().unwrap();
                let b = args["b"].as_i64().unwrap();
                Ok(turbomcp_protocol::types::ToolCallResult::text(format!(
                    "The sum is {}",
                    a + b
                )))
            },
        )
        .build();

    let (to_server_tx, to_server_rx) = mpsc::channel(8);
    let (from_server_tx, mut from_server_rx) = mpsc::channel(8);
    let transport: Arc<dyn Transport> = Arc::new(ChannelTransport {
        inbound: Mutex::new(to_server_rx),
        outbound: from_server_tx,
    });
    let session = Arc::new(Session::new(Default::default()));

    let run_handle = tokio::spawn({
        let dispatcher = dispatcher.clone();
        let transport = transport.clone();
        let session = session.clone();
        async move { dispatcher.run(transport, session).await }
    });

    let init = jsonrpc::parse_message(
        r#"{"jsonrpc":"2.0","id":"1","method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"X","version":"1"},"capabilities":{}}}"#,
    )
    .unwrap();
    to_server_tx.send(init).await.unwrap();

    let response = from_server_rx.recv().await.unwrap();
    match response {
        JsonRpcMessage::Response(r) => {
            assert_eq!(r.id, turbomcp_core::RequestId::string("1"));
            assert!(!r.is_error());
        }
        other => panic!("expected response, got {other:?}"),
    }

    let initialized = jsonrpc::parse_message(
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
    )
    .unwrap();
    to_server_tx.send(initialized).await.unwrap();

    // Give the notification a beat to land before issuing tools/call.
    tokio::task::yield_now().await;
    assert_eq!(session.state(), turbomcp_server::SessionState::Ready);

    let call = jsonrpc::parse_message(
        r#"{"jsonrpc":"2.0","id":"call-1","method":"tools/call","params":{"name":"add","arguments":{"a":5,"b":7}}}"#,
    )
    .unwrap();
    to_server_tx.send(call).await.unwrap();

    let response = from_server_rx.recv().await.unwrap();
    match response {
        JsonRpcMessage::Response(r) => {
            assert_eq!(r.id, turbomcp_core::RequestId::string("call-1"));
            let turbomcp_protocol::jsonrpc::JsonRpcResponsePayload::Result { result } = r.payload
            else {
                panic!("expected success result");
            };
            assert_eq!(result["content"][0]["text"], "The sum is 12");
            assert_eq!(result["isError"], false);
        }
        other => panic!("expected response, got {other:?}"),
    }

    drop(to_server_tx);
    run_handle.await.unwrap();
}
