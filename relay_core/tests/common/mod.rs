#![allow(dead_code)]

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use relay_core::{RelayConfig, RelayState};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub state: Arc<RelayState>,
    pub url: String,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Spawn a relay on a random local port
pub async fn spawn_server(config: RelayConfig) -> TestServer {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let state = Arc::new(RelayState::new(config));
    let shutdown = CancellationToken::new();

    let serve_state = state.clone();
    let serve_shutdown = shutdown.clone();
    tokio::spawn(async move {
        relay_core::server::serve(listener, serve_state, serve_shutdown)
            .await
            .unwrap();
    });

    TestServer {
        state,
        url: format!("ws://{}/ws", addr),
        shutdown,
    }
}

pub struct Client {
    write: SplitSink<Socket, Message>,
    read: SplitStream<Socket>,
}

impl Client {
    pub async fn connect(server: &TestServer) -> Self {
        let (ws_stream, _) = connect_async(&server.url)
            .await
            .expect("Failed to connect");
        let (write, read) = ws_stream.split();
        Self { write, read }
    }

    pub async fn send(&mut self, msg: Value) {
        self.send_text(msg.to_string()).await;
    }

    pub async fn send_text(&mut self, text: String) {
        self.write.send(Message::Text(text.into())).await.unwrap();
    }

    /// Next JSON frame, skipping transport pings
    pub async fn recv(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match self.read.next().await {
                    Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    other => panic!("Unexpected frame: {:?}", other),
                }
            }
        })
        .await
        .expect("Timed out waiting for a frame")
    }

    /// Assert nothing arrives within `wait`
    pub async fn expect_silence(&mut self, wait: Duration) {
        if let Ok(Some(Ok(Message::Text(text)))) =
            tokio::time::timeout(wait, self.read.next()).await
        {
            panic!("Expected no frame, got {}", text);
        }
    }

    pub async fn next_raw(&mut self) -> Option<Message> {
        tokio::time::timeout(Duration::from_secs(2), self.read.next())
            .await
            .expect("Timed out waiting for a frame")
            .and_then(Result::ok)
    }

    /// Send a Close frame but keep the TCP stream open
    pub async fn send_close(&mut self) {
        self.write.send(Message::Close(None)).await.unwrap();
    }

    pub async fn close(mut self) {
        let _ = self.write.send(Message::Close(None)).await;
    }
}

/// Run the share-code handshake; returns (owner, requester, requester's
/// origin code as seen by the owner, owner's origin code as seen by the
/// requester)
pub async fn pair(server: &TestServer) -> (Client, Client, String, String) {
    let mut owner = Client::connect(server).await;
    let mut requester = Client::connect(server).await;

    owner.send(serde_json::json!({"event": "REQUEST_SHARE_CODE"})).await;
    let share = owner.recv().await["data"].clone();

    requester
        .send(serde_json::json!({"event": "CONNECTION_REQUEST", "destination": share}))
        .await;
    let ack = requester.recv().await;
    let requester_origin = ack["data"]["AssignedOriginCOde"].as_str().unwrap().to_string();
    owner.recv().await;

    owner
        .send(serde_json::json!({
            "event": "CONNECTION_ACCEPT",
            "destination": requester_origin,
            "data": {"files": []}
        }))
        .await;
    let accept = requester.recv().await;
    let owner_origin = accept["origin"].as_str().unwrap().to_string();

    (owner, requester, requester_origin, owner_origin)
}

/// Poll until `check` holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Condition not reached in time");
}
