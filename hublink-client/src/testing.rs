//! Local hub fixtures for tests.

use crate::error::TransportError;
use crate::transport::{Transport, TransportParams, TransportRegistry, TransportState};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use hublink_protocol::{Message, WEBSOCKETS_TRANSPORT};
use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

pub const HANDSHAKE_REQUEST: &str = "{\"protocol\":\"json\",\"version\":1}\u{1e}";
pub const HANDSHAKE_OK: &str = "{}\u{1e}";

pub type HubSocket = WebSocketStream<TcpStream>;

/// Reads the next text frame from the peer.
pub async fn recv_text(ws: &mut HubSocket) -> String {
    loop {
        match ws.next().await {
            Some(Ok(WsMessage::Text(text))) => return text.as_str().to_string(),
            Some(Ok(WsMessage::Binary(data))) => {
                return String::from_utf8(data.to_vec()).unwrap();
            }
            Some(Ok(WsMessage::Close(_))) | None => panic!("peer closed"),
            Some(Ok(_)) => continue,
            Some(Err(e)) => panic!("socket error: {}", e),
        }
    }
}

pub async fn send_text(ws: &mut HubSocket, text: &str) {
    ws.send(WsMessage::text(text.to_string())).await.unwrap();
}

/// Accepts one WebSocket connection, answers the handshake with `reply`
/// and hands the socket to `script`. Resolves to the request path+query.
async fn serve_hub<F, Fut>(tcp: TcpStream, reply: &str, script: F) -> String
where
    F: FnOnce(HubSocket) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut target = String::new();
    let mut ws = tokio_tungstenite::accept_hdr_async(tcp, |req: &Request, resp: Response| {
        target = req.uri().to_string();
        Ok::<_, ErrorResponse>(resp)
    })
    .await
    .unwrap();

    assert_eq!(recv_text(&mut ws).await, HANDSHAKE_REQUEST);
    send_text(&mut ws, reply).await;
    script(ws).await;
    target
}

/// Starts a single-connection hub on 127.0.0.1.
pub async fn spawn_hub<F, Fut>(reply: &'static str, script: F) -> (SocketAddr, JoinHandle<String>)
where
    F: FnOnce(HubSocket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        serve_hub(tcp, reply, script).await
    });
    (addr, handle)
}

/// Answers one HTTP request with `status` and a JSON `body`.
/// Returns the request head.
async fn serve_http(tcp: TcpStream, status: u16, body: &str) -> String {
    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    serve_raw_http(tcp, &response).await
}

/// Reads one HTTP request head and writes `response` verbatim.
async fn serve_raw_http(mut tcp: TcpStream, response: &str) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = tcp.read(&mut buf).await.unwrap();
        assert!(n > 0, "client hung up before sending a request");
        head.extend_from_slice(&buf[..n]);
    }

    tcp.write_all(response.as_bytes()).await.unwrap();
    tcp.shutdown().await.unwrap();
    String::from_utf8_lossy(&head).into_owned()
}

/// Starts a one-shot HTTP endpoint that replies with raw `response` bytes.
pub async fn spawn_raw_http(response: &'static str) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        serve_raw_http(tcp, response).await
    });
    (addr, handle)
}

/// Starts a negotiate-only endpoint on 127.0.0.1.
pub async fn spawn_negotiate(
    status: u16,
    body: &'static str,
) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        serve_http(tcp, status, body).await
    });
    (addr, handle)
}

/// Starts a server answering negotiate, then one hub connection.
/// Resolves to the negotiate request head and the socket path+query.
pub async fn spawn_server<F, Fut>(
    negotiate_body: &'static str,
    script: F,
) -> (SocketAddr, JoinHandle<(String, String)>)
where
    F: FnOnce(HubSocket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let head = serve_http(tcp, 200, negotiate_body).await;
        let (tcp, _) = listener.accept().await.unwrap();
        let target = serve_hub(tcp, HANDSHAKE_OK, script).await;
        (head, target)
    });
    (addr, handle)
}

/// Shared state behind a [`MockTransport`].
#[derive(Default)]
pub struct MockWire {
    pub sent: Vec<Message>,
    pub incoming: VecDeque<Result<Vec<Message>, TransportError>>,
    pub connected: bool,
    pub created: usize,
    pub closes: usize,
    pub fail_connect: bool,
}

pub type SharedWire = Arc<Mutex<MockWire>>;

/// In-memory transport that records sends and replays queued frames.
pub struct MockTransport {
    wire: SharedWire,
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        WEBSOCKETS_TRANSPORT
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut wire = self.wire.lock().unwrap();
        if wire.fail_connect {
            return Err(TransportError::HandshakeRejected("mock".to_string()));
        }
        wire.connected = true;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<Message>, TransportError> {
        let mut wire = self.wire.lock().unwrap();
        match wire.incoming.pop_front() {
            Some(frame) => frame,
            None => {
                wire.connected = false;
                Err(TransportError::ConnectionClosed)
            }
        }
    }

    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let mut wire = self.wire.lock().unwrap();
        if !wire.connected {
            return Err(TransportError::NotConnected);
        }
        wire.sent.push(message.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.wire.lock().unwrap().connected
    }

    fn state(&self) -> TransportState {
        if self.is_connected() {
            TransportState::Connected
        } else {
            TransportState::Closed
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let mut wire = self.wire.lock().unwrap();
        wire.connected = false;
        wire.closes += 1;
        Ok(())
    }
}

/// Registry whose "WebSockets" entry builds mock transports on `wire`.
pub fn mock_registry(wire: &SharedWire) -> TransportRegistry {
    let wire = wire.clone();
    let mut registry = TransportRegistry::new();
    registry.register(WEBSOCKETS_TRANSPORT, move |_params: TransportParams| {
        wire.lock().unwrap().created += 1;
        Box::new(MockTransport { wire: wire.clone() }) as Box<dyn Transport>
    });
    registry
}
