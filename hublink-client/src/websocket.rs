//! WebSocket transport.

use crate::endpoint;
use crate::error::TransportError;
use crate::tls::create_tls_config;
use crate::transport::{Transport, TransportParams, TransportState};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use hublink_protocol::{
    Decoder, Encoder, HandshakeRequest, Message, PROTOCOL_NAME, WEBSOCKETS_TRANSPORT,
};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Hub transport over a single WebSocket.
pub struct WebSocketTransport {
    params: TransportParams,
    stream: Option<WsStream>,
    state: TransportState,
    /// Records that arrived in the handshake frame behind the reply.
    pending: Vec<Message>,
}

impl WebSocketTransport {
    pub fn new(params: TransportParams) -> Self {
        Self {
            params,
            stream: None,
            state: TransportState::Unconnected,
            pending: Vec::new(),
        }
    }

    /// Returns the socket URL for this connection.
    pub fn socket_url(&self) -> Result<Url, TransportError> {
        endpoint::socket_url(&self.params.url, &self.params.connection_id)
            .map_err(TransportError::InvalidUrl)
    }

    async fn open(&mut self, url: &Url) -> Result<(), TransportError> {
        let connector = if url.scheme() == "wss" {
            if self.params.tls.insecure {
                tracing::warn!("TLS certificate verification disabled for {}", url);
            }
            Some(Connector::Rustls(create_tls_config(&self.params.tls)?))
        } else {
            None
        };

        let (stream, response) =
            tokio_tungstenite::connect_async_tls_with_config(url.as_str(), None, true, connector)
                .await?;
        tracing::debug!("WebSocket open to {} ({})", url, response.status());
        self.stream = Some(stream);

        self.state = TransportState::Handshaking;
        self.handshake().await
    }

    async fn handshake(&mut self) -> Result<(), TransportError> {
        let request = HandshakeRequest::default();
        self.write_text(Encoder::encode_text(&request)?).await?;

        let frame = self.read_frame().await?;
        let (reply, trailing) = Decoder::decode_handshake(&frame)?;
        if let Some(error) = reply.error {
            return Err(TransportError::HandshakeRejected(error));
        }
        if !reply.is_empty() {
            tracing::debug!("Ignoring extra handshake reply fields: {}", reply.body);
        }

        tracing::debug!(
            "Handshake complete (protocol {} v{})",
            PROTOCOL_NAME,
            request.version
        );
        self.pending = trailing;
        Ok(())
    }

    /// Reads the next data frame, skipping control frames.
    async fn read_frame(&mut self) -> Result<Bytes, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return Ok(Bytes::copy_from_slice(text.as_bytes()));
                }
                Some(Ok(WsMessage::Binary(data))) => return Ok(data),
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::debug!("Server closed the socket: {:?}", frame);
                    return Err(TransportError::ConnectionClosed);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(TransportError::ConnectionClosed),
            }
        }
    }

    async fn write_text(&mut self, text: String) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.send(WsMessage::text(text)).await?;
        Ok(())
    }

    fn drop_stream(&mut self) {
        self.stream = None;
        self.pending.clear();
        self.state = TransportState::Closed;
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn name(&self) -> &'static str {
        WEBSOCKETS_TRANSPORT
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let url = self.socket_url()?;
        tracing::debug!("Connecting to {}...", url);
        self.state = TransportState::Connecting;

        let limit = self.params.connect_timeout;
        match with_timeout(limit, self.open(&url)).await {
            Ok(()) => {
                self.state = TransportState::Connected;
                tracing::info!("Connected to {}", url);
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Connection to {} failed: {}", url, e);
                self.drop_stream();
                Err(e)
            }
        }
    }

    async fn receive(&mut self) -> Result<Vec<Message>, TransportError> {
        if !self.pending.is_empty() {
            return Ok(std::mem::take(&mut self.pending));
        }

        let limit = self.params.receive_timeout;
        let frame = match with_timeout(limit, self.read_frame()).await {
            Ok(frame) => frame,
            // The socket is still usable after a read deadline.
            Err(TransportError::Timeout) => return Err(TransportError::Timeout),
            Err(e) => {
                if self.stream.is_some() {
                    tracing::debug!("Receive failed, dropping socket: {}", e);
                    self.drop_stream();
                }
                return Err(e);
            }
        };

        tracing::trace!("Received frame of {} bytes", frame.len());
        Ok(Decoder::decode_frame(&frame)?)
    }

    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let text = Encoder::encode_text(message)?;
        if let Err(e) = self.write_text(text).await {
            if self.stream.is_some() {
                tracing::debug!("Send failed, dropping socket: {}", e);
                self.drop_stream();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Returns true while a socket is held.
    ///
    /// This does not probe the peer: a silently dropped connection still
    /// reports connected until the next send or receive fails.
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn state(&self) -> TransportState {
        self.state
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        self.state = TransportState::Closing;
        let result = stream.close(None).await;
        self.drop_stream();

        match result {
            Ok(()) => {}
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!("WebSocket closed");
        Ok(())
    }
}

async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match limit {
        Some(duration) => tokio::time::timeout(duration, fut)
            .await
            .map_err(|_| TransportError::Timeout)?,
        None => fut.await,
    }
}
