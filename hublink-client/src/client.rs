//! High-level hub client.

use crate::callback::{handler_fn, CallbackRegistry, Handler, HandlerResult, EXIT_HOOK, PING_HOOK};
use crate::config::HubConfig;
use crate::endpoint;
use crate::error::ClientError;
use crate::negotiate;
use crate::shutdown::Shutdown;
use crate::transport::{Transport, TransportParams, TransportRegistry, TransportState};
use futures_util::future::BoxFuture;
use hublink_protocol::{Message, MessageType, NegotiateResponse};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Client for a single hub connection.
///
/// Owns the transport and the handler registry. All methods take
/// `&mut self`; handlers receive the client so they can reply.
pub struct HubClient {
    config: HubConfig,
    registry: TransportRegistry,
    callbacks: CallbackRegistry,
    transport: Option<Box<dyn Transport>>,
    /// State reported while no transport is held.
    idle_state: TransportState,
}

impl HubClient {
    /// Creates a client with the built-in transports and the ping auto-reply.
    pub fn new(config: HubConfig) -> Self {
        Self::with_registry(config, TransportRegistry::with_defaults())
    }

    /// Creates a client that picks transports from `registry`.
    pub fn with_registry(config: HubConfig, registry: TransportRegistry) -> Self {
        Self {
            config,
            registry,
            callbacks: CallbackRegistry::with_default_hooks(),
            transport: None,
            idle_state: TransportState::Unconnected,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Negotiates with the server and opens a transport.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        let negotiation = negotiate::negotiate(&self.config).await?;
        self.connect_transport(negotiation).await
    }

    /// Opens a transport for an already negotiated connection.
    ///
    /// The first transport offered by the server that the registry knows
    /// is used. Any previous transport is closed first.
    pub async fn connect_transport(
        &mut self,
        negotiation: NegotiateResponse,
    ) -> Result<(), ClientError> {
        let offered = negotiation.transport_names();
        let Some(name) = offered
            .iter()
            .copied()
            .find(|name| self.registry.contains(name))
        else {
            tracing::debug!(
                "No usable transport (offered {:?}, known {:?})",
                offered,
                self.registry.names()
            );
            return Err(ClientError::NoTransport {
                offered: offered.iter().map(|s| s.to_string()).collect(),
            });
        };

        let url =
            endpoint::hub_url(&self.config.url, &self.config.hub).map_err(ClientError::InvalidUrl)?;
        let params = TransportParams {
            url,
            connection_id: negotiation.socket_id().to_string(),
            tls: self.config.tls.clone(),
            connect_timeout: self.config.connect_timeout,
            receive_timeout: self.config.receive_timeout,
        };
        let mut transport =
            self.registry
                .create(name, params)
                .ok_or_else(|| ClientError::NoTransport {
                    offered: offered.iter().map(|s| s.to_string()).collect(),
                })?;

        self.close().await?;

        tracing::debug!(
            "Connecting {} transport for connection {}",
            transport.name(),
            negotiation.connection_id
        );
        transport.connect().await.map_err(ClientError::Connect)?;
        self.transport = Some(transport);
        Ok(())
    }

    /// Returns true while the transport holds an open connection.
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_connected())
    }

    pub fn connection_state(&self) -> TransportState {
        self.transport
            .as_ref()
            .map_or(self.idle_state, |t| t.state())
    }

    /// Closes the connection. A no-op when not connected.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        let Some(mut transport) = self.transport.take() else {
            return Ok(());
        };
        self.idle_state = TransportState::Closed;

        if transport.is_connected() {
            transport.close().await?;
            tracing::info!("Disconnected from hub {}", self.config.hub);
        }
        Ok(())
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Invokes `target` on the server with positional arguments.
    pub async fn invoke(&mut self, target: &str, arguments: Vec<Value>) -> Result<(), ClientError> {
        let transport = match self.transport.as_deref_mut() {
            Some(transport) if transport.is_connected() => transport,
            Some(_) => return Err(ClientError::NotConnected),
            None => {
                return Err(ClientError::InvokeBeforeConnection {
                    target: target.to_string(),
                })
            }
        };

        tracing::debug!("Invoking {}() with {} argument(s)", target, arguments.len());
        transport.invoke(target, arguments).await?;
        Ok(())
    }

    /// Sends a raw message.
    pub async fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        let transport = self.connected_transport()?;
        transport.send(message).await?;
        Ok(())
    }

    fn connected_transport(&mut self) -> Result<&mut (dyn Transport + 'static), ClientError> {
        self.transport
            .as_deref_mut()
            .filter(|t| t.is_connected())
            .ok_or(ClientError::NotConnected)
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Receives one frame and dispatches its messages. A no-op when not
    /// connected.
    pub async fn receive_call(&mut self) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Ok(());
        }
        let messages = self.receive_frame().await?;
        for message in &messages {
            self.dispatch(message).await?;
        }
        Ok(())
    }

    /// Receives and dispatches until shutdown, a server Close or an error.
    ///
    /// The shutdown signal is checked before every receive and also
    /// interrupts a receive in progress. Dispatch of a received frame
    /// always runs to completion.
    pub async fn run(&mut self, shutdown: &Shutdown) -> Result<(), ClientError> {
        loop {
            if shutdown.is_triggered() {
                tracing::debug!("Shutdown requested, leaving receive loop");
                break;
            }
            if !self.is_connected() {
                break;
            }

            let messages = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    tracing::debug!("Shutdown requested during receive");
                    break;
                }
                frame = self.receive_frame() => frame?,
            };

            let closing = messages
                .iter()
                .any(|m| m.message_type == MessageType::Close);
            for message in &messages {
                self.dispatch(message).await?;
            }
            if closing {
                tracing::debug!("Server closed the hub connection");
                break;
            }
        }
        Ok(())
    }

    async fn receive_frame(&mut self) -> Result<Vec<Message>, ClientError> {
        let transport = self.connected_transport()?;
        Ok(transport.receive().await?)
    }

    /// Runs the handlers registered for one message.
    pub async fn dispatch(&mut self, message: &Message) -> Result<(), ClientError> {
        match message.message_type {
            MessageType::Invocation => match message.target() {
                Some(target) => self.run_handlers(target, message.arguments()).await,
                None => {
                    tracing::warn!("Skipping invocation without target");
                    Ok(())
                }
            },
            MessageType::Close => {
                if let Some(ref error) = message.error {
                    tracing::warn!("Server closed the connection: {}", error);
                }
                self.run_handlers(EXIT_HOOK, &[]).await
            }
            MessageType::Ping => self.run_handlers(PING_HOOK, &[]).await,
            other => {
                tracing::debug!("Ignoring message of type {:?}", other);
                Ok(())
            }
        }
    }

    async fn run_handlers(&mut self, name: &str, arguments: &[Value]) -> Result<(), ClientError> {
        let handlers = self.callbacks.get(name);
        if handlers.is_empty() {
            tracing::debug!("No handler registered for {}", name);
        }
        for handler in handlers {
            handler
                .handle(arguments, self)
                .await
                .map_err(|source| ClientError::Handler {
                    target: name.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Appends a closure handler for invocations of `name`.
    pub fn on<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a [Value], &'a mut HubClient) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on_handler(name, Arc::new(handler_fn(handler)))
    }

    /// Appends a handler object for invocations of `name`.
    pub fn on_handler(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>) -> &mut Self {
        self.callbacks.add(name, handler);
        self
    }

    /// Appends a handler run when the server sends Close.
    pub fn on_exit<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a [Value], &'a mut HubClient) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(EXIT_HOOK, handler)
    }

    /// Appends a handler run when the server sends Ping.
    pub fn on_ping<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a [Value], &'a mut HubClient) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(PING_HOOK, handler)
    }

    /// Removes every handler for `name`, including the default ping reply
    /// when `name` is the ping hook.
    pub fn off(&mut self, name: &str) -> usize {
        self.callbacks.remove(name)
    }
}

impl fmt::Debug for HubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubClient")
            .field("url", &self.config.url)
            .field("hub", &self.config.hub)
            .field("state", &self.connection_state())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
