//! Handler registration and the reserved hook points.

use crate::client::HubClient;
use crate::error::HandlerError;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use hublink_protocol::Message;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name under which server Close handlers are registered.
pub const EXIT_HOOK: &str = "__EXIT__";

/// Name under which server Ping handlers are registered.
pub const PING_HOOK: &str = "__PING__";

pub type HandlerResult = Result<(), HandlerError>;

/// Reacts to one dispatched message.
///
/// Handlers get the invocation arguments (empty for hooks) and the client
/// itself, so they can send or invoke in response.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, arguments: &[Value], client: &mut HubClient) -> HandlerResult;
}

/// Adapts a closure returning a boxed future into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

/// Wraps a closure as a handler.
///
/// ```ignore
/// let handler = handler_fn(|args, _client| Box::pin(async move {
///     println!("{:?}", args);
///     Ok(())
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a [Value], &'a mut HubClient) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a [Value], &'a mut HubClient) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    async fn handle(&self, arguments: &[Value], client: &mut HubClient) -> HandlerResult {
        (self.f)(arguments, client).await
    }
}

/// Default Ping hook: answers with a ping of its own.
#[derive(Debug, Default)]
pub struct PingReply;

#[async_trait]
impl Handler for PingReply {
    async fn handle(&self, _arguments: &[Value], client: &mut HubClient) -> HandlerResult {
        if !client.is_connected() {
            return Ok(());
        }
        client.send(&Message::ping()).await?;
        Ok(())
    }
}

/// Ordered handler lists keyed by method name.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    handlers: HashMap<String, Vec<Arc<dyn Handler>>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the ping auto-reply installed.
    pub fn with_default_hooks() -> Self {
        let mut registry = Self::new();
        registry.add(PING_HOOK, Arc::new(PingReply));
        registry
    }

    /// Appends a handler for `name`.
    pub fn add(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.entry(name.into()).or_default().push(handler);
    }

    /// Removes every handler for `name`. Returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        self.handlers.remove(name).map_or(0, |list| list.len())
    }

    /// Returns the handlers for `name` in registration order.
    pub fn get(&self, name: &str) -> Vec<Arc<dyn Handler>> {
        self.handlers.get(name).cloned().unwrap_or_default()
    }

    pub fn count(&self, name: &str) -> usize {
        self.handlers.get(name).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(Vec::is_empty)
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<(&str, usize)> = self
            .handlers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        names.sort_unstable();
        f.debug_struct("CallbackRegistry")
            .field("handlers", &names)
            .finish()
    }
}
