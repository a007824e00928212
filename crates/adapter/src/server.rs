//! Server-shaped shim presented to handler code.
//!
//! Handler code written against a long-lived HTTP server expects to receive
//! the server alongside each request (for counters, `reload`, `stop` and
//! friends). [`Server`] provides that surface on top of the invocation loop.
//! Only [`Server::dispatch`] does real work; the rest keeps the expected
//! shape and behaves as a single-connection server would.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use protocol::{Request, Response};
use tracing::{error, info, warn};

use crate::Handler;

/// Port reported to handlers.
pub const DEFAULT_PORT: u16 = 80;

/// Hostname and server id reported to handlers.
pub const SERVER_NAME: &str = "lambda";

/// Mutable server settings, replaced by [`Server::reload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Reported listening port.
    pub port: u16,
    /// Reported hostname.
    pub hostname: String,
    /// Reported development flag.
    pub development: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            hostname: SERVER_NAME.to_owned(),
            development: false,
        }
    }
}

/// Options accepted by [`Server::reload`]. Unset fields keep their value.
#[derive(Default)]
pub struct ServerOptions {
    handler: Option<Arc<dyn Handler>>,
    port: Option<u16>,
    hostname: Option<String>,
    development: Option<bool>,
}

impl ServerOptions {
    /// Creates an empty set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the handler used by subsequent dispatches.
    #[must_use]
    pub fn handler(mut self, handler: impl Handler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Replaces the reported port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Replaces the reported hostname.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Replaces the reported development flag.
    #[must_use]
    pub fn development(mut self, development: bool) -> Self {
        self.development = Some(development);
        self
    }
}

/// Decrements the in-flight counter when a dispatch ends, however it ends
/// (success, error, panic or abort).
struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The server-like object handed to every [`Handler::fetch`] call.
pub struct Server {
    handler: RwLock<Arc<dyn Handler>>,
    settings: RwLock<ServerSettings>,
    pending_requests: AtomicUsize,
    stop_requested: AtomicBool,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("settings", &self.settings())
            .field("pending_requests", &self.pending_requests())
            .field("stop_requested", &self.stop_requested())
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Wraps `handler` in a server shim.
    pub fn new(handler: impl Handler) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    /// Wraps an already shared handler.
    pub fn from_arc(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler: RwLock::new(handler),
            settings: RwLock::new(ServerSettings::default()),
            pending_requests: AtomicUsize::new(0),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// The handler currently registered.
    pub fn handler(&self) -> Arc<dyn Handler> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A snapshot of the current settings.
    pub fn settings(&self) -> ServerSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reported listening port.
    pub fn port(&self) -> u16 {
        self.settings().port
    }

    /// Reported hostname.
    pub fn hostname(&self) -> String {
        self.settings().hostname
    }

    /// Reported development flag.
    pub fn development(&self) -> bool {
        self.settings().development
    }

    /// Server identifier.
    pub fn id(&self) -> &'static str {
        SERVER_NAME
    }

    /// Number of dispatches currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.pending_requests.load(Ordering::SeqCst)
    }

    /// Always zero: there are no WebSocket connections.
    pub fn pending_websockets(&self) -> usize {
        0
    }

    /// Always `false`: connection upgrades are not supported.
    pub fn upgrade(&self, request: &Request) -> bool {
        let _ = request;
        false
    }

    /// Always zero: there are no subscribers to publish to.
    pub fn publish(&self, topic: &str, data: &[u8]) -> usize {
        let _ = (topic, data);
        0
    }

    /// Applies `options`, replacing the handler and/or reported settings.
    pub fn reload(&self, options: ServerOptions) {
        if let Some(handler) = options.handler {
            *self.handler.write().unwrap_or_else(PoisonError::into_inner) = handler;
        }
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(port) = options.port {
            settings.port = port;
        }
        if let Some(hostname) = options.hostname {
            settings.hostname = hostname;
        }
        if let Some(development) = options.development {
            settings.development = development;
        }
        info!(port = settings.port, hostname = %settings.hostname, "server reloaded");
    }

    /// Asks the runtime to exit once the current invocation is reported.
    pub fn stop(&self) {
        warn!("Server.stop() called; runtime will exit after this invocation");
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`Server::stop`] has been called.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Dispatches `request` to the registered handler.
    ///
    /// Handler failures are contained: they are logged, then the handler's
    /// [`Handler::error`] fallback is tried, and if that is missing or fails
    /// too an empty 500 is returned. `None` means the handler produced no
    /// explicit response.
    pub async fn dispatch(&self, request: Request) -> Option<Response> {
        let _pending = PendingGuard::enter(&self.pending_requests);
        let handler = self.handler();

        let cause = match handler.fetch(request, self).await {
            Ok(response) => return response,
            Err(cause) => cause,
        };
        error!("handler failed: {cause:#}");

        match handler.error(&cause).await {
            Some(Ok(response)) => Some(response),
            Some(Err(fallback)) => {
                error!("error handler failed: {fallback:#}");
                Some(Response::empty(500))
            }
            None => Some(Response::empty(500)),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use protocol::Headers;

    use super::*;

    fn request() -> Request {
        Request {
            method: "GET".into(),
            url: "https://ex.com/".into(),
            headers: Headers::new(),
            body: None,
            event: serde_json::Value::Null,
        }
    }

    struct Counting;

    #[async_trait]
    impl Handler for Counting {
        async fn fetch(&self, _request: Request, server: &Server) -> anyhow::Result<Option<Response>> {
            Ok(Some(Response::text(200, server.pending_requests().to_string())))
        }
    }

    struct Failing {
        fallback: Option<bool>,
    }

    #[async_trait]
    impl Handler for Failing {
        async fn fetch(&self, _request: Request, _server: &Server) -> anyhow::Result<Option<Response>> {
            anyhow::bail!("database unavailable")
        }

        async fn error(&self, cause: &anyhow::Error) -> Option<anyhow::Result<Response>> {
            match self.fallback {
                None => None,
                Some(true) => Some(Ok(Response::text(503, format!("sorry: {cause}")))),
                Some(false) => Some(Err(anyhow::anyhow!("fallback broke too"))),
            }
        }
    }

    struct Silent;

    #[async_trait]
    impl Handler for Silent {
        async fn fetch(&self, _request: Request, _server: &Server) -> anyhow::Result<Option<Response>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn pending_requests_track_in_flight_dispatch() {
        let server = Server::new(Counting);
        let response = server.dispatch(request()).await.unwrap();
        assert_eq!(response.body, b"1");
        assert_eq!(server.pending_requests(), 0);
    }

    #[tokio::test]
    async fn failure_without_fallback_yields_empty_500() {
        let server = Server::new(Failing { fallback: None });
        let response = server.dispatch(request()).await.unwrap();
        assert_eq!(response, Response::empty(500));
        assert_eq!(server.pending_requests(), 0);
    }

    #[tokio::test]
    async fn fallback_handler_supplies_the_response() {
        let server = Server::new(Failing {
            fallback: Some(true),
        });
        let response = server.dispatch(request()).await.unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.body, b"sorry: database unavailable");
    }

    #[tokio::test]
    async fn failing_fallback_yields_empty_500() {
        let server = Server::new(Failing {
            fallback: Some(false),
        });
        let response = server.dispatch(request()).await.unwrap();
        assert_eq!(response, Response::empty(500));
    }

    #[tokio::test]
    async fn no_explicit_response_is_passed_through() {
        let server = Server::new(Silent);
        assert_eq!(server.dispatch(request()).await, None);
    }

    #[tokio::test]
    async fn reload_swaps_handler_and_settings() {
        let server = Server::new(Silent);
        server.reload(ServerOptions::new().handler(Counting).port(8080).development(true));

        assert_eq!(server.port(), 8080);
        assert_eq!(server.hostname(), "lambda");
        assert!(server.development());
        assert!(server.dispatch(request()).await.is_some());
    }

    #[test]
    fn inert_operations_keep_server_shape() {
        let server = Server::new(Silent);
        assert!(!server.upgrade(&request()));
        assert_eq!(server.publish("topic", b"data"), 0);
        assert_eq!(server.pending_websockets(), 0);
        assert_eq!(server.id(), "lambda");
        assert!(!server.stop_requested());
        server.stop();
        assert!(server.stop_requested());
    }
}
