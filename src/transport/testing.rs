//! Loopback WebSocket server and helpers for tests.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::{WebSocketStream, accept_async};

use crate::notify::EventRouter;
use crate::transport::ConnectionEvent;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for any single wait in tests.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval for [`wait_until`].
const POLL_INTERVAL: Duration = Duration::from_millis(5);

// ============================================================================
// TestServer
// ============================================================================

/// A WebSocket server on a random localhost port.
pub(crate) struct TestServer {
    listener: TcpListener,
    port: u16,
}

impl TestServer {
    /// Binds to `127.0.0.1:0`.
    pub(crate) async fn bind() -> Self {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.expect("bind test server");
        let port = listener.local_addr().expect("local addr").port();
        Self { listener, port }
    }

    /// Client URL for this server.
    pub(crate) fn url(&self) -> String {
        format!("ws://127.0.0.1:{}/notifications", self.port)
    }

    /// Accepts and upgrades the next connection, panicking on timeout.
    pub(crate) async fn accept(&self) -> WebSocketStream<TcpStream> {
        self.try_accept(WAIT_TIMEOUT)
            .await
            .expect("client did not connect in time")
    }

    /// Accepts and upgrades the next connection, or `None` on timeout.
    pub(crate) async fn try_accept(&self, wait: Duration) -> Option<WebSocketStream<TcpStream>> {
        let (stream, _) = timeout(wait, self.listener.accept()).await.ok()?.ok()?;
        accept_async(stream).await.ok()
    }
}

/// Returns a ws URL on a port that refuses connections.
pub(crate) async fn refused_endpoint() -> String {
    let server = TestServer::bind().await;
    let url = server.url();
    drop(server);
    url
}

/// Polls `condition` until it holds, panicking after the wait timeout.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        sleep(POLL_INTERVAL).await;
    }
}

// ============================================================================
// EventLog
// ============================================================================

/// Records every connection event a router emits.
#[derive(Clone, Default)]
pub(crate) struct EventLog {
    events: Arc<Mutex<Vec<ConnectionEvent>>>,
}

impl EventLog {
    /// Subscribes a new log to `router`.
    pub(crate) fn attach(router: &EventRouter) -> Self {
        let log = Self::default();
        let events = Arc::clone(&log.events);
        router.on_connection(move |event| events.lock().push(event.clone()));
        log
    }

    /// Copy of all events so far.
    pub(crate) fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().clone()
    }

    /// Number of events matching `predicate`.
    pub(crate) fn count(&self, predicate: impl Fn(&ConnectionEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}
