//! Notification socket lifecycle and reconnection.
//!
//! # Event Loop
//!
//! Each connection attempt is one spawned tokio task that:
//!
//! - performs the WebSocket handshake (bounded by the connect timeout)
//! - dispatches inbound text frames to the [`EventRouter`] in arrival order
//! - writes outbound messages queued by [`ConnectionManager::send`]
//! - reports open, error, and close back to the manager
//!
//! # Reconnection
//!
//! On close the manager consults its [`ReconnectAttempt`]: if another retry
//! is allowed the count is incremented and a retry task sleeps for
//! [`ReconnectPolicy::next_delay`] before starting a new attempt. An error
//! is always followed by a close, and only the close counts as a failed
//! attempt. Once the cap is reached the manager stays closed until
//! [`ConnectionManager::connect`] is called again.
//!
//! # Epochs
//!
//! Every attempt gets a fresh epoch number. Lifecycle reports carrying an
//! older epoch are discarded, which is how a torn-down task or a retry timer
//! that lost a race with [`ConnectionManager::disconnect`] is neutralized.
//!
//! # Event Delivery
//!
//! Lifecycle events are queued while the state lock is held, so the queue
//! order is the order of state transitions. They are delivered after the lock
//! is released by whichever caller finds the queue idle. A connection
//! listener that calls back into the manager (for example `disconnect` from a
//! `Connected` handler) only enqueues; its event is delivered after the
//! current one, never before it.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::notify::EventRouter;

use super::reconnect::{ReconnectAttempt, ReconnectPolicy};
use super::state::{ConnectionEvent, ConnectionState, ConnectionStatus};

// ============================================================================
// Constants
// ============================================================================

/// Default bound on a single handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Close code reported when the client disconnects on purpose.
const NORMAL_CLOSE: u16 = 1000;

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Transmit a serialized message.
    Send(String),
    /// Close the socket and stop.
    Shutdown,
}

/// Why the event loop stopped.
struct LoopExit {
    code: Option<u16>,
    reason: String,
}

/// Mutable manager state. Never held across an await or a callback.
struct ManagerState {
    ready_state: ConnectionState,
    attempt: ReconnectAttempt,
    /// Present while an attempt is connecting or open.
    command_tx: Option<mpsc::UnboundedSender<ConnectionCommand>>,
    /// Pending retry timer.
    retry: Option<JoinHandle<()>>,
    /// Set by `disconnect`, cleared by `connect`.
    stopped: bool,
    epoch: u64,
    /// Lifecycle events awaiting delivery, in transition order.
    pending: VecDeque<ConnectionEvent>,
    /// Set while some caller is delivering `pending`.
    draining: bool,
}

/// State shared between the manager handle and its tasks.
struct ManagerInner {
    endpoint: String,
    connect_timeout: Duration,
    router: Arc<EventRouter>,
    state: Mutex<ManagerState>,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Owns the single notification socket.
///
/// Cloning yields another handle to the same connection.
///
/// # Runtime
///
/// [`connect`](Self::connect) and [`reconnect`](Self::reconnect) spawn tokio
/// tasks and must be called from within a tokio runtime.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.inner.endpoint)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Creates a manager in the closed state. Nothing connects until
    /// [`connect`](Self::connect) is called.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        policy: ReconnectPolicy,
        connect_timeout: Duration,
        router: Arc<EventRouter>,
    ) -> Self {
        let state = ManagerState {
            ready_state: ConnectionState::Closed,
            attempt: ReconnectAttempt::new(policy),
            command_tx: None,
            retry: None,
            stopped: true,
            epoch: 0,
            pending: VecDeque::new(),
            draining: false,
        };

        Self {
            inner: Arc::new(ManagerInner {
                endpoint: endpoint.into(),
                connect_timeout,
                router,
                state: Mutex::new(state),
            }),
        }
    }

    /// The endpoint this manager connects to.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// The reconnect policy in effect.
    #[must_use]
    pub fn policy(&self) -> ReconnectPolicy {
        *self.inner.state.lock().attempt.policy()
    }

    /// Starts connecting.
    ///
    /// No-op if an attempt is already in flight or the socket is open.
    /// Otherwise cancels any pending retry, resets the attempt count, and
    /// starts a fresh attempt.
    pub fn connect(&self) {
        let (epoch, command_rx) = {
            let mut state = self.inner.state.lock();
            if state.command_tx.is_some() {
                debug!(state = %state.ready_state, "Connect ignored, connection already active");
                return;
            }

            state.stopped = false;
            if let Some(retry) = state.retry.take() {
                retry.abort();
                debug!("Cancelled pending retry for manual connect");
            }
            state.attempt.reset();
            self.inner.begin_attempt(&mut state)
        };

        self.inner.drain_events();
        tokio::spawn(Arc::clone(&self.inner).run_connection(epoch, command_rx));
    }

    /// Stops the connection and suppresses automatic reconnection.
    ///
    /// Cancels a pending retry timer, closes the socket if one is active,
    /// and moves to [`ConnectionState::Closed`].
    pub fn disconnect(&self) {
        let was_active = {
            let mut state = self.inner.state.lock();
            state.stopped = true;
            state.epoch += 1;

            if let Some(retry) = state.retry.take() {
                retry.abort();
                debug!("Cancelled pending retry");
            }

            if let Some(command_tx) = state.command_tx.take() {
                let _ = command_tx.send(ConnectionCommand::Shutdown);
            }

            let previous = std::mem::replace(&mut state.ready_state, ConnectionState::Closed);
            let was_active = previous != ConnectionState::Closed;
            if was_active {
                state.pending.push_back(ConnectionEvent::Disconnected {
                    code: Some(NORMAL_CLOSE),
                    reason: "client disconnect".to_string(),
                });
            }
            was_active
        };

        if was_active {
            info!(endpoint = %self.inner.endpoint, "Disconnected by client");
            self.inner.drain_events();
        }
    }

    /// Disconnects, then connects with a fresh attempt count.
    pub fn reconnect(&self) {
        self.disconnect();
        self.connect();
    }

    /// Serializes and transmits `message` if the socket is open.
    ///
    /// Returns `false` without queueing anything when not open (including
    /// the errored state) or when serialization fails.
    pub fn send<T>(&self, message: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound message");
                return false;
            }
        };

        let state = self.inner.state.lock();
        let command_tx = match (&state.command_tx, state.ready_state) {
            (Some(tx), ConnectionState::Open) => tx,
            _ => {
                warn!(state = %state.ready_state, "Not connected, dropping outbound message");
                return false;
            }
        };

        trace!(bytes = json.len(), "Queueing outbound message");
        command_tx.send(ConnectionCommand::Send(json)).is_ok()
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        let state = self.inner.state.lock();
        ConnectionStatus {
            is_connected: state.ready_state.is_open(),
            reconnect_attempts: state.attempt.count(),
            ready_state: state.ready_state,
        }
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().ready_state
    }

    /// Returns `true` while the socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Returns `true` while a retry timer is pending.
    #[must_use]
    pub fn retry_pending(&self) -> bool {
        self.inner.state.lock().retry.is_some()
    }
}

// ============================================================================
// ManagerInner - Lifecycle
// ============================================================================

impl ManagerInner {
    /// Moves to `Connecting` under a new epoch and opens the command channel.
    fn begin_attempt(
        &self,
        state: &mut ManagerState,
    ) -> (u64, mpsc::UnboundedReceiver<ConnectionCommand>) {
        state.epoch += 1;
        state.ready_state = ConnectionState::Connecting;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        state.command_tx = Some(command_tx);

        let attempt = state.attempt.count();
        info!(endpoint = %self.endpoint, attempt, "Connecting");
        state.pending.push_back(ConnectionEvent::Connecting { attempt });

        (state.epoch, command_rx)
    }

    /// Delivers queued lifecycle events with the state lock released.
    ///
    /// Returns at once if another caller is already delivering; that caller
    /// picks up anything queued meanwhile.
    fn drain_events(&self) {
        {
            let mut state = self.state.lock();
            if state.draining {
                return;
            }
            state.draining = true;
        }

        loop {
            let event = {
                let mut state = self.state.lock();
                match state.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            self.router.emit_connection(&event);
        }
    }

    /// Records a successful handshake. Returns `false` if the attempt is stale.
    fn on_open(&self, epoch: u64) -> bool {
        {
            let mut state = self.state.lock();
            if state.epoch != epoch || state.stopped {
                return false;
            }
            state.ready_state = ConnectionState::Open;
            state.attempt.reset();
            state.pending.push_back(ConnectionEvent::Connected);
        }

        info!(endpoint = %self.endpoint, "Connected");
        self.drain_events();
        true
    }

    /// Records a transport error. The close path handles retrying.
    fn on_error(&self, epoch: u64, message: String) {
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            state.ready_state = ConnectionState::Errored;
            error!(endpoint = %self.endpoint, error = %message, "Connection error");
            state.pending.push_back(ConnectionEvent::Error { message });
        }

        self.drain_events();
    }

    /// Records a close and schedules a retry if the policy allows.
    fn on_close(self: &Arc<Self>, epoch: u64, exit: LoopExit) {
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                debug!(epoch, current = state.epoch, "Ignoring close from stale attempt");
                return;
            }

            state.ready_state = ConnectionState::Closed;
            state.command_tx = None;

            if state.stopped {
                // Intentional stop; no retry
            } else if state.attempt.should_retry() {
                let count = state.attempt.record_failure();
                let delay = state.attempt.next_delay();
                info!(
                    attempt = count,
                    max = state.attempt.policy().max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );
                state.retry = Some(tokio::spawn(Arc::clone(self).retry_after(delay, epoch)));
            } else {
                warn!(
                    attempts = state.attempt.count(),
                    "Reconnect attempts exhausted, staying closed"
                );
            }

            info!(code = ?exit.code, reason = %exit.reason, "Connection closed");
            state.pending.push_back(ConnectionEvent::Disconnected {
                code: exit.code,
                reason: exit.reason,
            });
        }

        self.drain_events();
    }

    /// Retry timer body.
    async fn retry_after(self: Arc<Self>, delay: Duration, epoch: u64) {
        sleep(delay).await;

        let (next_epoch, command_rx) = {
            let mut state = self.state.lock();
            if state.stopped || state.epoch != epoch || state.command_tx.is_some() {
                debug!("Retry superseded, not reconnecting");
                return;
            }
            state.retry = None;
            self.begin_attempt(&mut state)
        };

        self.drain_events();
        tokio::spawn(Arc::clone(&self).run_connection(next_epoch, command_rx));
    }
}

// ============================================================================
// ManagerInner - Connection Task
// ============================================================================

impl ManagerInner {
    /// Runs one connection attempt to completion.
    async fn run_connection(
        self: Arc<Self>,
        epoch: u64,
        command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    ) {
        let stream = match Self::establish(&self.endpoint, self.connect_timeout).await {
            Ok(stream) => stream,
            Err(e) => {
                let reason = e.to_string();
                self.on_error(epoch, reason.clone());
                self.on_close(epoch, LoopExit { code: None, reason });
                return;
            }
        };

        if !self.on_open(epoch) {
            debug!("Attempt superseded during handshake, closing");
            let mut stream = stream;
            let _ = stream.close(None).await;
            return;
        }

        let exit = self.run_event_loop(epoch, stream, command_rx).await;
        self.on_close(epoch, exit);
    }

    /// Performs the WebSocket handshake.
    async fn establish(endpoint: &str, connect_timeout: Duration) -> Result<WsStream> {
        let (stream, response) = timeout(connect_timeout, connect_async(endpoint))
            .await
            .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))?
            .map_err(|e| Error::connection(e.to_string()))?;

        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(stream)
    }

    /// Pumps frames and commands until the socket closes.
    async fn run_event_loop(
        &self,
        epoch: u64,
        stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    ) -> LoopExit {
        let (mut ws_write, mut ws_read) = stream.split();

        loop {
            tokio::select! {
                // Frames from the server
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            self.router.dispatch(text.as_str());
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by server");
                            return match frame {
                                Some(frame) => LoopExit {
                                    code: Some(u16::from(frame.code)),
                                    reason: frame.reason.as_str().to_string(),
                                },
                                None => LoopExit {
                                    code: None,
                                    reason: "closed by server".to_string(),
                                },
                            };
                        }

                        Some(Err(e)) => {
                            let reason = e.to_string();
                            self.on_error(epoch, reason.clone());
                            return LoopExit { code: None, reason };
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            return LoopExit {
                                code: None,
                                reason: "stream ended".to_string(),
                            };
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the manager
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(json)) => {
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                let reason = e.to_string();
                                self.on_error(epoch, reason.clone());
                                return LoopExit { code: None, reason };
                            }
                            trace!("Message sent");
                        }

                        Some(ConnectionCommand::Shutdown) | None => {
                            debug!("Shutdown requested");
                            let _ = ws_write.close().await;
                            return LoopExit {
                                code: Some(NORMAL_CLOSE),
                                reason: "client disconnect".to_string(),
                            };
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
