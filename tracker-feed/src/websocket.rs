//! Realtime signal feed connection manager
//!
//! Owns one logical push channel per authorized session: opens the
//! websocket when the session becomes eligible (non-empty token + VIP),
//! sends keepalive pings while open, reconnects after recoverable
//! closures, and fans out decoded frames to the registered callback.
//!
//! The caller drives the manager declaratively through [`SignalFeed::configure`];
//! open/close/retry decisions converge on the latest session without the
//! caller managing connection lifecycle.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, Sleep};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use tracker_core::{ClientMessage, FeedState, ServerMessage, Session};

use crate::config::FeedConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Latest registered message callback, read at dispatch time
type MessageCallback = Arc<dyn Fn(ServerMessage) + Send + Sync>;

/// Commands from the [`SignalFeed`] handle to the connection task
enum Command {
    Configure(Session),
    Shutdown,
}

/// Server close codes that mean the session was deliberately rejected:
/// policy violation (1008), unsupported data (1003), internal error (1011).
/// These are terminal for the current cycle; no reconnect is scheduled.
fn is_policy_close(code: CloseCode) -> bool {
    matches!(
        code,
        CloseCode::Policy | CloseCode::Unsupported | CloseCode::Error
    )
}

// ============================================================================
// SignalFeed (public handle)
// ============================================================================

/// Handle to the realtime signal feed.
///
/// Creating a feed spawns a background connection task; dropping the
/// handle (or calling [`dispose`](Self::dispose)) tears it down, cancelling
/// any pending timers and closing the channel.
pub struct SignalFeed {
    command_tx: mpsc::UnboundedSender<Command>,
    connected: Arc<AtomicBool>,
    callback: Arc<Mutex<Option<MessageCallback>>>,
}

impl SignalFeed {
    /// Spawn the feed connection task. No channel is opened until an
    /// eligible session is supplied via [`configure`](Self::configure).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: FeedConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let callback: Arc<Mutex<Option<MessageCallback>>> = Arc::new(Mutex::new(None));

        let task = FeedTask {
            config,
            session: Session::anonymous(),
            state: FeedState::Idle,
            connected: Arc::clone(&connected),
            callback: Arc::clone(&callback),
            command_rx,
            socket: None,
            heartbeat: None,
            retry: None,
        };
        tokio::spawn(task.run());

        Self {
            command_tx,
            connected,
            callback,
        }
    }

    /// Declare the current session and message callback.
    ///
    /// Safe to call on every state change of the host application:
    /// replacing only the callback swaps it in place without touching the
    /// transport, while a changed token or VIP flag reconciles the
    /// channel (close without retry when eligibility is lost, immediate
    /// reopen when the credential changes while eligible).
    pub fn configure<F>(&self, token: Option<&str>, vip: bool, on_message: F)
    where
        F: Fn(ServerMessage) + Send + Sync + 'static,
    {
        *self.callback.lock() = Some(Arc::new(on_message));

        let session = Session {
            token: token.map(ToOwned::to_owned),
            vip,
        };
        let _ = self.command_tx.send(Command::Configure(session));
    }

    /// True strictly between a successful open and the next closure;
    /// false while idle, connecting, or waiting to retry.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Tear down the feed: cancel pending reconnect and heartbeat timers,
    /// close any open channel, and clear the connected flag. Idempotent.
    pub fn dispose(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.command_tx.send(Command::Shutdown);
    }
}

impl Drop for SignalFeed {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for SignalFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalFeed")
            .field("connected", &self.connected())
            .finish()
    }
}

// ============================================================================
// Connection task
// ============================================================================

/// Single-task owner of the socket and both timers. All lifecycle
/// mutations happen sequentially inside [`run`](Self::run), so a close
/// event can never race a handle created after it.
struct FeedTask {
    config: FeedConfig,
    session: Session,
    state: FeedState,
    connected: Arc<AtomicBool>,
    callback: Arc<Mutex<Option<MessageCallback>>>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    /// At most one live transport at a time
    socket: Option<WsStream>,
    /// Keepalive timer; exists exactly while `socket` does
    heartbeat: Option<Interval>,
    /// Pending reconnect, if the last closure was recoverable
    retry: Option<Pin<Box<Sleep>>>,
}

impl FeedTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Configure(session)) => self.reconfigure(session).await,
                    // Channel closure means the handle was dropped
                    Some(Command::Shutdown) | None => break,
                },
                frame = next_frame(&mut self.socket) => self.handle_frame(frame).await,
                _ = heartbeat_tick(&mut self.heartbeat) => self.send_ping().await,
                _ = retry_elapsed(&mut self.retry) => {
                    self.retry = None;
                    // Re-read eligibility at fire time: it may have lapsed
                    // since the retry was scheduled
                    if self.session.eligible() {
                        self.open().await;
                    } else {
                        self.set_state(FeedState::Idle);
                    }
                }
            }
        }

        self.teardown().await;
        self.set_state(FeedState::Disposed);
        debug!("[Feed] Connection task stopped");
    }

    /// Converge on a newly declared session
    async fn reconfigure(&mut self, session: Session) {
        if session == self.session {
            return;
        }
        self.session = session;

        if !self.session.eligible() {
            if self.socket.is_some() || self.retry.is_some() {
                info!("[Feed] Session no longer eligible, closing channel");
            }
            self.teardown().await;
            self.set_state(FeedState::Idle);
            return;
        }

        // Newly eligible, or the token changed while eligible. Either way
        // the old handle (and any pending retry) is superseded; reopen
        // immediately rather than waiting out a backoff.
        self.teardown().await;
        self.open().await;
    }

    /// Open a fresh channel for the current session. Callers guarantee
    /// eligibility and that no previous handle is still live.
    async fn open(&mut self) {
        let Some(token) = self.session.token() else {
            return;
        };
        let url = match self.config.feed_url(token) {
            Ok(url) => url,
            Err(e) => {
                error!("[Feed] Cannot derive feed endpoint: {}", e);
                self.set_state(FeedState::Idle);
                return;
            }
        };

        self.set_state(FeedState::Connecting);
        // The full URL carries the bearer token; log the base only
        info!("[Feed] Connecting to {}", self.config.api_url);

        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("[Feed] Connected");
                self.socket = Some(stream);
                // A successful open cancels a retry that raced with it
                self.retry = None;
                let period = self.config.heartbeat_interval;
                self.heartbeat = Some(interval_at(Instant::now() + period, period));
                self.connected.store(true, Ordering::SeqCst);
                self.set_state(FeedState::Open);
            }
            Err(e) => {
                warn!("[Feed] Connection failed: {}", e);
                self.connected.store(false, Ordering::SeqCst);
                self.schedule_retry();
            }
        }
    }

    async fn handle_frame(&mut self, frame: Option<Result<Message, WsError>>) {
        match frame {
            Some(Ok(Message::Text(text))) => self.dispatch(&text),
            Some(Ok(Message::Ping(data))) => {
                if let Some(socket) = self.socket.as_mut() {
                    if let Err(e) = socket.send(Message::Pong(data)).await {
                        warn!("[Feed] Failed to send pong: {}", e);
                    }
                }
            }
            Some(Ok(Message::Close(frame))) => self.on_close(frame).await,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                // Transport errors end the stream; the closure itself is
                // handled as an abnormal (recoverable) close
                error!("[Feed] Transport error: {}", e);
                self.on_close(None).await;
            }
            None => {
                info!("[Feed] Stream ended");
                self.on_close(None).await;
            }
        }
    }

    /// Decode an inbound frame and hand it to the latest callback.
    /// Malformed frames are dropped; they never close the channel.
    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => {
                debug!("[Feed] Received {:?}", message);
                let callback = self.callback.lock().clone();
                if let Some(callback) = callback {
                    callback(message);
                }
            }
            Err(e) => {
                debug!("[Feed] Dropping unrecognized frame: {} ({})", text, e);
            }
        }
    }

    async fn send_ping(&mut self) {
        let Some(socket) = self.socket.as_mut() else {
            return;
        };
        if let Ok(json) = serde_json::to_string(&ClientMessage::Ping) {
            if let Err(e) = socket.send(Message::Text(json.into())).await {
                // The read side will surface the closure; just report here
                warn!("[Feed] Failed to send ping: {}", e);
            }
        }
    }

    /// The channel closed. Policy rejections are terminal; every other
    /// cause (normal closure, network interruption) schedules a retry.
    async fn on_close(&mut self, frame: Option<CloseFrame>) {
        self.connected.store(false, Ordering::SeqCst);
        self.heartbeat = None;
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
        }

        match frame {
            Some(frame) if is_policy_close(frame.code) => {
                warn!(
                    "[Feed] Channel rejected by server (code {}): {}",
                    u16::from(frame.code),
                    frame.reason
                );
                self.set_state(FeedState::Idle);
            }
            _ => self.schedule_retry(),
        }
    }

    fn schedule_retry(&mut self) {
        let delay = self.config.reconnect_delay;
        info!("[Feed] Reconnecting in {:?}", delay);
        self.retry = Some(Box::pin(tokio::time::sleep(delay)));
        self.set_state(FeedState::RetryScheduled);
    }

    /// Release everything this task owns: timers first, then the
    /// transport, then the status flag. Safe to call with nothing open.
    async fn teardown(&mut self) {
        self.retry = None;
        self.heartbeat = None;
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn set_state(&mut self, state: FeedState) {
        if self.state != state {
            debug!("[Feed] {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

// select! helpers: a missing socket or timer parks its branch instead of
// disabling it, so the loop shape stays the same in every state.

async fn next_frame(socket: &mut Option<WsStream>) -> Option<Result<Message, WsError>> {
    match socket {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn heartbeat_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn retry_elapsed(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_close_codes() {
        // 1008 policy violation, 1003 unsupported data, 1011 internal error
        assert!(is_policy_close(CloseCode::from(1008)));
        assert!(is_policy_close(CloseCode::from(1003)));
        assert!(is_policy_close(CloseCode::from(1011)));
    }

    #[test]
    fn test_recoverable_close_codes() {
        // Normal closure and abnormal network termination both retry
        assert!(!is_policy_close(CloseCode::from(1000)));
        assert!(!is_policy_close(CloseCode::from(1006)));
        assert!(!is_policy_close(CloseCode::from(1001)));
        assert!(!is_policy_close(CloseCode::from(1012)));
    }
}
