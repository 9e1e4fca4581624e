//! WebSocket gateway client.
//!
//! One [`GatewayConnection::run`] call drives one connection: dial, handshake,
//! heartbeat, read loop. Reconnecting is the caller's decision.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use proto::{GatewayError, GatewayEvent, IdentifyData, IdentifyProperties, Opcode, intents};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use crate::heartbeat::HeartbeatMonitor;
use crate::router::EventRouter;
use crate::session::SessionState;
use crate::state::{ConnectionState, DisconnectReason, Effect, Inbound, transition};

/// Default gateway endpoint (API v10, JSON encoding).
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

const OUTBOUND_QUEUE: usize = 32;

/// Connection parameters.
#[derive(Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub token: String,
    pub intents: u64,
    /// Sent as the `browser`/`device` identify properties.
    pub client_name: String,
    /// Pause before re-identifying after INVALID_SESSION.
    pub reidentify_delay: Duration,
}

impl GatewayConfig {
    /// Defaults for `token`: public endpoint, default intents, 1s re-identify pause.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            token: token.into(),
            intents: intents::DEFAULT,
            client_name: env!("CARGO_PKG_NAME").to_string(),
            reidentify_delay: Duration::from_secs(1),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_reidentify_delay(mut self, delay: Duration) -> Self {
        self.reidentify_delay = delay;
        self
    }

    fn identify_frame(&self) -> Result<GatewayEvent, GatewayError> {
        let data = IdentifyData {
            token: self.token.clone(),
            intents: self.intents,
            properties: IdentifyProperties::for_client(&self.client_name),
        };
        GatewayEvent::identify(&data).map_err(|e| GatewayError::Protocol(e.to_string()))
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("client_name", &self.client_name)
            .field("reidentify_delay", &self.reidentify_delay)
            .finish()
    }
}

/// How a connection ended, with the session fields it held at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub reason: DisconnectReason,
    pub session_id: Option<String>,
    pub last_sequence: Option<u64>,
}

impl Disconnect {
    /// Whether READY was seen before the connection ended.
    pub fn reached_ready(&self) -> bool {
        self.session_id.is_some()
    }
}

/// Gateway client bound to a router.
pub struct GatewayConnection {
    config: GatewayConfig,
    router: Arc<EventRouter>,
    session: Arc<SessionState>,
    state: Mutex<ConnectionState>,
}

impl GatewayConnection {
    pub fn new(config: GatewayConfig, router: Arc<EventRouter>) -> Self {
        Self {
            config,
            router,
            session: Arc::new(SessionState::new()),
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(from = ?*state, to = ?next, "Gateway state changed");
            *state = next;
        }
    }

    /// Runs one connection until the server asks to reconnect, the socket
    /// fails, or `shutdown` becomes `true`.
    ///
    /// Dial and handshake failures are errors; every other ending is a
    /// [`Disconnect`].
    pub async fn run(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Disconnect, GatewayError> {
        self.session.reset();
        self.set_state(ConnectionState::Connecting);
        let _ = rustls::crypto::ring::default_provider().install_default();

        let socket = match tokio_tungstenite::connect_async(self.config.url.as_str()).await {
            Ok((socket, _response)) => socket,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(GatewayError::Dial(e.to_string()));
            }
        };
        info!(url = %self.config.url, "Gateway connected");
        self.set_state(ConnectionState::AwaitingHandshake);

        let (sink, mut stream) = socket.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (close_tx, close_rx) = oneshot::channel();
        let writer = tokio::spawn(write_frames(sink, outbound_rx, close_rx));

        let result = self.read_frames(&mut stream, &outbound_tx, &mut shutdown).await;

        let _ = close_tx.send(());
        drop(outbound_tx);
        if let Err(e) = writer.await {
            warn!("Gateway writer task failed: {e}");
        }

        let disconnect = Disconnect {
            reason: DisconnectReason::Shutdown,
            session_id: self.session.session_id(),
            last_sequence: self.session.sequence(),
        };
        self.session.reset();
        self.set_state(ConnectionState::Disconnected);

        let reason = result?;
        info!(?reason, "Gateway disconnected");
        Ok(Disconnect { reason, ..disconnect })
    }

    async fn read_frames<S>(
        &self,
        stream: &mut S,
        outbound: &mpsc::Sender<GatewayEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<DisconnectReason, GatewayError>
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        // Replaced on every HELLO; dropping it stops the beats.
        let mut heartbeat: Option<HeartbeatMonitor> = None;

        loop {
            if *shutdown.borrow() {
                return Ok(DisconnectReason::Shutdown);
            }

            let message = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Ok(DisconnectReason::Shutdown);
                    }
                    continue;
                }
                message = stream.next() => message,
            };

            let text = match message {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(frame))) => {
                    let detail = frame
                        .map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()));
                    return Ok(DisconnectReason::ClosedByServer(detail));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Ok(DisconnectReason::ReadFailed(e.to_string())),
                None => return Ok(DisconnectReason::ClosedByServer(None)),
            };

            let frame = match GatewayEvent::decode(text.as_str()) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Dropping undecodable gateway frame: {e}");
                    continue;
                }
            };
            if let Some(seq) = frame.s {
                self.session.observe_sequence(seq);
            }

            let op = frame.op;
            let inbound = match Inbound::from_frame(frame) {
                Ok(inbound) => inbound,
                Err(e) if op == Opcode::Hello.code() => {
                    return Err(GatewayError::Handshake(e.to_string()));
                }
                Err(e) => {
                    warn!(op, "Dropping malformed gateway frame: {e}");
                    continue;
                }
            };

            let (next, effects) = transition(self.state(), inbound);
            self.set_state(next);

            for effect in effects {
                match effect {
                    Effect::StartHeartbeat(interval) => {
                        heartbeat = Some(HeartbeatMonitor::spawn(
                            interval,
                            self.session.clone(),
                            outbound.clone(),
                        ));
                    }
                    Effect::SendHeartbeat => {
                        send(outbound, GatewayEvent::heartbeat(self.session.sequence())).await?;
                    }
                    Effect::Identify => {
                        send(outbound, self.config.identify_frame()?).await?;
                        debug!("Identify sent");
                    }
                    Effect::ResetSession => {
                        warn!("Session invalidated");
                        self.session.reset();
                    }
                    Effect::ReidentifyAfterPause => {
                        tokio::select! {
                            _ = tokio::time::sleep(self.config.reidentify_delay) => {}
                            _ = async { shutdown.wait_for(|stop| *stop).await.map(|_| ()) } => {
                                return Ok(DisconnectReason::Shutdown);
                            }
                        }
                        send(outbound, self.config.identify_frame()?).await?;
                        debug!("Re-identify sent");
                    }
                    Effect::CaptureSession(session_id) => {
                        info!(%session_id, "Gateway ready");
                        self.session.set_session_id(session_id);
                    }
                    Effect::Dispatch { event, data } => {
                        self.router.dispatch(&event, data);
                    }
                    Effect::Disconnect(reason) => {
                        drop(heartbeat.take());
                        return Ok(reason);
                    }
                }
            }
        }
    }
}

async fn send(
    outbound: &mpsc::Sender<GatewayEvent>,
    frame: GatewayEvent,
) -> Result<(), GatewayError> {
    outbound.send(frame).await.map_err(|_| GatewayError::Closed)
}

/// Serializes queued frames onto the socket until asked to close.
async fn write_frames<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<GatewayEvent>,
    mut close: oneshot::Receiver<()>,
) where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = &mut close => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!("Dropping unencodable outbound frame: {e}");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            warn!("Gateway write failed: {e}");
            return;
        }
    }
    if let Err(e) = sink.close().await {
        debug!("Gateway close failed: {e}");
    }
}
