//! Gateway connection state machine.
//!
//! [`transition`] is pure: it maps the current state and one decoded inbound
//! frame to the next state plus the effects the connection must perform.

use std::time::Duration;

use proto::{GatewayEvent, HelloData, Opcode, ProtoError, READY_EVENT, ReadyData};

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Dialing the WebSocket.
    Connecting,
    /// Socket open, waiting for HELLO.
    AwaitingHandshake,
    /// IDENTIFY sent, waiting for READY.
    Identifying,
    /// READY received.
    Connected,
}

/// Why the read loop handed control back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The shutdown signal fired.
    Shutdown,
    /// The server sent RECONNECT.
    ReconnectRequested,
    /// The server closed the socket (close code and reason when given).
    ClosedByServer(Option<String>),
    /// Reading from the socket failed.
    ReadFailed(String),
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Hello { heartbeat_interval: Duration },
    /// Server asks for an immediate heartbeat.
    HeartbeatRequest,
    HeartbeatAck,
    Ready { session_id: String, data: serde_json::Value },
    Dispatch { event: String, data: serde_json::Value },
    Reconnect,
    InvalidSession,
    /// Client-only opcodes echoed back; ignored.
    Unexpected(Opcode),
}

impl Inbound {
    /// Interprets a raw frame. Fails on unknown opcodes and malformed HELLO/READY payloads.
    pub fn from_frame(frame: GatewayEvent) -> Result<Self, ProtoError> {
        let inbound = match frame.opcode()? {
            Opcode::Hello => {
                let hello: HelloData = serde_json::from_value(frame.d)
                    .map_err(|e| ProtoError::Serialization(format!("HELLO: {e}")))?;
                if hello.heartbeat_interval == 0 {
                    return Err(ProtoError::Serialization(
                        "HELLO: heartbeat_interval must be positive".to_string(),
                    ));
                }
                Self::Hello {
                    heartbeat_interval: Duration::from_millis(hello.heartbeat_interval),
                }
            }
            Opcode::Heartbeat => Self::HeartbeatRequest,
            Opcode::HeartbeatAck => Self::HeartbeatAck,
            Opcode::Reconnect => Self::Reconnect,
            Opcode::InvalidSession => Self::InvalidSession,
            Opcode::Dispatch => {
                let event = frame.t.ok_or_else(|| {
                    ProtoError::Serialization("DISPATCH without event name".to_string())
                })?;
                if event == READY_EVENT {
                    let ready: ReadyData = serde_json::from_value(frame.d.clone())
                        .map_err(|e| ProtoError::Serialization(format!("READY: {e}")))?;
                    Self::Ready {
                        session_id: ready.session_id,
                        data: frame.d,
                    }
                } else {
                    Self::Dispatch {
                        event,
                        data: frame.d,
                    }
                }
            }
            op @ (Opcode::Identify | Opcode::Resume) => Self::Unexpected(op),
        };
        Ok(inbound)
    }
}

/// Work the connection performs after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// (Re)start the periodic heartbeat at this interval.
    StartHeartbeat(Duration),
    /// Send one heartbeat now.
    SendHeartbeat,
    /// Send IDENTIFY.
    Identify,
    /// Drop session id and sequence.
    ResetSession,
    /// Pause briefly, then IDENTIFY again.
    ReidentifyAfterPause,
    /// Record the session id from READY.
    CaptureSession(String),
    /// Hand an event to the router.
    Dispatch {
        event: String,
        data: serde_json::Value,
    },
    /// Stop reading and return to the caller.
    Disconnect(DisconnectReason),
}

/// Applies one inbound frame to `state`.
pub fn transition(state: ConnectionState, inbound: Inbound) -> (ConnectionState, Vec<Effect>) {
    use ConnectionState::*;

    match inbound {
        Inbound::Hello { heartbeat_interval } => (
            Identifying,
            vec![Effect::StartHeartbeat(heartbeat_interval), Effect::Identify],
        ),
        Inbound::HeartbeatRequest => (state, vec![Effect::SendHeartbeat]),
        Inbound::HeartbeatAck | Inbound::Unexpected(_) => (state, Vec::new()),
        Inbound::Ready { session_id, data } => (
            Connected,
            vec![
                Effect::CaptureSession(session_id),
                Effect::Dispatch {
                    event: READY_EVENT.to_string(),
                    data,
                },
            ],
        ),
        Inbound::Dispatch { event, data } => (state, vec![Effect::Dispatch { event, data }]),
        Inbound::Reconnect => (
            Disconnected,
            vec![Effect::Disconnect(DisconnectReason::ReconnectRequested)],
        ),
        Inbound::InvalidSession => (
            Identifying,
            vec![Effect::ResetSession, Effect::ReidentifyAfterPause],
        ),
    }
}
