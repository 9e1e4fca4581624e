//! Gateway client, event routing, and the schedule engine.

pub mod connection;
pub mod heartbeat;
pub mod router;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_support;

/// WebSocket gateway client.
pub use connection::{DEFAULT_GATEWAY_URL, Disconnect, GatewayConfig, GatewayConnection};
/// Periodic heartbeat task.
pub use heartbeat::HeartbeatMonitor;
/// Event-name to listener registry.
pub use router::{EventHandler, EventRouter, ListenerError, handler};
/// Schedule engine and its cron clock.
pub use scheduler::{Action, DedupStore, MinuteTicker, ScheduleEngine};
/// Per-connection session fields.
pub use session::SessionState;
/// Connection state machine.
pub use state::{ConnectionState, DisconnectReason};
/// Tracked background tasks.
pub use tasks::TaskTracker;
