//! Shared protocol types for the gateway client, REST collaborator, and scheduler.
//!
//! This crate defines serializable gateway frames, REST payloads, the schedule
//! configuration resource, and strongly-typed error enums shared across the workspace.

pub mod error;
pub mod gateway;
pub mod rest;
pub mod schedule;

/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of gateway frame and handshake types.
pub use gateway::{
    GatewayEvent, HelloData, IdentifyData, IdentifyProperties, Opcode, READY_EVENT, ReadyData,
    intents,
};
/// Re-export of REST payload types.
pub use rest::{Channel, Message, MessageCreate, ScheduledEvent, ScheduledEventCreate, User};
/// Re-export of schedule configuration types.
pub use schedule::{Schedule, ScheduleConfig};
