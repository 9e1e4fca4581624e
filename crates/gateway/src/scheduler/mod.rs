//! Schedule engine: per-minute evaluation, dedup state, and message rendering.

pub mod dedup;
pub mod engine;
pub mod render;
pub mod ticker;

pub use dedup::DedupStore;
pub use engine::{Action, ScheduleEngine};
pub use ticker::{EVERY_MINUTE, MinuteTicker};
