use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading/validation error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Gateway transport/handshake error.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// REST API error.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Channel lookup error.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Schedule evaluation or manual creation error.
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Internal protocol type error.
    #[error("Proto error: {0}")]
    Proto(#[from] ProtoError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was not provided.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),

    /// JSON parse error (schedule resource).
    #[error("JSON parse error: {0}")]
    Json(String),
}

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The WebSocket could not be opened.
    #[error("Dial failed: {0}")]
    Dial(String),

    /// HELLO was missing or malformed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// A frame could not be encoded or decoded.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The outbound frame queue is gone.
    #[error("Connection closed")]
    Closed,
}

/// REST API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response; carries status and raw body.
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Channel lookup errors
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No channel with this name in the guild listing.
    #[error("Channel not found: {0}")]
    NotFound(String),

    /// Listing the guild channels failed.
    #[error("Channel listing failed: {0}")]
    Api(#[from] ApiError),
}

/// Schedule errors
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Timezone name is not a known IANA zone.
    #[error("Invalid timezone '{timezone}' for schedule {schedule}")]
    InvalidTimezone { schedule: String, timezone: String },

    /// Time of day is not `HH:MM`.
    #[error("Invalid time '{time}' for schedule {schedule}")]
    InvalidTime { schedule: String, time: String },

    /// Local date/time does not exist in the zone (DST gap) or overflows.
    #[error("No valid occurrence for schedule {0}")]
    InvalidDate(String),

    /// Manual creation index out of range.
    #[error("No schedule at index {0}")]
    UnknownIndex(usize),

    /// A creation for this schedule and date is already recorded.
    #[error("Event for {schedule} on {date} was already created")]
    AlreadyCreated { schedule: String, date: String },

    /// Remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Channel resolution failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Internal proto errors
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Opcode number outside the known set.
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u8),

    /// Generic serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
