//! Request/response API types.

use serde::{Deserialize, Serialize};

/// Scheduled-event entity type for voice channels.
pub const ENTITY_TYPE_VOICE: u8 = 2;
/// Scheduled-event privacy level restricting visibility to guild members.
pub const PRIVACY_GUILD_ONLY: u8 = 2;

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// A guild channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Threads and DM channels may lack a name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: u8,
}

/// A posted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub content: String,
}

impl Message {
    /// Whether the message was written by a bot account.
    pub fn from_bot(&self) -> bool {
        self.author.as_ref().is_some_and(|author| author.bot)
    }
}

/// Body for creating a message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageCreate<'a> {
    pub content: &'a str,
}

/// A guild scheduled event as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub id: String,
    #[serde(default)]
    pub guild_id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scheduled_start_time: String,
    #[serde(default)]
    pub scheduled_end_time: Option<String>,
    #[serde(default)]
    pub entity_type: u8,
}

/// Body for creating a guild scheduled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEventCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// RFC 3339, UTC.
    pub scheduled_start_time: String,
    /// RFC 3339, UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_end_time: Option<String>,
    pub entity_type: u8,
    pub privacy_level: u8,
}
