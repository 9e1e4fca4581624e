//! Request/response collaborator trait.

use async_trait::async_trait;
use proto::{ApiError, Channel, Message, ScheduledEvent, ScheduledEventCreate};

/// Synchronous, authenticated REST calls the scheduler and commands rely on.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Post `content` to a channel.
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<Message, ApiError>;

    /// List every channel in a guild.
    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, ApiError>;

    /// Create a guild scheduled event.
    async fn create_scheduled_event(
        &self,
        guild_id: &str,
        event: &ScheduledEventCreate,
    ) -> Result<ScheduledEvent, ApiError>;
}
