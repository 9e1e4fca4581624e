//! Channel name → id cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use proto::ChannelError;
use tracing::debug;

use crate::api::MessagingApi;

/// Resolves human-readable channel names to ids for one guild.
///
/// A miss refreshes the cache from the full guild listing. Entries never
/// expire, so a rename after the first lookup is not observed.
pub struct ChannelResolver {
    api: Arc<dyn MessagingApi>,
    guild_id: String,
    cache: RwLock<HashMap<String, String>>,
}

impl ChannelResolver {
    /// Creates an empty resolver for `guild_id`.
    pub fn new(api: Arc<dyn MessagingApi>, guild_id: impl Into<String>) -> Self {
        Self {
            api,
            guild_id: guild_id.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Guild this resolver lists channels from.
    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// Returns the id for `name`, listing the guild's channels on a cache miss.
    pub async fn resolve(&self, name: &str) -> Result<String, ChannelError> {
        if let Some(id) = self.cached(name) {
            return Ok(id);
        }

        let channels = self.api.guild_channels(&self.guild_id).await?;
        debug!(guild_id = %self.guild_id, count = channels.len(), "Channel cache refreshed");

        let mut cache = self.cache.write();
        for channel in channels {
            if let Some(channel_name) = channel.name {
                cache.insert(channel_name, channel.id);
            }
        }
        cache
            .get(name)
            .cloned()
            .ok_or_else(|| ChannelError::NotFound(name.to_string()))
    }

    /// Cached id without touching the network.
    pub fn cached(&self, name: &str) -> Option<String> {
        self.cache.read().get(name).cloned()
    }

    /// Number of cached names.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Whether nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}
