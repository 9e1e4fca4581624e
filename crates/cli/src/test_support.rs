use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use channels::MessagingApi;
use proto::{ApiError, Channel, Message, ScheduledEvent, ScheduledEventCreate};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Locks process environment mutation for the entire test body.
pub(crate) fn with_locked_env<R>(run: impl FnOnce() -> R) -> R {
    let _guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    run()
}

/// Set an environment variable in test contexts.
///
/// # Safety
/// These calls remain unsafe in this toolchain. Call sites should use
/// `with_locked_env` to avoid data races between parallel tests.
pub(crate) fn set_env_var(key: &str, value: &str) {
    // SAFETY: required for this toolchain's `std::env` API.
    unsafe {
        std::env::set_var(key, value);
    }
}

/// Remove an environment variable in test contexts.
///
/// # Safety
/// These calls remain unsafe in this toolchain. Call sites should use
/// `with_locked_env` to avoid data races between parallel tests.
pub(crate) fn remove_env_var(key: &str) {
    // SAFETY: required for this toolchain's `std::env` API.
    unsafe {
        std::env::remove_var(key);
    }
}

/// API fake that records sends and event creations.
#[derive(Default)]
pub(crate) struct RecordingApi {
    channels: Vec<(String, String)>,
    sent: Mutex<Vec<(String, String)>>,
    created: Mutex<Vec<ScheduledEventCreate>>,
}

impl RecordingApi {
    pub(crate) fn with_channels(channels: &[(&str, &str)]) -> Self {
        Self {
            channels: channels
                .iter()
                .map(|(name, id)| (name.to_string(), id.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub(crate) fn created_count(&self) -> usize {
        self.created.lock().expect("created lock").len()
    }
}

#[async_trait]
impl MessagingApi for RecordingApi {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<Message, ApiError> {
        self.sent
            .lock()
            .expect("sent lock")
            .push((channel_id.to_string(), content.to_string()));
        Ok(Message {
            id: "m".to_string(),
            channel_id: channel_id.to_string(),
            guild_id: None,
            author: None,
            content: content.to_string(),
        })
    }

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, ApiError> {
        Ok(self
            .channels
            .iter()
            .map(|(name, id)| Channel {
                id: id.clone(),
                guild_id: Some(guild_id.to_string()),
                name: Some(name.clone()),
                kind: 0,
            })
            .collect())
    }

    async fn create_scheduled_event(
        &self,
        guild_id: &str,
        event: &ScheduledEventCreate,
    ) -> Result<ScheduledEvent, ApiError> {
        let mut created = self.created.lock().expect("created lock");
        created.push(event.clone());
        Ok(ScheduledEvent {
            id: format!("ev{}", created.len()),
            guild_id: guild_id.to_string(),
            channel_id: event.channel_id.clone(),
            name: event.name.clone(),
            description: event.description.clone(),
            scheduled_start_time: event.scheduled_start_time.clone(),
            scheduled_end_time: event.scheduled_end_time.clone(),
            entity_type: event.entity_type,
        })
    }
}
