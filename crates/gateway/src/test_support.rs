use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use channels::MessagingApi;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use proto::{ApiError, Channel, Message, Schedule, ScheduledEvent, ScheduledEventCreate};

pub(crate) fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("test timestamp")
        .with_timezone(&Utc)
}

pub(crate) fn schedule(name: &str, days: &[&str], time: &str, timezone: &str) -> Schedule {
    Schedule {
        name: name.to_string(),
        description: format!("{name} session"),
        voice_channel: "study-voice".to_string(),
        notify_channel: "events".to_string(),
        days: days.iter().map(|d| d.to_string()).collect(),
        time: time.to_string(),
        timezone: timezone.to_string(),
        duration_minutes: 60,
    }
}

/// In-memory API that records every call.
#[derive(Default)]
pub(crate) struct RecordingApi {
    channels: Vec<(String, String)>,
    sent: Mutex<Vec<(String, String)>>,
    created: Mutex<Vec<ScheduledEventCreate>>,
    next_event: AtomicUsize,
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

    /// `(channel_id, content)` pairs in send order.
    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    pub(crate) fn created(&self) -> Vec<ScheduledEventCreate> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl MessagingApi for RecordingApi {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<Message, ApiError> {
        let mut sent = self.sent.lock();
        sent.push((channel_id.to_string(), content.to_string()));
        Ok(Message {
            id: format!("m{}", sent.len()),
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
        self.created.lock().push(event.clone());
        let n = self.next_event.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ScheduledEvent {
            id: format!("ev{n}"),
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
