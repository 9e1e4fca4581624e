//! Chat commands handled on `MESSAGE_CREATE`.

use std::sync::Arc;

use channels::MessagingApi;
use chrono::{DateTime, Utc};
use gateway::scheduler::render;
use gateway::{EventRouter, ScheduleEngine, handler};
use proto::Message;
use tracing::{debug, warn};

pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";

const USAGE: &str = "Usage: `!schedule <number>`";

/// A recognised chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    ListSchedules,
    /// `!schedule <arg>`; the argument is validated when replying.
    CreateSchedule(String),
}

impl Command {
    /// Recognises `content`, or `None` for ordinary chat.
    pub fn parse(content: &str) -> Option<Self> {
        match content {
            "!ping" => Some(Self::Ping),
            "!schedule" => Some(Self::ListSchedules),
            _ => content
                .strip_prefix("!schedule ")
                .map(|arg| Self::CreateSchedule(arg.trim().to_string())),
        }
    }
}

/// Runs `command` and returns the reply text.
pub async fn reply(command: Command, engine: &ScheduleEngine, now: DateTime<Utc>) -> String {
    match command {
        Command::Ping => "pong!".to_string(),
        Command::ListSchedules => render::schedule_list(&engine.schedule_names()),
        Command::CreateSchedule(arg) if arg.is_empty() => USAGE.to_string(),
        Command::CreateSchedule(arg) => {
            let Ok(index) = arg.parse::<usize>() else {
                return "Invalid number. Use `!schedule` to see available options.".to_string();
            };
            match engine.create_event_by_index(index, now).await {
                Ok(event) => format!("Created scheduled event: **{}**", event.name),
                Err(e) => {
                    warn!(index, "Manual event creation failed: {e}");
                    format!("Failed to create event: {e}")
                }
            }
        }
    }
}

/// Registers the command listener on `router`. Messages from bots are ignored.
pub fn register(router: &EventRouter, api: Arc<dyn MessagingApi>, engine: Arc<ScheduleEngine>) {
    router.register(
        MESSAGE_CREATE,
        handler(move |data| {
            let api = api.clone();
            let engine = engine.clone();
            async move {
                let message: Message = serde_json::from_value(data)?;
                if message.from_bot() {
                    return Ok(());
                }
                let Some(command) = Command::parse(&message.content) else {
                    return Ok(());
                };
                debug!(?command, channel_id = %message.channel_id, "Chat command");
                let text = reply(command, &engine, Utc::now()).await;
                api.send_message(&message.channel_id, &text).await?;
                Ok(())
            }
        }),
    );
}
