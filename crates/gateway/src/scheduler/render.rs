//! Message bodies posted by the scheduler.

use chrono::{DateTime, TimeZone};
use proto::Schedule;

/// `"N minutes"` below an hour, otherwise whole hours (`"1 hour"`, `"2 hours"`).
pub fn lead_time_text(minutes: u32) -> String {
    if minutes >= 60 {
        match minutes / 60 {
            1 => "1 hour".to_string(),
            hours => format!("{hours} hours"),
        }
    } else {
        format!("{minutes} minutes")
    }
}

/// Reminder body. `voice` is either a channel mention or a plain `#name` fallback.
pub fn reminder(schedule: &Schedule, lead_minutes: u32, voice: &str) -> String {
    format!(
        "⏰ @everyone **Reminder:** {} starts in {}!\n\n\
         ⏱️ **Duration:** {} minutes\n\
         {}\n\n\
         📍 Join us in {voice}",
        schedule.name,
        lead_time_text(lead_minutes),
        schedule.duration_minutes,
        schedule.description,
    )
}

/// Announcement posted after a remote event is created.
pub fn announcement<Tz: TimeZone>(
    schedule: &Schedule,
    start: &DateTime<Tz>,
    voice_channel_id: &str,
    guild_id: &str,
    event_id: &str,
) -> String {
    let unix = start.timestamp();
    format!(
        "🎉 Hello @everyone\n\
         **New Event Alert!**\n\n\
         📌 **{name}**\n\
         {description}\n\n\
         🗓️ **When:** <t:{unix}:F> (<t:{unix}:R>)\n\
         🌐 **Timezone:** {timezone}\n\
         ⏱️ **Duration:** {duration} minutes\n\
         📍 **Where:** <#{voice_channel_id}>\n\n\
         See you there! 👋\n\
         https://discord.com/events/{guild_id}/{event_id}",
        name = schedule.name,
        description = schedule.description,
        timezone = schedule.timezone,
        duration = schedule.duration_minutes,
    )
}

/// Daily digest listing `entries` for the day of `local_now`.
pub fn digest<Tz: TimeZone>(local_now: &DateTime<Tz>, entries: &[Schedule]) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let header = format!("**Daily Schedule - {}**\n\n", local_now.format("%A, %B %-d"));
    if entries.is_empty() {
        return format!("{header}No events scheduled for today.");
    }
    entries.iter().fold(header, |mut body, entry| {
        body.push_str(&format!(
            "- **{}** at {} ({} min)\n",
            entry.name, entry.time, entry.duration_minutes
        ));
        body
    })
}

/// Reply to a bare `!schedule`.
pub fn schedule_list(names: &[String]) -> String {
    if names.is_empty() {
        return "No schedules configured.".to_string();
    }
    let mut reply = "**Available schedules:**\n".to_string();
    for (i, name) in names.iter().enumerate() {
        reply.push_str(&format!("`{}` - {name}\n", i + 1));
    }
    reply.push_str("\nUsage: `!schedule <number>`");
    reply
}
