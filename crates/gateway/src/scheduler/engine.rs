//! Per-minute schedule evaluation.
//!
//! [`ScheduleEngine::evaluate`] is synchronous: it runs the digest, reminder,
//! and creation passes in that order, claiming each action in the
//! [`DedupStore`] before returning it. Delivery happens afterwards on the
//! task tracker, so a slow remote call never delays the next tick.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use channels::{ChannelResolver, MessagingApi};
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use parking_lot::RwLock;
use proto::rest::{ENTITY_TYPE_VOICE, PRIVACY_GUILD_ONLY};
use proto::schedule::parse_time_of_day;
use proto::{
    ConfigError, Schedule, ScheduleConfig, ScheduleError, ScheduledEvent, ScheduledEventCreate,
};
use tracing::{debug, error, info, warn};

use super::dedup::DedupStore;
use super::render;
use crate::tasks::TaskTracker;

/// Something the scheduler decided to do on one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Post the day's digest.
    Digest {
        date: NaiveDate,
        local_now: DateTime<Tz>,
        channel: String,
        entries: Vec<Schedule>,
    },
    /// Remind `lead_minutes` before today's occurrence.
    Reminder {
        schedule: Schedule,
        date: NaiveDate,
        lead_minutes: u32,
    },
    /// Create the remote event for the occurrence on `date`, then announce it.
    Create {
        schedule: Schedule,
        date: NaiveDate,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Digest { .. } => "digest",
            Self::Reminder { .. } => "reminder",
            Self::Create { .. } => "create",
        }
    }
}

/// Remote side of the actions.
#[derive(Clone)]
struct Delivery {
    api: Arc<dyn MessagingApi>,
    resolver: Arc<ChannelResolver>,
}

impl Delivery {
    async fn run(&self, action: Action) -> Result<(), ScheduleError> {
        match action {
            Action::Digest {
                local_now,
                channel,
                entries,
                ..
            } => {
                let channel_id = self.resolver.resolve(&channel).await?;
                self.api
                    .send_message(&channel_id, &render::digest(&local_now, &entries))
                    .await?;
                info!(entries = entries.len(), "Sent daily digest");
                Ok(())
            }
            Action::Reminder {
                schedule,
                lead_minutes,
                ..
            } => self.remind(&schedule, lead_minutes).await,
            Action::Create {
                schedule,
                start,
                end,
                ..
            } => self.create(&schedule, &start, &end).await.map(|_| ()),
        }
    }

    async fn remind(&self, schedule: &Schedule, lead_minutes: u32) -> Result<(), ScheduleError> {
        let channel_id = self.resolver.resolve(&schedule.notify_channel).await?;
        let voice = match self.resolver.resolve(&schedule.voice_channel).await {
            Ok(id) => format!("<#{id}>"),
            // The reminder still goes out; only the channel mention degrades.
            Err(e) => {
                warn!(schedule = %schedule.name, "Voice channel unresolved, using plain name: {e}");
                format!("#{}", schedule.voice_channel)
            }
        };
        self.api
            .send_message(&channel_id, &render::reminder(schedule, lead_minutes, &voice))
            .await?;
        info!(
            schedule = %schedule.name,
            "Sent {} reminder",
            render::lead_time_text(lead_minutes)
        );
        Ok(())
    }

    async fn create(
        &self,
        schedule: &Schedule,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> Result<ScheduledEvent, ScheduleError> {
        let voice_id = self.resolver.resolve(&schedule.voice_channel).await?;
        let notify_id = self.resolver.resolve(&schedule.notify_channel).await?;

        let body = ScheduledEventCreate {
            channel_id: Some(voice_id.clone()),
            name: schedule.name.clone(),
            description: Some(schedule.description.clone()).filter(|d| !d.is_empty()),
            scheduled_start_time: utc_rfc3339(start),
            scheduled_end_time: Some(utc_rfc3339(end)),
            entity_type: ENTITY_TYPE_VOICE,
            privacy_level: PRIVACY_GUILD_ONLY,
        };
        let guild_id = self.resolver.guild_id();
        let event = self.api.create_scheduled_event(guild_id, &body).await?;
        info!(
            schedule = %schedule.name,
            event_id = %event.id,
            start = %start.to_rfc3339(),
            "Created scheduled event"
        );

        let announcement = render::announcement(schedule, start, &voice_id, guild_id, &event.id);
        match self.api.send_message(&notify_id, &announcement).await {
            Ok(_) => info!(schedule = %schedule.name, "Sent event announcement"),
            Err(e) => warn!(schedule = %schedule.name, "Failed to announce event: {e}"),
        }
        Ok(event)
    }
}

/// Holds the loaded schedules and turns clock ticks into actions.
pub struct ScheduleEngine {
    config: RwLock<Arc<ScheduleConfig>>,
    dedup: Arc<DedupStore>,
    delivery: Delivery,
    tasks: TaskTracker,
    ticks: AtomicU64,
}

impl ScheduleEngine {
    /// Creates an engine with no schedules loaded.
    pub fn new(
        api: Arc<dyn MessagingApi>,
        resolver: Arc<ChannelResolver>,
        dedup: Arc<DedupStore>,
        tasks: TaskTracker,
    ) -> Self {
        Self {
            config: RwLock::new(Arc::new(ScheduleConfig::default())),
            dedup,
            delivery: Delivery { api, resolver },
            tasks,
            ticks: AtomicU64::new(0),
        }
    }

    /// Replaces the schedule set. Dedup state is kept.
    /// Problems are logged; affected schedules stay inert at tick time.
    pub fn load(&self, config: ScheduleConfig) -> usize {
        for problem in config.validate() {
            warn!("Schedule config: {problem}");
        }
        let count = config.schedules.len();
        *self.config.write() = Arc::new(config);
        info!(count, "Schedules loaded");
        count
    }

    /// Reads the resource at `path` and loads it. On error the previous set stays active.
    pub fn load_from_path(&self, path: &Path) -> Result<usize, ConfigError> {
        let config = ScheduleConfig::load(path)?;
        Ok(self.load(config))
    }

    /// Snapshot of the active configuration.
    pub fn config(&self) -> Arc<ScheduleConfig> {
        self.config.read().clone()
    }

    /// Schedule names in configuration order.
    pub fn schedule_names(&self) -> Vec<String> {
        self.config()
            .schedules
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn dedup(&self) -> &Arc<DedupStore> {
        &self.dedup
    }

    /// Ticks evaluated since start.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Decides what to do at `now`, marking every returned action as done.
    pub fn evaluate(&self, now: DateTime<Utc>) -> Vec<Action> {
        let config = self.config();
        let mut actions = Vec::new();
        actions.extend(digest_pass(&config, &self.dedup, now));
        actions.extend(reminder_pass(&config, &self.dedup, now));
        actions.extend(creation_pass(&config, &self.dedup, now));
        actions
    }

    /// Evaluates `now` and spawns delivery of every action. Returns the actions.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<Action> {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        let actions = self.evaluate(now);
        for action in &actions {
            let delivery = self.delivery.clone();
            let action = action.clone();
            self.tasks.spawn(async move {
                let kind = action.kind();
                if let Err(e) = delivery.run(action).await {
                    error!(kind, "Scheduled action failed: {e}");
                }
            });
        }
        if !actions.is_empty() {
            debug!(count = actions.len(), "Tick produced actions");
        }
        actions
    }

    /// Creates the next occurrence (within a week) of the schedule at 1-based
    /// `index`, unless that occurrence was already created.
    pub async fn create_event_by_index(
        &self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<ScheduledEvent, ScheduleError> {
        let config = self.config();
        let schedule = index
            .checked_sub(1)
            .and_then(|i| config.schedules.get(i))
            .ok_or(ScheduleError::UnknownIndex(index))?;
        let tz = schedule.tz()?;
        let time = schedule.time_of_day()?;
        let (date, start, end) = next_occurrence(schedule, tz, time, now)
            .ok_or_else(|| ScheduleError::InvalidDate(schedule.name.clone()))?;

        if !self.dedup.mark_created(&schedule.name, date) {
            return Err(ScheduleError::AlreadyCreated {
                schedule: schedule.name.clone(),
                date: date.to_string(),
            });
        }
        info!(schedule = %schedule.name, %date, "Manual event creation");
        self.delivery.create(schedule, &start, &end).await
    }
}

fn digest_pass(config: &ScheduleConfig, dedup: &DedupStore, now: DateTime<Utc>) -> Option<Action> {
    if !config.digest_enabled() {
        return None;
    }
    // The digest follows the first schedule's zone.
    let tz = match config.schedules.first()?.tz() {
        Ok(tz) => tz,
        Err(e) => {
            debug!("Digest skipped: {e}");
            return None;
        }
    };
    let at = parse_time_of_day(&config.digest_time)?;
    let local_now = now.with_timezone(&tz);
    if !same_minute_of_day(local_now.time(), at) {
        return None;
    }
    let date = local_now.date_naive();
    if !dedup.mark_digest(date) {
        return None;
    }
    let entries = config
        .schedules
        .iter()
        .filter(|s| s.runs_on(local_now.weekday()))
        .cloned()
        .collect();
    Some(Action::Digest {
        date,
        local_now,
        channel: config.digest_channel.clone(),
        entries,
    })
}

fn reminder_pass(config: &ScheduleConfig, dedup: &DedupStore, now: DateTime<Utc>) -> Vec<Action> {
    let mut actions = Vec::new();
    for schedule in &config.schedules {
        let Some((tz, time)) = parsed(schedule) else {
            continue;
        };
        let local_now = now.with_timezone(&tz);
        if !schedule.runs_on(local_now.weekday()) {
            continue;
        }
        let date = local_now.date_naive();
        let Some(start) = tz.from_local_datetime(&date.and_time(time)).earliest() else {
            continue;
        };
        for &lead in &config.reminder_minutes {
            let target = start - Duration::minutes(i64::from(lead));
            if !same_minute(&local_now, &target) {
                continue;
            }
            if dedup.mark_reminded(&schedule.name, date, lead) {
                actions.push(Action::Reminder {
                    schedule: schedule.clone(),
                    date,
                    lead_minutes: lead,
                });
            }
        }
    }
    actions
}

fn creation_pass(config: &ScheduleConfig, dedup: &DedupStore, now: DateTime<Utc>) -> Vec<Action> {
    let mut actions = Vec::new();
    for schedule in &config.schedules {
        let Some((tz, time)) = parsed(schedule) else {
            continue;
        };
        let local_now = now.with_timezone(&tz);
        let Some(tomorrow) = local_now.date_naive().succ_opt() else {
            continue;
        };
        if !schedule.runs_on(tomorrow.weekday()) || !same_minute_of_day(local_now.time(), time) {
            continue;
        }
        let Some((start, end)) = occurrence(tz, tomorrow, time, schedule.duration_minutes) else {
            debug!(schedule = %schedule.name, %tomorrow, "No such local time, skipping");
            continue;
        };
        if dedup.mark_created(&schedule.name, tomorrow) {
            actions.push(Action::Create {
                schedule: schedule.clone(),
                date: tomorrow,
                start,
                end,
            });
        }
    }
    actions
}

fn parsed(schedule: &Schedule) -> Option<(Tz, NaiveTime)> {
    match (schedule.tz(), schedule.time_of_day()) {
        (Ok(tz), Ok(time)) => Some((tz, time)),
        (Err(e), _) | (_, Err(e)) => {
            debug!(schedule = %schedule.name, "Skipping schedule this tick: {e}");
            None
        }
    }
}

/// Start and end instants of the occurrence on `date`. `None` inside a DST gap.
fn occurrence(
    tz: Tz,
    date: NaiveDate,
    time: NaiveTime,
    duration_minutes: u32,
) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
    let start = tz.from_local_datetime(&date.and_time(time)).earliest()?;
    let end = start + Duration::minutes(i64::from(duration_minutes));
    Some((start, end))
}

/// First occurrence starting at or after `now`, looking one week ahead.
fn next_occurrence(
    schedule: &Schedule,
    tz: Tz,
    time: NaiveTime,
    now: DateTime<Utc>,
) -> Option<(NaiveDate, DateTime<Tz>, DateTime<Tz>)> {
    let today = now.with_timezone(&tz).date_naive();
    today
        .iter_days()
        .take(8)
        .filter(|date| schedule.runs_on(date.weekday()))
        .filter_map(|date| {
            occurrence(tz, date, time, schedule.duration_minutes).map(|(s, e)| (date, s, e))
        })
        .find(|(_, start, _)| *start >= now)
}

fn same_minute_of_day(time: NaiveTime, target: NaiveTime) -> bool {
    time.hour() == target.hour() && time.minute() == target.minute()
}

fn same_minute(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.timestamp().div_euclid(60) == b.timestamp().div_euclid(60)
}

fn utc_rfc3339(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true)
}
