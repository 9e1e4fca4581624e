//! Schedule configuration resource.
//!
//! The resource is a JSON document listing recurring events plus the digest
//! and reminder parameters shared by all of them.

use std::path::Path;

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ScheduleError};

/// Lead times used when the resource lists none.
pub const DEFAULT_REMINDER_MINUTES: [u32; 2] = [60, 15];

/// One recurring event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Unique key; also the remote event name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub voice_channel: String,
    pub notify_channel: String,
    /// Weekday names, case-insensitive (`monday`, `Mon`, ...).
    pub days: Vec<String>,
    /// Local start time, `HH:MM`.
    pub time: String,
    /// IANA zone name.
    pub timezone: String,
    pub duration_minutes: u32,
}

impl Schedule {
    /// Parses the IANA zone.
    pub fn tz(&self) -> Result<Tz, ScheduleError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ScheduleError::InvalidTimezone {
                schedule: self.name.clone(),
                timezone: self.timezone.clone(),
            })
    }

    /// Parses the `HH:MM` start time.
    pub fn time_of_day(&self) -> Result<NaiveTime, ScheduleError> {
        parse_time_of_day(&self.time).ok_or_else(|| ScheduleError::InvalidTime {
            schedule: self.name.clone(),
            time: self.time.clone(),
        })
    }

    /// Whether `day` is one of the configured weekdays.
    pub fn runs_on(&self, day: Weekday) -> bool {
        self.days
            .iter()
            .any(|name| name.trim().parse::<Weekday>().ok() == Some(day))
    }

    /// Day names that are not weekdays; they never match.
    pub fn unknown_days(&self) -> Vec<&str> {
        self.days
            .iter()
            .filter(|name| name.trim().parse::<Weekday>().is_err())
            .map(String::as_str)
            .collect()
    }
}

/// Root of the schedule resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    /// `HH:MM`; empty disables the digest.
    #[serde(default)]
    pub digest_time: String,
    /// Channel name; empty disables the digest.
    #[serde(default)]
    pub digest_channel: String,
    #[serde(default)]
    pub reminder_minutes: Vec<u32>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            schedules: Vec::new(),
            digest_time: String::new(),
            digest_channel: String::new(),
            reminder_minutes: DEFAULT_REMINDER_MINUTES.to_vec(),
        }
    }
}

impl ScheduleConfig {
    /// Parses the JSON resource, filling the default lead times when none are listed.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Json(e.to_string()))?;
        if config.reminder_minutes.is_empty() {
            config.reminder_minutes = DEFAULT_REMINDER_MINUTES.to_vec();
        }
        Ok(config)
    }

    /// Reads and parses the resource at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Whether both digest fields are set.
    pub fn digest_enabled(&self) -> bool {
        !self.digest_time.trim().is_empty() && !self.digest_channel.trim().is_empty()
    }

    /// Human-readable problems that make schedules inert at tick time.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for schedule in &self.schedules {
            if !seen.insert(schedule.name.as_str()) {
                problems.push(format!("duplicate schedule name '{}'", schedule.name));
            }
            if let Err(e) = schedule.tz() {
                problems.push(e.to_string());
            }
            if let Err(e) = schedule.time_of_day() {
                problems.push(e.to_string());
            }
            for day in schedule.unknown_days() {
                problems.push(format!(
                    "unknown day '{day}' for schedule {}",
                    schedule.name
                ));
            }
        }
        if self.digest_enabled() && parse_time_of_day(&self.digest_time).is_none() {
            problems.push(format!("invalid digest_time '{}'", self.digest_time));
        }
        problems
    }
}

/// Parses `HH:MM` (single-digit hours allowed).
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M").ok()
}
