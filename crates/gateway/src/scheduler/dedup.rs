use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{Days, NaiveDate};
use parking_lot::Mutex;

/// Claimed creation dates older than this, relative to the newest claim, are forgotten.
const CREATED_RETENTION: Days = Days::new(14);

/// Records which automated actions already ran.
///
/// Every `mark_*` call is an atomic check-and-set: it returns `true` exactly
/// once per key, so concurrent ticks and manual commands cannot both act.
/// Lives outside the schedule resource and survives reloads.
#[derive(Debug, Default)]
pub struct DedupStore {
    /// schedule name -> occurrence dates created
    created: Mutex<HashMap<String, BTreeSet<NaiveDate>>>,
    /// (schedule name, occurrence date, lead minutes)
    reminded: Mutex<HashSet<(String, NaiveDate, u32)>>,
    last_digest: Mutex<Option<NaiveDate>>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the creation of `schedule` on `date`.
    /// Fails only when that same date is already recorded.
    pub fn mark_created(&self, schedule: &str, date: NaiveDate) -> bool {
        let mut created = self.created.lock();
        let dates = created.entry(schedule.to_string()).or_default();
        if !dates.insert(date) {
            return false;
        }
        if let Some(cutoff) = dates
            .last()
            .and_then(|newest| newest.checked_sub_days(CREATED_RETENTION))
        {
            dates.retain(|d| *d >= cutoff);
        }
        true
    }

    /// Latest occurrence date created for `schedule`.
    pub fn last_created(&self, schedule: &str) -> Option<NaiveDate> {
        self.created
            .lock()
            .get(schedule)
            .and_then(|dates| dates.last().copied())
    }

    /// Claims the reminder for `schedule` on `date` at `lead_minutes`.
    pub fn mark_reminded(&self, schedule: &str, date: NaiveDate, lead_minutes: u32) -> bool {
        self.reminded
            .lock()
            .insert((schedule.to_string(), date, lead_minutes))
    }

    /// Claims the digest for `date`.
    pub fn mark_digest(&self, date: NaiveDate) -> bool {
        let mut last = self.last_digest.lock();
        if *last == Some(date) {
            return false;
        }
        *last = Some(date);
        true
    }

    pub fn last_digest(&self) -> Option<NaiveDate> {
        *self.last_digest.lock()
    }
}
