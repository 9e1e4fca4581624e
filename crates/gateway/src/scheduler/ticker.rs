//! Cron-driven clock for the schedule engine.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

use super::engine::ScheduleEngine;

/// Fires at second zero of every minute.
pub const EVERY_MINUTE: &str = "0 * * * * *";

/// Wraps tokio-cron-scheduler to tick a [`ScheduleEngine`] on a schedule
pub struct MinuteTicker {
    sched: JobScheduler,
}

impl MinuteTicker {
    /// Creates a new ticker instance.
    pub async fn new() -> Result<Self, String> {
        let sched = JobScheduler::new().await.map_err(|e| e.to_string())?;
        Ok(Self { sched })
    }

    /// Ticks `engine` at the start of every minute.
    pub async fn add_engine(&self, engine: Arc<ScheduleEngine>) -> Result<uuid::Uuid, String> {
        self.add_tick_job(EVERY_MINUTE, engine).await
    }

    /// Add a cron job that ticks `engine` with the wall-clock time
    pub async fn add_tick_job(
        &self,
        cron_expr: &str,
        engine: Arc<ScheduleEngine>,
    ) -> Result<uuid::Uuid, String> {
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let engine = engine.clone();
            Box::pin(async move {
                let actions = engine.tick(Utc::now());
                debug!(actions = actions.len(), "Schedule tick");
            })
        })
        .map_err(|e| e.to_string())?;

        let id = self.sched.add(job).await.map_err(|e| e.to_string())?;
        info!("Tick job added: {id} ({cron_expr})");
        Ok(id)
    }

    /// Starts ticking in the background.
    pub async fn start(&self) -> Result<(), String> {
        self.sched.start().await.map_err(|e| e.to_string())?;
        info!("MinuteTicker started");
        Ok(())
    }

    /// Stops ticking. Deliveries already spawned are left to the task tracker.
    pub async fn shutdown(&mut self) -> Result<(), String> {
        self.sched.shutdown().await.map_err(|e| e.to_string())?;
        info!("MinuteTicker shutdown");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use channels::ChannelResolver;
    use tokio::time::{Duration, Instant, sleep};

    use super::*;
    use crate::scheduler::DedupStore;
    use crate::tasks::TaskTracker;
    use crate::test_support::RecordingApi;

    fn idle_engine() -> Arc<ScheduleEngine> {
        let api = Arc::new(RecordingApi::default());
        let resolver = Arc::new(ChannelResolver::new(api.clone(), "g1"));
        Arc::new(ScheduleEngine::new(
            api,
            resolver,
            Arc::new(DedupStore::new()),
            TaskTracker::new(),
        ))
    }

    #[tokio::test]
    async fn add_tick_job_rejects_invalid_cron_expression() {
        let ticker = MinuteTicker::new().await.expect("ticker");
        let result = ticker.add_tick_job("invalid cron", idle_engine()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn every_minute_expression_is_accepted() {
        let ticker = MinuteTicker::new().await.expect("ticker");
        let id = ticker.add_engine(idle_engine()).await.expect("job");
        assert_ne!(id, uuid::Uuid::nil());
    }

    #[tokio::test]
    async fn ticks_engine_until_shutdown() {
        let mut ticker = MinuteTicker::new().await.expect("ticker");
        let engine = idle_engine();
        ticker
            .add_tick_job("1/1 * * * * *", engine.clone())
            .await
            .expect("job should be added");

        ticker.start().await.expect("ticker starts");
        let deadline = Instant::now() + Duration::from_secs(3);
        while engine.ticks() == 0 && Instant::now() < deadline {
            sleep(Duration::from_millis(50)).await;
        }
        assert!(engine.ticks() >= 1);

        ticker.shutdown().await.expect("ticker shutdown");
    }
}
