//! Wires the gateway, router, scheduler, and REST client into one running bot.

use std::sync::Arc;
use std::time::Duration;

use channels::{ChannelResolver, MessagingApi, RestClient};
use gateway::{
    DedupStore, DisconnectReason, EventRouter, GatewayConfig, GatewayConnection, MinuteTicker,
    ScheduleEngine, TaskTracker,
};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::commands;
use crate::config::Config;
use crate::daemon;

/// Time in-flight listeners and deliveries get to finish on shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const INITIAL_BACKOFF: Duration = Duration::from_secs(5);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Reconnect delay: starts at 5s and doubles up to 60s.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            next: INITIAL_BACKOFF,
        }
    }
}

impl Backoff {
    /// Delay to wait now; the following one is doubled.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }

    pub fn reset(&mut self) {
        self.next = INITIAL_BACKOFF;
    }
}

/// Runs connections until `shutdown` fires, waiting between attempts.
pub async fn reconnect_loop(connection: &GatewayConnection, mut shutdown: watch::Receiver<bool>) {
    let mut backoff = Backoff::default();
    loop {
        match connection.run(shutdown.clone()).await {
            Ok(disconnect) if disconnect.reason == DisconnectReason::Shutdown => return,
            Ok(disconnect) => {
                if disconnect.reached_ready() {
                    backoff.reset();
                }
                warn!(reason = ?disconnect.reason, "Gateway connection ended");
            }
            Err(e) => error!("Gateway connection failed: {e}"),
        }
        if *shutdown.borrow() {
            return;
        }

        let delay = backoff.next_delay();
        info!("Reconnecting in {}s", delay.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

/// Name sent in the identify descriptor.
pub const BOT_NAME: &str = "cnayp-bot";

/// Fully wired bot.
pub struct Bot {
    config: Config,
    engine: Arc<ScheduleEngine>,
    router: Arc<EventRouter>,
    tasks: TaskTracker,
}

impl Bot {
    /// Builds every component. Credentials must already be present.
    pub fn new(config: Config) -> proto::Result<Self> {
        config.require_credentials()?;

        let api: Arc<dyn MessagingApi> = Arc::new(RestClient::new(
            &config.discord.token,
            config.discord.api_base_url.clone(),
        )?);
        let resolver = Arc::new(ChannelResolver::new(
            api.clone(),
            config.discord.guild_id.clone(),
        ));
        let tasks = TaskTracker::new();
        let engine = Arc::new(ScheduleEngine::new(
            api.clone(),
            resolver,
            Arc::new(DedupStore::new()),
            tasks.clone(),
        ));
        let router = Arc::new(EventRouter::new(tasks.clone()));
        commands::register(&router, api, engine.clone());

        Ok(Self {
            config,
            engine,
            router,
            tasks,
        })
    }

    /// Runs until `shutdown` fires, then drains in-flight work.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let schedule_path = self.config.schedule.path.clone();
        if !daemon::reload_schedules(&self.engine, &schedule_path) {
            warn!("Starting without schedules; send SIGHUP after fixing the file");
        }

        let mut ticker = MinuteTicker::new().await.map_err(anyhow::Error::msg)?;
        ticker
            .add_engine(self.engine.clone())
            .await
            .map_err(anyhow::Error::msg)?;
        ticker.start().await.map_err(anyhow::Error::msg)?;

        let reload = tokio::spawn(daemon::reload_on_hangup(
            self.engine.clone(),
            schedule_path,
            shutdown.clone(),
        ));

        let gateway_config = GatewayConfig::new(self.config.discord.token.clone())
            .with_url(self.config.discord.gateway_url.clone())
            .with_client_name(BOT_NAME);
        let connection = GatewayConnection::new(gateway_config, self.router.clone());
        info!("Starting bot");
        reconnect_loop(&connection, shutdown).await;

        if let Err(e) = ticker.shutdown().await {
            warn!("Ticker shutdown failed: {e}");
        }
        match reload.await {
            Ok(Err(e)) => warn!("Reload handler failed: {e}"),
            Err(e) => warn!("Reload task failed: {e}"),
            Ok(Ok(())) => {}
        }
        let aborted = self.tasks.shutdown(SHUTDOWN_GRACE).await;
        info!(aborted, "Bot shutdown complete");
        Ok(())
    }
}
