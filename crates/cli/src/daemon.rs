//! Process signal handling: shutdown and schedule reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gateway::ScheduleEngine;
#[cfg(not(test))]
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

/// Wait for SIGTERM or SIGINT shutdown signal
#[cfg(not(test))]
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for ctrl-c");
        info!("Received Ctrl-C, shutting down");
    }
}

/// Re-reads the schedule resource into `engine`. A failed read keeps the active set.
pub fn reload_schedules(engine: &ScheduleEngine, path: &Path) -> bool {
    match engine.load_from_path(path) {
        Ok(count) => {
            info!(count, path = %path.display(), "Schedules reloaded");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), "Schedule reload failed, keeping previous set: {e}");
            false
        }
    }
}

/// Reloads schedules on every SIGHUP until `shutdown` fires.
#[cfg(unix)]
pub async fn reload_on_hangup(
    engine: Arc<ScheduleEngine>,
    path: PathBuf,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            received = hangup.recv() => {
                if received.is_none() {
                    return Ok(());
                }
                info!("Received SIGHUP, reloading schedules");
                reload_schedules(&engine, &path);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Ok(());
                }
            }
        }
    }
}

/// No hangup signal off unix; waits for shutdown only.
#[cfg(not(unix))]
pub async fn reload_on_hangup(
    _engine: Arc<ScheduleEngine>,
    _path: PathBuf,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    while shutdown.changed().await.is_ok() {
        if *shutdown.borrow() {
            break;
        }
    }
    Ok(())
}
