//! CLI entrypoint and subcommand orchestration.

mod bot;
mod commands;
mod config;
mod daemon;
#[cfg(test)]
mod test_support;

use clap::{Parser, Subcommand};
use proto::{Schedule, ScheduleConfig};

#[cfg(not(test))]
use crate::bot::Bot;
#[cfg(not(test))]
use config::Config;
#[cfg(not(test))]
use tracing::info;
#[cfg(not(test))]
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Top-level command-line arguments for the bot.
#[derive(Parser)]
#[command(name = "cnayp-bot")]
#[command(about = "Discord community scheduling bot", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging to ~/.cnayp-bot/logs/debug.log
    #[arg(long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands available in the application.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Connect to the gateway and run the scheduler (default)
    Start,
    /// Validate the schedule file and print it without connecting
    Check,
}

#[cfg(not(test))]
#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Start);

    // RUST_LOG wins over --log-level.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    let debug_writer = if cli.debug {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let log_dir = std::path::PathBuf::from(home)
            .join(".cnayp-bot")
            .join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        _file_guard = Some(guard);
        Some(writer)
    } else {
        _file_guard = None;
        None
    };

    match debug_writer {
        Some(writer) => {
            let console = fmt::layer().with_target(false).with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new(
                    "debug,hyper_util=info,rustls=info,reqwest=info,tungstenite=info,tokio_tungstenite=info",
                ));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        None => {
            fmt()
                .with_env_filter(console_filter)
                .with_target(false)
                .init();
        }
    }

    if cli.debug {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            command = ?command,
            log_level = %cli.log_level,
            "========== cnayp-bot session start =========="
        );
    }

    let config = Config::load(cli.config.as_deref())?;

    match command {
        Commands::Start => cmd_start(config).await,
        Commands::Check => cmd_check(&config),
    }
}

#[cfg(not(test))]
/// Runs the bot until SIGINT or SIGTERM.
async fn cmd_start(config: Config) -> anyhow::Result<()> {
    let bot = Bot::new(config)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        daemon::wait_for_shutdown().await;
        let _ = shutdown_tx.send(true);
    });

    bot.run(shutdown_rx).await
}

#[cfg(not(test))]
/// Loads the schedule file and prints what would run.
fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let schedules = ScheduleConfig::load(&config.schedule.path)?;
    println!("{}", check_report(&schedules));
    let problems = schedules.validate();
    if !problems.is_empty() {
        anyhow::bail!("{} problem(s) in {}", problems.len(), config.schedule.path.display());
    }
    Ok(())
}

/// Human-readable summary of a schedule file, problems last.
fn check_report(config: &ScheduleConfig) -> String {
    let mut lines = vec![format!("{} schedule(s)", config.schedules.len())];
    lines.extend(
        config
            .schedules
            .iter()
            .enumerate()
            .map(|(i, schedule)| format!("{}. {}", i + 1, describe_schedule(schedule))),
    );
    if config.digest_enabled() {
        lines.push(format!(
            "Digest at {} in #{}",
            config.digest_time, config.digest_channel
        ));
    }
    let reminders: Vec<String> = config
        .reminder_minutes
        .iter()
        .map(|m| m.to_string())
        .collect();
    lines.push(format!("Reminders: {} minutes before", reminders.join(", ")));
    for problem in config.validate() {
        lines.push(format!("problem: {problem}"));
    }
    lines.join("\n")
}

fn describe_schedule(schedule: &Schedule) -> String {
    format!(
        "{} - {} at {} ({}), {} min, voice #{}, notify #{}",
        schedule.name,
        schedule.days.join(", "),
        schedule.time,
        schedule.timezone,
        schedule.duration_minutes,
        schedule.voice_channel,
        schedule.notify_channel,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScheduleConfig {
        ScheduleConfig::from_json(
            r#"{
                "schedules": [{
                    "name": "Study Group",
                    "voice_channel": "study-voice",
                    "notify_channel": "events",
                    "days": ["monday", "wednesday"],
                    "time": "17:00",
                    "timezone": "America/New_York",
                    "duration_minutes": 90
                }],
                "digest_time": "08:00",
                "digest_channel": "general"
            }"#,
        )
        .expect("valid config")
    }

    #[test]
    fn cli_defaults_to_start() {
        let cli = Cli::parse_from(["cnayp-bot"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.debug);
    }

    #[test]
    fn cli_parses_check_with_config() {
        let cli = Cli::parse_from(["cnayp-bot", "--config", "bot.toml", "check"]);
        assert_eq!(cli.command, Some(Commands::Check));
        assert_eq!(cli.config, Some(std::path::PathBuf::from("bot.toml")));
    }

    #[test]
    fn describe_schedule_lists_days_time_and_zone() {
        let config = sample();
        assert_eq!(
            describe_schedule(&config.schedules[0]),
            "Study Group - monday, wednesday at 17:00 (America/New_York), 90 min, voice #study-voice, notify #events"
        );
    }

    #[test]
    fn check_report_includes_digest_and_reminders() {
        let report = check_report(&sample());
        assert!(report.starts_with("1 schedule(s)\n1. Study Group"));
        assert!(report.contains("Digest at 08:00 in #general"));
        assert!(report.contains("Reminders: 60, 15 minutes before"));
        assert!(!report.contains("problem:"));
    }

    #[test]
    fn check_report_lists_problems() {
        let mut config = sample();
        config.schedules[0].timezone = "Mars/Olympus".to_string();
        let report = check_report(&config);
        assert!(report.contains("problem:"));
    }
}
