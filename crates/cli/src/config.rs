use proto::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "cnayp-bot.toml";
/// Schedule resource location when nothing overrides it.
pub const DEFAULT_SCHEDULE_PATH: &str = "config/schedules.json";

/// Bot credentials and endpoints.
#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Also read from `DISCORD_BOT_TOKEN`.
    #[serde(default)]
    pub token: String,
    /// Guild whose channels and events the bot manages. Also read from `DISCORD_GUILD_ID`.
    #[serde(default)]
    pub guild_id: String,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_gateway_url() -> String {
    gateway::DEFAULT_GATEWAY_URL.to_string()
}

fn default_api_base_url() -> String {
    channels::DEFAULT_API_BASE_URL.to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            guild_id: String::new(),
            gateway_url: default_gateway_url(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("guild_id", &self.guild_id)
            .field("gateway_url", &self.gateway_url)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Where the schedule resource lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleFileConfig {
    #[serde(default = "default_schedule_path")]
    pub path: PathBuf,
}

fn default_schedule_path() -> PathBuf {
    PathBuf::from(DEFAULT_SCHEDULE_PATH)
}

impl Default for ScheduleFileConfig {
    fn default() -> Self {
        Self {
            path: default_schedule_path(),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub schedule: ScheduleFileConfig,
}

impl Config {
    /// Loads configuration from explicit path, fallback location, and env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            let cwd = std::env::current_dir().ok()?.join(DEFAULT_CONFIG_FILE);
            cwd.exists().then_some(cwd)
        });
        debug!(path = ?config_path, "Config file resolved");

        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?
        } else {
            Config::default()
        };

        // Environment variable overrides; empty values count as unset
        if let Some(token) = env_value("DISCORD_BOT_TOKEN") {
            config.discord.token = token;
        }
        if let Some(guild_id) = env_value("DISCORD_GUILD_ID") {
            config.discord.guild_id = guild_id;
        }
        if let Some(path) = env_value("DISCORD_SCHEDULE_PATH") {
            config.schedule.path = PathBuf::from(path);
        }
        if let Some(url) = env_value("DISCORD_GATEWAY_URL") {
            config.discord.gateway_url = url;
        }
        if let Some(url) = env_value("DISCORD_API_BASE_URL") {
            config.discord.api_base_url = url;
        }

        config.validate_endpoints()?;

        debug!(
            guild_id = %config.discord.guild_id,
            schedule_path = %config.schedule.path.display(),
            "Config loaded"
        );
        Ok(config)
    }

    /// Checks that each endpoint uses a scheme its client can dial.
    pub fn validate_endpoints(&self) -> Result<(), ConfigError> {
        check_scheme("gateway_url", &self.discord.gateway_url, &["ws://", "wss://"])?;
        check_scheme(
            "api_base_url",
            &self.discord.api_base_url,
            &["http://", "https://"],
        )
    }

    /// Fails on the first required field that is still empty.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.discord.token.trim().is_empty() {
            return Err(ConfigError::MissingField("DISCORD_BOT_TOKEN".to_string()));
        }
        if self.discord.guild_id.trim().is_empty() {
            return Err(ConfigError::MissingField("DISCORD_GUILD_ID".to_string()));
        }
        Ok(())
    }
}

fn check_scheme(field: &str, url: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    if schemes.iter().any(|scheme| url.starts_with(scheme)) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{url}' must start with {}", schemes.join(" or ")),
    })
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{remove_env_var, set_env_var, with_locked_env};

    const KEYS: [&str; 5] = [
        "DISCORD_BOT_TOKEN",
        "DISCORD_GUILD_ID",
        "DISCORD_SCHEDULE_PATH",
        "DISCORD_GATEWAY_URL",
        "DISCORD_API_BASE_URL",
    ];

    fn clear_env() {
        for key in KEYS {
            remove_env_var(key);
        }
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write config");
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert!(cfg.discord.token.is_empty());
        assert_eq!(cfg.discord.gateway_url, gateway::DEFAULT_GATEWAY_URL);
        assert_eq!(cfg.discord.api_base_url, "https://discord.com/api/v10");
        assert_eq!(cfg.schedule.path, PathBuf::from("config/schedules.json"));
    }

    #[test]
    fn env_overrides_file_values() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let path = tmp.path().join("bot.toml");
            write_file(
                &path,
                r#"
[discord]
token = "from-file"
guild_id = "111"

[schedule]
path = "file/schedules.json"
"#,
            );
            set_env_var("DISCORD_BOT_TOKEN", "from-env");
            set_env_var("DISCORD_SCHEDULE_PATH", "env/schedules.json");

            let cfg = Config::load(Some(&path)).expect("load");
            assert_eq!(cfg.discord.token, "from-env");
            assert_eq!(cfg.discord.guild_id, "111");
            assert_eq!(cfg.schedule.path, PathBuf::from("env/schedules.json"));
            assert_eq!(cfg.discord.gateway_url, gateway::DEFAULT_GATEWAY_URL);
            clear_env();
        });
    }

    #[test]
    fn empty_env_values_are_ignored() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let path = tmp.path().join("bot.toml");
            write_file(&path, "[discord]\nguild_id = \"222\"\n");
            set_env_var("DISCORD_GUILD_ID", "");

            let cfg = Config::load(Some(&path)).expect("load");
            assert_eq!(cfg.discord.guild_id, "222");
            clear_env();
        });
    }

    #[test]
    fn endpoint_overrides_from_env() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let path = tmp.path().join("empty.toml");
            write_file(&path, "");
            set_env_var("DISCORD_GATEWAY_URL", "ws://127.0.0.1:9000");
            set_env_var("DISCORD_API_BASE_URL", "http://127.0.0.1:9001/api");

            let cfg = Config::load(Some(&path)).expect("load");
            assert_eq!(cfg.discord.gateway_url, "ws://127.0.0.1:9000");
            assert_eq!(cfg.discord.api_base_url, "http://127.0.0.1:9001/api");
            clear_env();
        });
    }

    #[test]
    fn wrong_endpoint_scheme_is_invalid_value() {
        with_locked_env(|| {
            clear_env();
            let tmp = tempfile::tempdir().expect("tempdir");
            let path = tmp.path().join("bot.toml");
            write_file(&path, "[discord]\ngateway_url = \"https://gateway.example\"\n");

            let err = Config::load(Some(&path)).expect_err("http gateway");
            match err {
                ConfigError::InvalidValue { field, .. } => assert_eq!(field, "gateway_url"),
                other => panic!("unexpected error: {other:?}"),
            }

            set_env_var("DISCORD_GATEWAY_URL", "wss://gateway.example");
            set_env_var("DISCORD_API_BASE_URL", "ftp://api.example");
            let err = Config::load(Some(&path)).expect_err("ftp api");
            assert!(err.to_string().contains("api_base_url"));
            clear_env();
        });
    }

    #[test]
    fn missing_credentials_are_reported_in_order() {
        let mut cfg = Config::default();
        let err = cfg.require_credentials().expect_err("no token");
        assert!(err.to_string().contains("DISCORD_BOT_TOKEN"));

        cfg.discord.token = "t".to_string();
        let err = cfg.require_credentials().expect_err("no guild");
        assert!(err.to_string().contains("DISCORD_GUILD_ID"));

        cfg.discord.guild_id = "1".to_string();
        assert!(cfg.require_credentials().is_ok());
    }

    #[test]
    fn invalid_toml_is_a_toml_error() {
        with_locked_env(|| {
            let tmp = tempfile::tempdir().expect("tempdir");
            let path = tmp.path().join("broken.toml");
            write_file(&path, "[discord\ntoken = ");
            let err = Config::load(Some(&path)).expect_err("broken file");
            assert!(matches!(err, ConfigError::Toml(_)));
        });
    }

    #[test]
    fn missing_explicit_file_is_io_error() {
        let err = Config::load(Some(Path::new("/nonexistent/cnayp-bot.toml")))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn debug_output_redacts_token() {
        let mut cfg = Config::default();
        cfg.discord.token = "secret-token".to_string();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("secret-token"));
    }
}
