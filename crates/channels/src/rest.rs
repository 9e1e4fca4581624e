//! reqwest-backed implementation of [`MessagingApi`].

use async_trait::async_trait;
use proto::{ApiError, Channel, Message, MessageCreate, ScheduledEvent, ScheduledEventCreate};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::MessagingApi;

/// Default REST base URL (API v10).
pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

const USER_AGENT_VALUE: &str = concat!(
    "DiscordBot (https://github.com/kenesparta/discord-cnayp-bots, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// REST client authenticated with a bot token.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Builds a client for `base_url` sending `Authorization: Bot <token>` on every request.
    pub fn new(token: &str, base_url: impl Into<String>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|e| ApiError::Transport(format!("invalid token header: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MessagingApi for RestClient {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<Message, ApiError> {
        let url = self.url(&format!("/channels/{channel_id}/messages"));
        debug!(%channel_id, len = content.len(), "POST message");
        let response = self
            .http
            .post(&url)
            .json(&MessageCreate { content })
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::read(response).await
    }

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, ApiError> {
        let url = self.url(&format!("/guilds/{guild_id}/channels"));
        debug!(%guild_id, "GET guild channels");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::read(response).await
    }

    async fn create_scheduled_event(
        &self,
        guild_id: &str,
        event: &ScheduledEventCreate,
    ) -> Result<ScheduledEvent, ApiError> {
        let url = self.url(&format!("/guilds/{guild_id}/scheduled-events"));
        debug!(%guild_id, name = %event.name, "POST scheduled event");
        let response = self
            .http
            .post(&url)
            .json(event)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::read(response).await
    }
}
