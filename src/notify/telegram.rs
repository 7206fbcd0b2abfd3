use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Notifier, NotifyError};
use crate::config::TelegramConfig;

#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    admin_chat_id: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url)
            .field("bot_token", &"[REDACTED]")
            .field("admin_chat_id", &self.admin_chat_id)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &TelegramConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            admin_chat_id: config.admin_chat_id.clone(),
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip_all, fields(chat_id = %chat_id))]
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
        };

        // reqwest errors can echo the URL, which embeds the bot token.
        let response = self
            .client
            .post(self.send_message_url())
            .json(&payload)
            .send()
            .await
            .map_err(|err| NotifyError::Request(err.without_url().to_string()))?;

        let status = response.status();
        let result: ApiResponse = response
            .json()
            .await
            .map_err(|err| NotifyError::Response(err.without_url().to_string()))?;

        if !result.ok {
            return Err(NotifyError::Api(
                result
                    .description
                    .unwrap_or_else(|| format!("request failed with status {status}")),
            ));
        }

        debug!("message delivered");
        Ok(())
    }

    async fn notify_admin(&self, text: &str) -> Result<(), NotifyError> {
        self.send(&self.admin_chat_id, text).await
    }
}
