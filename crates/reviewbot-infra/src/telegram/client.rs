//! TelegramTransport -- concrete [`Transport`] for the Telegram Bot API.
//!
//! Calls Bot API methods as `POST {api_base}/bot{token}/{method}` with JSON
//! bodies. Besides the `Transport` port it exposes the methods the update
//! poller and the webhook commands need.
//!
//! The bot token is wrapped in [`secrecy::SecretString`] and only exposed
//! when building a request URL. Request errors are stripped of their URL
//! before they are surfaced, so the token never reaches a log line.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use reviewbot_core::transport::Transport;
use reviewbot_types::config::TelegramSettings;
use reviewbot_types::error::TransportError;
use reviewbot_types::reply::{Delivery, OutboundMessage};

use super::render::{render, render_markup};
use super::types::{ApiResponse, SendMessageRequest, SentMessage, TgFile, Update};

/// Update kinds requested from Telegram, for both polling and the webhook.
const ALLOWED_UPDATES: &[&str] = &["message"];

/// Slack added to the HTTP timeout on top of the long-poll timeout.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Telegram Bot API client.
///
/// Cloning is cheap; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct TelegramTransport {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    token: SecretString,
    api_base: String,
}

// No Debug derive: only the base URL is printed.
impl std::fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("api_base", &self.inner.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct GetFileParams<'a> {
    file_id: &'a str,
}

#[derive(Serialize)]
struct GetUpdatesParams<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SetWebhookParams<'a> {
    url: &'a str,
    allowed_updates: &'a [&'a str],
}

impl<'a> SetWebhookParams<'a> {
    fn new(url: &'a str) -> Self {
        Self {
            url,
            allowed_updates: ALLOWED_UPDATES,
        }
    }
}

#[derive(Serialize)]
struct NoParams {}

impl TelegramTransport {
    pub fn new(token: SecretString, settings: &TelegramSettings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.poll_timeout_secs) + HTTP_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                token,
                api_base: settings.api_base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.inner.api_base,
            self.inner.token.expose_secret()
        )
    }

    /// Download URL for a `getFile` path.
    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{file_path}",
            self.inner.api_base,
            self.inner.token.expose_secret()
        )
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, TransportError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .inner
            .client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| TransportError::Request(format!("{method}: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(format!("{method}: {}", e.without_url())))?;

        let parsed: ApiResponse<R> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                TransportError::Decode(format!("{method}: {e}"))
            } else {
                TransportError::Api {
                    code: i64::from(status.as_u16()),
                    description: status.to_string(),
                }
            }
        })?;
        parsed.into_result()
    }

    /// Long-poll for updates with `update_id >= offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TransportError> {
        let params = GetUpdatesParams {
            offset,
            timeout: timeout_secs,
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call("getUpdates", &params).await
    }

    /// Register `url` as the webhook. Returns the raw `result`.
    pub async fn set_webhook(&self, url: &str) -> Result<serde_json::Value, TransportError> {
        self.call("setWebhook", &SetWebhookParams::new(url)).await
    }

    /// Current webhook status. Returns the raw `result`.
    pub async fn webhook_info(&self) -> Result<serde_json::Value, TransportError> {
        self.call("getWebhookInfo", &NoParams {}).await
    }

    /// Remove the webhook so `getUpdates` can be used.
    pub async fn delete_webhook(&self) -> Result<serde_json::Value, TransportError> {
        self.call("deleteWebhook", &NoParams {}).await
    }
}

/// Build the `sendMessage` body for an outbound reply.
pub fn send_message_request(message: &OutboundMessage) -> SendMessageRequest {
    let rendered = render(&message.reply);
    SendMessageRequest {
        chat_id: message.chat_id.0,
        text: rendered.text,
        entities: rendered.entities,
        reply_markup: render_markup(message.markup),
    }
}

impl Transport for TelegramTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<Delivery, TransportError> {
        let request = send_message_request(message);
        let sent: SentMessage = self.call("sendMessage", &request).await?;
        Ok(Delivery {
            message_id: sent.message_id,
        })
    }

    async fn resolve_media_url(&self, file_id: &str) -> Result<String, TransportError> {
        let file: TgFile = self.call("getFile", &GetFileParams { file_id }).await?;
        let file_path = file.file_path.ok_or_else(|| {
            TransportError::Decode(format!("getFile returned no file_path for {}", file.file_id))
        })?;
        Ok(self.file_url(&file_path))
    }
}
