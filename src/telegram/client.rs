use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::types::{AnswerCallbackQuery, ApiResponse, GetUpdates, SendMessage, Update};
use crate::error::TelegramError;

/// Thin Bot API client over `reqwest`.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    poll_timeout_secs: u64,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TelegramClient {
    pub fn new(base_url: &str, token: &str, poll_timeout_secs: u64) -> Result<Self, TelegramError> {
        // long polls hold the connection for poll_timeout_secs
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .map_err(TelegramError::from)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            poll_timeout_secs,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(TelegramError::Api(
                description.unwrap_or_else(|| format!("{} failed", method)),
            )),
        }
    }

    /// Long-polls for updates after `offset`.
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let body = GetUpdates {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: vec!["message", "callback_query"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &body).await?;
        debug!(count = updates.len(), "Updates received");
        Ok(updates)
    }

    #[instrument(fields(chat_id = message.chat_id), skip(self, message))]
    pub async fn send_message(&self, message: &SendMessage) -> Result<(), TelegramError> {
        let _: serde_json::Value = self.call("sendMessage", message).await?;
        Ok(())
    }

    /// Stops the client-side spinner on a pressed button.
    #[instrument(skip(self))]
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        let body = AnswerCallbackQuery {
            callback_query_id: callback_query_id.to_string(),
        };
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }
}
