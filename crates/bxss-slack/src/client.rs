//! HTTP client for the Slack Web API.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::blocks::{Block, HEADER_TEXT};
use crate::error::NotificationDispatchError;

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    /// Fallback for clients that cannot render blocks.
    text: &'a str,
    blocks: &'a [Block],
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts messages with a bot token supplied per call, since the token is
/// only known once secrets have been resolved.
#[derive(Debug, Clone)]
pub struct SlackClient {
    client: Client,
    base_url: String,
}

impl SlackClient {
    /// Creates a client for the Web API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationDispatchError::Http`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn with_base_url(
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, NotificationDispatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends `blocks` to `channel` via `chat.postMessage`.
    ///
    /// # Errors
    ///
    /// - [`NotificationDispatchError::Http`] on network failure.
    /// - [`NotificationDispatchError::UnexpectedStatus`] for a non-2xx answer.
    /// - [`NotificationDispatchError::Api`] when Slack answers `ok: false`
    ///   (bad token, unknown channel, invalid blocks).
    pub async fn post_message(
        &self,
        token: &str,
        channel: &str,
        blocks: &[Block],
    ) -> Result<(), NotificationDispatchError> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let request = PostMessageRequest {
            channel,
            text: HEADER_TEXT,
            blocks,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotificationDispatchError::UnexpectedStatus {
                status: response.status().as_u16(),
            });
        }

        let body: PostMessageResponse = response.json().await?;
        if !body.ok {
            return Err(NotificationDispatchError::Api(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        tracing::debug!(channel, blocks = blocks.len(), "notification posted");
        Ok(())
    }
}
