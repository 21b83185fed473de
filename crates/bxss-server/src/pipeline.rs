//! Collection pipeline: report → optional screenshot upload → Slack.

use std::time::Duration;

use bxss_core::{AppConfig, CollectedReport};
use bxss_gcp::{
    GcsClient, SecretManagerClient, SecretResolver, StorageError, TokenSource, UrlSigner,
};
use bxss_slack::{report_blocks, screenshot_block, NotificationDispatchError, SlackClient};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed report body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("screenshot storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("notification dispatch failed: {0}")]
    Notification(#[from] NotificationDispatchError),
}

/// External collaborators of the pipeline, shared by all requests.
#[derive(Debug)]
pub struct Collector {
    storage: GcsClient,
    secrets: SecretResolver,
    slack: SlackClient,
}

impl Collector {
    #[must_use]
    pub fn new(storage: GcsClient, secrets: SecretResolver, slack: SlackClient) -> Self {
        Self {
            storage,
            secrets,
            slack,
        }
    }

    /// Wires the Google Cloud and Slack clients from configuration.
    ///
    /// # Errors
    ///
    /// Fails if an HTTP client cannot be built or the signing host is invalid.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let endpoints = &config.endpoints;

        let tokens = match &config.gcp_access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::metadata(http.clone(), &endpoints.metadata_url),
        };

        let secrets = SecretResolver::new(
            SecretManagerClient::new(http.clone(), &endpoints.secret_manager_url, tokens.clone()),
            &config.slack_token_secret_name,
            &config.slack_channel_secret_name,
        );
        let signer = UrlSigner::new(
            &config.hmac_access_id,
            &config.hmac_secret,
            &endpoints.signing_host,
        )?;
        let storage = GcsClient::new(
            http,
            &endpoints.storage_url,
            &config.storage_bucket,
            tokens,
            signer,
        );
        let slack = SlackClient::with_base_url(config.http_timeout_secs, &endpoints.slack_api_url)?;

        Ok(Self::new(storage, secrets, slack))
    }

    /// Builds the notification, stores the screenshot if there is one, and
    /// posts the result.
    ///
    /// A storage failure aborts the notification. When secrets cannot be
    /// resolved the dispatch is skipped rather than attempted without a
    /// credential.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Storage`] or [`PipelineError::Notification`].
    pub async fn process(&self, report: CollectedReport) -> Result<(), PipelineError> {
        let mut blocks = report_blocks(&report);

        if let Some(screenshot) = report.screenshot.as_deref() {
            let artifact = self
                .storage
                .store_screenshot(
                    screenshot,
                    report.client_name.as_deref(),
                    report.fingerprint.as_deref(),
                )
                .await?;
            match screenshot_block(&artifact.signed_url) {
                Some(block) => blocks.push(block),
                None => tracing::warn!(
                    key = %artifact.bucket_key,
                    "signed URL too long for an image block; screenshot omitted"
                ),
            }
        }

        let secrets = match self.secrets.ensure_secrets().await {
            Ok(secrets) => secrets,
            Err(e) => {
                tracing::error!(error = %e, "secret resolution failed");
                return Err(NotificationDispatchError::MissingSecrets.into());
            }
        };

        self.slack
            .post_message(&secrets.messaging_credential, &secrets.channel_id, &blocks)
            .await?;

        tracing::info!(
            fingerprint = report.fingerprint_label(),
            client_ip = %report.client_ip,
            "report dispatched"
        );
        Ok(())
    }
}
