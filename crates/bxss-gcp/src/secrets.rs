//! Secret Manager access and the process-wide secret cache.

use base64::{engine::general_purpose, Engine as _};
use bxss_core::Secrets;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::auth::TokenSource;
use crate::error::SecretFetchError;

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Deserialize)]
struct SecretPayload {
    #[serde(default)]
    data: String,
}

/// Minimal client for the Secret Manager `versions:access` endpoint.
#[derive(Debug, Clone)]
pub struct SecretManagerClient {
    client: Client,
    base_url: String,
    tokens: TokenSource,
}

impl SecretManagerClient {
    #[must_use]
    pub fn new(client: Client, base_url: &str, tokens: TokenSource) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Fetches a secret version by its full resource name
    /// (`projects/<p>/secrets/<s>/versions/<v>`) and returns it as text.
    ///
    /// # Errors
    ///
    /// - [`SecretFetchError::Token`] if no access token could be obtained.
    /// - [`SecretFetchError::Http`] on network failure.
    /// - [`SecretFetchError::UnexpectedStatus`] for a non-2xx answer, such as
    ///   an unknown name or missing permission.
    /// - [`SecretFetchError::Decode`] / [`SecretFetchError::Utf8`] when the
    ///   payload is not base64-encoded UTF-8.
    pub async fn access_secret(&self, name: &str) -> Result<String, SecretFetchError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/v1/{}:access", self.base_url, name.trim_start_matches('/'));

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(SecretFetchError::UnexpectedStatus {
                name: name.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: AccessSecretVersionResponse = response.json().await?;
        let bytes = general_purpose::STANDARD
            .decode(body.payload.data.as_bytes())
            .map_err(|source| SecretFetchError::Decode {
                name: name.to_string(),
                source,
            })?;

        String::from_utf8(bytes).map_err(|source| SecretFetchError::Utf8 {
            name: name.to_string(),
            source,
        })
    }
}

/// Resolves the messaging credential and channel id on first use and keeps
/// them for the lifetime of the process.
///
/// Concurrent first callers wait on the same initialization; a failed
/// resolution leaves the cache empty so a later call tries again.
#[derive(Debug)]
pub struct SecretResolver {
    client: SecretManagerClient,
    credential_name: String,
    channel_name: String,
    cache: OnceCell<Secrets>,
}

impl SecretResolver {
    #[must_use]
    pub fn new(client: SecretManagerClient, credential_name: &str, channel_name: &str) -> Self {
        Self {
            client,
            credential_name: credential_name.to_string(),
            channel_name: channel_name.to_string(),
            cache: OnceCell::new(),
        }
    }

    /// Returns the cached secrets, fetching both values if none are cached.
    ///
    /// # Errors
    ///
    /// Returns the first [`SecretFetchError`] from either fetch.
    pub async fn ensure_secrets(&self) -> Result<&Secrets, SecretFetchError> {
        self.cache.get_or_try_init(|| self.fetch()).await
    }

    /// Secrets resolved so far, without triggering a fetch.
    #[must_use]
    pub fn cached(&self) -> Option<&Secrets> {
        self.cache.get()
    }

    async fn fetch(&self) -> Result<Secrets, SecretFetchError> {
        let (messaging_credential, channel_id) = tokio::try_join!(
            self.client.access_secret(&self.credential_name),
            self.client.access_secret(&self.channel_name),
        )?;
        tracing::info!("messaging secrets resolved");

        Ok(Secrets {
            messaging_credential,
            channel_id,
        })
    }
}
