//! Screenshot persistence in Cloud Storage.

use base64::{engine::general_purpose, Engine as _};
use bxss_core::{artifact_key, StoredArtifact, SIGNED_URL_TTL_SECS};
use chrono::Utc;
use reqwest::{Client, Url};

use crate::auth::TokenSource;
use crate::error::StorageError;
use crate::signing::UrlSigner;

/// Uploads objects through the JSON API and signs read URLs for them.
#[derive(Debug, Clone)]
pub struct GcsClient {
    client: Client,
    base_url: String,
    bucket: String,
    tokens: TokenSource,
    signer: UrlSigner,
}

impl GcsClient {
    #[must_use]
    pub fn new(
        client: Client,
        base_url: &str,
        bucket: &str,
        tokens: TokenSource,
        signer: UrlSigner,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            tokens,
            signer,
        }
    }

    /// Stores a screenshot and returns a read URL valid for 15 minutes.
    ///
    /// `screenshot` is a data URL (`data:image/png;base64,...`) or bare
    /// base64. The image is decoded in memory, so concurrent uploads share
    /// no staging location.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidScreenshot`] if the image is not base64.
    /// - [`StorageError::Token`], [`StorageError::Http`] or
    ///   [`StorageError::UploadStatus`] if the upload fails.
    /// - [`StorageError::Signing`] if the URL cannot be signed.
    pub async fn store_screenshot(
        &self,
        screenshot: &str,
        client_name: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Result<StoredArtifact, StorageError> {
        let bytes = decode_screenshot(screenshot)?;
        let key = artifact_key(client_name, fingerprint);

        self.upload(&key, bytes, "image/png").await?;

        let signed = self
            .signer
            .sign_read(&self.bucket, &key, Utc::now(), SIGNED_URL_TTL_SECS)?;
        tracing::info!(key = %key, expires_at = %signed.expires_at, "screenshot stored");

        Ok(StoredArtifact {
            bucket_key: key,
            signed_url: signed.url,
            issued_at: signed.issued_at,
            expires_at: signed.expires_at,
        })
    }

    /// Uploads `bytes` under `key` with a single media upload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on token, network or non-2xx failures.
    pub async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let url = self.upload_url(key)?;
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::UploadStatus {
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }

    fn upload_url(&self, key: &str) -> Result<Url, StorageError> {
        let raw = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);
        let mut url = Url::parse(&raw).map_err(|e| StorageError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);
        Ok(url)
    }
}

/// Decodes the base64 part of a data URL, or the whole value if it has no
/// `data:` prefix.
///
/// # Errors
///
/// Returns [`StorageError::InvalidScreenshot`] when the payload is not base64.
pub fn decode_screenshot(screenshot: &str) -> Result<Vec<u8>, StorageError> {
    let encoded = match screenshot.split_once(',') {
        Some((_, data)) => data,
        None => screenshot,
    };
    Ok(general_purpose::STANDARD.decode(encoded.trim())?)
}
