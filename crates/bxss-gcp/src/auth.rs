//! OAuth access tokens for Google APIs.

use reqwest::Client;
use serde::Deserialize;

use crate::error::TokenError;

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Where bearer tokens for Secret Manager and Cloud Storage come from.
///
/// On Cloud Functions / Cloud Run the metadata server hands out tokens for
/// the attached service account; elsewhere a static token can be supplied.
#[derive(Debug, Clone)]
pub enum TokenSource {
    Static(String),
    Metadata { client: Client, base_url: String },
}

impl TokenSource {
    #[must_use]
    pub fn metadata(client: Client, base_url: &str) -> Self {
        Self::Metadata {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Returns a bearer token. Metadata tokens are fetched on every call.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the metadata server is unreachable or
    /// answers with a non-success status.
    pub async fn access_token(&self) -> Result<String, TokenError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Metadata { client, base_url } => {
                let response = client
                    .get(format!("{base_url}{TOKEN_PATH}"))
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(TokenError::UnexpectedStatus {
                        status: response.status().as_u16(),
                    });
                }

                let token: MetadataToken = response.json().await?;
                Ok(token.access_token)
            }
        }
    }
}
