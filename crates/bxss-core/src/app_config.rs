use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Base URLs of the external services. Overridable so the server can be
/// pointed at emulators or mock servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub secret_manager_url: String,
    pub storage_url: String,
    /// Host (with scheme) that signed read URLs are issued against.
    pub signing_host: String,
    pub metadata_url: String,
    pub slack_api_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            secret_manager_url: "https://secretmanager.googleapis.com".to_string(),
            storage_url: "https://storage.googleapis.com".to_string(),
            signing_host: "https://storage.googleapis.com".to_string(),
            metadata_url: "http://metadata.google.internal".to_string(),
            slack_api_url: "https://slack.com/api".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub extract_url: String,
    pub slack_token_secret_name: String,
    pub slack_channel_secret_name: String,
    pub storage_bucket: String,
    pub hmac_access_id: String,
    pub hmac_secret: String,
    pub gcp_access_token: Option<String>,
    pub http_timeout_secs: u64,
    pub endpoints: Endpoints,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("extract_url", &self.extract_url)
            .field("slack_token_secret_name", &self.slack_token_secret_name)
            .field("slack_channel_secret_name", &self.slack_channel_secret_name)
            .field("storage_bucket", &self.storage_bucket)
            .field("hmac_access_id", &self.hmac_access_id)
            .field("hmac_secret", &"[redacted]")
            .field(
                "gcp_access_token",
                &self.gcp_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
