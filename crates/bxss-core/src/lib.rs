//! Domain types and configuration shared by the blind-XSS collector crates.
//!
//! Nothing in here performs I/O: the cloud and messaging adapters live in
//! `bxss-gcp` and `bxss-slack`, the HTTP surface in `bxss-server`.

pub mod app_config;
pub mod artifact;
pub mod collection;
pub mod config;
pub mod report;
pub mod secrets;

use thiserror::Error;

pub use app_config::{AppConfig, Endpoints, Environment};
pub use artifact::{artifact_key, StoredArtifact, SIGNED_URL_TTL_SECS, ZERO_FINGERPRINT};
pub use collection::{CollectionConfig, PayloadQuery};
pub use config::{load_app_config, load_app_config_from_env};
pub use report::{CollectedReport, ReportBody, NOT_AVAILABLE};
pub use secrets::Secrets;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
