//! Google Cloud adapters for the collector: Secret Manager for messaging
//! credentials and Cloud Storage for screenshots.
//!
//! All clients take their base URLs explicitly so they can be pointed at
//! emulators or `wiremock` servers.

pub mod auth;
pub mod error;
pub mod secrets;
pub mod signing;
pub mod storage;

pub use auth::TokenSource;
pub use error::{SecretFetchError, StorageError, TokenError};
pub use secrets::{SecretManagerClient, SecretResolver};
pub use signing::{SignedUrl, UrlSigner};
pub use storage::{decode_screenshot, GcsClient};
