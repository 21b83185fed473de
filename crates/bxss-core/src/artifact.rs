use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Fingerprint used in storage keys when the report carried none.
pub const ZERO_FINGERPRINT: &str = "00000000-0000-0000-0000-000000000000";

/// Lifetime of a signed screenshot URL.
pub const SIGNED_URL_TTL_SECS: i64 = 15 * 60;

/// A screenshot persisted to object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub bucket_key: String,
    pub signed_url: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Derives `<scope>/<fingerprint>/<random id>.png`.
///
/// The scope is `clients/<name>` when a client name is given, else `all`.
/// The random id makes every key unique even for identical inputs.
#[must_use]
pub fn artifact_key(client_name: Option<&str>, fingerprint: Option<&str>) -> String {
    let fingerprint = fingerprint
        .filter(|f| !f.is_empty())
        .unwrap_or(ZERO_FINGERPRINT);
    let id = Uuid::new_v4();

    match client_name.filter(|n| !n.is_empty()) {
        Some(name) => format!("clients/{name}/{fingerprint}/{id}.png"),
        None => format!("all/{fingerprint}/{id}.png"),
    }
}
