//! Reports posted back by the delivered payload.
//!
//! The body comes from an arbitrary browser context, so every field is
//! optional and scalar fields accept any JSON type: a number where a string
//! was expected is kept as its JSON text instead of failing the whole body.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Placeholder rendered for fields the collector did not send.
pub const NOT_AVAILABLE: &str = "N/A";

/// Wire shape of the `/collect` JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportBody {
    #[serde(deserialize_with = "lenient_string")]
    pub clientip: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub fingerprint: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub referrer: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub origin: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ua: Option<String>,
    #[serde(rename = "localStorage", deserialize_with = "opaque_value")]
    pub local_storage: Option<serde_json::Value>,
    #[serde(rename = "sessionStorage", deserialize_with = "opaque_value")]
    pub session_storage: Option<serde_json::Value>,
    #[serde(deserialize_with = "lenient_string")]
    pub cookies: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub screenshot: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub clientname: Option<String>,
}

/// A normalized report, consumed once to build a notification.
#[derive(Debug, Clone)]
pub struct CollectedReport {
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub fingerprint: Option<String>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub referrer: Option<String>,
    pub origin: Option<String>,
    pub user_agent: Option<String>,
    pub local_storage: Option<serde_json::Value>,
    pub session_storage: Option<serde_json::Value>,
    pub cookies: Option<String>,
    /// Lowercase header name to value; repeated headers joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub screenshot: Option<String>,
    pub client_name: Option<String>,
}

impl CollectedReport {
    /// Normalizes a posted body together with the request headers.
    ///
    /// The client IP falls back to `x-forwarded-for` when the body has none.
    /// Empty strings are treated as absent.
    #[must_use]
    pub fn from_body(
        body: ReportBody,
        headers: BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let client_ip = non_empty(body.clientip)
            .or_else(|| headers.get("x-forwarded-for").cloned())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            timestamp,
            client_ip,
            fingerprint: non_empty(body.fingerprint),
            url: body.url,
            location: body.location,
            referrer: body.referrer,
            origin: body.origin,
            user_agent: body.ua,
            local_storage: body.local_storage,
            session_storage: body.session_storage,
            cookies: body.cookies,
            headers,
            screenshot: non_empty(body.screenshot),
            client_name: non_empty(body.clientname),
        }
    }

    /// The fingerprint as displayed in notifications.
    #[must_use]
    pub fn fingerprint_label(&self) -> &str {
        self.fingerprint.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    /// JSON text of the request headers, stable for a fixed header set.
    #[must_use]
    pub fn headers_json(&self) -> String {
        serde_json::to_string(&self.headers).unwrap_or_else(|_| "{}".to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn opaque_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()))
}
