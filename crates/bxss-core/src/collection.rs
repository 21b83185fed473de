//! Per-request collection settings derived from the payload URL's query string.

use serde::Serialize;

/// Raw query parameters accepted on the payload route.
///
/// `n` and `f` carry values; `c` and `b` are presence flags, so any value
/// (including an empty one, as in `?c`) switches them on.
#[derive(Debug, Clone, Default)]
pub struct PayloadQuery {
    pub n: Option<String>,
    pub f: Option<String>,
    pub c: Option<String>,
    pub b: Option<String>,
}

impl PayloadQuery {
    /// Collects the known flags from raw `key=value` pairs.
    ///
    /// Repeated keys are accepted: `n` and `f` keep their first non-empty
    /// value, and a repeated `c` or `b` is still just present. Unknown keys
    /// are ignored.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "n" => &mut query.n,
                "f" => &mut query.f,
                "c" => &mut query.c,
                "b" => &mut query.b,
                _ => continue,
            };
            if slot.as_deref().map_or(true, str::is_empty) {
                *slot = Some(value.clone());
            }
        }
        query
    }
}

/// Controls what the delivered payload collects. Serialized verbatim into
/// the rendered script, hence the camelCase field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    pub enable_external_calls: bool,
    pub take_screenshot: bool,
    pub client_name: Option<String>,
    pub forced_fingerprint: Option<String>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            enable_external_calls: true,
            take_screenshot: true,
            client_name: None,
            forced_fingerprint: None,
        }
    }
}

impl CollectionConfig {
    /// Applies the query flags in the order `n`, `f`, `c`, `b`.
    ///
    /// `c` and `b` write the same two fields, so when both are present `b`
    /// wins: external calls off, screenshot on. Values of `n` and `f` are
    /// passed through untouched; empty values are ignored.
    #[must_use]
    pub fn from_query(query: &PayloadQuery) -> Self {
        let mut config = Self::default();

        if let Some(name) = query.n.as_deref().filter(|v| !v.is_empty()) {
            config.client_name = Some(name.to_string());
        }
        if let Some(fingerprint) = query.f.as_deref().filter(|v| !v.is_empty()) {
            config.forced_fingerprint = Some(fingerprint.to_string());
        }
        if query.c.is_some() {
            config.enable_external_calls = false;
            config.take_screenshot = false;
        }
        if query.b.is_some() {
            config.enable_external_calls = false;
            config.take_screenshot = true;
        }

        config
    }
}
