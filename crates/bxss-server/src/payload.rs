//! Renders the collector script delivered on `GET /`.

use bxss_core::CollectionConfig;

const TEMPLATE: &str = include_str!("../templates/payload.js");

pub const CONTENT_TYPE: &str = "application/javascript; charset=utf-8";

/// Substitutes the collection config and extraction URL into the template.
///
/// Both are inserted as JSON literals, so client-controlled values such as
/// the client name end up as quoted strings.
///
/// # Errors
///
/// Returns a `serde_json::Error` if either value fails to serialize.
pub fn render(config: &CollectionConfig, extract_url: &str) -> Result<String, serde_json::Error> {
    let config_json = serde_json::to_string(config)?;
    let url_json = serde_json::to_string(extract_url)?;

    Ok(TEMPLATE
        .replace("{{CONFIG}}", &config_json)
        .replace("{{EXTRACT_URL}}", &url_json))
}
