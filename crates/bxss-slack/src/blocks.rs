//! Block Kit layout for a collected report.

use bxss_core::{CollectedReport, NOT_AVAILABLE};
use serde::Serialize;

pub const HEADER_TEXT: &str = "[New] Blind XSS Collected";

/// Slack rejects section text longer than this.
const MAX_SECTION_TEXT: usize = 3000;
/// Limit for each item of a section's `fields`.
const MAX_FIELD_TEXT: usize = 2000;
/// Limit for an image block's `image_url`.
const MAX_IMAGE_URL: usize = 3000;
const TRUNCATED_MARKER: &str = "…[truncated]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: Text,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
    },
    Image {
        title: Text,
        image_url: String,
        alt_text: String,
    },
}

impl Block {
    fn section(text: String) -> Self {
        Self::Section {
            text: Some(Text::Mrkdwn { text }),
            fields: Vec::new(),
        }
    }
}

/// Builds the fixed layout: header, timestamp, client IP and fingerprint
/// side by side, then one section per collected field.
#[must_use]
pub fn report_blocks(report: &CollectedReport) -> Vec<Block> {
    let opaque = |value: Option<&serde_json::Value>| {
        value.map_or_else(|| NOT_AVAILABLE.to_string(), serde_json::Value::to_string)
    };

    let mut blocks = vec![
        Block::Header {
            text: Text::PlainText {
                text: HEADER_TEXT.to_string(),
                emoji: true,
            },
        },
        Block::section(format!("*Date:*\n`{}`", report.timestamp.to_rfc2822())),
        Block::Section {
            text: None,
            fields: vec![
                Text::Mrkdwn {
                    text: labelled("Client IP", &report.client_ip, false, MAX_FIELD_TEXT),
                },
                Text::Mrkdwn {
                    text: labelled(
                        "Fingerprint",
                        report.fingerprint_label(),
                        false,
                        MAX_FIELD_TEXT,
                    ),
                },
            ],
        },
    ];

    let fields = [
        ("URL", or_na(report.url.as_deref())),
        ("Location", or_na(report.location.as_deref())),
        ("Referrer", or_na(report.referrer.as_deref())),
        ("Origin", or_na(report.origin.as_deref())),
        ("User-Agent", or_na(report.user_agent.as_deref())),
        ("Local Storage", opaque(report.local_storage.as_ref())),
        ("Session Storage", opaque(report.session_storage.as_ref())),
        ("Cookies", or_na(report.cookies.as_deref())),
        ("Headers", report.headers_json()),
    ];
    blocks.extend(
        fields
            .iter()
            .map(|(label, value)| Block::section(labelled(label, value, true, MAX_SECTION_TEXT))),
    );

    blocks
}

/// Image block pointing at a stored screenshot, or `None` when the URL is
/// longer than Slack accepts for an image.
#[must_use]
pub fn screenshot_block(image_url: &str) -> Option<Block> {
    if image_url.chars().count() > MAX_IMAGE_URL {
        return None;
    }
    Some(Block::Image {
        title: Text::PlainText {
            text: "Screenshot".to_string(),
            emoji: true,
        },
        image_url: image_url.to_string(),
        alt_text: "GCP Screenshot".to_string(),
    })
}

fn or_na(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

/// `*Label:*\nvalue`, with the value in a code span when `code` is set.
/// Values are cut so the whole text stays within `limit` characters.
fn labelled(label: &str, value: &str, code: bool, limit: usize) -> String {
    let tick = if code { "`" } else { "" };
    let overhead = label.chars().count() + 4 + tick.len() * 2;
    let budget = limit - overhead;

    let value = if value.chars().count() > budget {
        let keep = budget - TRUNCATED_MARKER.chars().count();
        let cut: String = value.chars().take(keep).collect();
        format!("{cut}{TRUNCATED_MARKER}")
    } else {
        value.to_string()
    };

    format!("*{label}:*\n{tick}{value}{tick}")
}
