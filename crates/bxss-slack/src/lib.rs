//! Slack notifications for collected reports.
//!
//! [`blocks`] turns a [`bxss_core::CollectedReport`] into a Block Kit
//! message; [`SlackClient`] posts it with `chat.postMessage`.

pub mod blocks;
pub mod client;
pub mod error;

pub use blocks::{report_blocks, screenshot_block, Block, Text};
pub use client::SlackClient;
pub use error::NotificationDispatchError;
