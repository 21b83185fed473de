use thiserror::Error;

/// The notification could not be delivered to Slack.
#[derive(Debug, Error)]
pub enum NotificationDispatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack returned HTTP {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Slack API error: {0}")]
    Api(String),

    #[error("messaging secrets unavailable")]
    MissingSecrets,
}
