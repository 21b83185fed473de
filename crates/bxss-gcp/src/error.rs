use thiserror::Error;

/// Failure obtaining an OAuth access token for Google APIs.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("metadata server returned HTTP {status}")]
    UnexpectedStatus { status: u16 },
}

/// The secret store was unreachable, denied access, or returned an unusable payload.
#[derive(Debug, Error)]
pub enum SecretFetchError {
    #[error("access token unavailable: {0}")]
    Token(#[from] TokenError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("secret {name} returned HTTP {status}")]
    UnexpectedStatus { name: String, status: u16 },

    #[error("secret {name} payload is not valid base64: {source}")]
    Decode {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("secret {name} payload is not UTF-8: {source}")]
    Utf8 {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Upload or signed-URL issuance failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("screenshot is not valid base64: {0}")]
    InvalidScreenshot(#[from] base64::DecodeError),

    #[error("access token unavailable: {0}")]
    Token(#[from] TokenError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload of {key} returned HTTP {status}")]
    UploadStatus { key: String, status: u16 },

    #[error("invalid storage URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("URL signing failed: {0}")]
    Signing(String),
}
