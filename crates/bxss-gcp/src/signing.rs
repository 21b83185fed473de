//! Cloud Storage V4 signed URLs using an HMAC key (`GOOG4-HMAC-SHA256`).

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::error::StorageError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "GOOG4-HMAC-SHA256";

/// Everything except RFC 3986 unreserved characters.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Same as [`QUERY_ENCODE`] but keeps path separators.
const PATH_ENCODE: &AsciiSet = &QUERY_ENCODE.remove(b'/');

/// A read URL together with its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues read-only signed URLs for objects.
#[derive(Clone)]
pub struct UrlSigner {
    access_id: String,
    secret: String,
    base: Url,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("access_id", &self.access_id)
            .field("secret", &"[redacted]")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl UrlSigner {
    /// `signing_host` is the scheme and host URLs are issued against,
    /// normally `https://storage.googleapis.com`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidUrl`] if `signing_host` has no host.
    pub fn new(access_id: &str, secret: &str, signing_host: &str) -> Result<Self, StorageError> {
        let base = Url::parse(signing_host).map_err(|e| StorageError::InvalidUrl {
            url: signing_host.to_string(),
            reason: e.to_string(),
        })?;
        if base.host_str().is_none() {
            return Err(StorageError::InvalidUrl {
                url: signing_host.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self {
            access_id: access_id.to_string(),
            secret: secret.to_string(),
            base,
        })
    }

    /// Signs a `GET` for `bucket/key`, valid for `ttl_secs` from `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Signing`] if the HMAC cannot be keyed.
    pub fn sign_read(
        &self,
        bucket: &str,
        key: &str,
        issued_at: DateTime<Utc>,
        ttl_secs: i64,
    ) -> Result<SignedUrl, StorageError> {
        let datetime = issued_at.format("%Y%m%dT%H%M%SZ").to_string();
        let date = issued_at.format("%Y%m%d").to_string();
        let scope = format!("{date}/auto/storage/goog4_request");
        let credential = format!("{}/{scope}", self.access_id);

        let host = self.host_header();
        let path = format!(
            "/{}/{}",
            utf8_percent_encode(bucket, QUERY_ENCODE),
            utf8_percent_encode(key, PATH_ENCODE)
        );

        let params = [
            ("X-Goog-Algorithm", ALGORITHM.to_string()),
            ("X-Goog-Credential", credential),
            ("X-Goog-Date", datetime.clone()),
            ("X-Goog-Expires", ttl_secs.to_string()),
            ("X-Goog-SignedHeaders", "host".to_string()),
        ];
        let canonical_query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, QUERY_ENCODE)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request =
            format!("GET\n{path}\n{canonical_query}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD");
        let string_to_sign = format!(
            "{ALGORITHM}\n{datetime}\n{scope}\n{:x}",
            Sha256::digest(canonical_request.as_bytes())
        );

        let mut key = hmac_sha256(format!("GOOG4{}", self.secret).as_bytes(), date.as_bytes())?;
        for part in ["auto", "storage", "goog4_request"] {
            key = hmac_sha256(&key, part.as_bytes())?;
        }
        let signature: String = hmac_sha256(&key, string_to_sign.as_bytes())?
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        let origin = self.base.origin().ascii_serialization();
        Ok(SignedUrl {
            url: format!("{origin}{path}?{canonical_query}&X-Goog-Signature={signature}"),
            issued_at,
            expires_at: issued_at + Duration::seconds(ttl_secs),
        })
    }

    fn host_header(&self) -> String {
        let host = self.base.host_str().unwrap_or_default();
        match self.base.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| StorageError::Signing(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("GOOG1EXAMPLE", "secret", "https://storage.googleapis.com")
            .expect("signer")
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).single().expect("valid time")
    }

    #[test]
    fn expiry_is_exactly_ttl_after_issuance() {
        let signed = signer()
            .sign_read("bucket", "all/x/y.png", fixed_time(), 900)
            .expect("sign");
        assert_eq!((signed.expires_at - signed.issued_at).num_seconds(), 900);
        assert!(signed.url.contains("X-Goog-Expires=900"));
    }

    #[test]
    fn url_carries_v4_parameters() {
        let signed = signer()
            .sign_read("bucket", "clients/acme/f/id.png", fixed_time(), 900)
            .expect("sign");
        assert!(signed
            .url
            .starts_with("https://storage.googleapis.com/bucket/clients/acme/f/id.png?"));
        assert!(signed.url.contains("X-Goog-Algorithm=GOOG4-HMAC-SHA256"));
        assert!(signed
            .url
            .contains("X-Goog-Credential=GOOG1EXAMPLE%2F20250304%2Fauto%2Fstorage%2Fgoog4_request"));
        assert!(signed.url.contains("X-Goog-Date=20250304T050607Z"));
        assert!(signed.url.contains("X-Goog-SignedHeaders=host"));

        let signature = signed
            .url
            .rsplit("X-Goog-Signature=")
            .next()
            .expect("signature");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_is_deterministic_and_time_dependent() {
        let a = signer().sign_read("b", "k.png", fixed_time(), 900).expect("sign");
        let b = signer().sign_read("b", "k.png", fixed_time(), 900).expect("sign");
        let c = signer()
            .sign_read("b", "k.png", fixed_time() + Duration::seconds(1), 900)
            .expect("sign");
        assert_eq!(a.url, b.url);
        assert_ne!(a.url, c.url);
    }

    #[test]
    fn object_key_is_percent_encoded() {
        let signed = signer()
            .sign_read("bucket", "clients/a b/f/id.png", fixed_time(), 900)
            .expect("sign");
        assert!(signed.url.contains("/bucket/clients/a%20b/f/id.png?"));
    }

    #[test]
    fn custom_host_keeps_port() {
        let signer = UrlSigner::new("id", "secret", "http://127.0.0.1:4443").expect("signer");
        let signed = signer.sign_read("b", "k.png", fixed_time(), 900).expect("sign");
        assert!(signed.url.starts_with("http://127.0.0.1:4443/b/k.png?"));
    }

    #[test]
    fn rejects_unparsable_host() {
        let result = UrlSigner::new("id", "secret", "not a url");
        assert!(matches!(result, Err(StorageError::InvalidUrl { .. })));
    }
}
