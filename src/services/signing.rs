//! Request and delivery-URL signatures for the object store.
//!
//! - API requests: SHA-1 over `k1=v1&k2=v2...` (keys sorted, empty values
//!   dropped) followed by the secret, hex encoded.
//! - Delivery URLs: SHA-1 over the delivered source path (`<folder>/<name>`)
//!   followed by the secret, URL-safe base64, first 8 characters, wrapped as
//!   `s--XXXXXXXX--`. The version segment is not covered.

use base64::{Engine as _, engine::general_purpose};
use sha1::{Digest, Sha1};
use std::{collections::BTreeMap, fmt};

const URL_SIGNATURE_LEN: usize = 8;

/// Account credentials, read once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Sign a set of API parameters.
    ///
    /// Callers must not include `file`, `api_key`, `resource_type` or
    /// `cloud_name`; the store excludes those from the signed payload.
    pub fn sign_params(&self, params: &BTreeMap<&str, String>) -> String {
        let to_sign = params
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha1::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Signature path segment for a delivery URL, e.g. `s--qpPfXO4e--`.
    pub fn url_signature(&self, source: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(source.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        let encoded = general_purpose::URL_SAFE.encode(hasher.finalize());
        format!("s--{}--", &encoded[..URL_SIGNATURE_LEN])
    }
}

/// True if `segment` has the `s--XXXXXXXX--` shape of a URL signature.
pub fn is_url_signature(segment: &str) -> bool {
    segment
        .strip_prefix("s--")
        .and_then(|rest| rest.strip_suffix("--"))
        .is_some_and(|sig| {
            sig.len() == URL_SIGNATURE_LEN
                && sig
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}
