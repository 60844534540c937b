//! Request-key generation.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the tier key for a request.
///
/// Keys are derived from the method and the URL with its fragment removed,
/// so `/page#a` and `/page#b` share an entry.
pub fn compute_request_key(method: &str, url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Identity of a stored request: its hashed key plus the parts it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
    pub key: String,
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { key: compute_request_key(method, &url), method: method.to_ascii_uppercase(), url: url.to_string() }
    }
}
