//! Immutable response snapshots.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Status code of synthesized offline responses.
pub const OFFLINE_STATUS: u16 = 503;

/// Reason phrase of synthesized offline responses.
pub const OFFLINE_STATUS_TEXT: &str = "Service Unavailable";

/// A captured response.
///
/// The body is read from the transport exactly once into `Bytes`; every clone
/// after that shares the same buffer, so storing a copy in a tier and handing
/// the live response to the caller never competes for the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: Option<String>,
}

impl ResponseSnapshot {
    /// Terminal 503 returned when every fallback level is exhausted.
    pub fn offline(url: impl Into<String>, body: &'static str) -> Self {
        Self {
            url: url.into(),
            status: OFFLINE_STATUS,
            status_text: OFFLINE_STATUS_TEXT.to_string(),
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: Bytes::from_static(body.as_bytes()),
            stored_at: None,
        }
    }

    /// Whether the response may be stored in a tier.
    ///
    /// Only 2xx statuses qualify; errors and anything else pass through uncached.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
