//! Open client pages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use url::Url;

use waystation_core::Error;

/// A page of the application currently open somewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ClientPage {
    pub id: String,
    pub url: String,
    pub focused: bool,
    /// Whether this engine intercepts the page's requests.
    pub controlled: bool,
}

/// Platform capability over open client pages.
#[async_trait]
pub trait ClientPages: Send + Sync {
    /// Every open page, including ones not yet controlled.
    async fn match_all(&self) -> Result<Vec<ClientPage>, Error>;

    async fn focus(&self, id: &str) -> Result<(), Error>;

    async fn open_window(&self, url: &str) -> Result<ClientPage, Error>;

    /// Take control of every open page. Returns how many were newly claimed.
    async fn claim(&self) -> Result<usize, Error>;
}

/// In-memory `ClientPages`.
///
/// Relative URLs passed to `open_window` resolve against the origin.
#[derive(Debug)]
pub struct ClientRegistry {
    origin: Url,
    pages: RwLock<Vec<ClientPage>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new(origin: Url) -> Self {
        Self { origin, pages: RwLock::new(Vec::new()), next_id: AtomicU64::new(1) }
    }

    /// Record a page opened by the user. It starts uncontrolled.
    pub async fn register(&self, url: &str) -> Result<ClientPage, Error> {
        let page = ClientPage {
            id: format!("client-{}", self.next_id.fetch_add(1, Ordering::Relaxed)),
            url: self.resolve(url)?,
            focused: false,
            controlled: false,
        };
        self.pages.write().await.push(page.clone());
        Ok(page)
    }

    /// Forget a closed page. Returns whether it was known.
    pub async fn close(&self, id: &str) -> bool {
        let mut pages = self.pages.write().await;
        let before = pages.len();
        pages.retain(|p| p.id != id);
        pages.len() != before
    }

    fn resolve(&self, url: &str) -> Result<String, Error> {
        self.origin
            .join(url)
            .map(|u| u.to_string())
            .map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))
    }
}

#[async_trait]
impl ClientPages for ClientRegistry {
    async fn match_all(&self) -> Result<Vec<ClientPage>, Error> {
        Ok(self.pages.read().await.clone())
    }

    async fn focus(&self, id: &str) -> Result<(), Error> {
        let mut pages = self.pages.write().await;
        if !pages.iter().any(|p| p.id == id) {
            return Err(Error::ClientFailed(format!("no open client {id}")));
        }
        for page in pages.iter_mut() {
            page.focused = page.id == id;
        }
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<ClientPage, Error> {
        let page = ClientPage {
            id: format!("client-{}", self.next_id.fetch_add(1, Ordering::Relaxed)),
            url: self.resolve(url)?,
            focused: true,
            controlled: true,
        };
        let mut pages = self.pages.write().await;
        for other in pages.iter_mut() {
            other.focused = false;
        }
        pages.push(page.clone());
        Ok(page)
    }

    async fn claim(&self) -> Result<usize, Error> {
        let mut pages = self.pages.write().await;
        let mut claimed = 0;
        for page in pages.iter_mut().filter(|p| !p.controlled) {
            page.controlled = true;
            claimed += 1;
        }
        Ok(claimed)
    }
}
