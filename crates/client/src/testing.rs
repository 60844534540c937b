//! Scripted collaborators for unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use waystation_core::{AppConfig, Error, ResponseSnapshot};

use crate::bridge::{Notification, Notifier, SyncCollaborator};
use crate::fetch::{InterceptRequest, Network};

pub const ORIGIN: &str = "https://hub.example.com";

pub fn config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), timeout_ms: 200, ..Default::default() }
}

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn response(path: &str, status: u16, body: &str) -> ResponseSnapshot {
    ResponseSnapshot {
        url: url(path).to_string(),
        status,
        status_text: String::new(),
        headers: vec![("content-type".into(), "text/html".into())],
        body: Bytes::from(body.to_string()),
        stored_at: None,
    }
}

#[derive(Clone)]
enum Reply {
    Respond(ResponseSnapshot),
    Fail,
    Hang,
}

/// Network that answers from a per-URL script and records every call.
///
/// Unscripted URLs fail like an unreachable host.
#[derive(Default)]
pub struct MockNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(url(path).to_string(), Reply::Respond(response(path, status, body)));
    }

    pub fn fail(&self, path: &str) {
        self.replies.lock().unwrap().insert(url(path).to_string(), Reply::Fail);
    }

    pub fn hang(&self, path: &str) {
        self.replies.lock().unwrap().insert(url(path).to_string(), Reply::Hang);
    }

    /// Make every scripted and unscripted URL fail.
    pub fn go_offline(&self) {
        self.replies.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &InterceptRequest) -> Result<ResponseSnapshot, Error> {
        let key = request.url.to_string();
        self.calls.lock().unwrap().push(key.clone());
        let reply = self.replies.lock().unwrap().get(&key).cloned();
        match reply {
            Some(Reply::Respond(snapshot)) => Ok(snapshot),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::NetworkFailure(format!("{key}: hung")))
            }
            Some(Reply::Fail) | None => Err(Error::NetworkFailure(format!("{key}: connection refused"))),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_notification(&self, notification: Notification) -> Result<(), Error> {
        self.shown.lock().unwrap().push(notification);
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingOutbox {
    pub messages: AtomicUsize,
    pub uploads: AtomicUsize,
}

#[async_trait]
impl SyncCollaborator for CountingOutbox {
    async fn flush_pending_messages(&self) -> Result<(), Error> {
        self.messages.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn flush_pending_uploads(&self) -> Result<(), Error> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
