//! Event dispatcher.
//!
//! Every inbound event is one `WorkerEvent`; `Worker::dispatch` hands it to
//! the component that owns it and returns what happened. Handlers share no
//! mutable state beyond the tier store and the lifecycle state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use waystation_core::{AppConfig, CacheDb, Error, TierStats};

use crate::bridge::{
    ClickOutcome, ClientPages, ControlMessage, Notification, NotificationClick, NotificationProfile, Notifier,
    SyncCollaborator, SyncTag, clear_all_tiers, handle_click, handle_push,
};
use crate::fetch::{InterceptRequest, Network};
use crate::lifecycle::{ActivationReport, InstallReport, LifecycleManager, LifecycleState};
use crate::refresh::{RefreshReport, Refresher};
use crate::strategy::{Interception, StrategyEngine};

/// Inbound events, one variant per category.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(InterceptRequest),
    /// Raw push data; `None` when the push carried none.
    Push(Option<Vec<u8>>),
    NotificationClick(NotificationClick),
    Sync(String),
    PeriodicSync(String),
    Message(ControlMessage),
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Install, plus the activation it requested when that ran.
    Installed { install: InstallReport, activation: Option<ActivationReport> },
    Activated(ActivationReport),
    Fetched(Interception),
    Pushed(Option<Notification>),
    Clicked(ClickOutcome),
    MessagesFlushed,
    UploadsFlushed,
    Refreshed(RefreshReport),
    /// Carries the activation report when the takeover happened right away.
    SkippedWaiting(Option<ActivationReport>),
    Cleared { tiers: u64 },
    Ignored(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WorkerStatus {
    pub state: LifecycleState,
    pub version: String,
    pub tiers: Vec<TierStats>,
}

pub struct Worker {
    db: CacheDb,
    version: String,
    engine: StrategyEngine,
    lifecycle: LifecycleManager,
    refresher: Refresher,
    profile: NotificationProfile,
    notifier: Arc<dyn Notifier>,
    clients: Arc<dyn ClientPages>,
    outbox: Arc<dyn SyncCollaborator>,
}

impl Worker {
    pub fn new(
        config: &AppConfig, db: CacheDb, network: Arc<dyn Network>, notifier: Arc<dyn Notifier>,
        clients: Arc<dyn ClientPages>, outbox: Arc<dyn SyncCollaborator>,
    ) -> Result<Self, Error> {
        Ok(Self {
            engine: StrategyEngine::from_config(config, db.clone(), network.clone())?,
            lifecycle: LifecycleManager::from_config(config, db.clone(), network.clone(), clients.clone())?,
            refresher: Refresher::from_config(config, db.clone(), network)?,
            profile: NotificationProfile::from_config(config),
            version: config.cache_version.clone(),
            db,
            notifier,
            clients,
            outbox,
        })
    }

    /// Install, then activate if immediate takeover was requested.
    pub async fn start(&self) -> (InstallReport, Option<ActivationReport>) {
        let installed = self.lifecycle.install().await;
        let activated =
            if self.lifecycle.skip_waiting_requested() { Some(self.lifecycle.activate().await) } else { None };
        (installed, activated)
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn engine(&self) -> &StrategyEngine {
        &self.engine
    }

    /// Wait until activation, including the client claim, has completed.
    pub async fn wait_intercepting(&self) {
        self.lifecycle.wait_intercepting().await;
    }

    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        Ok(WorkerStatus { state: self.lifecycle.state(), version: self.version.clone(), tiers: self.db.tier_stats().await? })
    }

    /// Request URLs cached in one tier, or `None` if the tier does not exist.
    pub async fn tier_urls(&self, tier: &str) -> Result<Option<Vec<String>>, Error> {
        if !self.db.has_tier(tier).await? {
            return Ok(None);
        }
        self.db.tier_urls(tier).await.map(Some)
    }

    /// Route an event to its handler.
    ///
    /// # Errors
    ///
    /// Returns the handler's error: an unreachable API request with nothing
    /// cached, a malformed push, a failed notification or client call, or a
    /// sync flush the caller should retry.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        match event {
            WorkerEvent::Install => {
                let (install, activation) = self.start().await;
                Ok(EventOutcome::Installed { install, activation })
            }
            WorkerEvent::Activate => Ok(EventOutcome::Activated(self.lifecycle.activate().await)),
            WorkerEvent::Fetch(request) => self.fetch(&request).await.map(EventOutcome::Fetched),
            WorkerEvent::Push(data) => {
                handle_push(&self.profile, self.notifier.as_ref(), data.as_deref()).await.map(EventOutcome::Pushed)
            }
            WorkerEvent::NotificationClick(click) => {
                handle_click(&click, self.clients.as_ref(), &self.profile.default_url)
                    .await
                    .map(EventOutcome::Clicked)
            }
            WorkerEvent::Sync(tag) => self.sync(&tag).await,
            WorkerEvent::PeriodicSync(tag) => self.periodic_sync(&tag).await,
            WorkerEvent::Message(message) => self.message(message).await,
        }
    }

    /// Serve a request, or pass it through until interception has begun.
    pub async fn fetch(&self, request: &InterceptRequest) -> Result<Interception, Error> {
        if !self.lifecycle.is_intercepting() {
            return Ok(Interception::Passthrough);
        }
        self.engine.handle(request).await
    }

    async fn sync(&self, tag: &str) -> Result<EventOutcome, Error> {
        match SyncTag::parse(tag) {
            SyncTag::Messages => {
                self.outbox.flush_pending_messages().await?;
                Ok(EventOutcome::MessagesFlushed)
            }
            SyncTag::Uploads => {
                self.outbox.flush_pending_uploads().await?;
                Ok(EventOutcome::UploadsFlushed)
            }
            SyncTag::RefreshData | SyncTag::Unknown(_) => Ok(self.ignore("sync", tag)),
        }
    }

    async fn periodic_sync(&self, tag: &str) -> Result<EventOutcome, Error> {
        match SyncTag::parse(tag) {
            SyncTag::RefreshData => Ok(EventOutcome::Refreshed(self.refresher.refresh().await)),
            _ => Ok(self.ignore("periodic sync", tag)),
        }
    }

    async fn message(&self, message: ControlMessage) -> Result<EventOutcome, Error> {
        match message {
            ControlMessage::SkipWaiting => Ok(EventOutcome::SkippedWaiting(self.lifecycle.skip_waiting().await)),
            ControlMessage::ClearCache => Ok(EventOutcome::Cleared { tiers: clear_all_tiers(&self.db).await? }),
        }
    }

    fn ignore(&self, kind: &str, tag: &str) -> EventOutcome {
        tracing::debug!(kind, tag, "ignoring unrecognized tag");
        EventOutcome::Ignored(format!("{kind}: {tag}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ClientRegistry;
    use crate::fetch::RequestMode;
    use crate::strategy::ResponseSource;
    use crate::testing::{CountingOutbox, MockNetwork, ORIGIN, RecordingNotifier, config, url};
    use reqwest::Method;
    use std::sync::atomic::Ordering;

    struct Fixture {
        worker: Worker,
        network: Arc<MockNetwork>,
        notifier: Arc<RecordingNotifier>,
        clients: Arc<ClientRegistry>,
        outbox: Arc<CountingOutbox>,
        db: CacheDb,
    }

    async fn fixture() -> Fixture {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = Arc::new(MockNetwork::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let clients = Arc::new(ClientRegistry::new(::url::Url::parse(ORIGIN).unwrap()));
        let outbox = Arc::new(CountingOutbox::default());
        let worker = Worker::new(
            &config(),
            db.clone(),
            network.clone(),
            notifier.clone(),
            clients.clone(),
            outbox.clone(),
        )
        .unwrap();
        Fixture { worker, network, notifier, clients, outbox, db }
    }

    fn serve_manifest(network: &MockNetwork) {
        for path in config().static_manifest {
            network.respond(&path, 200, &format!("shell {path}"));
        }
    }

    #[tokio::test]
    async fn test_start_installs_and_activates() {
        let f = fixture().await;
        serve_manifest(&f.network);
        f.db.open_tier("iso-hub-static-v0").await.unwrap();

        let (installed, activated) = f.worker.start().await;
        assert!(installed.population_error.is_none());
        assert_eq!(activated.unwrap().evicted, vec!["iso-hub-static-v0"]);
        assert_eq!(f.worker.lifecycle().state(), LifecycleState::Intercepting);
    }

    #[tokio::test]
    async fn test_install_event_takes_over() {
        let f = fixture().await;
        serve_manifest(&f.network);
        f.network.respond("/app.css", 200, "css");

        let outcome = f.worker.dispatch(WorkerEvent::Install).await.unwrap();
        let EventOutcome::Installed { install, activation } = outcome else { panic!("expected install") };
        assert!(install.population_error.is_none());
        assert!(activation.is_some());
        assert_eq!(f.worker.lifecycle().state(), LifecycleState::Intercepting);

        let served = f.worker.fetch(&InterceptRequest::get(url("/app.css"))).await.unwrap();
        assert!(matches!(served, Interception::Respond(_)));
    }

    #[tokio::test]
    async fn test_fetch_passthrough_before_activation() {
        let f = fixture().await;
        f.network.respond("/app.css", 200, "css");
        let outcome = f.worker.dispatch(WorkerEvent::Fetch(InterceptRequest::get(url("/app.css")))).await.unwrap();
        assert_eq!(outcome, EventOutcome::Fetched(Interception::Passthrough));
        assert_eq!(f.network.call_count(), 0);
    }

    #[tokio::test]
    async fn test_shell_served_offline_after_start() {
        let f = fixture().await;
        serve_manifest(&f.network);
        f.worker.start().await;

        f.network.go_offline();
        let outcome = f.worker.fetch(&InterceptRequest::new(Method::GET, url("/logo.png"), RequestMode::NoCors)).await;
        match outcome.unwrap() {
            Interception::Respond(served) => {
                assert_eq!(served.source, ResponseSource::Cache);
                assert_eq!(served.response.text(), "shell /logo.png");
            }
            Interception::Passthrough => panic!("expected cached logo"),
        }
    }

    #[tokio::test]
    async fn test_push_empty_object_defaults() {
        let f = fixture().await;
        let outcome = f.worker.dispatch(WorkerEvent::Push(Some(b"{}".to_vec()))).await.unwrap();
        let EventOutcome::Pushed(Some(notification)) = outcome else { panic!("expected notification") };
        assert_eq!(notification.title, "ISO Hub");
        assert_eq!(notification.body, "New notification from ISO Hub");
        assert_eq!(notification.data.url, "/dashboard");
        assert_eq!(f.notifier.shown.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_click_default_action_focuses_reports() {
        let f = fixture().await;
        let reports = f.clients.register("/reports").await.unwrap();
        let click = NotificationClick { action: None, url: Some("/reports".into()) };

        let outcome = f.worker.dispatch(WorkerEvent::NotificationClick(click)).await.unwrap();
        assert_eq!(
            outcome,
            EventOutcome::Clicked(ClickOutcome::Focus { client_id: reports.id, url: reports.url })
        );
    }

    #[tokio::test]
    async fn test_sync_tags_dispatch() {
        let f = fixture().await;
        assert_eq!(f.worker.dispatch(WorkerEvent::Sync("sync-messages".into())).await.unwrap(), EventOutcome::MessagesFlushed);
        assert_eq!(f.worker.dispatch(WorkerEvent::Sync("sync-uploads".into())).await.unwrap(), EventOutcome::UploadsFlushed);
        assert!(matches!(
            f.worker.dispatch(WorkerEvent::Sync("sync-photos".into())).await.unwrap(),
            EventOutcome::Ignored(_)
        ));
        assert_eq!(f.outbox.messages.load(Ordering::SeqCst), 1);
        assert_eq!(f.outbox.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_periodic_refresh_data() {
        let f = fixture().await;
        for path in config().cacheable_api_routes {
            f.network.respond(&path, 200, "fresh");
        }
        let outcome = f.worker.dispatch(WorkerEvent::PeriodicSync("refresh-data".into())).await.unwrap();
        let EventOutcome::Refreshed(report) = outcome else { panic!("expected refresh") };
        assert_eq!(report.refreshed.len(), 3);
    }

    #[tokio::test]
    async fn test_clear_cache_message() {
        let f = fixture().await;
        serve_manifest(&f.network);
        f.worker.start().await;
        f.db.open_tier("iso-hub-api-v1").await.unwrap();
        f.db.open_tier("leftover-v0").await.unwrap();

        let outcome = f.worker.dispatch(WorkerEvent::Message(ControlMessage::ClearCache)).await.unwrap();
        assert_eq!(outcome, EventOutcome::Cleared { tiers: 3 });
        assert!(f.db.tier_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skip_waiting_message_activates() {
        let f = fixture().await;
        serve_manifest(&f.network);
        f.worker.lifecycle().install().await;
        assert_eq!(f.worker.lifecycle().state(), LifecycleState::Waiting);

        let outcome = f.worker.dispatch(WorkerEvent::Message(ControlMessage::SkipWaiting)).await.unwrap();
        assert!(matches!(outcome, EventOutcome::SkippedWaiting(Some(_))));
        f.worker.wait_intercepting().await;
    }

    #[tokio::test]
    async fn test_status_reports_tiers() {
        let f = fixture().await;
        serve_manifest(&f.network);
        f.worker.start().await;

        let status = f.worker.status().await.unwrap();
        assert_eq!(status.state, LifecycleState::Intercepting);
        assert_eq!(status.version, "v1");
        assert_eq!(status.tiers[0].name, "iso-hub-static-v1");
        assert_eq!(status.tiers[0].entries as usize, config().static_manifest.len());
    }

    #[tokio::test]
    async fn test_tier_urls_lists_static_shell() {
        let f = fixture().await;
        serve_manifest(&f.network);
        f.worker.start().await;

        let urls = f.worker.tier_urls("iso-hub-static-v1").await.unwrap().unwrap();
        assert_eq!(urls.len(), config().static_manifest.len());
        assert!(urls.contains(&url("/dashboard").to_string()));
        assert_eq!(f.worker.tier_urls("iso-hub-static-v0").await.unwrap(), None);
    }
}
