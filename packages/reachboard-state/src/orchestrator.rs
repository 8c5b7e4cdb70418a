//! Fetch Orchestrator: the bridge between a fetch request and the store.
//!
//! ```text
//! request_fetch(domain)
//!     │
//!     ├─ dispatch FetchStarted (synchronous; assigns seq)
//!     │
//!     └─ spawn ──► provider.fetch(domain) ──► Payload::decode
//!                        │                         │
//!                        └──── error / panic ──────┴─► exactly one of
//!                                                     FetchSucceeded { seq } | FetchFailed { seq }
//! ```
//!
//! # Concurrency
//!
//! - Every request runs on its own task; nothing is cancelled
//! - Requests for different domains never wait on each other
//! - Overlapping requests for the same domain are reconciled by the store's
//!   [`FetchPolicy`]; the orchestrator only reports what happened
//!
//! # Error Boundary
//!
//! Provider errors, invalid payloads, timeouts and provider panics are all
//! turned into a [`FetchFailure`] here and only its message is dispatched.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::error::FetchFailure;
use crate::models::{Domain, Payload};
use crate::provider::DataProvider;
use crate::reducer::Action;
use crate::state::FetchPolicy;
use crate::store::{DashboardStore, StoreReader};

/// Orchestrator settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Give up on a provider call after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl OrchestratorConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// How one request ended, from the store's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The payload was stored.
    Applied,
    /// The request failed and its message was stored as the domain's error.
    Failed(String),
    /// A newer request had been issued; this completion was ignored.
    Discarded,
    /// The task never completed (runtime shut down).
    Aborted,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied)
    }
}

/// Handle to one in-flight request.
///
/// Dropping a ticket does not cancel the request.
#[derive(Debug)]
pub struct FetchTicket {
    domain: Domain,
    seq: u64,
    request_id: Uuid,
    handle: JoinHandle<FetchOutcome>,
}

impl FetchTicket {
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Sequence number the store assigned to this request.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Wait for the request's single completion to be dispatched.
    pub async fn completion(self) -> FetchOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    domain = %self.domain,
                    seq = self.seq,
                    request_id = %self.request_id,
                    error = %e,
                    "fetch task did not complete"
                );
                FetchOutcome::Aborted
            }
        }
    }
}

/// Issues fetches and maps their results onto store actions.
///
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct FetchOrchestrator {
    store: DashboardStore,
    provider: Arc<dyn DataProvider>,
    config: OrchestratorConfig,
}

impl FetchOrchestrator {
    pub fn new(
        store: DashboardStore,
        provider: Arc<dyn DataProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    pub fn reader(&self) -> StoreReader {
        self.store.subscribe()
    }

    pub fn config(&self) -> OrchestratorConfig {
        self.config
    }

    /// Mark `domain` loading and fetch it in the background.
    pub fn request_fetch(&self, domain: Domain) -> FetchTicket {
        let started = self.store.dispatch(Action::FetchStarted(domain));
        let seq = started.view(domain).latest_request;
        let request_id = Uuid::new_v4();
        debug!(domain = %domain, seq, request_id = %request_id, "fetch started");

        let handle = tokio::spawn(run_fetch(
            self.store.clone(),
            self.provider.clone(),
            self.config.timeout,
            domain,
            seq,
            request_id,
        ));

        FetchTicket {
            domain,
            seq,
            request_id,
            handle,
        }
    }

    /// Issue a request for every domain at once.
    pub fn fetch_all(&self) -> Vec<FetchTicket> {
        Domain::ALL
            .into_iter()
            .map(|domain| self.request_fetch(domain))
            .collect()
    }

    /// Fetch every domain and wait until each request has completed.
    pub async fn load_all(&self) -> Vec<(Domain, FetchOutcome)> {
        let tickets = self.fetch_all();
        let domains: Vec<Domain> = tickets.iter().map(FetchTicket::domain).collect();
        let outcomes = join_all(tickets.into_iter().map(FetchTicket::completion)).await;
        domains.into_iter().zip(outcomes).collect()
    }

    /// Dismiss `domain`'s error.
    pub fn clear_error(&self, domain: Domain) {
        self.store.dispatch(Action::ClearError(domain));
    }

    /// Back to the initial state; in-flight requests for `domain` become stale
    /// under [`FetchPolicy::LatestIssued`].
    pub fn reset(&self, domain: Domain) {
        self.store.dispatch(Action::Reset(domain));
    }

    pub fn reset_all(&self) {
        self.store.dispatch(Action::ResetAll);
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[instrument(skip_all, fields(domain = %domain, seq = seq, request_id = %request_id))]
async fn run_fetch(
    store: DashboardStore,
    provider: Arc<dyn DataProvider>,
    timeout: Option<Duration>,
    domain: Domain,
    seq: u64,
    request_id: Uuid,
) -> FetchOutcome {
    let action = match call_provider(provider.as_ref(), domain, timeout).await {
        Ok(payload) => Action::FetchSucceeded { seq, payload },
        Err(failure) => {
            warn!(error = %failure, "fetch failed");
            Action::FetchFailed {
                domain,
                seq,
                message: failure.message(),
            }
        }
    };

    let failed = match &action {
        Action::FetchFailed { message, .. } => Some(message.clone()),
        _ => None,
    };
    let policy = store.policy();
    let (_, accepted) =
        store.dispatch_inspect(action, |prior| prior.accepts(domain, seq, policy));

    match (accepted, failed) {
        (false, _) => {
            debug!(policy = ?policy, "superseded completion discarded");
            FetchOutcome::Discarded
        }
        (true, Some(message)) => FetchOutcome::Failed(message),
        (true, None) => {
            debug!("fetch applied");
            FetchOutcome::Applied
        }
    }
}

async fn call_provider(
    provider: &dyn DataProvider,
    domain: Domain,
    timeout: Option<Duration>,
) -> Result<Payload, FetchFailure> {
    let call = AssertUnwindSafe(provider.fetch(domain)).catch_unwind();

    let result = match timeout {
        Some(after) => match tokio::time::timeout(after, call).await {
            Ok(result) => result,
            Err(_) => return Err(FetchFailure::TimedOut { domain, after }),
        },
        None => call.await,
    };

    let raw = match result {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => return Err(FetchFailure::from_provider(domain, &e)),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!(panic = %panic_msg, "provider panicked");
            return Err(FetchFailure::fallback(domain));
        }
    };

    Payload::decode(domain, raw).map_err(|source| FetchFailure::Malformed { domain, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{fixture, MockDataProvider};
    use crate::testing::ScriptedProvider;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn channel_rows(name: &str) -> Value {
        json!([{ "name": name, "reach": 1000, "engagement": 5.0, "conversion": 1.0 }])
    }

    fn first_channel(store: &DashboardStore) -> Option<String> {
        store
            .snapshot()
            .channels()
            .data()
            .map(|rows| rows[0].name.clone())
    }

    fn scripted(policy: FetchPolicy) -> (FetchOrchestrator, crate::testing::ScriptedCalls) {
        let (provider, calls) = ScriptedProvider::new();
        let orchestrator = FetchOrchestrator::new(
            DashboardStore::new(policy),
            Arc::new(provider),
            OrchestratorConfig::default(),
        );
        (orchestrator, calls)
    }

    #[tokio::test]
    async fn test_started_is_dispatched_synchronously() {
        let (orchestrator, mut calls) = scripted(FetchPolicy::default());
        let ticket = orchestrator.request_fetch(Domain::Summary);

        // Before the task has run at all.
        let snapshot = orchestrator.store().snapshot();
        assert!(snapshot.summary().is_loading());
        assert_eq!(ticket.seq(), 1);

        calls.expect(Domain::Summary).await.succeed(fixture(Domain::Summary));
        assert_eq!(ticket.completion().await, FetchOutcome::Applied);

        let snapshot = orchestrator.store().snapshot();
        assert!(!snapshot.summary().is_loading());
        assert_eq!(
            snapshot.summary().data().map(|s| s.total_audience),
            Some(1_200_000.0)
        );
    }

    #[tokio::test]
    async fn test_last_writer_wins_keeps_last_resolved_payload() {
        let (orchestrator, mut calls) = scripted(FetchPolicy::LastWriterWins);

        let first = orchestrator.request_fetch(Domain::ChannelMetrics);
        let second = orchestrator.request_fetch(Domain::ChannelMetrics);
        let first_call = calls.expect(Domain::ChannelMetrics).await;
        let second_call = calls.expect(Domain::ChannelMetrics).await;

        second_call.succeed(channel_rows("second"));
        assert_eq!(second.completion().await, FetchOutcome::Applied);
        assert_eq!(first_channel(orchestrator.store()).as_deref(), Some("second"));

        first_call.succeed(channel_rows("first"));
        assert_eq!(first.completion().await, FetchOutcome::Applied);
        assert_eq!(first_channel(orchestrator.store()).as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_latest_issued_discards_slow_superseded_request() {
        let (orchestrator, mut calls) = scripted(FetchPolicy::LatestIssued);

        let first = orchestrator.request_fetch(Domain::ChannelMetrics);
        let second = orchestrator.request_fetch(Domain::ChannelMetrics);
        let first_call = calls.expect(Domain::ChannelMetrics).await;
        let second_call = calls.expect(Domain::ChannelMetrics).await;

        second_call.succeed(channel_rows("second"));
        assert_eq!(second.completion().await, FetchOutcome::Applied);

        first_call.succeed(channel_rows("first"));
        assert_eq!(first.completion().await, FetchOutcome::Discarded);
        assert_eq!(first_channel(orchestrator.store()).as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_latest_issued_stays_loading_until_latest_resolves() {
        let (orchestrator, mut calls) = scripted(FetchPolicy::LatestIssued);

        let first = orchestrator.request_fetch(Domain::TrendSeries);
        let second = orchestrator.request_fetch(Domain::TrendSeries);
        let first_call = calls.expect(Domain::TrendSeries).await;
        let second_call = calls.expect(Domain::TrendSeries).await;

        first_call.fail("stale failure");
        assert_eq!(first.completion().await, FetchOutcome::Discarded);
        let snapshot = orchestrator.store().snapshot();
        assert!(snapshot.trends().is_loading());
        assert!(snapshot.trends().error().is_none());

        second_call.succeed(fixture(Domain::TrendSeries));
        assert!(second.completion().await.is_applied());
        assert!(!orchestrator.store().snapshot().trends().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_audience_failure_does_not_touch_summary() {
        let provider =
            MockDataProvider::new().with_failure(Domain::AudienceMetrics, "network unreachable");
        let orchestrator = FetchOrchestrator::new(
            DashboardStore::default(),
            Arc::new(provider),
            OrchestratorConfig::default(),
        );

        let audience = orchestrator.request_fetch(Domain::AudienceMetrics);
        let summary = orchestrator.request_fetch(Domain::Summary);

        assert_eq!(
            audience.completion().await,
            FetchOutcome::Failed("network unreachable".into())
        );
        assert_eq!(summary.completion().await, FetchOutcome::Applied);

        let snapshot = orchestrator.store().snapshot();
        assert_eq!(snapshot.audience().error(), Some("network unreachable"));
        assert!(!snapshot.audience().is_loading());
        assert!(snapshot.summary().data().is_some());
        assert!(snapshot.summary().error().is_none());
    }

    #[tokio::test]
    async fn test_domains_do_not_block_each_other() {
        let (orchestrator, mut calls) = scripted(FetchPolicy::default());

        let summary = orchestrator.request_fetch(Domain::Summary);
        let channels = orchestrator.request_fetch(Domain::ChannelMetrics);
        let _summary_call = calls.expect(Domain::Summary).await;
        let channels_call = calls.expect(Domain::ChannelMetrics).await;

        channels_call.succeed(channel_rows("Website"));
        assert_eq!(channels.completion().await, FetchOutcome::Applied);

        let snapshot = orchestrator.store().snapshot();
        assert!(snapshot.summary().is_loading());
        assert!(!snapshot.channels().is_loading());
        drop(summary);
    }

    #[tokio::test]
    async fn test_invalid_payload_becomes_domain_error() {
        let (orchestrator, mut calls) = scripted(FetchPolicy::default());
        let ticket = orchestrator.request_fetch(Domain::AudienceMetrics);
        calls
            .expect(Domain::AudienceMetrics)
            .await
            .succeed(json!([{ "platform": "Website", "value": 1, "percentage": 140 }]));

        let FetchOutcome::Failed(message) = ticket.completion().await else {
            panic!("expected a failure");
        };
        assert_eq!(
            message,
            "invalid audience payload: audience[0].percentage must be between 0 and 100 (got 140)"
        );
        assert!(orchestrator.store().snapshot().audience().data().is_none());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_data() {
        let (orchestrator, mut calls) = scripted(FetchPolicy::default());

        let ticket = orchestrator.request_fetch(Domain::ContentMetrics);
        calls
            .expect(Domain::ContentMetrics)
            .await
            .succeed(fixture(Domain::ContentMetrics));
        ticket.completion().await;

        let ticket = orchestrator.request_fetch(Domain::ContentMetrics);
        let refreshing = orchestrator.store().snapshot();
        assert!(refreshing.content().is_loading());
        assert_eq!(refreshing.content().data().map(Vec::len), Some(5));

        calls.expect(Domain::ContentMetrics).await.fail("bad gateway");
        ticket.completion().await;

        let snapshot = orchestrator.store().snapshot();
        assert_eq!(snapshot.content().error(), Some("bad gateway"));
        assert_eq!(snapshot.content().data().map(Vec::len), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_request() {
        let (provider, mut calls) = ScriptedProvider::new();
        let orchestrator = FetchOrchestrator::new(
            DashboardStore::default(),
            Arc::new(provider),
            OrchestratorConfig::with_timeout(Duration::from_millis(1500)),
        );

        let ticket = orchestrator.request_fetch(Domain::TrendSeries);
        let _never_answered = calls.expect(Domain::TrendSeries).await;

        assert_eq!(
            ticket.completion().await,
            FetchOutcome::Failed("trends request timed out after 1500ms".into())
        );
        assert!(!orchestrator.store().snapshot().trends().is_loading());
    }

    struct PanickingProvider;

    #[async_trait]
    impl DataProvider for PanickingProvider {
        async fn fetch(&self, _domain: Domain) -> Result<Value> {
            panic!("provider bug");
        }
    }

    #[tokio::test]
    async fn test_provider_panic_becomes_fallback_error() {
        let orchestrator = FetchOrchestrator::new(
            DashboardStore::default(),
            Arc::new(PanickingProvider),
            OrchestratorConfig::default(),
        );
        let outcome = orchestrator.request_fetch(Domain::ContentMetrics).completion().await;
        assert_eq!(
            outcome,
            FetchOutcome::Failed("Failed to fetch content data".into())
        );
        let snapshot = orchestrator.store().snapshot();
        assert!(!snapshot.content().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_all_populates_every_domain() {
        let orchestrator = FetchOrchestrator::new(
            DashboardStore::default(),
            Arc::new(MockDataProvider::new()),
            OrchestratorConfig::default(),
        );
        let outcomes = orchestrator.load_all().await;
        assert_eq!(outcomes.len(), Domain::ALL.len());
        assert!(outcomes.iter().all(|(_, o)| o.is_applied()));

        let snapshot = orchestrator.store().snapshot();
        for domain in Domain::ALL {
            let view = snapshot.view(domain);
            assert!(view.has_data, "{} not loaded", domain);
            assert!(!view.is_loading);
        }
    }

    #[tokio::test]
    async fn test_reset_orphans_inflight_request() {
        let (orchestrator, mut calls) = scripted(FetchPolicy::LatestIssued);
        let ticket = orchestrator.request_fetch(Domain::Summary);
        let call = calls.expect(Domain::Summary).await;

        orchestrator.reset(Domain::Summary);
        call.succeed(fixture(Domain::Summary));

        assert_eq!(ticket.completion().await, FetchOutcome::Discarded);
        assert!(orchestrator.store().snapshot().summary().data().is_none());
    }

    #[tokio::test]
    async fn test_clear_error_dismisses_message() {
        let (orchestrator, mut calls) = scripted(FetchPolicy::default());
        let ticket = orchestrator.request_fetch(Domain::Summary);
        calls.expect(Domain::Summary).await.fail("boom");
        ticket.completion().await;
        assert_eq!(orchestrator.store().snapshot().summary().error(), Some("boom"));

        orchestrator.clear_error(Domain::Summary);
        assert!(orchestrator.store().snapshot().summary().error().is_none());
    }
}
