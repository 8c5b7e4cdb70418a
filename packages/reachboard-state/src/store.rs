//! Root state composition and the single writer.
//!
//! # Guarantees
//!
//! - **Whole-snapshot replacement**: every dispatch publishes a new
//!   `Arc<RootState>`; readers never observe a half-applied action
//! - **Single writer**: only [`DashboardStore::dispatch`] produces snapshots
//! - **Read-only fan-out**: any number of [`StoreReader`]s can hold and await
//!   snapshots, none can write
//!
//! Backed by a `tokio::sync::watch` channel, so readers always see the latest
//! snapshot and intermediate ones may be skipped by slow readers.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::auth::AuthState;
use crate::models::{
    AudienceShare, ChannelRecord, ContentRecord, Domain, SummaryData, TrendPoint,
};
use crate::reducer::{Action, Reducer, RootReducer};
use crate::state::{DomainState, FetchPolicy};

// =============================================================================
// Root State
// =============================================================================

/// The complete client state: one [`DomainState`] per domain plus auth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootState {
    pub(crate) summary: DomainState<SummaryData>,
    pub(crate) channels: DomainState<Vec<ChannelRecord>>,
    pub(crate) audience: DomainState<Vec<AudienceShare>>,
    pub(crate) content: DomainState<Vec<ContentRecord>>,
    pub(crate) trends: DomainState<Vec<TrendPoint>>,
    pub(crate) auth: AuthState,
}

impl RootState {
    pub fn summary(&self) -> &DomainState<SummaryData> {
        &self.summary
    }

    pub fn channels(&self) -> &DomainState<Vec<ChannelRecord>> {
        &self.channels
    }

    pub fn audience(&self) -> &DomainState<Vec<AudienceShare>> {
        &self.audience
    }

    pub fn content(&self) -> &DomainState<Vec<ContentRecord>> {
        &self.content
    }

    pub fn trends(&self) -> &DomainState<Vec<TrendPoint>> {
        &self.trends
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    /// Payload-agnostic view of one domain.
    pub fn view(&self, domain: Domain) -> DomainView<'_> {
        match domain {
            Domain::Summary => DomainView::of(domain, &self.summary),
            Domain::ChannelMetrics => DomainView::of(domain, &self.channels),
            Domain::AudienceMetrics => DomainView::of(domain, &self.audience),
            Domain::ContentMetrics => DomainView::of(domain, &self.content),
            Domain::TrendSeries => DomainView::of(domain, &self.trends),
        }
    }

    /// Whether a completion of request `seq` for `domain` would be applied.
    pub fn accepts(&self, domain: Domain, seq: u64, policy: FetchPolicy) -> bool {
        match domain {
            Domain::Summary => self.summary.accepts(seq, policy),
            Domain::ChannelMetrics => self.channels.accepts(seq, policy),
            Domain::AudienceMetrics => self.audience.accepts(seq, policy),
            Domain::ContentMetrics => self.content.accepts(seq, policy),
            Domain::TrendSeries => self.trends.accepts(seq, policy),
        }
    }

    /// True while any domain has a request in flight.
    pub fn any_loading(&self) -> bool {
        Domain::ALL.iter().any(|d| self.view(*d).is_loading)
    }
}

/// Loading/error/data presence of one domain, without its payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainView<'a> {
    pub domain: Domain,
    pub is_loading: bool,
    pub error: Option<&'a str>,
    pub has_data: bool,
    pub latest_request: u64,
}

impl<'a> DomainView<'a> {
    fn of<T>(domain: Domain, state: &'a DomainState<T>) -> Self {
        Self {
            domain,
            is_loading: state.is_loading(),
            error: state.error(),
            has_data: state.data().is_some(),
            latest_request: state.latest_request(),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

struct StoreInner {
    sender: watch::Sender<Arc<RootState>>,
    reducer: RootReducer,
}

/// Owner of the root state. Cheap to clone; clones share the same state.
///
/// # Example
///
/// ```ignore
/// let store = DashboardStore::new(FetchPolicy::LatestIssued);
/// let mut reader = store.subscribe();
///
/// store.dispatch(Action::FetchStarted(Domain::Summary));
/// assert!(reader.snapshot().summary().is_loading());
/// ```
#[derive(Clone)]
pub struct DashboardStore {
    inner: Arc<StoreInner>,
}

impl DashboardStore {
    pub fn new(policy: FetchPolicy) -> Self {
        Self::with_state(policy, RootState::default())
    }

    /// Start from an explicit state instead of the session-start default.
    pub fn with_state(policy: FetchPolicy, state: RootState) -> Self {
        let (sender, _) = watch::channel(Arc::new(state));
        Self {
            inner: Arc::new(StoreInner {
                sender,
                reducer: RootReducer::new(policy),
            }),
        }
    }

    pub fn policy(&self) -> FetchPolicy {
        self.inner.reducer.policy()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<RootState> {
        self.inner.sender.borrow().clone()
    }

    /// A read-only handle for consumers.
    pub fn subscribe(&self) -> StoreReader {
        StoreReader {
            receiver: self.inner.sender.subscribe(),
        }
    }

    /// Apply `action` and publish the result. Returns the snapshot produced
    /// by this action (not a later one).
    pub fn dispatch(&self, action: Action) -> Arc<RootState> {
        self.dispatch_inspect(action, |_| ()).0
    }

    /// Like [`dispatch`](Self::dispatch), additionally running `inspect`
    /// against the state the action was applied to, under the same lock.
    pub(crate) fn dispatch_inspect<R>(
        &self,
        action: Action,
        inspect: impl FnOnce(&RootState) -> R,
    ) -> (Arc<RootState>, R) {
        let mut outcome = None;
        self.inner.sender.send_if_modified(|current| {
            let seen = inspect(current);
            let next = self.inner.reducer.reduce(current, &action);
            let modified = next != **current;
            if modified {
                *current = Arc::new(next);
            }
            outcome = Some((current.clone(), seen, modified));
            modified
        });

        match outcome {
            Some((snapshot, seen, modified)) => {
                debug!(
                    action = action.name(),
                    domain = action.domain().map(|d| d.as_str()),
                    modified,
                    "dispatched"
                );
                (snapshot, seen)
            }
            // send_if_modified always runs its closure.
            None => unreachable!("watch::Sender::send_if_modified skipped its closure"),
        }
    }
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new(FetchPolicy::default())
    }
}

impl std::fmt::Debug for DashboardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardStore")
            .field("policy", &self.policy())
            .field("readers", &self.inner.sender.receiver_count())
            .finish()
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Read-only subscription to the root state.
#[derive(Clone)]
pub struct StoreReader {
    receiver: watch::Receiver<Arc<RootState>>,
}

impl StoreReader {
    pub fn snapshot(&self) -> Arc<RootState> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published snapshot. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Arc<RootState>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until `predicate` holds for the current or a future snapshot.
    /// `None` if the store is dropped first.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&RootState) -> bool,
    ) -> Option<Arc<RootState>> {
        self.receiver
            .wait_for(|state| predicate(state))
            .await
            .ok()
            .map(|state| state.clone())
    }
}
