//! Pure reducers and the action surface.
//!
//! Reducers are the only code that produces new state. They:
//! 1. Receive the previous state by reference
//! 2. Receive one event or action
//! 3. Return the next state
//!
//! No IO, no async, no logging. The [`DashboardStore`](crate::DashboardStore)
//! publishes whatever the reducer returns as one whole snapshot.

use std::sync::Arc;

use crate::auth::{AuthEvent, AuthState};
use crate::models::{Domain, Payload};
use crate::state::{DomainState, FetchEvent, FetchPolicy};
use crate::store::RootState;

/// A pure state transition.
pub trait Reducer<E, S> {
    fn reduce(&self, state: &S, event: &E) -> S;
}

/// Everything that can be dispatched into the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    FetchStarted(Domain),
    /// Request `seq` resolved; the payload determines the domain.
    FetchSucceeded { seq: u64, payload: Payload },
    FetchFailed { domain: Domain, seq: u64, message: String },
    ClearError(Domain),
    Reset(Domain),
    /// Reset every domain, leaving auth alone.
    ResetAll,
    Auth(AuthEvent),
}

impl Action {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::FetchStarted(_) => "fetch_started",
            Action::FetchSucceeded { .. } => "fetch_succeeded",
            Action::FetchFailed { .. } => "fetch_failed",
            Action::ClearError(_) => "clear_error",
            Action::Reset(_) => "reset",
            Action::ResetAll => "reset_all",
            Action::Auth(event) => event.name(),
        }
    }

    /// The domain this action targets, if it targets exactly one.
    pub fn domain(&self) -> Option<Domain> {
        match self {
            Action::FetchStarted(domain)
            | Action::FetchFailed { domain, .. }
            | Action::ClearError(domain)
            | Action::Reset(domain) => Some(*domain),
            Action::FetchSucceeded { payload, .. } => Some(payload.domain()),
            Action::ResetAll | Action::Auth(_) => None,
        }
    }
}

// =============================================================================
// Domain Reducer
// =============================================================================

/// Applies fetch-lifecycle events to one domain under a [`FetchPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainReducer {
    policy: FetchPolicy,
}

impl DomainReducer {
    pub fn new(policy: FetchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }
}

impl<T> Reducer<FetchEvent<T>, DomainState<T>> for DomainReducer {
    fn reduce(&self, state: &DomainState<T>, event: &FetchEvent<T>) -> DomainState<T> {
        state.apply(event, self.policy)
    }
}

// =============================================================================
// Auth Reducer
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthReducer;

impl Reducer<AuthEvent, AuthState> for AuthReducer {
    fn reduce(&self, state: &AuthState, event: &AuthEvent) -> AuthState {
        state.apply(event)
    }
}

// =============================================================================
// Root Reducer
// =============================================================================

/// Payload-free lifecycle events, convertible to any domain's `FetchEvent`.
enum Lifecycle<'a> {
    Started,
    Failed { seq: u64, message: &'a str },
    ClearError,
    Reset,
}

impl Lifecycle<'_> {
    fn typed<T>(&self) -> FetchEvent<T> {
        match self {
            Lifecycle::Started => FetchEvent::Started,
            Lifecycle::Failed { seq, message } => FetchEvent::Failed {
                seq: *seq,
                message: (*message).to_string(),
            },
            Lifecycle::ClearError => FetchEvent::ClearError,
            Lifecycle::Reset => FetchEvent::Reset,
        }
    }
}

/// Routes each [`Action`] to exactly one sub-state.
///
/// Every sub-state the action does not target is carried over unchanged
/// (its payload `Arc`s are shared, not copied).
#[derive(Debug, Clone, Copy, Default)]
pub struct RootReducer {
    domains: DomainReducer,
    auth: AuthReducer,
}

impl RootReducer {
    pub fn new(policy: FetchPolicy) -> Self {
        Self {
            domains: DomainReducer::new(policy),
            auth: AuthReducer,
        }
    }

    pub fn policy(&self) -> FetchPolicy {
        self.domains.policy()
    }

    fn lifecycle(&self, state: &mut RootState, domain: Domain, event: Lifecycle<'_>) {
        let r = &self.domains;
        match domain {
            Domain::Summary => state.summary = r.reduce(&state.summary, &event.typed()),
            Domain::ChannelMetrics => state.channels = r.reduce(&state.channels, &event.typed()),
            Domain::AudienceMetrics => state.audience = r.reduce(&state.audience, &event.typed()),
            Domain::ContentMetrics => state.content = r.reduce(&state.content, &event.typed()),
            Domain::TrendSeries => state.trends = r.reduce(&state.trends, &event.typed()),
        }
    }

    fn succeeded(&self, state: &mut RootState, seq: u64, payload: &Payload) {
        let r = &self.domains;
        match payload {
            Payload::Summary(data) => {
                let event = FetchEvent::Succeeded { seq, payload: Arc::new(data.clone()) };
                state.summary = r.reduce(&state.summary, &event);
            }
            Payload::ChannelMetrics(rows) => {
                let event = FetchEvent::Succeeded { seq, payload: Arc::new(rows.clone()) };
                state.channels = r.reduce(&state.channels, &event);
            }
            Payload::AudienceMetrics(rows) => {
                let event = FetchEvent::Succeeded { seq, payload: Arc::new(rows.clone()) };
                state.audience = r.reduce(&state.audience, &event);
            }
            Payload::ContentMetrics(rows) => {
                let event = FetchEvent::Succeeded { seq, payload: Arc::new(rows.clone()) };
                state.content = r.reduce(&state.content, &event);
            }
            Payload::TrendSeries(points) => {
                let event = FetchEvent::Succeeded { seq, payload: Arc::new(points.clone()) };
                state.trends = r.reduce(&state.trends, &event);
            }
        }
    }
}

impl Reducer<Action, RootState> for RootReducer {
    fn reduce(&self, state: &RootState, action: &Action) -> RootState {
        let mut next = state.clone();
        match action {
            Action::FetchStarted(domain) => self.lifecycle(&mut next, *domain, Lifecycle::Started),
            Action::FetchSucceeded { seq, payload } => self.succeeded(&mut next, *seq, payload),
            Action::FetchFailed { domain, seq, message } => self.lifecycle(
                &mut next,
                *domain,
                Lifecycle::Failed { seq: *seq, message },
            ),
            Action::ClearError(domain) => self.lifecycle(&mut next, *domain, Lifecycle::ClearError),
            Action::Reset(domain) => self.lifecycle(&mut next, *domain, Lifecycle::Reset),
            Action::ResetAll => {
                for domain in Domain::ALL {
                    self.lifecycle(&mut next, domain, Lifecycle::Reset);
                }
            }
            Action::Auth(event) => next.auth = self.auth.reduce(&state.auth, event),
        }
        next
    }
}
