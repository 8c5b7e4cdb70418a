//! Per-domain fetch state and its transitions.
//!
//! A [`DomainState`] is the last-known snapshot of one analytics domain. It is
//! only ever changed by the transition methods below, each of which takes the
//! previous state by reference and returns the next one.
//!
//! # Key Properties
//!
//! - **Stale-while-revalidate**: starting a fetch keeps the previous `data`
//! - **Failures keep data**: a failed refresh never discards a prior success
//! - **Loading and error are exclusive**: every transition that sets `error`
//!   clears `is_loading` in the same step
//! - **Sequenced requests**: each started fetch gets the next sequence number;
//!   completions carry it back so stale ones can be told apart

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// How completions for the same domain are reconciled when fetches overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Only the most recently issued request may complete the domain.
    /// Completions of superseded requests are discarded.
    #[default]
    LatestIssued,
    /// Every completion is applied; whichever resolves last wins.
    LastWriterWins,
}

impl std::str::FromStr for FetchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "latest-issued" => Ok(FetchPolicy::LatestIssued),
            "last-writer-wins" | "lww" => Ok(FetchPolicy::LastWriterWins),
            other => Err(format!(
                "unknown fetch policy '{}' (expected 'latest' or 'last-writer-wins')",
                other
            )),
        }
    }
}

/// A fetch-lifecycle event for one domain.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent<T> {
    /// A request was issued. The state assigns its sequence number.
    Started,
    /// Request `seq` resolved with a payload.
    Succeeded { seq: u64, payload: Arc<T> },
    /// Request `seq` failed with a human-readable message.
    Failed { seq: u64, message: String },
    /// The error banner was dismissed.
    ClearError,
    /// Back to the initial snapshot.
    Reset,
}

/// One domain's data, loading flag and last error.
#[derive(Debug, PartialEq)]
pub struct DomainState<T> {
    data: Option<Arc<T>>,
    is_loading: bool,
    error: Option<String>,
    latest_request: u64,
}

// Manual impls: `Arc<T>` is cloneable for any `T`.
impl<T> Clone for DomainState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
            latest_request: self.latest_request,
        }
    }
}

impl<T> Default for DomainState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            latest_request: 0,
        }
    }
}

impl<T> DomainState<T> {
    /// The session-start state: no data, not loading, no error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last successfully loaded payload, if any.
    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    /// Shared handle to the last payload.
    pub fn data_arc(&self) -> Option<Arc<T>> {
        self.data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Sequence number of the most recently issued request (0 if none).
    pub fn latest_request(&self) -> u64 {
        self.latest_request
    }

    pub fn on_fetch_started(&self) -> Self {
        Self {
            data: self.data.clone(),
            is_loading: true,
            error: None,
            latest_request: self.latest_request + 1,
        }
    }

    pub fn on_fetch_succeeded(&self, payload: Arc<T>) -> Self {
        Self {
            data: Some(payload),
            is_loading: false,
            error: None,
            latest_request: self.latest_request,
        }
    }

    pub fn on_fetch_failed(&self, message: impl Into<String>) -> Self {
        Self {
            data: self.data.clone(),
            is_loading: false,
            error: Some(message.into()),
            latest_request: self.latest_request,
        }
    }

    pub fn on_clear_error(&self) -> Self {
        Self {
            error: None,
            ..self.clone()
        }
    }

    /// Initial snapshot again. The sequence counter advances so requests
    /// issued before the reset can no longer complete the domain under
    /// [`FetchPolicy::LatestIssued`].
    pub fn reset(&self) -> Self {
        Self {
            latest_request: self.latest_request + 1,
            ..Self::default()
        }
    }

    /// Whether a completion for request `seq` should be applied.
    pub fn accepts(&self, seq: u64, policy: FetchPolicy) -> bool {
        match policy {
            FetchPolicy::LatestIssued => seq == self.latest_request,
            FetchPolicy::LastWriterWins => true,
        }
    }

    /// Apply one lifecycle event under `policy`.
    ///
    /// A completion that the policy rejects returns an unchanged copy.
    pub fn apply(&self, event: &FetchEvent<T>, policy: FetchPolicy) -> Self {
        match event {
            FetchEvent::Started => self.on_fetch_started(),
            FetchEvent::Succeeded { seq, payload } => {
                if self.accepts(*seq, policy) {
                    self.on_fetch_succeeded(payload.clone())
                } else {
                    self.clone()
                }
            }
            FetchEvent::Failed { seq, message } => {
                if self.accepts(*seq, policy) {
                    self.on_fetch_failed(message.clone())
                } else {
                    self.clone()
                }
            }
            FetchEvent::ClearError => self.on_clear_error(),
            FetchEvent::Reset => self.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(value: u32) -> DomainState<u32> {
        DomainState::new()
            .on_fetch_started()
            .on_fetch_succeeded(Arc::new(value))
    }

    #[test]
    fn test_initial_state() {
        let state: DomainState<u32> = DomainState::new();
        assert!(state.data().is_none());
        assert!(!state.is_loading());
        assert!(state.error().is_none());
        assert_eq!(state.latest_request(), 0);
    }

    #[test]
    fn test_start_then_succeed_from_any_prior_state() {
        let priors = [
            DomainState::new(),
            loaded(1),
            loaded(1).on_fetch_failed("boom"),
            DomainState::new().on_fetch_started(),
        ];
        for prior in priors {
            let next = prior.on_fetch_started().on_fetch_succeeded(Arc::new(42));
            assert_eq!(next.data(), Some(&42));
            assert!(!next.is_loading());
            assert!(next.error().is_none());
        }
    }

    #[test]
    fn test_start_then_fail_keeps_prior_data() {
        let priors = [DomainState::new(), loaded(7)];
        for prior in priors {
            let before = prior.data().copied();
            let next = prior.on_fetch_started().on_fetch_failed("network unreachable");
            assert_eq!(next.data().copied(), before);
            assert!(!next.is_loading());
            assert_eq!(next.error(), Some("network unreachable"));
        }
    }

    #[test]
    fn test_started_keeps_stale_data_and_clears_error() {
        let state = loaded(3).on_fetch_failed("timeout").on_fetch_started();
        assert_eq!(state.data(), Some(&3));
        assert!(state.is_loading());
        assert!(state.error().is_none());
    }

    #[test]
    fn test_loading_and_error_never_both_set() {
        let mut state: DomainState<u32> = DomainState::new();
        let events = [
            FetchEvent::Started,
            FetchEvent::Failed { seq: 1, message: "x".into() },
            FetchEvent::Started,
            FetchEvent::Started,
            FetchEvent::Failed { seq: 3, message: "y".into() },
            FetchEvent::ClearError,
            FetchEvent::Started,
            FetchEvent::Succeeded { seq: 4, payload: Arc::new(1) },
        ];
        for event in &events {
            state = state.apply(event, FetchPolicy::LastWriterWins);
            assert!(!(state.is_loading() && state.error().is_some()));
        }
    }

    #[test]
    fn test_clear_error_is_idempotent() {
        let failed = loaded(5).on_fetch_failed("bad gateway");
        let once = failed.on_clear_error();
        let twice = once.on_clear_error();
        assert_eq!(once, twice);
        assert_eq!(once.data(), Some(&5));
        assert!(once.error().is_none());
    }

    #[test]
    fn test_clear_error_leaves_loading_untouched() {
        let state: DomainState<u32> = DomainState::new().on_fetch_started();
        assert!(state.on_clear_error().is_loading());
    }

    #[test]
    fn test_sequence_numbers_increase_per_start() {
        let state: DomainState<u32> = DomainState::new()
            .on_fetch_started()
            .on_fetch_started()
            .on_fetch_started();
        assert_eq!(state.latest_request(), 3);
    }

    #[test]
    fn test_latest_issued_discards_superseded_completion() {
        let state: DomainState<u32> = DomainState::new()
            .on_fetch_started()
            .on_fetch_started();

        let stale = state.apply(
            &FetchEvent::Succeeded { seq: 1, payload: Arc::new(1) },
            FetchPolicy::LatestIssued,
        );
        assert_eq!(stale, state);

        let fresh = stale.apply(
            &FetchEvent::Succeeded { seq: 2, payload: Arc::new(2) },
            FetchPolicy::LatestIssued,
        );
        assert_eq!(fresh.data(), Some(&2));
        assert!(!fresh.is_loading());
    }

    #[test]
    fn test_latest_issued_discards_superseded_failure() {
        let state = loaded(9).on_fetch_started().on_fetch_started();
        let next = state.apply(
            &FetchEvent::Failed { seq: 2, message: "old".into() },
            FetchPolicy::LatestIssued,
        );
        assert!(next.error().is_none());
        assert!(next.is_loading());
    }

    #[test]
    fn test_last_writer_wins_applies_every_completion() {
        let state: DomainState<u32> = DomainState::new()
            .on_fetch_started()
            .on_fetch_started();

        let after_second = state.apply(
            &FetchEvent::Succeeded { seq: 2, payload: Arc::new(2) },
            FetchPolicy::LastWriterWins,
        );
        let after_first = after_second.apply(
            &FetchEvent::Succeeded { seq: 1, payload: Arc::new(1) },
            FetchPolicy::LastWriterWins,
        );
        assert_eq!(after_first.data(), Some(&1));
    }

    #[test]
    fn test_reset_orphans_inflight_request() {
        let state = loaded(4).on_fetch_started();
        assert_eq!(state.latest_request(), 2);

        let reset = state.reset();
        assert!(reset.data().is_none());
        assert!(!reset.is_loading());
        assert!(reset.error().is_none());

        let late = reset.apply(
            &FetchEvent::Succeeded { seq: 2, payload: Arc::new(8) },
            FetchPolicy::LatestIssued,
        );
        assert!(late.data().is_none());

        // Last-writer-wins has no way to tell, and repopulates.
        let late = reset.apply(
            &FetchEvent::Succeeded { seq: 2, payload: Arc::new(8) },
            FetchPolicy::LastWriterWins,
        );
        assert_eq!(late.data(), Some(&8));
    }

    #[test]
    fn test_fetch_policy_parsing() {
        assert_eq!("latest".parse::<FetchPolicy>().unwrap(), FetchPolicy::LatestIssued);
        assert_eq!(
            "Last-Writer-Wins".parse::<FetchPolicy>().unwrap(),
            FetchPolicy::LastWriterWins
        );
        assert!("first".parse::<FetchPolicy>().is_err());
    }
}
