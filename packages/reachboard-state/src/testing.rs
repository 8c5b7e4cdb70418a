//! Testing utilities for fetch races and store scenarios.
//!
//! # Feature Flag
//!
//! Available in this crate's own tests and, for downstream crates, with the
//! `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! reachboard-state = { path = "../reachboard-state", features = ["testing"] }
//! ```
//!
//! # Scripted Completions
//!
//! [`ScriptedProvider`] never answers on its own. Every `fetch` parks as a
//! [`PendingCall`] that the test resolves explicitly, in whatever order the
//! scenario needs:
//!
//! ```ignore
//! let (provider, mut calls) = ScriptedProvider::new();
//! let orchestrator = FetchOrchestrator::new(store, Arc::new(provider), OrchestratorConfig::default());
//!
//! let first = orchestrator.request_fetch(Domain::ChannelMetrics);
//! let second = orchestrator.request_fetch(Domain::ChannelMetrics);
//!
//! let a = calls.next().await.unwrap();
//! let b = calls.next().await.unwrap();
//! b.succeed(json!([]));        // second resolves first
//! a.fail("too slow");          // first resolves last
//! ```

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::models::Domain;
use crate::provider::DataProvider;
use crate::reducer::{Action, Reducer, RootReducer};
use crate::store::RootState;

/// A provider call waiting for the test to resolve it.
#[derive(Debug)]
pub struct PendingCall {
    domain: Domain,
    responder: oneshot::Sender<Result<Value, String>>,
}

impl PendingCall {
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Resolve with `payload`.
    pub fn succeed(self, payload: Value) {
        // The fetch task may already be gone (timed out); nothing to do then.
        let _ = self.responder.send(Ok(payload));
    }

    /// Reject with `message`.
    pub fn fail(self, message: impl Into<String>) {
        let _ = self.responder.send(Err(message.into()));
    }
}

/// Receiving side of a [`ScriptedProvider`].
#[derive(Debug)]
pub struct ScriptedCalls {
    receiver: mpsc::UnboundedReceiver<PendingCall>,
}

impl ScriptedCalls {
    /// The next call, in the order fetch tasks reached the provider.
    pub async fn next(&mut self) -> Option<PendingCall> {
        self.receiver.recv().await
    }

    /// The next call, asserting it is for `domain`.
    pub async fn expect(&mut self, domain: Domain) -> PendingCall {
        match self.next().await {
            Some(call) if call.domain == domain => call,
            Some(call) => panic!("expected a {} call, got {}", domain, call.domain),
            None => panic!("expected a {} call, provider dropped", domain),
        }
    }

    /// Number of calls already waiting.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }
}

/// A [`DataProvider`] whose every answer is chosen by the test.
#[derive(Debug)]
pub struct ScriptedProvider {
    sender: mpsc::UnboundedSender<PendingCall>,
}

impl ScriptedProvider {
    pub fn new() -> (Self, ScriptedCalls) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self { sender },
            ScriptedCalls { receiver },
        )
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    async fn fetch(&self, domain: Domain) -> Result<Value> {
        let (responder, answer) = oneshot::channel();
        self.sender
            .send(PendingCall { domain, responder })
            .map_err(|_| anyhow!("scripted provider has no listener"))?;

        match answer.await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(message)) => Err(anyhow!("{}", message)),
            Err(_) => Err(anyhow!("scripted call for {} was dropped", domain)),
        }
    }
}

/// Fold `actions` over the initial state with `reducer`.
pub fn replay(reducer: &RootReducer, actions: &[Action]) -> RootState {
    actions
        .iter()
        .fold(RootState::default(), |state, action| reducer.reduce(&state, action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_calls_resolve_out_of_order() {
        let (provider, mut calls) = ScriptedProvider::new();
        let provider = std::sync::Arc::new(provider);

        let p1 = provider.clone();
        let first = tokio::spawn(async move { p1.fetch(Domain::Summary).await });
        let a = calls.expect(Domain::Summary).await;

        let p2 = provider.clone();
        let second = tokio::spawn(async move { p2.fetch(Domain::TrendSeries).await });
        let b = calls.expect(Domain::TrendSeries).await;

        b.fail("upstream unavailable");
        a.succeed(json!({ "ok": true }));

        assert_eq!(first.await.unwrap().unwrap(), json!({ "ok": true }));
        assert_eq!(
            second.await.unwrap().unwrap_err().to_string(),
            "upstream unavailable"
        );
    }

    #[tokio::test]
    async fn test_dropped_call_is_an_error() {
        let (provider, mut calls) = ScriptedProvider::new();
        let provider = std::sync::Arc::new(provider);

        let p = provider.clone();
        let fetch = tokio::spawn(async move { p.fetch(Domain::ContentMetrics).await });
        drop(calls.next().await.unwrap());

        let err = fetch.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "scripted call for content was dropped");
    }

    #[test]
    fn test_replay_starts_from_default() {
        let state = replay(&RootReducer::default(), &[Action::FetchStarted(Domain::Summary)]);
        assert!(state.summary().is_loading());
        assert!(!state.channels().is_loading());
    }
}
