//! # Reachboard State
//!
//! The client-side asynchronous state layer of the Reachboard analytics
//! dashboard: it fetches remote analytics data per domain, tracks loading and
//! error state, composes everything into one snapshot and derives
//! display-ready values from it.
//!
//! ## Core Concepts
//!
//! - [`Action`] = Facts (a fetch started, resolved, failed; a login succeeded)
//! - [`Reducer`] = Pure transition from previous state and one action to the next
//! - [`DashboardStore`] = The single writer, publishing whole [`RootState`] snapshots
//! - [`FetchOrchestrator`] = Turns provider calls into exactly one completion action
//!
//! ## Architecture
//!
//! ```text
//! Consumer (screen / CLI)
//!     │
//!     ▼ request_fetch(domain)
//! FetchOrchestrator ──dispatch(FetchStarted)──────────────┐
//!     │                                                   │
//!     ▼ spawn                                             │
//! DataProvider.fetch(domain)                              │
//!     │                                                   │
//!     ▼ Payload::decode                                   ▼
//! dispatch(FetchSucceeded | FetchFailed) ──► DashboardStore ──► RootReducer
//!                                                 │
//!                                                 ▼ watch
//!                                           StoreReader.snapshot()
//!                                                 │
//!                                                 ▼
//!                                           projection::*
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Reducers are pure** - No IO, no async, no logging
//! 2. **One request = one completion** - Every issued fetch dispatches exactly
//!    one success or failure
//! 3. **Loading and error are exclusive** - No snapshot has both for a domain
//! 4. **Domains are isolated** - Actions for one domain never change another
//! 5. **Strings cross the boundary** - No `anyhow::Error` ever reaches state
//! 6. **Latest issued wins** - By default a completion for a superseded request
//!    is discarded ([`FetchPolicy::LastWriterWins`] restores the older behaviour)
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use reachboard_state::{
//!     DashboardStore, FetchOrchestrator, MockDataProvider, OrchestratorConfig,
//! };
//!
//! let store = DashboardStore::default();
//! let orchestrator = FetchOrchestrator::new(
//!     store.clone(),
//!     Arc::new(MockDataProvider::new()),
//!     OrchestratorConfig::default(),
//! );
//!
//! orchestrator.load_all().await;
//! let snapshot = store.snapshot();
//! if let Some(summary) = snapshot.summary().data() {
//!     for card in reachboard_state::projection::summary_cards(summary) {
//!         println!("{}: {}", card.title, card.value);
//!     }
//! }
//! ```

// Core modules
mod auth;
mod config;
mod error;
mod models;
mod orchestrator;
mod provider;
mod reducer;
mod session;
mod state;
mod store;

// Fixture-backed providers
pub mod mock;

// Display helpers
pub mod projection;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;


// Re-export domain types
pub use models::{
    AudienceShare, ChannelRecord, ContentRecord, Domain, Payload, SummaryData, TrendPoint,
};

// Re-export state types
pub use state::{DomainState, FetchEvent, FetchPolicy};

// Re-export reducers and actions
pub use reducer::{Action, AuthReducer, DomainReducer, Reducer, RootReducer};

// Re-export store types
pub use store::{DashboardStore, DomainView, RootState, StoreReader};

// Re-export auth types
pub use auth::{AuthEvent, AuthPhase, AuthState, User};
pub use session::{Gate, Session};

// Re-export orchestration types
pub use orchestrator::{FetchOrchestrator, FetchOutcome, FetchTicket, OrchestratorConfig};

// Re-export provider contracts
pub use provider::{
    AuthProvider, CredentialStore, DataProvider, FileCredentialStore, LoginGrant,
    MemoryCredentialStore,
};
pub use mock::{MockAuthProvider, MockDataProvider};

// Re-export error types
pub use error::{AuthError, FetchFailure, PayloadError};

// Re-export configuration
pub use config::Config;

// Re-export commonly used external types
pub use async_trait::async_trait;
