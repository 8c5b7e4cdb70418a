//! Auth gate state machine.
//!
//! ```text
//! Anonymous ──CheckStarted──► Checking ──CheckSucceeded(Some)──► Authenticated
//!     ▲                        │    │                                 │
//!     └──CheckSucceeded(None)──┘    └──CheckFailed──► CheckFailed     │
//!     ▲                                                               │
//!     └─────────────────────────────LoggedOut─────────────────────────┘
//! ```
//!
//! Explicit login moves `Anonymous`/`CheckFailed` straight to `Authenticated`
//! on success. None of these transitions touch dashboard domain data.

use serde::{Deserialize, Serialize};

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    #[default]
    Anonymous,
    Checking,
    Authenticated,
    CheckFailed,
}

/// Facts about the session, dispatched by [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    CheckStarted,
    /// The check resolved; `None` means the stored credential is not valid.
    CheckSucceeded(Option<User>),
    CheckFailed(String),
    LoginStarted,
    LoginSucceeded(User),
    LoginFailed(String),
    LogoutStarted,
    LoggedOut,
    /// The auth error banner was dismissed.
    ClearError,
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::CheckStarted => "check_started",
            AuthEvent::CheckSucceeded(_) => "check_succeeded",
            AuthEvent::CheckFailed(_) => "check_failed",
            AuthEvent::LoginStarted => "login_started",
            AuthEvent::LoginSucceeded(_) => "login_succeeded",
            AuthEvent::LoginFailed(_) => "login_failed",
            AuthEvent::LogoutStarted => "logout_started",
            AuthEvent::LoggedOut => "logged_out",
            AuthEvent::ClearError => "auth_clear_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthState {
    phase: AuthPhase,
    user: Option<User>,
    is_loading: bool,
    error: Option<String>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Next state for `event`.
    ///
    /// Check results are only honoured while `Checking`; one that resolves
    /// after an explicit login or logout is stale and leaves the state as is.
    pub fn apply(&self, event: &AuthEvent) -> Self {
        match event {
            AuthEvent::CheckStarted => Self {
                phase: AuthPhase::Checking,
                is_loading: true,
                error: None,
                ..self.clone()
            },
            AuthEvent::CheckSucceeded(user) if self.phase == AuthPhase::Checking => match user {
                Some(user) => Self {
                    phase: AuthPhase::Authenticated,
                    user: Some(user.clone()),
                    is_loading: false,
                    error: None,
                },
                None => Self {
                    phase: AuthPhase::Anonymous,
                    user: None,
                    is_loading: false,
                    error: None,
                },
            },
            AuthEvent::CheckFailed(message) if self.phase == AuthPhase::Checking => Self {
                phase: AuthPhase::CheckFailed,
                user: None,
                is_loading: false,
                error: Some(message.clone()),
            },
            AuthEvent::CheckSucceeded(_) | AuthEvent::CheckFailed(_) => self.clone(),
            AuthEvent::LoginStarted => Self {
                is_loading: true,
                error: None,
                ..self.clone()
            },
            AuthEvent::LoginSucceeded(user) => Self {
                phase: AuthPhase::Authenticated,
                user: Some(user.clone()),
                is_loading: false,
                error: None,
            },
            AuthEvent::LoginFailed(message) => Self {
                phase: AuthPhase::Anonymous,
                user: None,
                is_loading: false,
                error: Some(message.clone()),
            },
            AuthEvent::LogoutStarted => Self {
                is_loading: true,
                ..self.clone()
            },
            AuthEvent::LoggedOut => Self {
                phase: AuthPhase::Anonymous,
                user: None,
                is_loading: false,
                error: None,
            },
            AuthEvent::ClearError => Self {
                error: None,
                ..self.clone()
            },
        }
    }
}
