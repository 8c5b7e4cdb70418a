//! Drives the auth gate against an [`AuthProvider`] and a [`CredentialStore`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{AuthEvent, AuthState, User};
use crate::error::AuthError;
use crate::provider::{AuthProvider, CredentialStore};
use crate::reducer::Action;
use crate::store::DashboardStore;

/// Which screen the auth state allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// A check, login or logout is in flight.
    Pending,
    Dashboard,
    Login,
}

impl Gate {
    pub fn for_state(auth: &AuthState) -> Self {
        if auth.is_loading() {
            Gate::Pending
        } else if auth.is_authenticated() {
            Gate::Dashboard
        } else {
            Gate::Login
        }
    }
}

#[derive(Clone)]
pub struct Session {
    store: DashboardStore,
    auth: Arc<dyn AuthProvider>,
    credentials: Arc<dyn CredentialStore>,
}

impl Session {
    pub fn new(
        store: DashboardStore,
        auth: Arc<dyn AuthProvider>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            store,
            auth,
            credentials,
        }
    }

    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    /// Current gate decision.
    pub fn gate(&self) -> Gate {
        Gate::for_state(self.store.snapshot().auth())
    }

    /// Restore a persisted session, if any.
    ///
    /// With a stored token the gate moves to checking before the provider is
    /// asked; a token the provider no longer recognizes is removed. Without a
    /// token nothing is dispatched.
    pub async fn start(&self) -> Gate {
        let token = match self.credentials.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "could not read stored credentials");
                None
            }
        };
        let Some(token) = token else {
            debug!("no stored credentials");
            return self.gate();
        };

        self.dispatch(AuthEvent::CheckStarted);
        let event = match self.auth.check_session(&token).await {
            Ok(Some(user)) => {
                info!(user_id = %user.id, "session restored");
                AuthEvent::CheckSucceeded(Some(user))
            }
            Ok(None) => {
                info!("stored session is no longer valid");
                self.forget_token();
                AuthEvent::CheckSucceeded(None)
            }
            Err(e) => {
                warn!(error = %e, "session check failed");
                AuthEvent::CheckFailed(e.to_string())
            }
        };
        self.dispatch(event);
        self.gate()
    }

    pub async fn login(&self, identifier: &str, secret: &str) -> Result<User, AuthError> {
        self.dispatch(AuthEvent::LoginStarted);
        match self.auth.login(identifier, secret).await {
            Ok(grant) => {
                if let Err(e) = self.credentials.save(&grant.token) {
                    warn!(error = %e, "could not persist session token");
                }
                info!(user_id = %grant.user.id, "logged in");
                self.dispatch(AuthEvent::LoginSucceeded(grant.user.clone()));
                Ok(grant.user)
            }
            Err(e) => {
                info!(error = %e, "login rejected");
                self.dispatch(AuthEvent::LoginFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Always ends logged out, even if the provider call fails. Dashboard
    /// data is left in place.
    pub async fn logout(&self) {
        self.dispatch(AuthEvent::LogoutStarted);
        if let Err(e) = self.auth.logout().await {
            warn!(error = %e, "provider logout failed");
        }
        self.forget_token();
        self.dispatch(AuthEvent::LoggedOut);
    }

    /// Dismiss the auth error without changing the gate.
    pub fn clear_error(&self) {
        self.dispatch(AuthEvent::ClearError);
    }

    fn forget_token(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "could not clear stored credentials");
        }
    }

    fn dispatch(&self, event: AuthEvent) {
        self.store.dispatch(Action::Auth(event));
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
