//! Session capability gate.
//!
//! Callers consult [`CapabilityGate::is_authorized`] before invoking any
//! mutation; the repository and cache never check it themselves. The session
//! flag is explicit state owned by a [`SessionGate`] and is reset whenever
//! the app returns to the foreground.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Binary "may proceed" check.
pub trait CapabilityGate: Send + Sync {
    fn is_authorized(&self) -> bool;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("session is not authorized to modify tasks")]
    Unauthorized,
}

/// Fail unless the gate currently authorizes writes.
pub fn ensure_authorized(gate: &dyn CapabilityGate) -> Result<(), GateError> {
    if gate.is_authorized() {
        Ok(())
    } else {
        Err(GateError::Unauthorized)
    }
}

/// Gate that always authorizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl CapabilityGate for AllowAll {
    fn is_authorized(&self) -> bool {
        true
    }
}

/// Foreground state reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppLifecycle {
    #[default]
    Active,
    Inactive,
    Background,
}

impl AppLifecycle {
    fn is_away(&self) -> bool {
        matches!(self, AppLifecycle::Inactive | AppLifecycle::Background)
    }
}

/// Result of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failed(String),
    /// No authentication method is available on this host.
    Unavailable,
}

/// External authentication step (biometrics, passcode, confirmation).
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, reason: &str) -> AuthOutcome;
}

#[derive(Debug, Default)]
struct SessionState {
    authenticated: bool,
    authenticating: bool,
    lifecycle: AppLifecycle,
}

/// Prompt shown when asking the user to authenticate.
pub const AUTH_REASON: &str = "Authenticate to access your tasks";

/// Authentication state for one app session.
pub struct SessionGate {
    authenticator: Arc<dyn Authenticator>,
    state: Mutex<SessionState>,
}

impl SessionGate {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            state: Mutex::new(SessionState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_authenticating(&self) -> bool {
        self.state().authenticating
    }

    pub fn lifecycle(&self) -> AppLifecycle {
        self.state().lifecycle
    }

    /// Run the authenticator and record the result.
    pub async fn authenticate(&self) -> bool {
        self.state().authenticating = true;
        let outcome = self.authenticator.authenticate(AUTH_REASON).await;
        let ok = outcome == AuthOutcome::Success;
        {
            let mut state = self.state();
            state.authenticated = ok;
            state.authenticating = false;
        }
        match outcome {
            AuthOutcome::Success => info!("Session authenticated"),
            AuthOutcome::Failed(reason) => warn!(%reason, "Authentication failed"),
            AuthOutcome::Unavailable => warn!("No authentication method available"),
        }
        ok
    }

    /// Same as [`SessionGate::authenticate`]; for a user-initiated retry.
    pub async fn retry(&self) -> bool {
        self.authenticate().await
    }

    /// Record a lifecycle transition. Coming back to the foreground from the
    /// background or an inactive state drops the session and authenticates
    /// again. Returns whether re-authentication ran.
    pub async fn on_lifecycle_change(&self, next: AppLifecycle) -> bool {
        let returning = {
            let mut state = self.state();
            let returning = state.lifecycle.is_away() && next == AppLifecycle::Active;
            state.lifecycle = next;
            if returning {
                state.authenticated = false;
            }
            returning
        };
        if !returning {
            return false;
        }
        debug!("Returned to foreground; re-authenticating");
        self.authenticate().await;
        true
    }

    /// Drop the session.
    pub fn clear(&self) {
        self.state().authenticated = false;
    }
}

impl CapabilityGate for SessionGate {
    fn is_authorized(&self) -> bool {
        self.state().authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Hands out queued outcomes in order.
    struct ScriptedAuthenticator {
        outcomes: Mutex<VecDeque<AuthOutcome>>,
    }

    impl ScriptedAuthenticator {
        fn new(outcomes: Vec<AuthOutcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
            })
        }
    }

    #[async_trait]
    impl Authenticator for ScriptedAuthenticator {
        async fn authenticate(&self, _reason: &str) -> AuthOutcome {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(AuthOutcome::Unavailable)
        }
    }

    #[tokio::test]
    async fn test_starts_unauthorized() {
        let gate = SessionGate::new(ScriptedAuthenticator::new(vec![]));
        assert!(!gate.is_authorized());
        assert_eq!(ensure_authorized(&gate), Err(GateError::Unauthorized));
    }

    #[tokio::test]
    async fn test_authenticate_success_and_failure() {
        let gate = SessionGate::new(ScriptedAuthenticator::new(vec![
            AuthOutcome::Failed("cancelled".into()),
            AuthOutcome::Success,
        ]));
        assert!(!gate.authenticate().await);
        assert!(!gate.is_authorized());
        assert!(gate.retry().await);
        assert!(gate.is_authorized());
        assert!(!gate.is_authenticating());
    }

    #[tokio::test]
    async fn test_foreground_return_resets_and_reauthenticates() {
        let gate = SessionGate::new(ScriptedAuthenticator::new(vec![
            AuthOutcome::Success,
            AuthOutcome::Failed("no match".into()),
        ]));
        assert!(gate.authenticate().await);

        // going away keeps the session
        assert!(!gate.on_lifecycle_change(AppLifecycle::Background).await);
        assert!(gate.is_authorized());

        // coming back re-runs auth, which fails here
        assert!(gate.on_lifecycle_change(AppLifecycle::Active).await);
        assert!(!gate.is_authorized());
        assert_eq!(gate.lifecycle(), AppLifecycle::Active);
    }

    #[tokio::test]
    async fn test_active_to_active_is_not_a_return() {
        let gate = SessionGate::new(ScriptedAuthenticator::new(vec![AuthOutcome::Success]));
        gate.authenticate().await;
        assert!(!gate.on_lifecycle_change(AppLifecycle::Active).await);
        assert!(gate.is_authorized());
    }

    #[test]
    fn test_clear_and_allow_all() {
        let gate = SessionGate::new(ScriptedAuthenticator::new(vec![]));
        gate.clear();
        assert!(!gate.is_authorized());
        assert!(ensure_authorized(&AllowAll).is_ok());
    }
}
