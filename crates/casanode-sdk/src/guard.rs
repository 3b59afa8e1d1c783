//! Bearer lifecycle: expiry tracking, proactive refresh and invalidation.
//!
//! The guard is the only writer of the [`CredentialStore`]. Its state moves
//! through [`SessionState`] via [`SessionEvent`]s; an event that is not a
//! legal transition from the current state is dropped together with its
//! side effect, so a refresh that finishes after a fresh login can never
//! overwrite the new credential.
//!
//! ```text
//!  Unauthenticated ──login──► Valid ──near expiry──► RefreshPending
//!        ▲                     ▲  │                      │    │
//!        │                     │  └─expired, no refresh──┼─┐  │
//!      logout                  └────────refreshed────────┘ │  │
//!                                                          ▼  ▼
//!                                           Invalid ◄──refresh failed
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use casanode_models::AuthTokens;
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, DEFAULT_INVALID_REASON};
use crate::error::SdkError;
use crate::jwt;
use crate::single_flight::SingleFlight;
use crate::transport::NodeTransport;

/// Where the session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No credential.
    Unauthenticated,
    /// A credential is held and usable.
    Valid,
    /// A refresh exchange is in flight.
    RefreshPending,
    /// The credential was dropped; a new login is required.
    Invalid {
        /// Message for the landing page.
        reason: String,
    },
}

/// Something that happened to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login exchange returned a token.
    LoginSucceeded,
    /// A login exchange returned no usable token.
    LoginFailed {
        /// Why.
        reason: String,
    },
    /// The bearer is about to expire and a refresh exchange begins.
    RefreshStarted,
    /// The refresh exchange returned a token.
    RefreshSucceeded,
    /// The refresh exchange failed.
    RefreshFailed {
        /// Why.
        reason: String,
    },
    /// The bearer expired and there is nothing to refresh it with.
    Expired {
        /// Why.
        reason: String,
    },
    /// Explicit logout.
    Cleared,
}

impl SessionState {
    /// The state `event` leads to, or `None` if it is not allowed from here.
    pub fn transition(&self, event: &SessionEvent) -> Option<SessionState> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (_, E::LoginSucceeded) | (S::RefreshPending, E::RefreshSucceeded) => Some(S::Valid),
            (_, E::LoginFailed { reason }) | (S::RefreshPending, E::RefreshFailed { reason }) => {
                Some(S::Invalid {
                    reason: reason.clone(),
                })
            }
            (S::Valid, E::RefreshStarted) => Some(S::RefreshPending),
            (S::Valid | S::RefreshPending, E::Expired { reason }) => Some(S::Invalid {
                reason: reason.clone(),
            }),
            (_, E::Cleared) => Some(S::Unauthenticated),
            _ => None,
        }
    }

    /// Whether a credential is (still) held.
    pub fn has_credential(&self) -> bool {
        matches!(self, SessionState::Valid | SessionState::RefreshPending)
    }
}

/// What the stored credential calls for right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    Missing,
    Fresh,
    NeedsRefresh,
    Expired,
}

struct GuardInner {
    transport: Arc<dyn NodeTransport>,
    credentials: Arc<CredentialStore>,
    refresh_margin_ms: i64,
    state: Mutex<SessionState>,
}

/// Keeps the bearer usable, refreshing it once per expiry window.
///
/// Cloning is cheap; clones share state and the in-flight refresh.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<GuardInner>,
    refresh: Arc<SingleFlight<bool>>,
}

impl SessionGuard {
    /// Build the guard, deriving the initial state from the stored credential.
    pub fn new(
        transport: Arc<dyn NodeTransport>,
        credentials: Arc<CredentialStore>,
        refresh_margin_ms: i64,
    ) -> Self {
        let stored = credentials.snapshot();
        let state = match (stored.access_token, stored.invalid_reason) {
            (Some(_), _) => SessionState::Valid,
            (None, Some(reason)) => SessionState::Invalid { reason },
            (None, None) => SessionState::Unauthenticated,
        };
        debug!(state = ?state, "session guard initialised");

        Self {
            inner: Arc::new(GuardInner {
                transport,
                credentials,
                refresh_margin_ms,
                state: Mutex::new(state),
            }),
            refresh: Arc::new(SingleFlight::new()),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.inner.lock_state().clone()
    }

    /// Read access to the credential store.
    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Whether a refresh exchange is running.
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_in_flight()
    }

    /// Make sure a usable bearer is held, refreshing it when it is within
    /// the refresh margin of its expiry.
    ///
    /// Concurrent callers share a single refresh exchange. Returns `false`
    /// when there is no credential, it expired with nothing to refresh it
    /// with, or the refresh failed.
    pub async fn ensure_authenticated(&self) -> bool {
        if !self.state().has_credential() {
            return false;
        }

        match self.inner.freshness() {
            Freshness::Fresh => true,
            Freshness::Missing => false,
            Freshness::Expired => {
                self.inner.expire();
                false
            }
            Freshness::NeedsRefresh => {
                let inner = Arc::clone(&self.inner);
                self.refresh
                    .run(move || async move { inner.refresh().await })
                    .await
                    .unwrap_or(false)
            }
        }
    }

    /// Exchange a pre-shared token for a bearer.
    ///
    /// A transport failure leaves the stored credential untouched; a node
    /// answer without a token invalidates the session.
    pub async fn login(&self, pre_shared_token: Option<&str>) -> Result<(), SdkError> {
        let inner = &self.inner;
        let answer = inner
            .transport
            .login(pre_shared_token)
            .await
            .map_err(SdkError::into_transport)?;

        let Some(tokens) = answer else {
            let reason = "Login rejected by the node".to_string();
            inner.apply_with(
                SessionEvent::LoginFailed {
                    reason: reason.clone(),
                },
                || {
                    inner.credentials.invalidate(Some(&reason));
                    inner.transport.set_auth_token(None);
                },
            );
            return Err(SdkError::AuthenticationFailure(reason));
        };

        inner.apply_with(SessionEvent::LoginSucceeded, || inner.store_tokens(tokens));
        info!("login succeeded");
        Ok(())
    }

    /// Forget the credential, endpoint included.
    pub fn logout(&self) {
        let inner = &self.inner;
        inner.apply_with(SessionEvent::Cleared, || {
            inner.credentials.clear();
            inner.transport.set_auth_token(None);
        });
    }

    /// Remember where the node was reached, for [`Session::resume`](crate::Session::resume).
    pub fn record_endpoint(&self, host: &str, port: u16) {
        self.inner.credentials.set_last_endpoint(host, port);
    }

    /// The stored bearer, unless it is known to have expired.
    pub fn usable_token(&self) -> Option<String> {
        let token = self.inner.credentials.access_token()?;
        let expires_at = self
            .inner
            .credentials
            .expires_at()
            .or_else(|| jwt::expiration_ms(&token));
        match expires_at {
            Some(exp) if now_ms() >= exp => None,
            _ => Some(token),
        }
    }
}

impl GuardInner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `event` and, if it is a legal transition, run `effect` while
    /// the state lock is held.
    fn apply_with(&self, event: SessionEvent, effect: impl FnOnce()) -> bool {
        let mut state = self.lock_state();
        match state.transition(&event) {
            Some(next) => {
                effect();
                debug!(from = ?state, to = ?next, event = ?event, "session transition");
                *state = next;
                true
            }
            None => {
                debug!(state = ?state, event = ?event, "session event ignored");
                false
            }
        }
    }

    fn freshness(&self) -> Freshness {
        let Some(token) = self.credentials.access_token() else {
            return Freshness::Missing;
        };

        let expires_at = match self.credentials.expires_at() {
            Some(exp) => exp,
            None => match jwt::expiration_ms(&token) {
                Some(exp) => {
                    self.credentials.set_expiry(Some(exp));
                    exp
                }
                // Unknown expiry: no proactive refresh.
                None => return Freshness::Fresh,
            },
        };

        let now = now_ms();
        if now < expires_at.saturating_sub(self.refresh_margin_ms) {
            Freshness::Fresh
        } else if now >= expires_at && self.credentials.refresh_token().is_none() {
            Freshness::Expired
        } else {
            Freshness::NeedsRefresh
        }
    }

    fn expire(&self) {
        let applied = self.apply_with(
            SessionEvent::Expired {
                reason: DEFAULT_INVALID_REASON.to_string(),
            },
            || {
                self.credentials.invalidate(None);
                self.transport.set_auth_token(None);
            },
        );
        if applied {
            info!("bearer expired without a refresh token, session invalidated");
        }
    }

    /// Body of the single-flight refresh.
    async fn refresh(&self) -> bool {
        // An earlier flight may have renewed the token meanwhile.
        match self.freshness() {
            Freshness::Fresh => return true,
            Freshness::Missing => return false,
            Freshness::Expired => {
                self.expire();
                return false;
            }
            Freshness::NeedsRefresh => {}
        }
        if !self.apply_with(SessionEvent::RefreshStarted, || {}) {
            return self.lock_state().has_credential();
        }

        let refresh_token = self.credentials.refresh_token();
        info!(
            with_refresh_token = refresh_token.is_some(),
            "refreshing bearer"
        );

        let failure = match self.transport.refresh_auth(refresh_token.as_deref()).await {
            Ok(Some(tokens)) => {
                return self.apply_with(SessionEvent::RefreshSucceeded, || {
                    self.store_tokens(tokens);
                });
            }
            Ok(None) => {
                SdkError::AuthenticationFailure("refresh exchange returned no token".into())
            }
            Err(e) => e.into_transport(),
        };

        warn!(error = %failure, "bearer refresh failed, session invalidated");
        self.apply_with(
            SessionEvent::RefreshFailed {
                reason: DEFAULT_INVALID_REASON.to_string(),
            },
            || {
                self.credentials.invalidate(None);
                self.transport.set_auth_token(None);
            },
        );
        false
    }

    fn store_tokens(&self, tokens: AuthTokens) {
        let expires_at = tokens
            .expires_at
            .or_else(|| jwt::expiration_ms(&tokens.token));
        self.transport.set_auth_token(Some(tokens.token.clone()));
        self.credentials
            .set_tokens(tokens.token, tokens.refresh_token, expires_at);
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{MockTransport, Script};

    const HOUR_MS: i64 = 3_600_000;

    fn token_expiring_at(ms: i64) -> String {
        jwt::unsigned_token(&json!({ "sub": "node", "exp": ms / 1000 }))
    }

    fn guard_with(mock: Arc<MockTransport>, credentials: Arc<CredentialStore>) -> SessionGuard {
        SessionGuard::new(mock, credentials, 60_000)
    }

    fn stored(token: &str, refresh: Option<&str>, expires_at: Option<i64>) -> Arc<CredentialStore> {
        let store = CredentialStore::in_memory();
        store.set_tokens(token.into(), refresh.map(String::from), expires_at);
        Arc::new(store)
    }

    fn refreshed(token: &str) -> Script {
        Script {
            refresh: Ok(Some(AuthTokens {
                token: token.into(),
                refresh_token: None,
                expires_at: Some(now_ms() + HOUR_MS),
            })),
            ..Script::default()
        }
    }

    #[test]
    fn transitions_are_enumerated() {
        let valid = SessionState::Valid;
        assert_eq!(
            valid.transition(&SessionEvent::RefreshStarted),
            Some(SessionState::RefreshPending)
        );
        assert_eq!(
            SessionState::Unauthenticated.transition(&SessionEvent::RefreshStarted),
            None
        );
        assert_eq!(
            SessionState::Valid.transition(&SessionEvent::RefreshSucceeded),
            None
        );
        assert_eq!(
            SessionState::Invalid { reason: "x".into() }.transition(&SessionEvent::LoginSucceeded),
            Some(SessionState::Valid)
        );
        assert_eq!(
            SessionState::RefreshPending.transition(&SessionEvent::Cleared),
            Some(SessionState::Unauthenticated)
        );
    }

    #[test]
    fn initial_state_follows_store() {
        let mock = Arc::new(MockTransport::connected());
        let empty = Arc::new(CredentialStore::in_memory());
        assert_eq!(
            guard_with(mock.clone(), empty).state(),
            SessionState::Unauthenticated
        );

        let invalid = Arc::new(CredentialStore::in_memory());
        invalid.invalidate(Some("gone"));
        assert_eq!(
            guard_with(mock.clone(), invalid).state(),
            SessionState::Invalid {
                reason: "gone".into()
            }
        );

        let held = stored("t", None, None);
        assert_eq!(guard_with(mock, held).state(), SessionState::Valid);
    }

    #[tokio::test]
    async fn expired_without_refresh_token_is_cleared() {
        let mock = Arc::new(MockTransport::connected());
        let creds = stored("t", None, Some(now_ms() - 1_000));
        let guard = guard_with(mock.clone(), creds.clone());

        assert!(!guard.ensure_authenticated().await);
        assert!(creds.access_token().is_none());
        assert_eq!(creds.invalid_reason().as_deref(), Some(DEFAULT_INVALID_REASON));
        assert!(matches!(guard.state(), SessionState::Invalid { .. }));
        assert_eq!(mock.calls("refresh"), 0);
    }

    #[tokio::test]
    async fn extreme_stored_expiry_counts_as_expired() {
        let mock = Arc::new(MockTransport::connected());
        let creds = stored("t", None, Some(i64::MIN + 1));
        let guard = guard_with(mock.clone(), creds.clone());

        assert!(!guard.ensure_authenticated().await);
        assert!(creds.access_token().is_none());
        assert!(matches!(guard.state(), SessionState::Invalid { .. }));
        assert_eq!(mock.calls("refresh"), 0);
    }

    #[tokio::test]
    async fn fresh_token_needs_no_exchange() {
        let mock = Arc::new(MockTransport::connected());
        let creds = stored("t", Some("r"), Some(now_ms() + HOUR_MS));
        let guard = guard_with(mock.clone(), creds);

        assert!(guard.ensure_authenticated().await);
        assert!(guard.ensure_authenticated().await);
        assert_eq!(mock.calls("refresh"), 0);
        assert_eq!(guard.state(), SessionState::Valid);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let mock = Arc::new(MockTransport::connected().with_script(refreshed("new")));
        let creds = stored("old", Some("r"), Some(now_ms() + 10_000));
        let guard = guard_with(mock.clone(), creds.clone());

        let (a, b) = tokio::join!(guard.ensure_authenticated(), guard.ensure_authenticated());
        assert!(a && b);
        assert_eq!(mock.calls("refresh"), 1);
        assert_eq!(creds.access_token().as_deref(), Some("new"));
        assert_eq!(creds.refresh_token().as_deref(), Some("r"));
        assert_eq!(mock.auth_token().as_deref(), Some("new"));
        assert_eq!(guard.state(), SessionState::Valid);
        assert!(!guard.is_refreshing());
    }

    #[tokio::test]
    async fn within_margin_without_refresh_token_uses_bearer() {
        let mock = Arc::new(MockTransport::connected().with_script(refreshed("new")));
        let creds = stored("old", None, Some(now_ms() + 10_000));
        let guard = guard_with(mock.clone(), creds.clone());

        assert!(guard.ensure_authenticated().await);
        assert_eq!(mock.calls("refresh"), 1);
        assert_eq!(creds.access_token().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn failed_refresh_invalidates_and_stops_retrying() {
        let mock = Arc::new(MockTransport::connected().with_script(Script {
            refresh: Err("boom".into()),
            ..Script::default()
        }));
        let creds = stored("old", Some("r"), Some(now_ms() + 10_000));
        let guard = guard_with(mock.clone(), creds.clone());

        assert!(!guard.ensure_authenticated().await);
        assert!(!guard.ensure_authenticated().await);
        assert_eq!(mock.calls("refresh"), 1);
        assert!(creds.access_token().is_none());
        assert!(creds.refresh_token().is_none());
        assert!(matches!(guard.state(), SessionState::Invalid { .. }));
    }

    #[tokio::test]
    async fn refresh_without_token_in_answer_invalidates() {
        let mock = Arc::new(MockTransport::connected());
        let creds = stored("old", Some("r"), Some(now_ms() - 1_000));
        let guard = guard_with(mock.clone(), creds.clone());

        assert!(!guard.ensure_authenticated().await);
        assert_eq!(mock.calls("refresh"), 1);
        assert!(creds.access_token().is_none());
    }

    #[tokio::test]
    async fn expiry_is_derived_from_the_token() {
        let mock = Arc::new(MockTransport::connected());
        let exp = now_ms() + HOUR_MS;
        let creds = stored(&token_expiring_at(exp), None, None);
        let guard = guard_with(mock.clone(), creds.clone());

        assert!(guard.ensure_authenticated().await);
        assert_eq!(creds.expires_at(), Some(exp / 1000 * 1000));
        assert_eq!(mock.calls("refresh"), 0);
    }

    #[tokio::test]
    async fn derived_past_expiry_invalidates() {
        let mock = Arc::new(MockTransport::connected());
        let creds = stored(&token_expiring_at(now_ms() - HOUR_MS), None, None);
        let guard = guard_with(mock.clone(), creds.clone());

        assert!(!guard.ensure_authenticated().await);
        assert!(creds.access_token().is_none());
    }

    #[tokio::test]
    async fn unknown_expiry_never_refreshes() {
        let mock = Arc::new(MockTransport::connected());
        let creds = stored("opaque", Some("r"), None);
        let guard = guard_with(mock.clone(), creds);

        assert!(guard.ensure_authenticated().await);
        assert_eq!(mock.calls("refresh"), 0);
    }

    #[tokio::test]
    async fn unauthenticated_makes_no_calls() {
        let mock = Arc::new(MockTransport::connected());
        let guard = guard_with(mock.clone(), Arc::new(CredentialStore::in_memory()));

        assert!(!guard.ensure_authenticated().await);
        assert_eq!(mock.total_calls(), 0);
    }

    #[tokio::test]
    async fn login_stores_tokens_and_bearer() {
        let exp = now_ms() + HOUR_MS;
        let mock = Arc::new(MockTransport::connected().with_script(Script {
            login: Some(AuthTokens {
                token: token_expiring_at(exp),
                refresh_token: Some("r".into()),
                expires_at: None,
            }),
            ..Script::default()
        }));
        let creds = Arc::new(CredentialStore::in_memory());
        creds.invalidate(Some("old session"));
        let guard = guard_with(mock.clone(), creds.clone());

        guard.login(Some("psk")).await.unwrap();
        assert_eq!(guard.state(), SessionState::Valid);
        assert_eq!(creds.refresh_token().as_deref(), Some("r"));
        assert_eq!(creds.expires_at(), Some(exp / 1000 * 1000));
        assert!(creds.invalid_reason().is_none());
        assert_eq!(mock.auth_token(), creds.access_token());
    }

    #[tokio::test]
    async fn rejected_login_is_an_authentication_failure() {
        let mock = Arc::new(MockTransport::connected());
        let creds = Arc::new(CredentialStore::in_memory());
        let guard = guard_with(mock, creds.clone());

        let err = guard.login(Some("bad")).await.unwrap_err();
        assert!(matches!(err, SdkError::AuthenticationFailure(_)));
        assert!(matches!(guard.state(), SessionState::Invalid { .. }));
        assert!(creds.invalid_reason().is_some());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let mock = Arc::new(MockTransport::connected());
        let creds = stored("t", Some("r"), None);
        creds.set_last_endpoint("10.0.0.1", 8443);
        let guard = guard_with(mock.clone(), creds.clone());

        guard.logout();
        assert_eq!(guard.state(), SessionState::Unauthenticated);
        assert!(creds.access_token().is_none());
        assert!(creds.last_endpoint().is_none());
        assert!(mock.auth_token().is_none());
    }

    #[test]
    fn usable_token_hides_expired_bearer() {
        let mock = Arc::new(MockTransport::connected());
        let expired = stored("t", None, Some(now_ms() - 1));
        assert!(guard_with(mock.clone(), expired).usable_token().is_none());

        let live = stored("t", None, Some(now_ms() + HOUR_MS));
        assert_eq!(guard_with(mock, live).usable_token().as_deref(), Some("t"));
    }
}
