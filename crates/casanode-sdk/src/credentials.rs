//! Durable credential store.
//!
//! Holds the bearer, the refresh token, the bearer expiry, the last-known
//! endpoint and the reason of the last invalidation. Every mutation is
//! written through to a JSON file so a restarted client can resume its
//! session. Mutators are crate-private: only the
//! [`SessionGuard`](crate::SessionGuard) changes a credential.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Reason recorded when a session is invalidated without a specific one.
pub const DEFAULT_INVALID_REASON: &str = "Session expired. Please rescan the QR code.";

/// Persisted authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credential {
    /// Bearer presented on authenticated requests.
    #[serde(rename = "token")]
    pub access_token: Option<String>,
    /// Refresh token, when the node issued one.
    pub refresh_token: Option<String>,
    /// Bearer expiry in milliseconds since the Unix epoch.
    pub expires_at: Option<i64>,
    /// Host of the last successful pairing.
    pub last_ip: Option<String>,
    /// Port of the last successful pairing.
    pub last_port: Option<u16>,
    /// Why the previous session ended, shown on the landing page.
    #[serde(rename = "invalidReason")]
    pub invalid_reason: Option<String>,
}

/// Write-through holder of the [`Credential`].
#[derive(Debug)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    state: RwLock<Credential>,
}

impl CredentialStore {
    /// Load the store from `path`, starting empty when the file is missing
    /// or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load(&path).unwrap_or_default();
        Self {
            path: Some(path),
            state: RwLock::new(state),
        }
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(Credential::default()),
        }
    }

    /// Copy of the current credential.
    pub fn snapshot(&self) -> Credential {
        self.read().clone()
    }

    /// Current bearer.
    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    /// Current refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    /// Known bearer expiry.
    pub fn expires_at(&self) -> Option<i64> {
        self.read().expires_at
    }

    /// Reason of the last invalidation.
    pub fn invalid_reason(&self) -> Option<String> {
        self.read().invalid_reason.clone()
    }

    /// Host and port of the last successful pairing.
    pub fn last_endpoint(&self) -> Option<(String, u16)> {
        let state = self.read();
        match (&state.last_ip, state.last_port) {
            (Some(ip), Some(port)) => Some((ip.clone(), port)),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Mutators (session guard only)
    // ------------------------------------------------------------------

    /// Store a fresh bearer. A missing refresh token keeps the previous one.
    pub(crate) fn set_tokens(
        &self,
        token: String,
        refresh_token: Option<String>,
        expires_at: Option<i64>,
    ) {
        self.mutate(|c| {
            c.access_token = Some(token);
            if refresh_token.is_some() {
                c.refresh_token = refresh_token;
            }
            c.expires_at = expires_at;
            c.invalid_reason = None;
        });
    }

    pub(crate) fn set_expiry(&self, expires_at: Option<i64>) {
        self.mutate(|c| c.expires_at = expires_at);
    }

    /// Remember the endpoint; empty hosts and port 0 are ignored.
    pub(crate) fn set_last_endpoint(&self, ip: &str, port: u16) {
        self.mutate(|c| {
            if !ip.is_empty() {
                c.last_ip = Some(ip.to_string());
            }
            if port > 0 {
                c.last_port = Some(port);
            }
        });
    }

    /// Drop the tokens and record why.
    pub(crate) fn invalidate(&self, reason: Option<&str>) {
        self.mutate(|c| {
            c.access_token = None;
            c.refresh_token = None;
            c.expires_at = None;
            c.invalid_reason = Some(reason.unwrap_or(DEFAULT_INVALID_REASON).to_string());
        });
    }

    /// Forget everything, endpoint included.
    pub(crate) fn clear(&self) {
        self.mutate(|c| *c = Credential::default());
    }

    fn read(&self) -> RwLockReadGuard<'_, Credential> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate(&self, f: impl FnOnce(&mut Credential)) {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut state);
            state.clone()
        };
        if let Some(path) = &self.path {
            save(path, &snapshot);
        }
    }
}

fn load(path: &Path) -> Option<Credential> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(credential) => {
                debug!(path = %path.display(), "credential store loaded");
                Some(credential)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse credential store");
                None
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read credential store");
            None
        }
    }
}

fn save(path: &Path, credential: &Credential) {
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!(path = %dir.display(), error = %e, "failed to create data directory");
            return;
        }
    }
    match serde_json::to_string_pretty(credential) {
        Ok(json) => {
            if let Err(e) = fs::write(path, json) {
                warn!(path = %path.display(), error = %e, "failed to write credential store");
            }
        }
        Err(e) => warn!(error = %e, "failed to serialize credential store"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_token_is_kept_when_absent() {
        let store = CredentialStore::in_memory();
        store.set_tokens("a".into(), Some("r1".into()), Some(10));
        store.set_tokens("b".into(), None, Some(20));

        let c = store.snapshot();
        assert_eq!(c.access_token.as_deref(), Some("b"));
        assert_eq!(c.refresh_token.as_deref(), Some("r1"));
        assert_eq!(c.expires_at, Some(20));
    }

    #[test]
    fn invalidate_uses_default_reason_and_keeps_endpoint() {
        let store = CredentialStore::in_memory();
        store.set_last_endpoint("10.0.0.1", 8443);
        store.set_tokens("a".into(), Some("r".into()), Some(10));
        store.invalidate(None);

        let c = store.snapshot();
        assert!(c.access_token.is_none());
        assert!(c.refresh_token.is_none());
        assert!(c.expires_at.is_none());
        assert_eq!(c.invalid_reason.as_deref(), Some(DEFAULT_INVALID_REASON));
        assert_eq!(store.last_endpoint(), Some(("10.0.0.1".into(), 8443)));
    }

    #[test]
    fn new_tokens_clear_the_invalid_reason() {
        let store = CredentialStore::in_memory();
        store.invalidate(Some("revoked"));
        store.set_tokens("a".into(), None, None);
        assert!(store.invalid_reason().is_none());
    }

    #[test]
    fn last_endpoint_ignores_empty_values() {
        let store = CredentialStore::in_memory();
        store.set_last_endpoint("10.0.0.1", 8443);
        store.set_last_endpoint("", 0);
        assert_eq!(store.last_endpoint(), Some(("10.0.0.1".into(), 8443)));
    }

    #[test]
    fn clear_forgets_everything() {
        let store = CredentialStore::in_memory();
        store.set_last_endpoint("10.0.0.1", 8443);
        store.set_tokens("a".into(), None, None);
        store.clear();
        assert_eq!(store.snapshot(), Credential::default());
    }

    #[test]
    fn writes_through_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("auth.json");

        let store = CredentialStore::open(&path);
        store.set_tokens("jwt".into(), Some("refresh".into()), Some(1234));
        store.set_last_endpoint("192.168.50.1", 8443);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["token"], "jwt");
        assert_eq!(raw["refreshToken"], "refresh");
        assert_eq!(raw["expiresAt"], 1234);
        assert_eq!(raw["lastIp"], "192.168.50.1");

        let reloaded = CredentialStore::open(&path);
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = CredentialStore::open(&path);
        assert_eq!(store.snapshot(), Credential::default());
    }
}
