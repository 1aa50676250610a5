//! Authorization session shared by all calls of one client

use crate::{ClientError, Result};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Credentials returned by `b2_authorize_account`
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Account the token belongs to
    pub account_id: String,
    /// Token sent as the `Authorization` header
    pub authorization_token: String,
    /// Host for API calls, when the service named one
    pub api_url: Option<String>,
    /// Host for downloads, when the service named one
    pub download_url: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account_id", &self.account_id)
            .field("authorization_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("download_url", &self.download_url)
            .finish()
    }
}

/// Holder for the current session.
///
/// Writers replace the whole session under the write lock; readers get a
/// cloned snapshot, so a call never sees half of an update.
#[derive(Clone, Default)]
pub(crate) struct SessionState {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionState {
    pub fn install(&self, session: Session) {
        *self.inner.write() = Some(session);
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    pub fn snapshot(&self) -> Option<Session> {
        self.inner.read().clone()
    }

    /// Snapshot for an authenticated call, or `Unauthenticated`
    pub fn require(&self, operation: &'static str) -> Result<Session> {
        match self.snapshot() {
            Some(s) if !s.authorization_token.is_empty() => Ok(s),
            _ => Err(ClientError::Unauthenticated { operation }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> Session {
        Session {
            account_id: "acct1".to_string(),
            authorization_token: token.to_string(),
            api_url: None,
            download_url: None,
        }
    }

    #[test]
    fn test_require_without_session() {
        let state = SessionState::default();
        let err = state.require("b2_create_bucket").unwrap_err();
        assert!(matches!(
            err,
            ClientError::Unauthenticated { operation: "b2_create_bucket" }
        ));
    }

    #[test]
    fn test_empty_token_is_unauthenticated() {
        let state = SessionState::default();
        state.install(session(""));
        assert!(state.require("b2_delete_bucket").is_err());
    }

    #[test]
    fn test_install_replace_clear() {
        let state = SessionState::default();
        state.install(session("tok1"));
        let shared = state.clone();
        shared.install(session("tok2"));
        assert_eq!(state.require("op").unwrap().authorization_token, "tok2");

        state.clear();
        assert!(shared.snapshot().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", session("secret-token"));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("acct1"));
    }
}
