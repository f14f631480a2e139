use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use super::{validate_jwt_with_secret, AuthError, Identity};

/// What the rest of the app knows about who is signed in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub user: Option<Identity>,
    pub is_authenticated: bool,
    pub loading: bool,
}

impl AuthState {
    pub fn signed_in(identity: Identity) -> Self {
        Self { user: Some(identity), is_authenticated: true, loading: false }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    /// State while a stored session is still being checked
    pub fn pending() -> Self {
        Self { user: None, is_authenticated: false, loading: true }
    }
}

/// Holds the current [`AuthState`] and broadcasts every change.
pub struct AuthContext {
    tx: watch::Sender<AuthState>,
    secret: String,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::with_secret(crate::config::config().security.jwt_secret.clone())
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(AuthState::pending());
        Self { tx, secret: secret.into() }
    }

    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    pub fn sign_in(&self, identity: Identity) {
        info!(user = %identity.id, role = %identity.role, "signed in");
        self.tx.send_replace(AuthState::signed_in(identity));
    }

    /// Sign in with a bearer token. An invalid token signs the user out.
    pub fn sign_in_with_token(&self, token: &str) -> Result<Identity, AuthError> {
        match validate_jwt_with_secret(token, &self.secret) {
            Ok(identity) => {
                self.sign_in(identity.clone());
                Ok(identity)
            }
            Err(e) => {
                self.tx.send_replace(AuthState::signed_out());
                Err(e)
            }
        }
    }

    pub fn sign_out(&self) {
        if let Some(user) = &self.tx.borrow().user {
            info!(user = %user.id, "signed out");
        }
        self.tx.send_replace(AuthState::signed_out());
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt_with_secret, Claims};
    use crate::database::models::Role;
    use uuid::Uuid;

    #[test]
    fn starts_pending_then_tracks_sign_in_and_out() {
        let auth = AuthContext::with_secret("s");
        assert!(auth.current().loading);

        let identity = Identity::new(Uuid::new_v4(), "Maya", Role::Manager);
        auth.sign_in(identity.clone());
        assert_eq!(auth.current(), AuthState::signed_in(identity));

        auth.sign_out();
        assert_eq!(auth.current(), AuthState::signed_out());
    }

    #[test]
    fn bad_token_leaves_user_signed_out() {
        let auth = AuthContext::with_secret("s");
        assert!(auth.sign_in_with_token("not-a-token").is_err());
        assert!(!auth.current().is_authenticated);
        assert!(!auth.current().loading);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let auth = AuthContext::with_secret("s");
        let mut rx = auth.subscribe();
        let identity = Identity::new(Uuid::new_v4(), "Dev", Role::Employee);
        let token = generate_jwt_with_secret(&Claims::with_expiry(&identity, 1), "s").unwrap();

        auth.sign_in_with_token(&token).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().user.as_ref(), Some(&identity));
    }
}
