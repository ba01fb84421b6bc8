// src/state.rs

use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    error::ClientError,
    utils::jwt::{Claims, now_unix, read_claims},
};

/// The bearer credential currently in use.
#[derive(Debug, Clone)]
pub struct Credential {
    token: String,
    claims: Claims,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self, ClientError> {
        let token = token.into();
        let claims = read_claims(&token)?;
        Ok(Self { token, claims })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

/// Process-wide authentication state.
///
/// Owned by the application root and handed to the API client. Cloning shares the
/// same credential slot; only one credential is active at a time.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the active credential.
    pub fn set(&self, credential: Credential) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(credential);
    }

    /// Parses and installs a raw token.
    pub fn set_token(&self, token: impl Into<String>) -> Result<(), ClientError> {
        self.set(Credential::new(token)?);
        Ok(())
    }

    /// Drops the active credential. The next authenticated call fails with `Auth`.
    pub fn invalidate(&self) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if slot.take().is_some() {
            tracing::warn!("Credential invalidated; re-authentication required");
        }
    }

    /// Drops the credential only if it is still `token`. A credential installed
    /// after `token` was read survives.
    pub fn invalidate_token(&self, token: &str) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|c| c.token == token) {
            slot.take();
            tracing::warn!("Credential invalidated; re-authentication required");
        }
    }

    /// Returns the token to attach as `Authorization: Bearer`.
    ///
    /// An expired credential is cleared here, before any request is sent.
    pub fn bearer(&self) -> Result<String, ClientError> {
        self.bearer_at(now_unix())
    }

    pub fn bearer_at(&self, now: u64) -> Result<String, ClientError> {
        let current = {
            let slot = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            slot.clone()
        };

        match current {
            None => Err(ClientError::Auth("Not logged in".to_string())),
            Some(credential) if credential.claims.is_expired_at(now) => {
                self.invalidate_token(&credential.token);
                Err(ClientError::Auth("Session expired".to_string()))
            }
            Some(credential) => Ok(credential.token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_ok()
    }

    pub fn claims(&self) -> Option<Claims> {
        let slot = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|c| c.claims.clone())
    }
}
