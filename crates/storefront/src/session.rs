//! Session token provider.
//!
//! The cart store never stores tokens itself; it asks a [`SessionTokens`]
//! implementation whether a bearer token is present right now. No token means
//! local storage is the only source of truth and no remote call is made.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;

/// Source of the current bearer token.
pub trait SessionTokens: Send + Sync {
    /// The token to send, or `None` when signed out.
    fn token(&self) -> Option<SecretString>;
}

/// In-memory token slot that can be signed in and out at runtime.
///
/// Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    token: Arc<RwLock<Option<SecretString>>>,
}

impl SessionSlot {
    /// Create a slot, optionally pre-populated.
    #[must_use]
    pub fn new(token: Option<SecretString>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    /// Store a token.
    pub fn sign_in(&self, token: SecretString) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Forget the token.
    pub fn sign_out(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionTokens for SessionSlot {
    fn token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
