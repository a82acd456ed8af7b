//! Shared state injected into the request depot.
use std::fmt;
use std::sync::Arc;

use blogpost_store::{MemoryStore, PostStore, UserStore};
use salvo::Depot;

use crate::auth::TokenIssuer;
use crate::error::{AppError, AppResult};

/// Shared handles injected into every request's depot.
#[derive(Clone)]
pub struct AppState {
    /// Blog post persistence.
    pub posts: Arc<dyn PostStore>,
    /// User persistence.
    pub users: Arc<dyn UserStore>,
    /// Token signing and verification.
    pub tokens: TokenIssuer,
    /// Bcrypt work factor for new passwords.
    pub bcrypt_cost: u32,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("tokens", &self.tokens)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates state from separate post and user stores.
    pub fn new(
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
        tokens: TokenIssuer,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            posts,
            users,
            tokens,
            bcrypt_cost,
        }
    }

    /// Creates state backed by a single in-memory store.
    pub fn in_memory(store: MemoryStore, tokens: TokenIssuer, bcrypt_cost: u32) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store, tokens, bcrypt_cost)
    }

    /// Fetches the state injected by the router.
    pub fn obtain(depot: &Depot) -> AppResult<&Self> {
        depot
            .obtain::<Self>()
            .map_err(|_| AppError::Internal("application state is not configured".to_owned()))
    }
}
