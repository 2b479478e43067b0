use std::sync::Arc;
use std::time::Duration;

use crate::store::Store;
use crate::token::TokenMaker;
use crate::transfer::TransferEngine;
use crate::user_auth::UserAuthService;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    /// Ledger store (autocommit reads and single-row writes)
    pub store: Arc<dyn Store>,
    /// Transfer engine bound to the same store
    pub engine: Arc<TransferEngine>,
    /// Registration, login and token verification
    pub user_auth: Arc<UserAuthService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        token_maker: Arc<dyn TokenMaker>,
        access_token_duration: Duration,
        tx_timeout: Option<Duration>,
    ) -> Self {
        let engine = TransferEngine::new(store.clone()).with_timeout(tx_timeout);
        let user_auth = UserAuthService::new(store.clone(), token_maker, access_token_duration);
        Self {
            store,
            engine: Arc::new(engine),
            user_auth: Arc::new(user_auth),
        }
    }
}
