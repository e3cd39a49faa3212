use std::{sync::Arc, time::Duration};

use crate::{db::OrmConn, services::token_service::TokenKeys};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub tokens: Arc<TokenKeys>,
    /// Upper bound for catalog listings.
    pub read_timeout: Duration,
}

impl AppState {
    pub fn new(orm: OrmConn, tokens: TokenKeys, read_timeout: Duration) -> Self {
        Self {
            orm,
            tokens: Arc::new(tokens),
            read_timeout,
        }
    }
}
