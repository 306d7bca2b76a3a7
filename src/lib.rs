//! Highscore API library crate.
//!
//! Token-gated submission and paginated querying of player hiscores over a
//! relational store. The binary in `main.rs` wires these modules together;
//! integration tests in `tests/` use them directly.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod store;

use auth::{PermissionRegistry, TokenVerifier};
use store::hiscore::HiscoreRepository;
use store::tokens::TokenRepository;
use store::QueryExecutor;

/// Shared application state passed to handlers.
pub struct AppState {
    pub executor: QueryExecutor,
    pub verifier: TokenVerifier,
    pub hiscores: HiscoreRepository,
    pub tokens: TokenRepository,
}

impl AppState {
    pub fn new(executor: QueryExecutor) -> Self {
        let registry = Arc::new(PermissionRegistry::standard());
        Self {
            verifier: TokenVerifier::new(executor.clone(), registry),
            hiscores: HiscoreRepository::new(executor.clone()),
            tokens: TokenRepository::new(executor.clone()),
            executor,
        }
    }
}
