// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::exam::registry::SessionRegistry;
use crate::store::{ResultStore, TestStore, UserStore};

/// The persistence collaborators, as trait objects so tests can swap the
/// Postgres store for the in-memory one.
#[derive(Clone)]
pub struct Stores {
    pub tests: Arc<dyn TestStore>,
    pub results: Arc<dyn ResultStore>,
    pub users: Arc<dyn UserStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub sessions: SessionRegistry,
    pub config: Config,
}

impl FromRef<AppState> for Stores {
    fn from_ref(state: &AppState) -> Self {
        state.stores.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
