pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;

use std::sync::Arc;

use auth::tokens::TokenKeys;
use config::Config;
use db::store::SpaceStore;
use gateway::hub::HubHandle;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Membership and chat persistence.
    pub store: Arc<dyn SpaceStore>,
    /// Bearer token verification keys.
    pub tokens: Arc<TokenKeys>,
    pub config: Arc<Config>,
    /// Handle to the process-wide broadcast hub.
    pub hub: HubHandle,
}
