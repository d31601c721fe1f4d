use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::gateway::PaymentGateway;
use crate::identity::IdentityDirectory;

/// Shared handles for every request handler. Constructed once in `main`
/// and cloned per request; no other process-wide state exists.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub gateway: Arc<dyn PaymentGateway>,
    pub identity: Arc<dyn IdentityDirectory>,
    pub config: Arc<Config>,
}
