use std::sync::Arc;

use sqlx::PgPool;

use classroom_admission::DecisionService;
use classroom_config::{AppConfig, CorsConfig, JwtConfig, SecurityConfig};

/// Shared per-process state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub security_config: SecurityConfig,
    pub decision: Arc<dyn DecisionService>,
}

impl AppState {
    pub fn new(db: PgPool, config: &AppConfig, decision: Arc<dyn DecisionService>) -> Self {
        Self {
            db,
            jwt_config: config.jwt.clone(),
            cors_config: config.cors.clone(),
            security_config: config.security.clone(),
            decision,
        }
    }
}
