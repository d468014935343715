//! # Classroom DB
//!
//! PostgreSQL connection pool initialization for the classroom API.
//!
//! # Example
//!
//! ```ignore
//! use classroom_config::DatabaseConfig;
//! use classroom_db::init_db_pool;
//!
//! let pool = init_db_pool(&DatabaseConfig::from_env()?).await?;
//! ```

use std::time::Duration;

use classroom_config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub use sqlx::PgPool;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

/// Connects to PostgreSQL and returns a pool.
///
/// The pool is cheaply cloneable and shared through the application state.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = pool_options(config).connect(&config.url).await?;
    info!(max_connections = config.max_connections, "Database pool ready");
    Ok(pool)
}

/// Builds a pool that connects on first use.
///
/// Used where a pool must exist but may never be queried, such as router
/// tests that only exercise middleware.
pub fn lazy_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    pool_options(config).connect_lazy(&config.url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        let config = DatabaseConfig {
            url: "postgres://nobody@127.0.0.1:1/never".to_string(),
            max_connections: 2,
        };
        let pool = lazy_db_pool(&config).unwrap();
        assert_eq!(pool.size(), 0);
    }
}
