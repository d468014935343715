use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{error, info, warn};

use classroom::logging::{init_tracing, shutdown_tracer};
use classroom::metrics::{init_metrics, metrics_app};
use classroom::router::init_router;
use classroom::state::AppState;
use classroom_config::AppConfig;
use classroom_db::init_db_pool;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenv().ok();

    if let Err(e) = run().await {
        error!(error = ?e, "Server failed");
        eprintln!("classroom: {e:#}");
        shutdown_tracer().await;
        std::process::exit(1);
    }

    shutdown_tracer().await;
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;

    init_tracing(config.server.environment)?;

    if config.security.bypass {
        warn!("APP_ENV=test: admission gates are disabled");
    }

    let db = init_db_pool(&config.database)
        .await
        .context("Failed to connect to the database")?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run migrations")?;

    let decision = Arc::new(config.security.local_decision_service());
    {
        let decision = Arc::clone(&decision);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                decision.prune();
            }
        });
    }

    if let Some(handle) = init_metrics()? {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.server.metrics_port));
        let listener = tokio::net::TcpListener::bind(metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics listener on {metrics_addr}"))?;
        info!("Metrics available at http://{metrics_addr}/metrics");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let state = AppState::new(db, &config, decision);
    let app = init_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        environment = %config.server.environment,
        admission_mode = %config.security.mode,
        failure_mode = %config.security.failure_mode,
        "Server running on http://localhost:{}",
        config.server.port
    );
    info!("Swagger UI available at http://localhost:{}/swagger-ui", config.server.port);
    info!("Scalar UI available at http://localhost:{}/scalar", config.server.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
