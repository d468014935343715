use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use classroom_config::CorsConfig;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::admission::{post_auth_admission, pre_auth_admission};
use crate::middleware::auth::{reject_invalid_credential, resolve_identity};
use crate::modules::auth::init_auth_router;
use crate::modules::subjects::init_subjects_router;
use crate::modules::welcome::welcome;
use crate::state::AppState;

/// Maximum accepted request body.
pub const BODY_LIMIT: usize = 100 * 1024;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origin
        .parse::<HeaderValue>()
        .into_iter()
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Builds the application.
///
/// Layers run outermost first: logging, metrics, CORS, body limit, identity
/// resolution, the pre-auth gate, rejection of unverifiable tokens, and the
/// post-auth gate.
pub fn init_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_config);

    Router::new()
        .route("/", get(welcome))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", init_auth_router())
                .nest("/subjects", init_subjects_router()),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            post_auth_admission,
        ))
        .layer(middleware::from_fn(reject_invalid_credential))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            pre_auth_admission,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_identity))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}
