use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{get_session, sign_in_email, sign_out, sign_up_email};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/sign-up/email", post(sign_up_email))
        .route("/sign-in/email", post(sign_in_email))
        .route("/get-session", get(get_session))
        .route("/sign-out", post(sign_out))
}
