use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use veritext_core::health::{database_ready, healthz};
use veritext_core::middleware::with_http_layers;

use crate::handlers::{
    analysis::{create_analysis, delete_analysis, get_analysis, get_stats, list_analyses},
    credits::{get_balance, reset_credits},
    session::{check_token, create_token, refresh_token, revoke_token},
    user::get_me,
};
use crate::state::AppState;

async fn readyz(State(state): State<AppState>) -> StatusCode {
    database_ready(&state.db).await
}

pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Session
        .route(
            "/auth/token",
            get(check_token)
                .post(create_token)
                .patch(refresh_token)
                .delete(revoke_token),
        )
        // Users
        .route("/users/@me", get(get_me))
        // Credits
        .route("/credits", get(get_balance))
        .route("/cron/reset-credits", post(reset_credits))
        // Analyses
        .route("/analyses", get(list_analyses).post(create_analysis))
        .route("/analyses/stats", get(get_stats))
        .route("/analyses/{id}", get(get_analysis).delete(delete_analysis))
        .with_state(state);

    with_http_layers(routes)
}
