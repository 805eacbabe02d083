use axum::http::StatusCode;
use sea_orm::DatabaseConnection;

/// Liveness: the process is up and serving.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness: 200 when the database answers a ping, 503 otherwise.
pub async fn database_ready(db: &DatabaseConnection) -> StatusCode {
    match db.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness probe: database unreachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
