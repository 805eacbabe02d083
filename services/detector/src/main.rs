use std::sync::Arc;

use sea_orm::Database;
use tracing::info;

use veritext_auth_types::token::TokenCodec;
use veritext_core::tracing::init_tracing;
use veritext_detector::config::DetectorConfig;
use veritext_detector::infra::scoring::HttpScoringClient;
use veritext_detector::router::build_router;
use veritext_detector::state::AppState;
use veritext_detector::usecase::analyze::AnalysisPolicy;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = DetectorConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create Redis pool");

    let scorer = HttpScoringClient::new(config.scoring).expect("failed to build scoring client");

    let state = AppState {
        db,
        redis,
        codec: TokenCodec::new(&config.access_token_secret, &config.refresh_token_secret),
        cookie_domain: config.cookie_domain,
        cron_secret: Arc::from(config.cron_secret),
        scorer,
        allowances: config.allowances,
        policy: AnalysisPolicy {
            thresholds: config.thresholds,
            default_language: config.default_language,
        },
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.detector_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("detector service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
