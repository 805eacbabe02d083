use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use veritext_auth_types::transport::bearer_token;
use veritext_domain::user::Plan;

use crate::error::DetectorError;
use crate::extract::AuthSession;
use crate::state::AppState;
use crate::usecase::credits::{GetBalanceUseCase, ResetCreditsUseCase};

// ── GET /credits ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub credits: i32,
    pub plan: Plan,
    pub monthly_allowance: i32,
    #[serde(serialize_with = "veritext_core::serde::to_rfc3339_ms")]
    pub credits_reset_at: DateTime<Utc>,
    #[serde(serialize_with = "veritext_core::serde::to_rfc3339_ms")]
    pub next_reset_at: DateTime<Utc>,
}

pub async fn get_balance(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, DetectorError> {
    let usecase = GetBalanceUseCase {
        ledger: state.ledger(),
        allowances: state.allowances,
    };
    let balance = usecase.execute(session.user_id(), Utc::now()).await?;
    Ok(Json(BalanceResponse {
        credits: balance.credits,
        plan: balance.plan,
        monthly_allowance: balance.monthly_allowance,
        credits_reset_at: balance.credits_reset_at,
        next_reset_at: balance.next_reset_at,
    }))
}

// ── POST /cron/reset-credits ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRunResponse {
    pub users_processed: u32,
    pub successful: u32,
    pub failed: u32,
    pub execution_time_ms: u64,
    pub errors: Vec<String>,
}

/// Byte comparison whose duration depends only on the length of `expected`.
fn secrets_match(presented: &[u8], expected: &[u8]) -> bool {
    let mut diff = presented.len() ^ expected.len();
    for (i, b) in expected.iter().enumerate() {
        let a = presented.get(i).copied().unwrap_or(0);
        diff |= usize::from(a ^ b);
    }
    diff == 0
}

pub async fn reset_credits(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ResetRunResponse>, DetectorError> {
    let presented = bearer_token(&headers).ok_or(DetectorError::Unauthorized)?;
    if !secrets_match(presented.as_bytes(), state.cron_secret.as_bytes()) {
        return Err(DetectorError::Unauthorized);
    }

    let usecase = ResetCreditsUseCase::new(state.ledger());
    let report = usecase.execute(Utc::now()).await?;
    Ok(Json(ResetRunResponse {
        users_processed: report.users_processed,
        successful: report.batch.success,
        failed: report.batch.failed,
        execution_time_ms: report.execution_time_ms,
        errors: report.batch.errors,
    }))
}
