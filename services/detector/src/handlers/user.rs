use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use veritext_domain::user::{Plan, UserRole};

use crate::error::DetectorError;
use crate::extract::AuthSession;
use crate::state::AppState;
use crate::usecase::user::GetProfileUseCase;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub plan: Plan,
    pub role: UserRole,
    pub credits: i32,
    #[serde(serialize_with = "veritext_core::serde::to_rfc3339_ms")]
    pub credits_reset_at: DateTime<Utc>,
    pub email_verified: bool,
    #[serde(serialize_with = "veritext_core::serde::to_rfc3339_ms_opt")]
    pub current_period_end: Option<DateTime<Utc>>,
}

// ── GET /users/@me ───────────────────────────────────────────────────────────

pub async fn get_me(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, DetectorError> {
    let usecase = GetProfileUseCase {
        users: state.user_repo(),
    };
    let user = usecase.execute(session.user_id()).await?;
    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        plan: user.plan,
        role: user.role,
        credits: user.credits,
        credits_reset_at: user.credits_reset_at,
        email_verified: user.email_verified,
        current_period_end: user.current_period_end,
    }))
}
