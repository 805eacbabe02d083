use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use veritext_domain::pagination::PageRequest;

use crate::domain::types::{Analysis, AnalysisStats};
use crate::error::DetectorError;
use crate::extract::AuthSession;
use crate::state::AppState;
use crate::usecase::analyze::{AnalyzeInput, AnalyzeTextUseCase};
use crate::usecase::history::{
    AnalysisStatsUseCase, DeleteAnalysisUseCase, GetAnalysisUseCase, ListAnalysesUseCase,
};

// ── POST /analyses ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    pub language: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis: Analysis,
    pub remaining_credits: i32,
}

pub async fn create_analysis(
    session: AuthSession,
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<AnalyzeRequest>, DetectorError>,
) -> Result<(StatusCode, Json<AnalyzeResponse>), DetectorError> {
    let usecase = AnalyzeTextUseCase {
        ledger: state.ledger(),
        scorer: state.scorer.clone(),
        analyses: state.analysis_repo(),
        policy: state.policy,
    };
    let out = usecase
        .execute(AnalyzeInput {
            user_id: session.user_id(),
            text: body.text,
            language: body.language,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AnalyzeResponse {
            analysis: out.analysis,
            remaining_credits: out.remaining_credits,
        }),
    ))
}

// ── GET /analyses ────────────────────────────────────────────────────────────

pub async fn list_analyses(
    session: AuthSession,
    State(state): State<AppState>,
    WithRejection(Query(page), _): WithRejection<Query<PageRequest>, DetectorError>,
) -> Result<Json<Vec<Analysis>>, DetectorError> {
    let usecase = ListAnalysesUseCase {
        repo: state.analysis_repo(),
    };
    Ok(Json(usecase.execute(session.user_id(), page).await?))
}

// ── GET /analyses/stats ──────────────────────────────────────────────────────

pub async fn get_stats(
    session: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<AnalysisStats>, DetectorError> {
    let usecase = AnalysisStatsUseCase {
        repo: state.analysis_repo(),
    };
    Ok(Json(usecase.execute(session.user_id()).await?))
}

// ── GET /analyses/{id} ───────────────────────────────────────────────────────

pub async fn get_analysis(
    session: AuthSession,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, DetectorError>,
) -> Result<Json<Analysis>, DetectorError> {
    let usecase = GetAnalysisUseCase {
        repo: state.analysis_repo(),
    };
    Ok(Json(usecase.execute(session.user_id(), id).await?))
}

// ── DELETE /analyses/{id} ────────────────────────────────────────────────────

pub async fn delete_analysis(
    session: AuthSession,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, DetectorError>,
) -> Result<StatusCode, DetectorError> {
    let usecase = DeleteAnalysisUseCase {
        repo: state.analysis_repo(),
    };
    usecase.execute(session.user_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
