use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{CookieJar, WithRejection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use veritext_auth_types::cookie::{
    clear_cookies, set_access_token_cookie, set_refresh_token_cookie,
};
use veritext_auth_types::token::now_secs;
use veritext_auth_types::transport::{access_token, refresh_token as refresh_token_value};
use veritext_domain::user::{Plan, UserRole};

use crate::error::DetectorError;
use crate::extract::AuthSession;
use crate::state::AppState;
use crate::usecase::session::{
    LoginInput, LoginUseCase, LogoutUseCase, RefreshSessionUseCase, SessionTokens,
};

const X_ACCESS_TOKEN_EXPIRES: &str = "x-access-token-expires";

fn token_expires_header(exp: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(X_ACCESS_TOKEN_EXPIRES),
        HeaderValue::from(exp),
    );
    headers
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub access_token_exp: u64,
}

fn session_response(
    state: &AppState,
    jar: CookieJar,
    tokens: SessionTokens,
) -> (StatusCode, CookieJar, HeaderMap, Json<SessionResponse>) {
    let access_exp = tokens.pair.access.exp;
    let jar = set_access_token_cookie(jar, tokens.pair.access.token, state.cookie_domain.clone());
    let jar = set_refresh_token_cookie(jar, tokens.pair.refresh.token, state.cookie_domain.clone());
    (
        StatusCode::CREATED,
        jar,
        token_expires_header(access_exp),
        Json(SessionResponse {
            user_id: tokens.user_id,
            access_token_exp: access_exp,
        }),
    )
}

// ── GET /auth/token ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTokenResponse {
    pub user_id: Uuid,
    pub role: UserRole,
    pub plan: Plan,
    pub exp: u64,
}

pub async fn check_token(session: AuthSession) -> impl IntoResponse {
    let claims = session.claims;
    (
        token_expires_header(claims.exp),
        Json(CheckTokenResponse {
            user_id: claims.sub,
            role: claims.role,
            plan: claims.plan,
            exp: claims.exp,
        }),
    )
}

// ── POST /auth/token ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn create_token(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, DetectorError>,
) -> Result<impl IntoResponse, DetectorError> {
    let usecase = LoginUseCase {
        users: state.user_repo(),
        codec: state.codec.clone(),
    };
    let tokens = usecase
        .execute(
            LoginInput {
                email: body.email,
                password: body.password,
            },
            now_secs(),
        )
        .await?;
    Ok(session_response(&state, jar, tokens))
}

// ── PATCH /auth/token ─────────────────────────────────────────────────────────

pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, DetectorError> {
    let token = refresh_token_value(&headers).ok_or(DetectorError::Unauthorized)?;

    let usecase = RefreshSessionUseCase {
        users: state.user_repo(),
        revocations: state.revocation_list(),
        codec: state.codec.clone(),
    };
    let tokens = usecase.execute(&token, now_secs()).await?;
    Ok(session_response(&state, jar, tokens))
}

// ── DELETE /auth/token ────────────────────────────────────────────────────────

/// Force logout. Cookies are cleared on every outcome, including an expired
/// access token or a failed revocation write.
pub async fn revoke_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let usecase = LogoutUseCase {
        revocations: state.revocation_list(),
        codec: state.codec.clone(),
    };
    let result = usecase
        .execute(
            access_token(&headers).as_deref(),
            refresh_token_value(&headers).as_deref(),
            now_secs(),
        )
        .await;

    let jar = clear_cookies(jar, state.cookie_domain.clone());
    match result {
        Ok(()) => (StatusCode::NO_CONTENT, jar).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}
