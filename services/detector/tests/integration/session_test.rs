use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use axum_test::TestServer;
use serde_json::Value;

use veritext_auth_types::token::{ACCESS_TOKEN_TTL_SECS, TokenCodec, now_secs};
use veritext_detector::domain::repository::RevocationList;
use veritext_detector::domain::types::User;
use veritext_detector::error::DetectorError;
use veritext_detector::extract::{AuthSession, SessionState};
use veritext_detector::usecase::session::{
    LoginInput, LoginUseCase, LogoutUseCase, RefreshSessionUseCase,
};
use veritext_domain::user::Plan;
use veritext_testing::auth::{MockSession, test_codec};

use crate::helpers::{MockRevocations, MockUserRepo, test_user};

const PASSWORD: &str = "correct horse battery staple";

fn user_with_password() -> User {
    User {
        password_hash: Some(bcrypt::hash(PASSWORD, 4).unwrap()),
        ..test_user(10)
    }
}

fn login(email: &str, password: &str) -> LoginInput {
    LoginInput {
        email: email.to_owned(),
        password: password.to_owned(),
    }
}

// ── LoginUseCase ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_issue_pair_for_valid_credentials() {
    let user = user_with_password();
    let usecase = LoginUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        codec: test_codec(),
    };

    let now = now_secs();
    let session = usecase
        .execute(login("  Writer@Example.COM ", PASSWORD), now)
        .await
        .unwrap();

    assert_eq!(session.user_id, user.id);
    let claims = test_codec().verify_access(&session.pair.access.token).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.email, user.email);
    assert_eq!(claims.plan, Plan::Free);
    assert_eq!(session.pair.access.exp, now + ACCESS_TOKEN_TTL_SECS);
    assert!(test_codec().verify_refresh(&session.pair.refresh.token).is_ok());
}

#[tokio::test]
async fn should_reject_wrong_password() {
    let usecase = LoginUseCase {
        users: MockUserRepo::new(vec![user_with_password()]),
        codec: test_codec(),
    };

    let result = usecase
        .execute(login("writer@example.com", "wrong"), now_secs())
        .await;

    assert!(
        matches!(result, Err(DetectorError::InvalidCredentials)),
        "expected InvalidCredentials, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_unknown_email_the_same_way() {
    let usecase = LoginUseCase {
        users: MockUserRepo::new(vec![user_with_password()]),
        codec: test_codec(),
    };

    let result = usecase
        .execute(login("nobody@example.com", PASSWORD), now_secs())
        .await;

    assert!(matches!(result, Err(DetectorError::InvalidCredentials)));
}

#[tokio::test]
async fn should_reject_password_login_for_provider_only_account() {
    let usecase = LoginUseCase {
        users: MockUserRepo::new(vec![test_user(10)]),
        codec: test_codec(),
    };

    let result = usecase
        .execute(login("writer@example.com", PASSWORD), now_secs())
        .await;

    assert!(matches!(result, Err(DetectorError::InvalidCredentials)));
}

// ── RefreshSessionUseCase ────────────────────────────────────────────────────

#[tokio::test]
async fn should_rotate_refresh_token_and_revoke_the_old_one() {
    let user = test_user(10);
    let session = MockSession::new(user.id, Plan::Free);
    let revocations = MockRevocations::default();
    let usecase = RefreshSessionUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        revocations: revocations.clone(),
        codec: test_codec(),
    };

    let rotated = usecase
        .execute(session.refresh_token(), now_secs())
        .await
        .unwrap();

    assert_eq!(rotated.user_id, user.id);
    assert_ne!(rotated.pair.refresh.jti, session.tokens.refresh.jti);
    assert!(revocations.contains(session.tokens.refresh.jti));
    assert!(!revocations.contains(rotated.pair.refresh.jti));

    let replay = usecase.execute(session.refresh_token(), now_secs()).await;
    assert!(
        matches!(replay, Err(DetectorError::TokenInvalid)),
        "expected TokenInvalid on replay, got {replay:?}"
    );
}

#[tokio::test]
async fn should_refuse_access_token_as_refresh_token() {
    let user = test_user(10);
    let session = MockSession::new(user.id, Plan::Free);
    let usecase = RefreshSessionUseCase {
        users: MockUserRepo::new(vec![user]),
        revocations: MockRevocations::default(),
        codec: test_codec(),
    };

    let result = usecase.execute(session.access_token(), now_secs()).await;

    assert!(matches!(result, Err(DetectorError::TokenInvalid)));
}

#[tokio::test]
async fn should_report_expired_refresh_token() {
    let user = test_user(10);
    let eight_days = 8 * 24 * 60 * 60;
    let session = MockSession::issued_at(user.id, Plan::Free, now_secs() - eight_days);
    let usecase = RefreshSessionUseCase {
        users: MockUserRepo::new(vec![user]),
        revocations: MockRevocations::default(),
        codec: test_codec(),
    };

    let result = usecase.execute(session.refresh_token(), now_secs()).await;

    assert!(
        matches!(result, Err(DetectorError::TokenExpired)),
        "expected TokenExpired, got {result:?}"
    );
}

#[tokio::test]
async fn should_refuse_refresh_for_deleted_user() {
    let session = MockSession::new(uuid::Uuid::new_v4(), Plan::Free);
    let usecase = RefreshSessionUseCase {
        users: MockUserRepo::new(vec![]),
        revocations: MockRevocations::default(),
        codec: test_codec(),
    };

    let result = usecase.execute(session.refresh_token(), now_secs()).await;

    assert!(matches!(result, Err(DetectorError::TokenInvalid)));
}

#[tokio::test]
async fn should_rotate_a_refresh_token_only_once_under_concurrency() {
    let user = test_user(10);
    let session = MockSession::new(user.id, Plan::Free);
    let usecase = RefreshSessionUseCase {
        users: MockUserRepo::new(vec![user]),
        revocations: MockRevocations::default(),
        codec: test_codec(),
    };

    let now = now_secs();
    let (first, second) = tokio::join!(
        usecase.execute(session.refresh_token(), now),
        usecase.execute(session.refresh_token(), now),
    );

    let rotated = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(rotated, 1, "same refresh token rotated more than once");
    let failure = if first.is_err() { first } else { second };
    assert!(matches!(failure, Err(DetectorError::TokenInvalid)));
}

// ── LogoutUseCase ────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_revoke_both_tokens_until_they_expire() {
    let user = test_user(10);
    let session = MockSession::new(user.id, Plan::Free);
    let revocations = MockRevocations::default();
    let usecase = LogoutUseCase {
        revocations: revocations.clone(),
        codec: test_codec(),
    };

    usecase
        .execute(
            Some(session.access_token()),
            Some(session.refresh_token()),
            now_secs(),
        )
        .await
        .unwrap();

    assert!(revocations.contains(session.tokens.access.jti));
    assert!(revocations.contains(session.tokens.refresh.jti));
    let access_ttl = revocations.ttl_of(session.tokens.access.jti).unwrap();
    assert!(access_ttl.as_secs() <= ACCESS_TOKEN_TTL_SECS);
}

#[tokio::test]
async fn should_revoke_refresh_token_when_access_token_has_expired() {
    let session = MockSession::issued_at(uuid::Uuid::new_v4(), Plan::Free, now_secs() - 3600);
    let revocations = MockRevocations::default();
    let usecase = LogoutUseCase {
        revocations: revocations.clone(),
        codec: test_codec(),
    };

    usecase
        .execute(
            Some(session.access_token()),
            Some(session.refresh_token()),
            now_secs(),
        )
        .await
        .unwrap();

    assert!(!revocations.contains(session.tokens.access.jti));
    assert!(revocations.contains(session.tokens.refresh.jti));
}

#[tokio::test]
async fn should_succeed_without_any_token() {
    let revocations = MockRevocations::default();
    let usecase = LogoutUseCase {
        revocations: revocations.clone(),
        codec: test_codec(),
    };

    usecase.execute(None, None, now_secs()).await.unwrap();

    assert!(revocations.entries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_ignore_refresh_token_of_another_user_on_logout() {
    let session = MockSession::new(uuid::Uuid::new_v4(), Plan::Free);
    let stranger = MockSession::new(uuid::Uuid::new_v4(), Plan::Free);
    let revocations = MockRevocations::default();
    let usecase = LogoutUseCase {
        revocations: revocations.clone(),
        codec: test_codec(),
    };

    usecase
        .execute(
            Some(session.access_token()),
            Some(stranger.refresh_token()),
            now_secs(),
        )
        .await
        .unwrap();

    assert!(revocations.contains(session.tokens.access.jti));
    assert!(!revocations.contains(stranger.tokens.refresh.jti));
}

// ── AuthSession extractor ────────────────────────────────────────────────────

#[derive(Clone)]
struct TestState {
    codec: TokenCodec,
    revocations: MockRevocations,
}

impl SessionState for TestState {
    type Revocations = MockRevocations;

    fn token_codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn revocations(&self) -> Self::Revocations {
        self.revocations.clone()
    }
}

async fn whoami(session: AuthSession) -> String {
    session.user_id().to_string()
}

fn test_server(revocations: MockRevocations) -> TestServer {
    let state = TestState {
        codec: test_codec(),
        revocations,
    };
    let app = Router::new().route("/whoami", get(whoami)).with_state(state);
    TestServer::new(app).unwrap()
}

async fn get_with(server: &TestServer, headers: &axum::http::HeaderMap) -> axum_test::TestResponse {
    let mut request = server.get("/whoami");
    for (name, value) in headers {
        request = request.add_header(name.clone(), value.clone());
    }
    request.await
}

#[tokio::test]
async fn should_reject_request_without_token() {
    let server = test_server(MockRevocations::default());

    let response = server.get("/whoami").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn should_accept_token_from_cookie_or_bearer_header() {
    let server = test_server(MockRevocations::default());
    let session = MockSession::new(uuid::Uuid::new_v4(), Plan::Pro);

    let from_cookie = get_with(&server, &session.cookie_headers()).await;
    let from_bearer = get_with(&server, &session.bearer_headers()).await;

    assert_eq!(from_cookie.status_code(), StatusCode::OK);
    assert_eq!(from_cookie.text(), session.user_id.to_string());
    assert_eq!(from_bearer.status_code(), StatusCode::OK);
    assert_eq!(from_bearer.text(), session.user_id.to_string());
}

#[tokio::test]
async fn should_distinguish_expired_access_token() {
    let server = test_server(MockRevocations::default());
    let session = MockSession::issued_at(uuid::Uuid::new_v4(), Plan::Free, now_secs() - 3600);

    let response = get_with(&server, &session.bearer_headers()).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn should_reject_revoked_access_token() {
    let revocations = MockRevocations::default();
    let server = test_server(revocations.clone());
    let session = MockSession::new(uuid::Uuid::new_v4(), Plan::Free);
    revocations
        .revoke(session.tokens.access.jti, std::time::Duration::from_secs(60))
        .await
        .unwrap();

    let response = get_with(&server, &session.cookie_headers()).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn should_reject_token_signed_with_another_secret() {
    let server = test_server(MockRevocations::default());
    let foreign = TokenCodec::new("other-access", "other-refresh");
    let user = test_user(1);
    let pair = foreign
        .issue(veritext_auth_types::token::TokenSubject {
            user_id: user.id,
            email: &user.email,
            role: user.role,
            plan: user.plan,
        })
        .unwrap();

    let response = server
        .get("/whoami")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&format!("Bearer {}", pair.access.token)).unwrap(),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "TOKEN_INVALID");
}
