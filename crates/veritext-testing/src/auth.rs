//! Session helpers for integration tests.
//!
//! `MockSession` mints real tokens with fixed test secrets, so requests go
//! through the same verification path as production traffic.

use http::header::{AUTHORIZATION, COOKIE};
use http::{HeaderMap, HeaderValue};
use uuid::Uuid;

use veritext_auth_types::cookie::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use veritext_auth_types::token::{TokenCodec, TokenPair, TokenSubject, now_secs};
use veritext_domain::user::{Plan, UserRole};

pub const TEST_ACCESS_SECRET: &str = "test-access-secret";
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret";

/// Codec keyed with the test secrets.
pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_ACCESS_SECRET, TEST_REFRESH_SECRET)
}

/// A signed-in test user.
pub struct MockSession {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub plan: Plan,
    pub tokens: TokenPair,
}

impl MockSession {
    pub fn new(user_id: Uuid, plan: Plan) -> Self {
        Self::issued_at(user_id, plan, now_secs())
    }

    /// Session whose tokens were issued at `iat` (seconds since epoch).
    pub fn issued_at(user_id: Uuid, plan: Plan, iat: u64) -> Self {
        let email = format!("{user_id}@test.local");
        let tokens = test_codec()
            .issue_at(
                TokenSubject {
                    user_id,
                    email: &email,
                    role: UserRole::User,
                    plan,
                },
                iat,
            )
            .expect("sign test tokens");
        Self {
            user_id,
            email,
            role: UserRole::User,
            plan,
            tokens,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access.token
    }

    pub fn refresh_token(&self) -> &str {
        &self.tokens.refresh.token
    }

    /// `Cookie` header carrying both tokens.
    pub fn cookie_headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        let value = format!(
            "{ACCESS_TOKEN_COOKIE}={}; {REFRESH_TOKEN_COOKIE}={}",
            self.access_token(),
            self.refresh_token()
        );
        map.insert(COOKIE, HeaderValue::from_str(&value).expect("cookie header"));
        map
    }

    /// `Authorization: Bearer` header carrying the access token.
    pub fn bearer_headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        let value = format!("Bearer {}", self.access_token());
        map.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&value).expect("authorization header"),
        );
        map
    }
}
