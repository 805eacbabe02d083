//! Token transport: where a raw token string is read from on an inbound request.
//!
//! The access token comes from the `accessToken` cookie, falling back to an
//! `Authorization: Bearer` header. The refresh token is only ever read from its cookie.

use axum_extra::extract::CookieJar;
use http::HeaderMap;
use http::header::AUTHORIZATION;

use crate::cookie::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

/// Value of an `Authorization: Bearer <token>` header. The scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_owned())
}

/// Raw access token from the cookie, else the bearer header.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_TOKEN_COOKIE).or_else(|| bearer_token(headers))
}

/// Raw refresh token from its cookie.
pub fn refresh_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, REFRESH_TOKEN_COOKIE)
}
