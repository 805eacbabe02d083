//! Cookie builders for access and refresh tokens.
//!
//! Both cookies are httpOnly, Secure and SameSite=Lax. The refresh cookie is
//! scoped to `/auth/token` so it only travels with refresh and logout calls.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::token::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};

/// Cookie name for the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie name for the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Path the refresh cookie is restricted to.
pub const REFRESH_TOKEN_PATH: &str = "/auth/token";

fn token_cookie(
    name: &'static str,
    value: String,
    path: &'static str,
    domain: String,
    max_age: Duration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .domain(domain)
        .max_age(max_age)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Set the access-token cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use veritext_auth_types::cookie::{set_access_token_cookie, ACCESS_TOKEN_COOKIE};
///
/// let jar = set_access_token_cookie(CookieJar::new(), "a".to_string(), "example.com".to_string());
/// let cookie = jar.get(ACCESS_TOKEN_COOKIE).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(900)));
/// assert!(cookie.http_only().unwrap_or(false));
/// ```
pub fn set_access_token_cookie(jar: CookieJar, value: String, domain: String) -> CookieJar {
    jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        value,
        "/",
        domain,
        Duration::seconds(ACCESS_TOKEN_TTL_SECS as i64),
    ))
}

/// Set the refresh-token cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use veritext_auth_types::cookie::{set_refresh_token_cookie, REFRESH_TOKEN_COOKIE};
///
/// let jar = set_refresh_token_cookie(CookieJar::new(), "r".to_string(), "example.com".to_string());
/// let cookie = jar.get(REFRESH_TOKEN_COOKIE).unwrap();
/// assert_eq!(cookie.path(), Some("/auth/token"));
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_refresh_token_cookie(jar: CookieJar, value: String, domain: String) -> CookieJar {
    jar.add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        value,
        REFRESH_TOKEN_PATH,
        domain,
        Duration::seconds(REFRESH_TOKEN_TTL_SECS as i64),
    ))
}

/// Expire both token cookies (Max-Age=0). This is the transport half of a logout;
/// revoking the token IDs is the caller's job.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use veritext_auth_types::cookie::{clear_cookies, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
///
/// let jar = clear_cookies(CookieJar::new(), "example.com".to_string());
/// assert_eq!(jar.get(ACCESS_TOKEN_COOKIE).unwrap().max_age(), Some(time::Duration::ZERO));
/// assert_eq!(jar.get(REFRESH_TOKEN_COOKIE).unwrap().value(), "");
/// ```
pub fn clear_cookies(jar: CookieJar, domain: String) -> CookieJar {
    jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        String::new(),
        "/",
        domain.clone(),
        Duration::ZERO,
    ))
    .add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        String::new(),
        REFRESH_TOKEN_PATH,
        domain,
        Duration::ZERO,
    ))
}
