//! Stateless signing and verification of access and refresh tokens.
//!
//! Both token classes are HS256 JWTs signed with their own secret and tagged
//! with a `typ` claim, so a refresh token is never accepted where an access
//! token is expected and vice versa. Verification takes the clock explicitly;
//! nothing here touches storage.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use veritext_domain::user::{Plan, UserRole};

/// Access-token lifetime in seconds (15 minutes).
pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Refresh-token lifetime in seconds (7 days).
pub const REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Errors returned by token verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("failed to sign token")]
    Signing,
}

/// Token class carried in the `typ` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims of a short-lived access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID.
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub plan: Plan,
    /// Token ID, the key for revocation.
    pub jti: Uuid,
    /// Issued-at, seconds since UNIX epoch.
    pub iat: u64,
    /// Expiry, seconds since UNIX epoch.
    pub exp: u64,
    pub typ: TokenKind,
}

/// Claims of a refresh token. Carries only the user ID; everything else is
/// reloaded from storage when a new pair is minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: u64,
    pub exp: u64,
    pub typ: TokenKind,
}

/// Identity snapshot encoded into an access token.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
    pub role: UserRole,
    pub plan: Plan,
}

/// A signed token together with the metadata callers need for cookies and revocation.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: Uuid,
    pub exp: u64,
}

/// Freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Seconds since UNIX epoch from the system clock.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Signs and verifies both token classes.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
        }
    }

    pub fn issue(&self, subject: TokenSubject<'_>) -> Result<TokenPair, TokenError> {
        self.issue_at(subject, now_secs())
    }

    /// Mint an access/refresh pair as of `now` (seconds since epoch).
    pub fn issue_at(&self, subject: TokenSubject<'_>, now: u64) -> Result<TokenPair, TokenError> {
        let access = AccessClaims {
            sub: subject.user_id,
            email: subject.email.to_owned(),
            role: subject.role,
            plan: subject.plan,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + ACCESS_TOKEN_TTL_SECS,
            typ: TokenKind::Access,
        };
        let refresh = RefreshClaims {
            sub: subject.user_id,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + REFRESH_TOKEN_TTL_SECS,
            typ: TokenKind::Refresh,
        };

        Ok(TokenPair {
            access: IssuedToken {
                token: sign(&access, &self.access_encoding)?,
                jti: access.jti,
                exp: access.exp,
            },
            refresh: IssuedToken {
                token: sign(&refresh, &self.refresh_encoding)?,
                jti: refresh.jti,
                exp: refresh.exp,
            },
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify_access_at(token, now_secs())
    }

    pub fn verify_access_at(&self, token: &str, now: u64) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = decode_claims(token, &self.access_decoding)?;
        check_claims(claims.typ, TokenKind::Access, claims.exp, now)?;
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify_refresh_at(token, now_secs())
    }

    pub fn verify_refresh_at(&self, token: &str, now: u64) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = decode_claims(token, &self.refresh_decoding)?;
        check_claims(claims.typ, TokenKind::Refresh, claims.exp, now)?;
        Ok(claims)
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, TokenError> {
    encode(&Header::new(Algorithm::HS256), claims, key).map_err(|_| TokenError::Signing)
}

/// Signature and shape only. Expiry is checked by the caller against an explicit clock.
fn decode_claims<T: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<T, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<T>(token, key, &validation).map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidRsaKey(_) => {
            TokenError::InvalidSignature
        }
        _ => TokenError::Malformed,
    })?;
    Ok(data.claims)
}

fn check_claims(
    actual: TokenKind,
    expected: TokenKind,
    exp: u64,
    now: u64,
) -> Result<(), TokenError> {
    if actual != expected {
        return Err(TokenError::Malformed);
    }
    if exp <= now {
        return Err(TokenError::Expired);
    }
    Ok(())
}
