//! Session extraction for authenticated routes.

use std::future::Future;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use veritext_auth_types::token::{AccessClaims, TokenCodec};
use veritext_auth_types::transport::access_token;

use crate::domain::repository::RevocationList;
use crate::error::DetectorError;

/// What the [`AuthSession`] extractor needs from router state.
pub trait SessionState: Send + Sync {
    type Revocations: RevocationList;

    fn token_codec(&self) -> &TokenCodec;

    fn revocations(&self) -> Self::Revocations;
}

/// A verified, non-revoked access token.
///
/// Read from the `accessToken` cookie, else `Authorization: Bearer`.
/// Missing ⇒ `Unauthorized`; expired ⇒ `TokenExpired`; bad signature, wrong
/// token class or revoked ⇒ `TokenInvalid`.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: AccessClaims,
}

impl AuthSession {
    pub fn user_id(&self) -> Uuid {
        self.claims.sub
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: SessionState,
{
    type Rejection = DetectorError;

    // Verification is synchronous; only the revocation lookup awaits, on owned values.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let verified = match access_token(&parts.headers) {
            Some(token) => state
                .token_codec()
                .verify_access(&token)
                .map_err(DetectorError::from),
            None => Err(DetectorError::Unauthorized),
        };
        let revocations = state.revocations();

        async move {
            let claims = verified?;
            if revocations.is_revoked(claims.jti).await? {
                return Err(DetectorError::TokenInvalid);
            }
            Ok(Self { claims })
        }
    }
}
