use std::time::Duration;

use anyhow::Context as _;
use tracing::{info, warn};
use uuid::Uuid;

use veritext_auth_types::token::{TokenCodec, TokenPair, TokenSubject};
use veritext_domain::user::normalize_email;

use crate::domain::repository::{RevocationList, UserRepository};
use crate::domain::types::User;
use crate::error::DetectorError;

/// Time left before `exp`, used as the revocation entry's lifetime.
pub fn remaining_lifetime(exp: u64, now: u64) -> Duration {
    Duration::from_secs(exp.saturating_sub(now))
}

fn subject(user: &User) -> TokenSubject<'_> {
    TokenSubject {
        user_id: user.id,
        email: &user.email,
        role: user.role,
        plan: user.plan,
    }
}

#[derive(Debug)]
pub struct SessionTokens {
    pub user_id: Uuid,
    pub pair: TokenPair,
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub struct LoginUseCase<U: UserRepository> {
    pub users: U,
    pub codec: TokenCodec,
}

impl<U: UserRepository> LoginUseCase<U> {
    pub async fn execute(
        &self,
        input: LoginInput,
        now: u64,
    ) -> Result<SessionTokens, DetectorError> {
        let email = normalize_email(&input.email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(DetectorError::InvalidCredentials)?;

        // Accounts created through an external provider have no password.
        let Some(hash) = user.password_hash.clone() else {
            return Err(DetectorError::InvalidCredentials);
        };

        let password = input.password;
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("join password verification")?;
        let verified = match verified {
            Ok(v) => v,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "stored password hash is unreadable");
                false
            }
        };
        if !verified {
            return Err(DetectorError::InvalidCredentials);
        }

        let pair = self.codec.issue_at(subject(&user), now)?;
        info!(user_id = %user.id, "session created");
        Ok(SessionTokens {
            user_id: user.id,
            pair,
        })
    }
}

// ── Refresh ──────────────────────────────────────────────────────────────────

/// Rotate a refresh token into a new pair. The old refresh token is revoked.
pub struct RefreshSessionUseCase<U: UserRepository, R: RevocationList> {
    pub users: U,
    pub revocations: R,
    pub codec: TokenCodec,
}

impl<U: UserRepository, R: RevocationList> RefreshSessionUseCase<U, R> {
    pub async fn execute(
        &self,
        refresh_token: &str,
        now: u64,
    ) -> Result<SessionTokens, DetectorError> {
        let claims = self.codec.verify_refresh_at(refresh_token, now)?;

        // Claiming the jti is the rotation: of two concurrent requests with the
        // same token only one gets a new pair.
        let claimed = self
            .revocations
            .revoke_if_absent(claims.jti, remaining_lifetime(claims.exp, now))
            .await?;
        if !claimed {
            warn!(user_id = %claims.sub, "refresh token replayed");
            return Err(DetectorError::TokenInvalid);
        }

        // Plan and role are reloaded so a rotated access token reflects the current account.
        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(DetectorError::TokenInvalid)?;

        let pair = self.codec.issue_at(subject(&user), now)?;
        info!(user_id = %user.id, "session refreshed");
        Ok(SessionTokens {
            user_id: user.id,
            pair,
        })
    }
}

// ── Logout ───────────────────────────────────────────────────────────────────

/// Revoke whichever presented tokens still verify.
///
/// An expired or missing access token does not block the logout; the refresh
/// token is revoked on its own in that case.
pub struct LogoutUseCase<R: RevocationList> {
    pub revocations: R,
    pub codec: TokenCodec,
}

impl<R: RevocationList> LogoutUseCase<R> {
    pub async fn execute(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        now: u64,
    ) -> Result<(), DetectorError> {
        let access = access_token.and_then(|t| self.codec.verify_access_at(t, now).ok());
        let refresh = refresh_token.and_then(|t| self.codec.verify_refresh_at(t, now).ok());

        if let Some(claims) = &access {
            self.revocations
                .revoke(claims.jti, remaining_lifetime(claims.exp, now))
                .await?;
        }

        match (&access, refresh) {
            (Some(access), Some(claims)) if claims.sub != access.sub => {
                warn!(user_id = %access.sub, "refresh token belongs to another user, ignored");
            }
            (_, Some(claims)) => {
                self.revocations
                    .revoke(claims.jti, remaining_lifetime(claims.exp, now))
                    .await?;
            }
            (_, None) => {}
        }

        match access {
            Some(claims) => info!(user_id = %claims.sub, "session revoked"),
            None => info!("session cookies cleared without a live access token"),
        }
        Ok(())
    }
}
