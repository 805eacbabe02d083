#![allow(async_fn_in_trait)]

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use veritext_domain::analysis::Language;
use veritext_domain::pagination::PageRequest;

use crate::domain::types::{
    Analysis, AnalysisStats, LedgerAccount, ReserveOutcome, Reservation, ResetOutcome,
    ScoreResult, User,
};
use crate::error::{DetectorError, ScoringError};

/// Read access to stored users.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DetectorError>;

    /// Lookup by already-normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DetectorError>;
}

/// Persistence of analysis results, always scoped to the owning user.
pub trait AnalysisRepository: Send + Sync {
    async fn create(&self, analysis: &Analysis) -> Result<(), DetectorError>;

    /// Newest first.
    async fn list(&self, user_id: Uuid, page: PageRequest) -> Result<Vec<Analysis>, DetectorError>;

    async fn stats(&self, user_id: Uuid) -> Result<AnalysisStats, DetectorError>;

    async fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Analysis>, DetectorError>;

    /// Returns `true` if a row was deleted.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, DetectorError>;
}

/// The external AI-detection provider.
pub trait ScoringPort: Send + Sync {
    async fn score(&self, text: &str, language: Language) -> Result<ScoreResult, ScoringError>;
}

/// Per-user credit balance.
///
/// Futures are `Send` so a compensating refund can be spawned from a drop guard.
pub trait CreditLedger: Clone + Send + Sync + 'static {
    /// Decrement by `cost` iff the balance covers it, as one conditional write.
    fn reserve(
        &self,
        user_id: Uuid,
        cost: i32,
    ) -> impl Future<Output = Result<ReserveOutcome, DetectorError>> + Send;

    /// Return a reservation. `Ok(false)` when a reset already replaced the
    /// balance it was taken from.
    fn refund(
        &self,
        reservation: &Reservation,
    ) -> impl Future<Output = Result<bool, DetectorError>> + Send;

    fn account(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<LedgerAccount>, DetectorError>> + Send;

    fn list_users_due_for_reset(
        &self,
        as_of: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Uuid>, DetectorError>> + Send;

    /// Set the balance to the plan allowance unless it was already allocated
    /// for the period containing `as_of`. The staleness check is part of the write.
    fn reset_credits(
        &self,
        user_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> impl Future<Output = Result<ResetOutcome, DetectorError>> + Send;
}

/// Denylist of token IDs that must no longer authenticate.
pub trait RevocationList: Clone + Send + Sync + 'static {
    /// Entries expire after `ttl`, normally the token's remaining lifetime.
    fn revoke(
        &self,
        jti: Uuid,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), DetectorError>> + Send;

    /// Revoke `jti` unless it already is, in one atomic step.
    ///
    /// Returns `true` for the single caller that made the entry.
    fn revoke_if_absent(
        &self,
        jti: Uuid,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, DetectorError>> + Send;

    fn is_revoked(&self, jti: Uuid) -> impl Future<Output = Result<bool, DetectorError>> + Send;
}
