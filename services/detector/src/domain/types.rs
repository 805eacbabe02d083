use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use veritext_domain::analysis::{Confidence, Indicator, Language, SuspiciousPart};
use veritext_domain::credit::{billing_anchor, is_due, next_period_start, period_start};
use veritext_domain::user::{Plan, UserRole};

/// Credits consumed by one analysis.
pub const ANALYSIS_COST: i32 = 1;

/// Upper bound for a single user's reset inside a batch, in seconds.
pub const RESET_TIMEOUT_SECS: u64 = 10;

/// Stored user as the detector sees it.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// `None` for accounts that only sign in through an external provider.
    pub password_hash: Option<String>,
    pub plan: Plan,
    pub role: UserRole,
    pub credits: i32,
    pub credits_reset_at: DateTime<Utc>,
    pub email_verified: bool,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One persisted scoring result. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ai_score: f64,
    pub confidence: Confidence,
    pub is_ai_generated: bool,
    pub indicators: Vec<Indicator>,
    pub explanation: String,
    pub suspicious_parts: Vec<SuspiciousPart>,
    pub processing_time_ms: u64,
    pub word_count: u32,
    pub char_count: u32,
    pub language: Language,
    #[serde(serialize_with = "veritext_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

/// Aggregate over a user's analyses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub count: u64,
    /// `None` when the user has no analyses.
    pub average_ai_score: Option<f64>,
}

/// Normalized output of the scoring provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    /// AI probability in `0.0..=100.0`.
    pub ai_score: f64,
    pub indicators: Vec<Indicator>,
    pub explanation: String,
    pub suspicious_parts: Vec<SuspiciousPart>,
    pub processing_time_ms: u64,
}

/// Credit held by an in-flight analysis.
///
/// `period_marker` is the `credits_reset_at` value the decrement was applied
/// against; a refund only lands while the balance is still in that period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub user_id: Uuid,
    pub amount: i32,
    /// Balance right after the decrement.
    pub remaining: i32,
    pub period_marker: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    Granted(Reservation),
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Balance set to the plan allowance.
    Reset { amount: i32 },
    /// Already allocated for the current period; nothing written.
    AlreadyCurrent,
}

/// Ledger-relevant slice of a user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    pub user_id: Uuid,
    pub plan: Plan,
    pub credits: i32,
    pub credits_reset_at: DateTime<Utc>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LedgerAccount {
    pub fn anchor(&self) -> DateTime<Utc> {
        billing_anchor(self.plan, self.created_at, self.current_period_end)
    }

    pub fn period_start(&self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        period_start(self.anchor(), as_of)
    }

    pub fn next_reset_at(&self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        next_period_start(self.anchor(), as_of)
    }

    pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
        is_due(self.credits_reset_at, self.period_start(as_of))
    }
}

/// Outcome of resetting a batch of users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResetReport {
    pub success: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}
