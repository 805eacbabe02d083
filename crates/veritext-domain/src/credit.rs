//! Credit allowances, billing periods and the conceptual credit journal.

use chrono::{DateTime, Datelike, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::Plan;

/// Monthly credit allowance per plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAllowances {
    pub free: i32,
    pub pro: i32,
    pub enterprise: i32,
}

impl Default for PlanAllowances {
    fn default() -> Self {
        Self {
            free: 10,
            pro: 100,
            enterprise: 1000,
        }
    }
}

impl PlanAllowances {
    pub fn for_plan(&self, plan: Plan) -> i32 {
        match plan {
            Plan::Free => self.free,
            Plan::Pro => self.pro,
            Plan::Enterprise => self.enterprise,
        }
    }
}

/// Why a balance moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditReason {
    Consume,
    Refund,
    Reset,
    /// Allowance credited outside the monthly cycle, such as by the billing
    /// provider on an upgrade. This service reads such entries but never
    /// writes them.
    Grant,
}

impl CreditReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consume => "CONSUME",
            Self::Refund => "REFUND",
            Self::Reset => "RESET",
            Self::Grant => "GRANT",
        }
    }
}

/// One balance movement. Not stored; emitted as a structured log event.
///
/// For a RESET the delta is unknown without a second read, so it carries the
/// new absolute balance in `balance_after` and `delta` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditTransaction {
    pub user_id: Uuid,
    pub delta: Option<i64>,
    pub balance_after: Option<i64>,
    pub reason: CreditReason,
    pub at: DateTime<Utc>,
}

/// Point from which a user's monthly periods are counted.
///
/// Paid plans follow the billing provider's `current_period_end` when known;
/// everything else follows the account creation date.
pub fn billing_anchor(
    plan: Plan,
    created_at: DateTime<Utc>,
    current_period_end: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    match current_period_end {
        Some(end) if plan.is_paid() => end,
        _ => created_at,
    }
}

fn shift_months(anchor: DateTime<Utc>, months: i64) -> DateTime<Utc> {
    let shifted = if months >= 0 {
        anchor.checked_add_months(Months::new(months as u32))
    } else {
        anchor.checked_sub_months(Months::new(months.unsigned_abs() as u32))
    };
    shifted.unwrap_or(anchor)
}

/// Latest `anchor + k months` (k may be negative) that is not after `as_of`.
///
/// Day-of-month is clamped to the end of shorter months, so an anchor on the
/// 31st yields the 28th/29th/30th where needed.
pub fn period_start(anchor: DateTime<Utc>, as_of: DateTime<Utc>) -> DateTime<Utc> {
    let diff = i64::from(as_of.year() - anchor.year()) * 12
        + i64::from(as_of.month0()) - i64::from(anchor.month0());
    let candidate = shift_months(anchor, diff);
    if candidate > as_of {
        shift_months(anchor, diff - 1)
    } else {
        candidate
    }
}

/// Start of the period following the one containing `as_of`.
pub fn next_period_start(anchor: DateTime<Utc>, as_of: DateTime<Utc>) -> DateTime<Utc> {
    let current = period_start(anchor, as_of);
    let diff = i64::from(current.year() - anchor.year()) * 12
        + i64::from(current.month0()) - i64::from(anchor.month0());
    shift_months(anchor, diff + 1)
}

/// A balance is due for reset once its last allocation predates the current period.
pub fn is_due(credits_reset_at: DateTime<Utc>, period_start: DateTime<Utc>) -> bool {
    credits_reset_at < period_start
}
