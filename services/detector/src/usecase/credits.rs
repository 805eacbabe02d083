use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use veritext_domain::credit::{CreditReason, CreditTransaction, PlanAllowances};
use veritext_domain::user::Plan;

use crate::domain::repository::CreditLedger;
use crate::domain::types::{BatchResetReport, RESET_TIMEOUT_SECS, ResetOutcome};
use crate::error::DetectorError;

/// Emit one balance movement as a structured event.
pub fn record_transaction(
    user_id: Uuid,
    delta: Option<i64>,
    balance_after: Option<i64>,
    reason: CreditReason,
) {
    let tx = CreditTransaction {
        user_id,
        delta,
        balance_after,
        reason,
        at: Utc::now(),
    };
    info!(
        user_id = %tx.user_id,
        delta = tx.delta,
        balance_after = tx.balance_after,
        reason = tx.reason.as_str(),
        at = %tx.at,
        "credit transaction"
    );
}

// ── GetBalance ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub credits: i32,
    pub plan: Plan,
    pub monthly_allowance: i32,
    pub credits_reset_at: DateTime<Utc>,
    pub next_reset_at: DateTime<Utc>,
}

pub struct GetBalanceUseCase<L: CreditLedger> {
    pub ledger: L,
    pub allowances: PlanAllowances,
}

impl<L: CreditLedger> GetBalanceUseCase<L> {
    pub async fn execute(
        &self,
        user_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> Result<Balance, DetectorError> {
        let account = self
            .ledger
            .account(user_id)
            .await?
            .ok_or(DetectorError::NotFound)?;
        Ok(Balance {
            credits: account.credits,
            plan: account.plan,
            monthly_allowance: self.allowances.for_plan(account.plan),
            credits_reset_at: account.credits_reset_at,
            next_reset_at: account.next_reset_at(as_of),
        })
    }
}

// ── ResetCredits ─────────────────────────────────────────────────────────────

/// Summary of one scheduled reset run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRunReport {
    pub users_processed: u32,
    pub batch: BatchResetReport,
    pub execution_time_ms: u64,
}

pub struct ResetCreditsUseCase<L: CreditLedger> {
    pub ledger: L,
    /// Upper bound for one user's reset.
    pub per_user_timeout: Duration,
}

impl<L: CreditLedger> ResetCreditsUseCase<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            per_user_timeout: Duration::from_secs(RESET_TIMEOUT_SECS),
        }
    }

    /// Reset every listed user independently. One failure never stops the rest.
    pub async fn batch_reset(&self, user_ids: &[Uuid], as_of: DateTime<Utc>) -> BatchResetReport {
        let mut report = BatchResetReport::default();
        for &user_id in user_ids {
            let outcome = tokio::time::timeout(
                self.per_user_timeout,
                self.ledger.reset_credits(user_id, as_of),
            )
            .await;

            match outcome {
                Ok(Ok(ResetOutcome::Reset { amount })) => {
                    record_transaction(user_id, None, Some(i64::from(amount)), CreditReason::Reset);
                    report.success += 1;
                }
                Ok(Ok(ResetOutcome::AlreadyCurrent)) => {
                    info!(%user_id, "credits already current for this period");
                    report.success += 1;
                }
                Ok(Err(e)) => {
                    warn!(%user_id, error = %e, "credit reset failed");
                    report.failed += 1;
                    report.errors.push(format!("{user_id}: {}", describe(&e)));
                }
                Err(_) => {
                    warn!(
                        %user_id,
                        timeout_ms = self.per_user_timeout.as_millis() as u64,
                        "credit reset timed out"
                    );
                    report.failed += 1;
                    report.errors.push(format!("{user_id}: timed out"));
                }
            }
        }
        report
    }

    /// Find everyone due as of `as_of` and reset them.
    pub async fn execute(&self, as_of: DateTime<Utc>) -> Result<ResetRunReport, DetectorError> {
        let started = Instant::now();
        let due = self.ledger.list_users_due_for_reset(as_of).await?;
        let batch = self.batch_reset(&due, as_of).await;
        let report = ResetRunReport {
            users_processed: u32::try_from(due.len()).unwrap_or(u32::MAX),
            batch,
            execution_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            users_processed = report.users_processed,
            successful = report.batch.success,
            failed = report.batch.failed,
            execution_time_ms = report.execution_time_ms,
            "credit reset run finished"
        );
        Ok(report)
    }
}

/// Error text for the report; internal errors carry their context chain.
fn describe(e: &DetectorError) -> String {
    match e {
        DetectorError::Internal(inner) | DetectorError::Persistence(inner) => format!("{inner:#}"),
        other => other.to_string(),
    }
}
