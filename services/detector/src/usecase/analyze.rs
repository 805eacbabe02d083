//! The analysis pipeline: validate, reserve a credit, score, persist.
//!
//! The scoring call happens outside any storage transaction. Once a credit
//! is reserved every exit path either keeps it (success) or hands it back
//! through [`RefundGuard`], including the request future being dropped.

use std::fmt;

use chrono::Utc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use veritext_domain::analysis::{
    ConfidenceThresholds, Language, MAX_TEXT_CHARS, MIN_TEXT_CHARS, TextMetrics,
};
use veritext_domain::credit::CreditReason;

use crate::domain::repository::{AnalysisRepository, CreditLedger, ScoringPort};
use crate::domain::types::{ANALYSIS_COST, Analysis, ReserveOutcome, Reservation};
use crate::error::DetectorError;
use crate::usecase::credits::record_transaction;

/// Pipeline position, attached to every log line of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    ReservingCredit,
    Scoring,
    Persisting,
    Debited,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::ReservingCredit => "reserving_credit",
            Self::Scoring => "scoring",
            Self::Persisting => "persisting",
            Self::Debited => "debited",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product parameters of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisPolicy {
    pub thresholds: ConfidenceThresholds,
    /// Used when the request names no language.
    pub default_language: Language,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            thresholds: ConfidenceThresholds::default(),
            default_language: Language::Pt,
        }
    }
}

/// Input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedText {
    pub text: String,
    pub language: Language,
    pub metrics: TextMetrics,
}

/// Check length and language before anything else is touched.
pub fn validate(
    text: &str,
    language: Option<&str>,
    default_language: Language,
) -> Result<ValidatedText, DetectorError> {
    let text = text.trim();
    let metrics = TextMetrics::measure(text);
    if metrics.char_count < MIN_TEXT_CHARS {
        return Err(DetectorError::Validation(format!(
            "text must be at least {MIN_TEXT_CHARS} characters"
        )));
    }
    if metrics.char_count > MAX_TEXT_CHARS {
        return Err(DetectorError::Validation(format!(
            "text must be at most {MAX_TEXT_CHARS} characters"
        )));
    }

    let language = match language {
        None => default_language,
        Some(value) => value
            .parse::<Language>()
            .map_err(|_| DetectorError::Validation(format!("unsupported language: {value}")))?,
    };

    Ok(ValidatedText {
        text: text.to_owned(),
        language,
        metrics,
    })
}

/// Holds a reservation until the run settles.
///
/// Dropped while still armed, it spawns the refund on the current runtime.
pub struct RefundGuard<L: CreditLedger> {
    ledger: L,
    reservation: Option<Reservation>,
}

impl<L: CreditLedger> RefundGuard<L> {
    pub fn arm(ledger: L, reservation: Reservation) -> Self {
        Self {
            ledger,
            reservation: Some(reservation),
        }
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    /// Keep the credit spent.
    pub fn disarm(mut self) -> Option<Reservation> {
        self.reservation.take()
    }

    /// Refund inline on an explicit failure path.
    pub async fn refund_now(mut self) {
        if let Some(reservation) = self.reservation.take() {
            refund_logged(&self.ledger, &reservation).await;
        }
    }
}

impl<L: CreditLedger> Drop for RefundGuard<L> {
    fn drop(&mut self) {
        let Some(reservation) = self.reservation.take() else {
            return;
        };
        warn!(
            user_id = %reservation.user_id,
            "analysis abandoned after reservation, refunding in background"
        );
        match Handle::try_current() {
            Ok(handle) => {
                let ledger = self.ledger.clone();
                handle.spawn(async move {
                    refund_logged(&ledger, &reservation).await;
                });
            }
            Err(_) => {
                error!(
                    user_id = %reservation.user_id,
                    amount = reservation.amount,
                    "no runtime available, reservation not refunded"
                );
            }
        }
    }
}

/// Refund and log the outcome. Never fails the caller.
pub async fn refund_logged<L: CreditLedger>(ledger: &L, reservation: &Reservation) {
    match ledger.refund(reservation).await {
        Ok(true) => record_transaction(
            reservation.user_id,
            Some(i64::from(reservation.amount)),
            None,
            CreditReason::Refund,
        ),
        Ok(false) => info!(
            user_id = %reservation.user_id,
            amount = reservation.amount,
            "refund absorbed by a reset in the meantime"
        ),
        Err(e) => error!(
            user_id = %reservation.user_id,
            amount = reservation.amount,
            error = %e,
            "refund failed"
        ),
    }
}

pub struct AnalyzeInput {
    pub user_id: Uuid,
    pub text: String,
    pub language: Option<String>,
}

#[derive(Debug)]
pub struct AnalyzeOutput {
    pub analysis: Analysis,
    pub remaining_credits: i32,
}

pub struct AnalyzeTextUseCase<L: CreditLedger, S: ScoringPort, A: AnalysisRepository> {
    pub ledger: L,
    pub scorer: S,
    pub analyses: A,
    pub policy: AnalysisPolicy,
}

impl<L: CreditLedger, S: ScoringPort, A: AnalysisRepository> AnalyzeTextUseCase<L, S, A> {
    pub async fn execute(&self, input: AnalyzeInput) -> Result<AnalyzeOutput, DetectorError> {
        let user_id = input.user_id;

        let mut stage = Stage::Validating;
        let validated = validate(
            &input.text,
            input.language.as_deref(),
            self.policy.default_language,
        )
        .inspect_err(|e| debug!(%user_id, %stage, error = %e, "rejected input"))?;

        stage = Stage::ReservingCredit;
        let reservation = match self.ledger.reserve(user_id, ANALYSIS_COST).await? {
            ReserveOutcome::Granted(reservation) => reservation,
            ReserveOutcome::Denied => {
                info!(%user_id, %stage, "insufficient credits");
                return Err(DetectorError::InsufficientCredits);
            }
        };
        record_transaction(
            user_id,
            Some(-i64::from(reservation.amount)),
            Some(i64::from(reservation.remaining)),
            CreditReason::Consume,
        );
        let remaining_credits = reservation.remaining;
        let guard = RefundGuard::arm(self.ledger.clone(), reservation);

        stage = Stage::Scoring;
        let scored = match self
            .scorer
            .score(&validated.text, validated.language)
            .await
        {
            Ok(scored) => scored,
            Err(e) => {
                warn!(%user_id, %stage, error = %e, "scoring failed, refunding");
                guard.refund_now().await;
                return Err(DetectorError::UpstreamUnavailable);
            }
        };

        let classification = self.policy.thresholds.classify(scored.ai_score);

        stage = Stage::Persisting;
        let analysis = Analysis {
            id: Uuid::new_v4(),
            user_id,
            ai_score: scored.ai_score,
            confidence: classification.confidence,
            is_ai_generated: classification.is_ai_generated,
            indicators: scored.indicators,
            explanation: scored.explanation,
            suspicious_parts: scored.suspicious_parts,
            processing_time_ms: scored.processing_time_ms,
            word_count: u32::try_from(validated.metrics.word_count).unwrap_or(u32::MAX),
            char_count: u32::try_from(validated.metrics.char_count).unwrap_or(u32::MAX),
            language: validated.language,
            created_at: Utc::now(),
        };
        if let Err(e) = self.analyses.create(&analysis).await {
            error!(%user_id, %stage, error = %e, "persisting analysis failed, refunding");
            guard.refund_now().await;
            return Err(DetectorError::Persistence(
                anyhow::Error::new(e).context("persist analysis"),
            ));
        }

        stage = Stage::Debited;
        guard.disarm();
        info!(
            %user_id,
            %stage,
            analysis_id = %analysis.id,
            ai_score = analysis.ai_score,
            confidence = analysis.confidence.as_str(),
            processing_time_ms = analysis.processing_time_ms,
            remaining_credits,
            "analysis completed"
        );

        Ok(AnalyzeOutput {
            analysis,
            remaining_credits,
        })
    }
}
