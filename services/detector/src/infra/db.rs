use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, SimpleExpr, UpdateStatement};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
};
use uuid::Uuid;

use veritext_detector_schema::{analyses, users};
use veritext_domain::analysis::{Confidence, Indicator, Language, SuspiciousPart};
use veritext_domain::credit::PlanAllowances;
use veritext_domain::pagination::PageRequest;
use veritext_domain::user::{Plan, UserRole};

use crate::domain::repository::{AnalysisRepository, CreditLedger, UserRepository};
use crate::domain::types::{
    Analysis, AnalysisStats, LedgerAccount, ReserveOutcome, Reservation, ResetOutcome, User,
};
use crate::error::DetectorError;

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DetectorError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        model.map(user_from_model).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DetectorError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find user by email")?;
        model.map(user_from_model).transpose()
    }
}

fn user_from_model(model: users::Model) -> Result<User, DetectorError> {
    let plan = model.plan.parse::<Plan>().context("decode user plan")?;
    let role = model.role.parse::<UserRole>().context("decode user role")?;
    Ok(User {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        plan,
        role,
        credits: model.credits,
        credits_reset_at: model.credits_reset_at,
        email_verified: model.email_verified,
        current_period_end: model.current_period_end,
        created_at: model.created_at,
    })
}

fn account_from_model(model: users::Model) -> Result<LedgerAccount, DetectorError> {
    let plan = model.plan.parse::<Plan>().context("decode user plan")?;
    Ok(LedgerAccount {
        user_id: model.id,
        plan,
        credits: model.credits,
        credits_reset_at: model.credits_reset_at,
        current_period_end: model.current_period_end,
        created_at: model.created_at,
    })
}

// ── Credit ledger ────────────────────────────────────────────────────────────

/// Balance stored in `users.credits`. Every write is a single conditional
/// UPDATE so concurrent requests never observe a half-applied movement.
#[derive(Clone)]
pub struct DbCreditLedger {
    pub db: DatabaseConnection,
    pub allowances: PlanAllowances,
}

/// Take `cost` credits only while the balance covers it, returning the row.
fn reserve_statement(user_id: Uuid, cost: i32, now: DateTime<Utc>) -> UpdateStatement {
    let mut stmt = users::Entity::update_many()
        .col_expr(
            users::Column::Credits,
            Expr::col(users::Column::Credits).sub(cost),
        )
        .col_expr(users::Column::UpdatedAt, Expr::value(now))
        .filter(users::Column::Id.eq(user_id))
        .filter(users::Column::Credits.gte(cost))
        .into_query();
    stmt.returning_all();
    stmt
}

/// Give a reservation back unless the period it was taken from has been reset.
fn refund_statement(reservation: &Reservation, now: DateTime<Utc>) -> UpdateStatement {
    users::Entity::update_many()
        .col_expr(
            users::Column::Credits,
            Expr::col(users::Column::Credits).add(reservation.amount),
        )
        .col_expr(users::Column::UpdatedAt, Expr::value(now))
        .filter(users::Column::Id.eq(reservation.user_id))
        .filter(users::Column::CreditsResetAt.eq(reservation.period_marker))
        .into_query()
}

/// Restore the allowance once per period; a second run finds the marker moved.
fn reset_statement(
    user_id: Uuid,
    amount: i32,
    period_start: DateTime<Utc>,
    as_of: DateTime<Utc>,
    now: DateTime<Utc>,
) -> UpdateStatement {
    users::Entity::update_many()
        .col_expr(users::Column::Credits, Expr::value(amount))
        .col_expr(users::Column::CreditsResetAt, Expr::value(as_of))
        .col_expr(users::Column::UpdatedAt, Expr::value(now))
        .filter(users::Column::Id.eq(user_id))
        .filter(users::Column::CreditsResetAt.lt(period_start))
        .into_query()
}

impl CreditLedger for DbCreditLedger {
    async fn reserve(&self, user_id: Uuid, cost: i32) -> Result<ReserveOutcome, DetectorError> {
        let backend = self.db.get_database_backend();
        let stmt = reserve_statement(user_id, cost, Utc::now());
        let row = users::Entity::find()
            .from_raw_sql(backend.build(&stmt))
            .one(&self.db)
            .await
            .context("reserve credits")?;

        Ok(match row {
            Some(row) => ReserveOutcome::Granted(Reservation {
                user_id,
                amount: cost,
                remaining: row.credits,
                period_marker: row.credits_reset_at,
            }),
            None => ReserveOutcome::Denied,
        })
    }

    async fn refund(&self, reservation: &Reservation) -> Result<bool, DetectorError> {
        let backend = self.db.get_database_backend();
        let result = self
            .db
            .execute(backend.build(&refund_statement(reservation, Utc::now())))
            .await
            .context("refund credits")?;
        Ok(result.rows_affected() > 0)
    }

    async fn account(&self, user_id: Uuid) -> Result<Option<LedgerAccount>, DetectorError> {
        let model = users::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .context("load ledger account")?;
        model.map(account_from_model).transpose()
    }

    async fn list_users_due_for_reset(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, DetectorError> {
        // Period boundaries depend on each user's anchor, so the final cut is made here.
        let models = users::Entity::find()
            .filter(users::Column::CreditsResetAt.lt(as_of))
            .order_by_asc(users::Column::CreditsResetAt)
            .all(&self.db)
            .await
            .context("list reset candidates")?;

        let mut due = Vec::new();
        for model in models {
            let account = account_from_model(model)?;
            if account.is_due(as_of) {
                due.push(account.user_id);
            }
        }
        Ok(due)
    }

    async fn reset_credits(
        &self,
        user_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> Result<ResetOutcome, DetectorError> {
        let account = self.account(user_id).await?.ok_or(DetectorError::NotFound)?;
        let period_start = account.period_start(as_of);
        let amount = self.allowances.for_plan(account.plan);

        let backend = self.db.get_database_backend();
        let stmt = reset_statement(user_id, amount, period_start, as_of, Utc::now());
        let result = self
            .db
            .execute(backend.build(&stmt))
            .await
            .context("reset credits")?;

        Ok(if result.rows_affected() > 0 {
            ResetOutcome::Reset { amount }
        } else {
            ResetOutcome::AlreadyCurrent
        })
    }
}

// ── Analysis repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAnalysisRepository {
    pub db: DatabaseConnection,
}

impl AnalysisRepository for DbAnalysisRepository {
    async fn create(&self, analysis: &Analysis) -> Result<(), DetectorError> {
        let indicators =
            serde_json::to_value(&analysis.indicators).context("encode indicators")?;
        let suspicious_parts =
            serde_json::to_value(&analysis.suspicious_parts).context("encode suspicious parts")?;

        analyses::ActiveModel {
            id: Set(analysis.id),
            user_id: Set(analysis.user_id),
            ai_score: Set(analysis.ai_score),
            confidence: Set(analysis.confidence.as_str().to_owned()),
            is_ai_generated: Set(analysis.is_ai_generated),
            indicators: Set(indicators),
            explanation: Set(analysis.explanation.clone()),
            suspicious_parts: Set(suspicious_parts),
            processing_time_ms: Set(
                i64::try_from(analysis.processing_time_ms).unwrap_or(i64::MAX),
            ),
            word_count: Set(i32::try_from(analysis.word_count).unwrap_or(i32::MAX)),
            char_count: Set(i32::try_from(analysis.char_count).unwrap_or(i32::MAX)),
            language: Set(analysis.language.as_str().to_owned()),
            created_at: Set(analysis.created_at),
        }
        .insert(&self.db)
        .await
        .context("insert analysis")?;
        Ok(())
    }

    async fn list(&self, user_id: Uuid, page: PageRequest) -> Result<Vec<Analysis>, DetectorError> {
        let models = analyses::Entity::find()
            .filter(analyses::Column::UserId.eq(user_id))
            .order_by_desc(analyses::Column::CreatedAt)
            .order_by_desc(analyses::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list analyses")?;
        models.into_iter().map(analysis_from_model).collect()
    }

    async fn stats(&self, user_id: Uuid) -> Result<AnalysisStats, DetectorError> {
        let row = analyses::Entity::find()
            .select_only()
            .column_as(
                SimpleExpr::from(Func::count(Expr::col(analyses::Column::Id))),
                "count",
            )
            .column_as(
                SimpleExpr::from(Func::avg(Expr::col(analyses::Column::AiScore))),
                "average_ai_score",
            )
            .filter(analyses::Column::UserId.eq(user_id))
            .into_tuple::<(i64, Option<f64>)>()
            .one(&self.db)
            .await
            .context("aggregate analyses")?;

        let (count, average_ai_score) = row.unwrap_or((0, None));
        Ok(AnalysisStats {
            count: u64::try_from(count).unwrap_or(0),
            average_ai_score,
        })
    }

    async fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Analysis>, DetectorError> {
        let model = analyses::Entity::find_by_id(id)
            .filter(analyses::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .context("find analysis")?;
        model.map(analysis_from_model).transpose()
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, DetectorError> {
        let result = analyses::Entity::delete_many()
            .filter(analyses::Column::Id.eq(id))
            .filter(analyses::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .context("delete analysis")?;
        Ok(result.rows_affected > 0)
    }
}

fn analysis_from_model(model: analyses::Model) -> Result<Analysis, DetectorError> {
    let confidence = model
        .confidence
        .parse::<Confidence>()
        .context("decode confidence")?;
    let language = model.language.parse::<Language>().context("decode language")?;
    let indicators: Vec<Indicator> =
        serde_json::from_value(model.indicators).context("decode indicators")?;
    let suspicious_parts: Vec<SuspiciousPart> =
        serde_json::from_value(model.suspicious_parts).context("decode suspicious parts")?;

    Ok(Analysis {
        id: model.id,
        user_id: model.user_id,
        ai_score: model.ai_score,
        confidence,
        is_ai_generated: model.is_ai_generated,
        indicators,
        explanation: model.explanation,
        suspicious_parts,
        processing_time_ms: u64::try_from(model.processing_time_ms).unwrap_or(0),
        word_count: u32::try_from(model.word_count).unwrap_or(0),
        char_count: u32::try_from(model.char_count).unwrap_or(0),
        language,
        created_at: model.created_at,
    })
}
