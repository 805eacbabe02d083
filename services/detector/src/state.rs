use std::sync::Arc;

use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;

use veritext_auth_types::token::TokenCodec;
use veritext_domain::credit::PlanAllowances;

use crate::extract::SessionState;
use crate::infra::cache::RedisRevocationList;
use crate::infra::db::{DbAnalysisRepository, DbCreditLedger, DbUserRepository};
use crate::infra::scoring::HttpScoringClient;
use crate::usecase::analyze::AnalysisPolicy;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub codec: TokenCodec,
    pub cookie_domain: String,
    pub cron_secret: Arc<str>,
    pub scorer: HttpScoringClient,
    pub allowances: PlanAllowances,
    pub policy: AnalysisPolicy,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn ledger(&self) -> DbCreditLedger {
        DbCreditLedger {
            db: self.db.clone(),
            allowances: self.allowances,
        }
    }

    pub fn analysis_repo(&self) -> DbAnalysisRepository {
        DbAnalysisRepository {
            db: self.db.clone(),
        }
    }

    pub fn revocation_list(&self) -> RedisRevocationList {
        RedisRevocationList {
            pool: self.redis.clone(),
        }
    }
}

impl SessionState for AppState {
    type Revocations = RedisRevocationList;

    fn token_codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn revocations(&self) -> Self::Revocations {
        self.revocation_list()
    }
}
