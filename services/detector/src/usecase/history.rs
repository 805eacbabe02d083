use uuid::Uuid;

use veritext_domain::pagination::PageRequest;

use crate::domain::repository::AnalysisRepository;
use crate::domain::types::{Analysis, AnalysisStats};
use crate::error::DetectorError;

// ── ListAnalyses ─────────────────────────────────────────────────────────────

pub struct ListAnalysesUseCase<A: AnalysisRepository> {
    pub repo: A,
}

impl<A: AnalysisRepository> ListAnalysesUseCase<A> {
    pub async fn execute(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Vec<Analysis>, DetectorError> {
        self.repo.list(user_id, page.clamped()).await
    }
}

// ── AnalysisStats ────────────────────────────────────────────────────────────

pub struct AnalysisStatsUseCase<A: AnalysisRepository> {
    pub repo: A,
}

impl<A: AnalysisRepository> AnalysisStatsUseCase<A> {
    pub async fn execute(&self, user_id: Uuid) -> Result<AnalysisStats, DetectorError> {
        self.repo.stats(user_id).await
    }
}

// ── GetAnalysis ──────────────────────────────────────────────────────────────

pub struct GetAnalysisUseCase<A: AnalysisRepository> {
    pub repo: A,
}

impl<A: AnalysisRepository> GetAnalysisUseCase<A> {
    /// Another user's analysis is reported as missing.
    pub async fn execute(&self, user_id: Uuid, id: Uuid) -> Result<Analysis, DetectorError> {
        self.repo
            .find(user_id, id)
            .await?
            .ok_or(DetectorError::NotFound)
    }
}

// ── DeleteAnalysis ───────────────────────────────────────────────────────────

pub struct DeleteAnalysisUseCase<A: AnalysisRepository> {
    pub repo: A,
}

impl<A: AnalysisRepository> DeleteAnalysisUseCase<A> {
    pub async fn execute(&self, user_id: Uuid, id: Uuid) -> Result<(), DetectorError> {
        if !self.repo.delete(user_id, id).await? {
            return Err(DetectorError::NotFound);
        }
        Ok(())
    }
}
