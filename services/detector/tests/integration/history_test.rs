use chrono::{Duration, Utc};
use uuid::Uuid;

use veritext_detector::domain::types::Analysis;
use veritext_detector::error::DetectorError;
use veritext_detector::usecase::history::{
    AnalysisStatsUseCase, DeleteAnalysisUseCase, GetAnalysisUseCase, ListAnalysesUseCase,
};
use veritext_detector::usecase::user::GetProfileUseCase;
use veritext_domain::analysis::{Confidence, Language};
use veritext_domain::pagination::PageRequest;

use crate::helpers::{MockAnalysisRepo, MockUserRepo, test_user};

fn analysis(user_id: Uuid, ai_score: f64, minutes_ago: i64) -> Analysis {
    Analysis {
        id: Uuid::new_v4(),
        user_id,
        ai_score,
        confidence: Confidence::Medium,
        is_ai_generated: ai_score >= 50.0,
        indicators: vec![],
        explanation: String::new(),
        suspicious_parts: vec![],
        processing_time_ms: 300,
        word_count: 120,
        char_count: 700,
        language: Language::Pt,
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

// ── ListAnalysesUseCase ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_list_own_analyses_newest_first() {
    let owner = Uuid::new_v4();
    let older = analysis(owner, 20.0, 30);
    let newer = analysis(owner, 80.0, 5);
    let foreign = analysis(Uuid::new_v4(), 50.0, 1);
    let usecase = ListAnalysesUseCase {
        repo: MockAnalysisRepo::new(vec![older.clone(), foreign, newer.clone()]),
    };

    let page = usecase.execute(owner, PageRequest::default()).await.unwrap();

    let ids: Vec<_> = page.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[tokio::test]
async fn should_clamp_page_size() {
    let owner = Uuid::new_v4();
    let rows = (0..3).map(|i| analysis(owner, 10.0, i)).collect();
    let usecase = ListAnalysesUseCase {
        repo: MockAnalysisRepo::new(rows),
    };

    let page = usecase
        .execute(owner, PageRequest { per_page: 0, page: 0 })
        .await
        .unwrap();

    assert_eq!(page.len(), 1);
}

// ── AnalysisStatsUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_average_scores_per_user() {
    let owner = Uuid::new_v4();
    let usecase = AnalysisStatsUseCase {
        repo: MockAnalysisRepo::new(vec![
            analysis(owner, 20.0, 2),
            analysis(owner, 60.0, 1),
            analysis(Uuid::new_v4(), 100.0, 1),
        ]),
    };

    let stats = usecase.execute(owner).await.unwrap();

    assert_eq!(stats.count, 2);
    assert_eq!(stats.average_ai_score, Some(40.0));
}

#[tokio::test]
async fn should_report_no_average_without_analyses() {
    let usecase = AnalysisStatsUseCase {
        repo: MockAnalysisRepo::empty(),
    };

    let stats = usecase.execute(Uuid::new_v4()).await.unwrap();

    assert_eq!(stats.count, 0);
    assert_eq!(stats.average_ai_score, None);
}

// ── GetAnalysisUseCase / DeleteAnalysisUseCase ───────────────────────────────

#[tokio::test]
async fn should_hide_analyses_of_other_users() {
    let owner = Uuid::new_v4();
    let row = analysis(owner, 70.0, 1);
    let repo = MockAnalysisRepo::new(vec![row.clone()]);

    let found = GetAnalysisUseCase { repo: repo.clone() }
        .execute(owner, row.id)
        .await
        .unwrap();
    assert_eq!(found.id, row.id);

    let result = GetAnalysisUseCase { repo }
        .execute(Uuid::new_v4(), row.id)
        .await;
    assert!(matches!(result, Err(DetectorError::NotFound)));
}

#[tokio::test]
async fn should_delete_only_own_analysis() {
    let owner = Uuid::new_v4();
    let row = analysis(owner, 70.0, 1);
    let repo = MockAnalysisRepo::new(vec![row.clone()]);
    let stored = repo.analyses_handle();

    let stranger = DeleteAnalysisUseCase { repo: repo.clone() }
        .execute(Uuid::new_v4(), row.id)
        .await;
    assert!(matches!(stranger, Err(DetectorError::NotFound)));
    assert_eq!(stored.lock().unwrap().len(), 1);

    DeleteAnalysisUseCase { repo: repo.clone() }
        .execute(owner, row.id)
        .await
        .unwrap();
    assert!(stored.lock().unwrap().is_empty());

    let again = DeleteAnalysisUseCase { repo }.execute(owner, row.id).await;
    assert!(matches!(again, Err(DetectorError::NotFound)));
}

// ── GetProfileUseCase ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_load_profile_of_session_user() {
    let user = test_user(7);
    let usecase = GetProfileUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
    };

    let profile = usecase.execute(user.id).await.unwrap();
    assert_eq!(profile.email, user.email);
    assert_eq!(profile.credits, 7);

    let missing = usecase.execute(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(DetectorError::NotFound)));
}
