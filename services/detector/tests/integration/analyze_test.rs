use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use veritext_detector::domain::repository::CreditLedger;
use veritext_detector::domain::types::ReserveOutcome;
use veritext_detector::error::DetectorError;
use veritext_detector::infra::scoring::{HttpScoringClient, ScoringConfig};
use veritext_detector::usecase::analyze::{
    AnalysisPolicy, AnalyzeInput, AnalyzeTextUseCase, RefundGuard,
};
use veritext_domain::analysis::{Confidence, Language};

use crate::helpers::{
    MockAnalysisRepo, MockLedger, MockScorer, ScorerBehavior, sample_text, test_user,
};

fn input(user_id: uuid::Uuid) -> AnalyzeInput {
    AnalyzeInput {
        user_id,
        text: sample_text(),
        language: Some("en".to_owned()),
    }
}

// ── AnalyzeTextUseCase: success ──────────────────────────────────────────────

#[tokio::test]
async fn should_debit_one_credit_and_store_analysis() {
    let user = test_user(1);
    let ledger = MockLedger::with_user(&user);
    let analyses = MockAnalysisRepo::empty();
    let stored = analyses.analyses_handle();

    let usecase = AnalyzeTextUseCase {
        ledger: ledger.clone(),
        scorer: MockScorer::new(ScorerBehavior::Score(85.0)),
        analyses,
        policy: AnalysisPolicy::default(),
    };

    let output = usecase.execute(input(user.id)).await.unwrap();

    assert_eq!(output.remaining_credits, 0);
    assert_eq!(output.analysis.user_id, user.id);
    assert_eq!(output.analysis.ai_score, 85.0);
    assert_eq!(output.analysis.confidence, Confidence::High);
    assert!(output.analysis.is_ai_generated);
    assert_eq!(output.analysis.language, Language::En);
    assert_eq!(output.analysis.word_count, 19);
    assert_eq!(ledger.credits(user.id), 0);

    let stored = stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, output.analysis.id);
}

#[tokio::test]
async fn should_classify_low_score_as_human() {
    let user = test_user(3);
    let usecase = AnalyzeTextUseCase {
        ledger: MockLedger::with_user(&user),
        scorer: MockScorer::new(ScorerBehavior::Score(12.5)),
        analyses: MockAnalysisRepo::empty(),
        policy: AnalysisPolicy::default(),
    };

    let output = usecase.execute(input(user.id)).await.unwrap();

    assert_eq!(output.analysis.confidence, Confidence::Low);
    assert!(!output.analysis.is_ai_generated);
    assert_eq!(output.remaining_credits, 2);
}

#[tokio::test]
async fn should_use_default_language_when_absent() {
    let user = test_user(1);
    let usecase = AnalyzeTextUseCase {
        ledger: MockLedger::with_user(&user),
        scorer: MockScorer::new(ScorerBehavior::Score(40.0)),
        analyses: MockAnalysisRepo::empty(),
        policy: AnalysisPolicy::default(),
    };

    let output = usecase
        .execute(AnalyzeInput {
            language: None,
            ..input(user.id)
        })
        .await
        .unwrap();

    assert_eq!(output.analysis.language, Language::Pt);
}

// ── AnalyzeTextUseCase: credit gate ──────────────────────────────────────────

#[tokio::test]
async fn should_refuse_without_calling_scorer_when_balance_is_empty() {
    let user = test_user(1);
    let scorer = MockScorer::new(ScorerBehavior::Score(85.0));
    let usecase = AnalyzeTextUseCase {
        ledger: MockLedger::with_user(&user),
        scorer: scorer.clone(),
        analyses: MockAnalysisRepo::empty(),
        policy: AnalysisPolicy::default(),
    };

    usecase.execute(input(user.id)).await.unwrap();
    let result = usecase.execute(input(user.id)).await;

    assert!(
        matches!(result, Err(DetectorError::InsufficientCredits)),
        "expected InsufficientCredits, got {result:?}"
    );
    assert_eq!(scorer.call_count(), 1);
}

#[tokio::test]
async fn should_not_reserve_when_validation_fails() {
    let user = test_user(2);
    let ledger = MockLedger::with_user(&user);
    let scorer = MockScorer::new(ScorerBehavior::Score(85.0));
    let usecase = AnalyzeTextUseCase {
        ledger: ledger.clone(),
        scorer: scorer.clone(),
        analyses: MockAnalysisRepo::empty(),
        policy: AnalysisPolicy::default(),
    };

    let too_short = usecase
        .execute(AnalyzeInput {
            text: "far too short".to_owned(),
            ..input(user.id)
        })
        .await;
    let bad_language = usecase
        .execute(AnalyzeInput {
            language: Some("de".to_owned()),
            ..input(user.id)
        })
        .await;

    assert!(matches!(too_short, Err(DetectorError::Validation(_))));
    assert!(matches!(bad_language, Err(DetectorError::Validation(_))));
    assert_eq!(ledger.credits(user.id), 2);
    assert_eq!(scorer.call_count(), 0);
}

// ── AnalyzeTextUseCase: refunds ──────────────────────────────────────────────

#[tokio::test]
async fn should_refund_when_scoring_is_unavailable() {
    let user = test_user(5);
    let ledger = MockLedger::with_user(&user);
    let analyses = MockAnalysisRepo::empty();
    let stored = analyses.analyses_handle();
    let usecase = AnalyzeTextUseCase {
        ledger: ledger.clone(),
        scorer: MockScorer::new(ScorerBehavior::Unavailable),
        analyses,
        policy: AnalysisPolicy::default(),
    };

    let result = usecase.execute(input(user.id)).await;

    assert!(
        matches!(result, Err(DetectorError::UpstreamUnavailable)),
        "expected UpstreamUnavailable, got {result:?}"
    );
    assert_eq!(ledger.credits(user.id), 5);
    assert!(stored.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_refund_when_persisting_fails() {
    let user = test_user(4);
    let ledger = MockLedger::with_user(&user);
    let usecase = AnalyzeTextUseCase {
        ledger: ledger.clone(),
        scorer: MockScorer::new(ScorerBehavior::Score(60.0)),
        analyses: MockAnalysisRepo::failing(),
        policy: AnalysisPolicy::default(),
    };

    let result = usecase.execute(input(user.id)).await;

    match result {
        Err(DetectorError::Persistence(e)) => {
            assert!(format!("{e:#}").contains("connection closed"));
        }
        other => panic!("expected Persistence, got {other:?}"),
    }
    assert_eq!(ledger.credits(user.id), 4);
}

#[tokio::test]
async fn should_refund_when_request_is_abandoned_mid_scoring() {
    let user = test_user(2);
    let ledger = MockLedger::with_user(&user);
    let usecase = AnalyzeTextUseCase {
        ledger: ledger.clone(),
        scorer: MockScorer::new(ScorerBehavior::Hang),
        analyses: MockAnalysisRepo::empty(),
        policy: AnalysisPolicy::default(),
    };

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), usecase.execute(input(user.id))).await;
    assert!(abandoned.is_err(), "scoring should not have finished");

    // The guard refunds on a spawned task.
    for _ in 0..100 {
        if ledger.credits(user.id) == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(ledger.credits(user.id), 2);
}

#[tokio::test]
async fn should_absorb_refund_after_period_reset() {
    let user = test_user(3);
    let ledger = MockLedger::with_user(&user);

    let ReserveOutcome::Granted(reservation) = ledger.reserve(user.id, 1).await.unwrap() else {
        panic!("reservation should be granted");
    };
    let guard = RefundGuard::arm(ledger.clone(), reservation);

    // A reset lands while the reservation is outstanding.
    {
        let mut accounts = ledger.accounts.lock().unwrap();
        let account = accounts.get_mut(&user.id).unwrap();
        account.credits = 10;
        account.credits_reset_at += chrono::Duration::seconds(1);
    }

    guard.refund_now().await;

    assert_eq!(ledger.credits(user.id), 10);
}

#[tokio::test]
async fn should_keep_credit_once_disarmed() {
    let user = test_user(3);
    let ledger = MockLedger::with_user(&user);

    let ReserveOutcome::Granted(reservation) = ledger.reserve(user.id, 1).await.unwrap() else {
        panic!("reservation should be granted");
    };
    let guard = RefundGuard::arm(ledger.clone(), reservation.clone());
    assert_eq!(guard.reservation(), Some(&reservation));

    assert_eq!(guard.disarm(), Some(reservation));
    tokio::task::yield_now().await;

    assert_eq!(ledger.credits(user.id), 2);
}

// ── AnalyzeTextUseCase: concurrency ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_never_grant_more_analyses_than_credits() {
    let user = test_user(3);
    let ledger = MockLedger::with_user(&user);
    let usecase = Arc::new(AnalyzeTextUseCase {
        ledger: ledger.clone(),
        scorer: MockScorer::new(ScorerBehavior::Score(50.0)),
        analyses: MockAnalysisRepo::empty(),
        policy: AnalysisPolicy::default(),
    });

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let usecase = Arc::clone(&usecase);
            let user_id = user.id;
            tokio::spawn(async move { usecase.execute(input(user_id)).await })
        })
        .collect();

    let mut granted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(DetectorError::InsufficientCredits) => refused += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(granted, 3);
    assert_eq!(refused, 7);
    assert_eq!(ledger.credits(user.id), 0);
}

// ── AnalyzeTextUseCase + HttpScoringClient ───────────────────────────────────

#[tokio::test]
async fn should_leave_balance_unchanged_when_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = ScoringConfig::new(server.uri(), "sk-test");
    config.timeout = Duration::from_millis(100);
    config.backoff_base = Duration::from_millis(10);

    let user = test_user(5);
    let ledger = MockLedger::with_user(&user);
    let usecase = AnalyzeTextUseCase {
        ledger: ledger.clone(),
        scorer: HttpScoringClient::new(config).unwrap(),
        analyses: MockAnalysisRepo::empty(),
        policy: AnalysisPolicy::default(),
    };

    let result = usecase.execute(input(user.id)).await;

    assert!(
        matches!(result, Err(DetectorError::UpstreamUnavailable)),
        "expected UpstreamUnavailable, got {result:?}"
    );
    assert_eq!(ledger.credits(user.id), 5);
}
