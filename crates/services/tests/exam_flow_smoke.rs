use quiz_core::model::{Category, ExamSettings, SessionMode};
use quiz_core::time::fixed_clock;
use services::{AdvanceResult, AppServices, QuizConfig, SessionEvent, SessionState};

fn config(name: &str, exam_size: u32) -> QuizConfig {
    QuizConfig {
        database_url: format!("sqlite:file:{name}?mode=memory&cache=shared"),
        exam: ExamSettings::new(exam_size, 600, 0.86, false).unwrap(),
        ..QuizConfig::default()
    }
}

#[tokio::test]
async fn exam_result_survives_restart() {
    let (first, _events) = AppServices::new_sqlite(config("memdb_exam_restart", 5), fixed_clock())
        .await
        .unwrap();
    let exam_loop = first.exam_loop();
    exam_loop.start_exam().await.unwrap();

    let report = loop {
        let snapshot = exam_loop.snapshot().await;
        let question = snapshot.question.expect("question shown");
        exam_loop
            .answer(question.correct_answer_index())
            .await
            .unwrap();
        if let AdvanceResult::Completed(report) = exam_loop.advance().await.unwrap() {
            break report;
        }
    };
    assert_eq!(report.outcome.mode, SessionMode::MockTest);
    assert_eq!(report.outcome.score, 5);
    assert!(report.outcome.passed);
    assert!(report.persisted);

    // The shared in-memory database lives as long as `first` holds a connection.
    let (second, _events) =
        AppServices::new_sqlite(config("memdb_exam_restart", 5), fixed_clock())
            .await
            .unwrap();
    let history = second.results().results().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].score(), 5);
    assert_eq!(history[0].total(), 5);
    assert!(history[0].passed());
    assert_eq!(second.results().stats().await.pass_rate_percent, 100);
}

#[tokio::test]
async fn failed_exam_is_recorded_as_failed() {
    let (services, _events) =
        AppServices::new_sqlite(config("memdb_exam_failed", 3), fixed_clock())
            .await
            .unwrap();
    let exam_loop = services.exam_loop();
    exam_loop.start_exam().await.unwrap();

    let report = loop {
        if let AdvanceResult::Completed(report) = exam_loop.advance().await.unwrap() {
            break report;
        }
    };
    assert_eq!(report.outcome.score, 0);
    assert!(!report.outcome.passed);
    assert_eq!(services.results().latest().await.map(|r| r.passed()), Some(false));

    services.results().clear().await.unwrap();
    assert!(services.results().results().await.is_empty());
}

#[tokio::test]
async fn category_practice_without_ai_key_uses_fallback_explanation() {
    let (services, _events) = AppServices::in_memory(QuizConfig::default(), fixed_clock()).await;
    assert!(!services.explanations_enabled());

    let exam_loop = services.exam_loop();
    exam_loop
        .start_practice(Some(Category::SafetyMargins))
        .await
        .unwrap();
    let snapshot = exam_loop.snapshot().await;
    assert_eq!(snapshot.total, 1);
    assert_eq!(
        snapshot.question.as_ref().map(|q| q.category()),
        Some(Category::SafetyMargins)
    );

    let feedback = exam_loop.answer(0).await.unwrap();
    assert!(feedback.explanation.is_some());

    let pending = exam_loop
        .request_explanation(&services.explanations())
        .await
        .unwrap();
    let text = exam_loop.apply_explanation(pending).await;
    assert_eq!(
        text.as_deref(),
        Some(services::explanation::EXPLANATION_UNAVAILABLE_FALLBACK)
    );

    let AdvanceResult::Completed(report) = exam_loop.advance().await.unwrap() else {
        panic!("single-question practice should complete");
    };
    assert!(report.outcome.result.is_none());
    assert!(services.results().results().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn timed_out_exam_reports_through_events() {
    let config = QuizConfig {
        exam: ExamSettings::new(5, 2, 0.86, false).unwrap(),
        ..QuizConfig::default()
    };
    let (services, mut events) = AppServices::in_memory(config, fixed_clock()).await;
    let exam_loop = services.exam_loop();
    exam_loop.start_exam().await.unwrap();

    let report = loop {
        match events.recv().await.expect("timer event") {
            SessionEvent::Tick { .. } => {}
            SessionEvent::Expired(report) => break report,
        }
    };
    assert!(report.outcome.expired);
    assert_eq!(report.outcome.score, 0);
    assert_eq!(report.outcome.time_taken_secs, 2);
    assert_eq!(exam_loop.snapshot().await.state, SessionState::Completed);
    assert_eq!(services.results().results().await.len(), 1);
}
