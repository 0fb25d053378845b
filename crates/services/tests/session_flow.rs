use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use monitor_core::Clock;
use monitor_core::model::{ActivityLabel, ActivityResult, SessionId, SessionStatus};
use monitor_core::time::fixed_now;
use services::{Classifier, ClassifierError, PlaceholderClassifier, SessionService};
use storage::repository::InMemorySessionRepository;
use storage::repository::SessionRepository;

/// Counts invocations so tests can assert the one-time transition.
#[derive(Clone, Default)]
struct CountingClassifier {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Classifier for CountingClassifier {
    async fn classify(&self, session_id: SessionId) -> Result<ActivityResult, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Widen the race window between the status read and the store write.
        tokio::time::sleep(Duration::from_millis(20)).await;
        PlaceholderClassifier.classify(session_id).await
    }
}

struct FailingClassifier;

#[async_trait]
impl Classifier for FailingClassifier {
    async fn classify(&self, _session_id: SessionId) -> Result<ActivityResult, ClassifierError> {
        Err(ClassifierError::Unavailable("model offline".into()))
    }
}

fn service_with(
    repo: &InMemorySessionRepository,
    classifier: Arc<dyn Classifier>,
    now: chrono::DateTime<chrono::Utc>,
) -> SessionService {
    SessionService::new(Clock::fixed(now), Arc::new(repo.clone()), classifier)
}

#[tokio::test]
async fn one_minute_session_lifecycle() {
    let repo = InMemorySessionRepository::new();
    let calls = CountingClassifier::default();
    let classifier: Arc<dyn Classifier> = Arc::new(calls.clone());

    let t0 = fixed_now();
    let id = service_with(&repo, classifier.clone(), t0)
        .start(1)
        .await
        .unwrap();

    let at_30s = service_with(&repo, classifier.clone(), t0 + ChronoDuration::milliseconds(30_000));
    let snap = at_30s.poll(id).await.unwrap();
    assert_eq!(snap.status, SessionStatus::Running);
    assert_eq!(snap.remaining_ms, 30_000);

    let at_61s = service_with(&repo, classifier.clone(), t0 + ChronoDuration::milliseconds(61_000));
    let snap = at_61s.poll(id).await.unwrap();
    assert_eq!(snap.status, SessionStatus::Finished);
    assert_eq!(snap.remaining_ms, 0);
    assert_eq!(calls.calls.load(Ordering::SeqCst), 1);

    // Finished is terminal; repeated polls neither flip status nor
    // re-classify.
    let snap = at_61s.poll(id).await.unwrap();
    assert_eq!(snap.status, SessionStatus::Finished);
    assert_eq!(calls.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn immediate_stop_attaches_a_result() {
    let repo = InMemorySessionRepository::new();
    let calls = CountingClassifier::default();
    let service = service_with(&repo, Arc::new(calls.clone()), fixed_now());

    let id = service.start(60).await.unwrap();
    service.stop(id).await.unwrap();

    let snap = service.poll(id).await.unwrap();
    assert_eq!(snap.status, SessionStatus::Finished);
    assert_eq!(snap.remaining_ms, 0);
    assert_eq!(calls.calls.load(Ordering::SeqCst), 1);

    let result = service.result(id).await.unwrap();
    assert_eq!(result.predicted, ActivityLabel::YoutubeEntertain);
}

#[tokio::test]
async fn concurrent_poll_and_stop_classify_once() {
    let repo = InMemorySessionRepository::new();
    let calls = CountingClassifier::default();
    let classifier: Arc<dyn Classifier> = Arc::new(calls.clone());

    let t0 = fixed_now();
    let id = service_with(&repo, classifier.clone(), t0)
        .start(1)
        .await
        .unwrap();

    // Both callers sit right at the natural-expiry boundary and observe a
    // still-running record.
    let service = service_with(&repo, classifier, t0 + ChronoDuration::milliseconds(61_000));
    let poller = service.clone();
    let stopper = service.clone();

    let (poll_res, stop_res) = tokio::join!(poller.poll(id), stopper.stop(id));
    let snap = poll_res.unwrap();
    stop_res.unwrap();

    assert_eq!(snap.status, SessionStatus::Finished);
    assert_eq!(calls.calls.load(Ordering::SeqCst), 1);

    let stored = repo.get_session(id).await.unwrap().unwrap();
    assert!(stored.is_finished());
    assert!(stored.result().is_some());
}

#[tokio::test]
async fn classifier_failure_falls_back_and_still_finishes() {
    let repo = InMemorySessionRepository::new();
    let service = service_with(&repo, Arc::new(FailingClassifier), fixed_now());

    let id = service.start(1).await.unwrap();
    service.stop(id).await.unwrap();

    let stored = repo.get_session(id).await.unwrap().unwrap();
    assert!(stored.is_finished());
    assert_eq!(stored.result(), Some(&ActivityResult::fallback()));

    let result = service.result(id).await.unwrap();
    assert_eq!(result, ActivityResult::fallback());
}

#[tokio::test]
async fn unknown_session_polls_finished_without_error() {
    let repo = InMemorySessionRepository::new();
    let service = service_with(&repo, Arc::new(PlaceholderClassifier), fixed_now());

    let snap = service.poll(SessionId::generate()).await.unwrap();
    assert_eq!(snap.status, SessionStatus::Finished);
    assert_eq!(snap.remaining_ms, 0);
}
