use async_trait::async_trait;
use monitor_core::model::{
    ActivityLabel, ActivityResult, Distribution, ResultMeta, SessionId, TimelineWindow,
};

use crate::error::ClassifierError;

/// External collaborator producing the activity-probability result.
///
/// Invoked by `SessionService` at most once per session, only at the finish
/// transition. The payload is stored and returned verbatim; the session
/// core never interprets it. A failing classifier does not block the finish
/// transition — the service substitutes the defined fallback payload.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Produce the probability result for a finished session.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError` if no result can be produced; the caller
    /// recovers with [`ActivityResult::fallback`].
    async fn classify(&self, session_id: SessionId) -> Result<ActivityResult, ClassifierError>;
}

/// Stand-in classifier returning a fixed placeholder distribution.
///
/// Mirrors the shape the real analysis pipeline reports (an overall
/// distribution plus a 30-second-window timeline) without doing any signal
/// processing. The per-window values are pinned constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderClassifier;

impl PlaceholderClassifier {
    const WINDOW_SEC: u32 = 30;
    const WINDOWS: u32 = 20;

    fn overall() -> Distribution {
        Distribution::from_pairs([
            (ActivityLabel::Game, 0.12),
            (ActivityLabel::YoutubeEntertain, 0.28),
            (ActivityLabel::YoutubeMusic, 0.18),
            (ActivityLabel::Study, 0.24),
            (ActivityLabel::Sns, 0.08),
            (ActivityLabel::Webtoon, 0.04),
            (ActivityLabel::Other, 0.06),
        ])
        .expect("placeholder distribution is valid")
    }
}

#[async_trait]
impl Classifier for PlaceholderClassifier {
    async fn classify(&self, _session_id: SessionId) -> Result<ActivityResult, ClassifierError> {
        let probs = Self::overall();
        let timeline = (0..Self::WINDOWS)
            .map(|i| TimelineWindow {
                window_start: i * Self::WINDOW_SEC,
                window_end: (i + 1) * Self::WINDOW_SEC,
                probs: probs.clone(),
                argmax: ActivityLabel::Study,
            })
            .collect();

        Ok(ActivityResult {
            overall: probs,
            predicted: ActivityLabel::YoutubeEntertain,
            timeline,
            meta: ResultMeta {
                window_sec: Self::WINDOW_SEC,
                windows: Self::WINDOWS,
            },
        })
    }
}
