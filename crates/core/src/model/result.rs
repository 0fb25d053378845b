use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("distribution has no labels")]
    Empty,

    #[error("probability for {label} out of range: {value}")]
    InvalidProbability { label: ActivityLabel, value: f64 },
}

/// Fixed set of activity categories the classifier reports over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLabel {
    Game,
    YoutubeEntertain,
    YoutubeMusic,
    Study,
    Sns,
    Webtoon,
    Other,
}

impl ActivityLabel {
    pub const ALL: [ActivityLabel; 7] = [
        ActivityLabel::Game,
        ActivityLabel::YoutubeEntertain,
        ActivityLabel::YoutubeMusic,
        ActivityLabel::Study,
        ActivityLabel::Sns,
        ActivityLabel::Webtoon,
        ActivityLabel::Other,
    ];

    /// Returns the canonical snake_case name for the label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLabel::Game => "game",
            ActivityLabel::YoutubeEntertain => "youtube_entertain",
            ActivityLabel::YoutubeMusic => "youtube_music",
            ActivityLabel::Study => "study",
            ActivityLabel::Sns => "sns",
            ActivityLabel::Webtoon => "webtoon",
            ActivityLabel::Other => "other",
        }
    }
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability mass per activity label.
///
/// Labels absent from the map read as probability zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution(BTreeMap<ActivityLabel, f64>);

impl Distribution {
    /// Build a distribution from a label→probability map.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::Empty` if the map has no entries, or
    /// `ResultError::InvalidProbability` if any value lies outside `[0, 1]`.
    pub fn new(probs: BTreeMap<ActivityLabel, f64>) -> Result<Self, ResultError> {
        if probs.is_empty() {
            return Err(ResultError::Empty);
        }
        for (label, value) in &probs {
            if !value.is_finite() || !(0.0..=1.0).contains(value) {
                return Err(ResultError::InvalidProbability {
                    label: *label,
                    value: *value,
                });
            }
        }
        Ok(Self(probs))
    }

    /// Build a distribution from `(label, probability)` pairs.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Distribution::new`].
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (ActivityLabel, f64)>,
    ) -> Result<Self, ResultError> {
        Self::new(pairs.into_iter().collect())
    }

    /// Probability for a label, zero when absent.
    #[must_use]
    pub fn get(&self, label: ActivityLabel) -> f64 {
        self.0.get(&label).copied().unwrap_or(0.0)
    }

    /// Label carrying the highest probability mass.
    #[must_use]
    pub fn argmax(&self) -> Option<ActivityLabel> {
        self.0
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
            .map(|(label, _)| *label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActivityLabel, f64)> + '_ {
        self.0.iter().map(|(label, value)| (*label, *value))
    }
}

/// One fixed-width slice of the per-window probability timeline.
///
/// Window bounds are seconds from session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineWindow {
    pub window_start: u32,
    pub window_end: u32,
    pub probs: Distribution,
    pub argmax: ActivityLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMeta {
    pub window_sec: u32,
    pub windows: u32,
}

/// Opaque classification payload attached to a finished session.
///
/// The session core stores and returns this verbatim; it never interprets
/// the probabilities beyond validating their range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityResult {
    pub overall: Distribution,
    #[serde(rename = "predicted_activity")]
    pub predicted: ActivityLabel,
    pub timeline: Vec<TimelineWindow>,
    pub meta: ResultMeta,
}

impl ActivityResult {
    /// Defined fallback payload for sessions that finish without a usable
    /// classification (classifier failure, or a stop before any analysis ran).
    #[must_use]
    pub fn fallback() -> Self {
        let mut probs = BTreeMap::new();
        probs.insert(ActivityLabel::Study, 0.3);
        probs.insert(ActivityLabel::YoutubeEntertain, 0.4);
        probs.insert(ActivityLabel::Other, 0.3);

        Self {
            overall: Distribution(probs),
            predicted: ActivityLabel::YoutubeEntertain,
            timeline: Vec::new(),
            meta: ResultMeta {
                window_sec: 30,
                windows: 60,
            },
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
