mod analyzer;
mod http;
pub mod table;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use analyzer::{ClassifierError, EmotionClassifier, KeywordEmotionClassifier};
pub use http::HttpEmotionClassifier;
pub use table::{lookup, valence};

/// GoEmotions label set: 27 emotions plus `neutral`.
///
/// Parsing is total. Anything outside the set becomes [`EmotionLabel::Neutral`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum EmotionLabel {
    Admiration,
    Amusement,
    Approval,
    Caring,
    Desire,
    Excitement,
    Gratitude,
    Joy,
    Love,
    Optimism,
    Pride,
    Relief,
    Anger,
    Annoyance,
    Disappointment,
    Disapproval,
    Disgust,
    Embarrassment,
    Fear,
    Grief,
    Nervousness,
    Remorse,
    Sadness,
    Confusion,
    Curiosity,
    Realization,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    pub const COUNT: usize = 28;

    pub const ALL: [EmotionLabel; Self::COUNT] = [
        Self::Admiration,
        Self::Amusement,
        Self::Approval,
        Self::Caring,
        Self::Desire,
        Self::Excitement,
        Self::Gratitude,
        Self::Joy,
        Self::Love,
        Self::Optimism,
        Self::Pride,
        Self::Relief,
        Self::Anger,
        Self::Annoyance,
        Self::Disappointment,
        Self::Disapproval,
        Self::Disgust,
        Self::Embarrassment,
        Self::Fear,
        Self::Grief,
        Self::Nervousness,
        Self::Remorse,
        Self::Sadness,
        Self::Confusion,
        Self::Curiosity,
        Self::Realization,
        Self::Surprise,
        Self::Neutral,
    ];

    pub fn parse(value: &str) -> Self {
        let wanted = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == wanted)
            .unwrap_or(Self::Neutral)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admiration => "admiration",
            Self::Amusement => "amusement",
            Self::Approval => "approval",
            Self::Caring => "caring",
            Self::Desire => "desire",
            Self::Excitement => "excitement",
            Self::Gratitude => "gratitude",
            Self::Joy => "joy",
            Self::Love => "love",
            Self::Optimism => "optimism",
            Self::Pride => "pride",
            Self::Relief => "relief",
            Self::Anger => "anger",
            Self::Annoyance => "annoyance",
            Self::Disappointment => "disappointment",
            Self::Disapproval => "disapproval",
            Self::Disgust => "disgust",
            Self::Embarrassment => "embarrassment",
            Self::Fear => "fear",
            Self::Grief => "grief",
            Self::Nervousness => "nervousness",
            Self::Remorse => "remorse",
            Self::Sadness => "sadness",
            Self::Confusion => "confusion",
            Self::Curiosity => "curiosity",
            Self::Realization => "realization",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl From<&str> for EmotionLabel {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for EmotionLabel {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum IntensityTier {
    Low,
    Medium,
    High,
}

impl IntensityTier {
    pub const HIGH_THRESHOLD: f32 = 0.85;
    pub const MEDIUM_THRESHOLD: f32 = 0.60;

    /// `> 0.85` is high, `[0.60, 0.85]` is medium, anything else is low.
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence > Self::HIGH_THRESHOLD {
            Self::High
        } else if confidence >= Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Unknown tiers fall back to `medium`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl From<&str> for IntensityTier {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for IntensityTier {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl fmt::Display for IntensityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionScore {
    pub label: EmotionLabel,
    pub confidence: f32,
}

impl EmotionScore {
    /// Confidence is clamped to `[0, 1]`; NaN becomes zero.
    pub fn new(label: EmotionLabel, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { label, confidence }
    }
}

/// Converts raw `(label, score)` pairs from a classifier into scores ranked by
/// descending confidence. Equal confidences keep their input order.
pub fn rank_scores<I, S>(raw: I) -> Vec<EmotionScore>
where
    I: IntoIterator<Item = (S, f32)>,
    S: AsRef<str>,
{
    let mut scores: Vec<EmotionScore> = raw
        .into_iter()
        .map(|(label, score)| EmotionScore::new(EmotionLabel::parse(label.as_ref()), score))
        .collect();
    scores.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(EmotionLabel::parse("Joy"), EmotionLabel::Joy);
        assert_eq!(EmotionLabel::parse("  SADNESS "), EmotionLabel::Sadness);
    }

    #[test]
    fn unknown_labels_become_neutral() {
        assert_eq!(EmotionLabel::parse("happy"), EmotionLabel::Neutral);
        assert_eq!(EmotionLabel::parse(""), EmotionLabel::Neutral);
    }

    #[test]
    fn every_label_round_trips_through_its_name() {
        for label in EmotionLabel::ALL {
            assert_eq!(EmotionLabel::parse(label.as_str()), label);
        }
        assert_eq!(EmotionLabel::ALL.len(), EmotionLabel::COUNT);
    }

    #[test]
    fn tier_thresholds() {
        assert_eq!(IntensityTier::from_confidence(0.86), IntensityTier::High);
        assert_eq!(IntensityTier::from_confidence(0.85), IntensityTier::Medium);
        assert_eq!(IntensityTier::from_confidence(0.60), IntensityTier::Medium);
        assert_eq!(IntensityTier::from_confidence(0.59), IntensityTier::Low);
        assert_eq!(IntensityTier::from_confidence(0.0), IntensityTier::Low);
    }

    #[test]
    fn garbled_tiers_default_to_medium() {
        assert_eq!(IntensityTier::parse("HIGH"), IntensityTier::High);
        assert_eq!(IntensityTier::parse("extreme"), IntensityTier::Medium);
        assert_eq!(IntensityTier::parse(""), IntensityTier::Medium);
    }

    #[test]
    fn rank_scores_sorts_and_normalizes() {
        let ranked = rank_scores(vec![
            ("sadness", 0.2),
            ("JOY", 0.7),
            ("mystery", 0.1),
            ("anger", 1.4),
        ]);
        let labels: Vec<_> = ranked.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                EmotionLabel::Anger,
                EmotionLabel::Joy,
                EmotionLabel::Sadness,
                EmotionLabel::Neutral
            ]
        );
        assert_eq!(ranked[0].confidence, 1.0);
    }

    #[test]
    fn nan_confidence_is_zero() {
        let score = EmotionScore::new(EmotionLabel::Joy, f32::NAN);
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn unknown_label_deserializes_as_neutral() {
        let label: EmotionLabel = serde_json::from_str("\"elation\"").expect("json");
        assert_eq!(label, EmotionLabel::Neutral);
        let label: EmotionLabel = serde_json::from_str("\"grief\"").expect("json");
        assert_eq!(label, EmotionLabel::Grief);
    }
}
