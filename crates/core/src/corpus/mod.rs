use crate::emotion::{valence, EmotionLabel, EmotionScore, IntensityTier};
use crate::prosody::base_pitch;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RankedEmotion {
    pub label: EmotionLabel,
    pub confidence: f32,
    pub intensity: IntensityTier,
}

impl From<EmotionScore> for RankedEmotion {
    fn from(score: EmotionScore) -> Self {
        Self {
            label: score.label,
            confidence: score.confidence,
            intensity: IntensityTier::from_confidence(score.confidence),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SentenceRecord {
    pub index: usize,
    pub sentence: String,
    pub emotions: Vec<RankedEmotion>,
}

impl SentenceRecord {
    /// Ranks `scores` by descending confidence (stable) and tags each with its tier.
    pub fn new<S: Into<String>>(index: usize, sentence: S, mut scores: Vec<EmotionScore>) -> Self {
        scores.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Self {
            index,
            sentence: sentence.into(),
            emotions: scores.into_iter().map(RankedEmotion::from).collect(),
        }
    }

    pub fn top(&self) -> Option<&RankedEmotion> {
        self.emotions.first()
    }

    pub fn top_label(&self) -> Option<EmotionLabel> {
        self.top().map(|e| e.label)
    }
}

/// Sentence records in corpus order. Order drives volatility and concatenation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Timeline(Vec<SentenceRecord>);

impl Timeline {
    pub fn new(records: Vec<SentenceRecord>) -> Self {
        Self(records)
    }

    pub fn records(&self) -> &[SentenceRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SentenceRecord> {
        self.0.iter()
    }

    pub fn into_records(self) -> Vec<SentenceRecord> {
        self.0
    }

    fn scores(&self) -> impl Iterator<Item = &RankedEmotion> {
        self.0.iter().flat_map(|r| r.emotions.iter())
    }
}

impl FromIterator<SentenceRecord> for Timeline {
    fn from_iter<T: IntoIterator<Item = SentenceRecord>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CorpusStatistics {
    pub dominant_emotion: EmotionLabel,
    pub weighted_emotion: EmotionLabel,
    pub volatility_score: f32,
    pub valence_score: f32,
    pub base_pitch_semitones: f32,
}

impl CorpusStatistics {
    pub fn from_timeline(timeline: &Timeline) -> Self {
        let volatility_score = volatility_score(timeline);
        let valence_score = valence_score(timeline);
        Self {
            dominant_emotion: dominant_emotion(timeline),
            weighted_emotion: weighted_emotion(timeline),
            volatility_score,
            valence_score,
            base_pitch_semitones: base_pitch(valence_score, volatility_score),
        }
    }
}

/// Label with the largest accumulated weight; the earliest label wins ties.
fn heaviest(weights: impl IntoIterator<Item = (EmotionLabel, f32)>) -> Option<EmotionLabel> {
    let mut totals: Vec<(EmotionLabel, f32)> = Vec::new();
    for (label, weight) in weights {
        match totals.iter_mut().find(|(l, _)| *l == label) {
            Some((_, total)) => *total += weight,
            None => totals.push((label, weight)),
        }
    }

    let mut best: Option<(EmotionLabel, f32)> = None;
    for (label, total) in totals {
        if best.map_or(true, |(_, b)| total > b) {
            best = Some((label, total));
        }
    }
    best.map(|(label, _)| label)
}

/// Most frequent top-ranked label. Records without scores count as `neutral`.
pub fn dominant_emotion(timeline: &Timeline) -> EmotionLabel {
    heaviest(
        timeline
            .iter()
            .map(|r| (r.top_label().unwrap_or(EmotionLabel::Neutral), 1.0)),
    )
    .unwrap_or(EmotionLabel::Neutral)
}

/// Label with the largest summed confidence across every score of every sentence.
pub fn weighted_emotion(timeline: &Timeline) -> EmotionLabel {
    heaviest(timeline.scores().map(|e| (e.label, e.confidence))).unwrap_or(EmotionLabel::Neutral)
}

/// Fraction of adjacent sentence pairs whose top label changes. Only records
/// with at least one score take part.
pub fn volatility_score(timeline: &Timeline) -> f32 {
    let tops: Vec<EmotionLabel> = timeline.iter().filter_map(SentenceRecord::top_label).collect();
    if tops.len() < 2 {
        return 0.0;
    }
    let changes = tops.windows(2).filter(|pair| pair[0] != pair[1]).count();
    changes as f32 / (tops.len() - 1) as f32
}

/// Confidence-weighted mean valence over every score, clamped to `[-1, 1]`.
pub fn valence_score(timeline: &Timeline) -> f32 {
    let (weighted_sum, total_weight) = timeline
        .scores()
        .fold((0.0f32, 0.0f32), |(sum, weight), e| {
            (sum + valence(e.label) * e.confidence, weight + e.confidence)
        });
    if total_weight == 0.0 {
        return 0.0;
    }
    (weighted_sum / total_weight).clamp(-1.0, 1.0)
}
