use crate::corpus::SentenceRecord;
use crate::emotion::{lookup, EmotionLabel, IntensityTier};
use serde::{Deserialize, Serialize};

/// Maximum corpus-wide pitch nudge, in semitones.
pub const PITCH_BIAS_COEFFICIENT: f32 = 0.7;

pub const PITCH_MIN_SEMITONES: f32 = -5.0;
pub const PITCH_MAX_SEMITONES: f32 = 5.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoiceParameters {
    pub speed: f32,
    pub pitch_semitones: f32,
    pub volume_db: f32,
}

impl VoiceParameters {
    pub const UNITY: VoiceParameters = VoiceParameters {
        speed: 1.0,
        pitch_semitones: 0.0,
        volume_db: 0.0,
    };
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self::UNITY
    }
}

/// `valence * K * (1 - min(volatility, 1))`. A volatile corpus gets little or
/// no global bias.
pub fn base_pitch(valence: f32, volatility: f32) -> f32 {
    let damp = 1.0 - volatility.min(1.0);
    valence * PITCH_BIAS_COEFFICIENT * damp
}

pub fn apply_bias(params: VoiceParameters, base_pitch: f32) -> VoiceParameters {
    VoiceParameters {
        pitch_semitones: (params.pitch_semitones + base_pitch)
            .clamp(PITCH_MIN_SEMITONES, PITCH_MAX_SEMITONES),
        ..params
    }
}

/// Table parameters for the sentence's top emotion (neutral/medium when it has
/// none) with the corpus bias applied.
pub fn sentence_parameters(record: &SentenceRecord, base_pitch: f32) -> VoiceParameters {
    let table = match record.top() {
        Some(top) => lookup(top.label, top.intensity),
        None => lookup(EmotionLabel::Neutral, IntensityTier::Medium),
    };
    apply_bias(table, base_pitch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionScore;

    #[test]
    fn base_pitch_scales_with_valence() {
        assert!((base_pitch(1.0, 0.0) - 0.7).abs() < 1e-6);
        assert!((base_pitch(-0.5, 0.0) + 0.35).abs() < 1e-6);
    }

    #[test]
    fn volatility_damps_bias() {
        assert!((base_pitch(1.0, 0.5) - 0.35).abs() < 1e-6);
        assert_eq!(base_pitch(0.9, 1.0), 0.0);
        assert_eq!(base_pitch(0.9, 3.0), 0.0);
    }

    #[test]
    fn zero_valence_gives_zero_bias() {
        assert_eq!(base_pitch(0.0, 0.0), 0.0);
        assert_eq!(base_pitch(0.0, 0.4), 0.0);
    }

    #[test]
    fn apply_bias_only_touches_pitch() {
        let original = VoiceParameters {
            speed: 1.2,
            pitch_semitones: 2.0,
            volume_db: 1.5,
        };
        let biased = apply_bias(original, 0.5);
        assert_eq!(biased.pitch_semitones, 2.5);
        assert_eq!(biased.speed, original.speed);
        assert_eq!(biased.volume_db, original.volume_db);
        assert_eq!(original.pitch_semitones, 2.0);
    }

    #[test]
    fn apply_bias_clamps_pitch() {
        let high = VoiceParameters {
            pitch_semitones: 4.8,
            ..VoiceParameters::UNITY
        };
        assert_eq!(apply_bias(high, 0.7).pitch_semitones, 5.0);
        assert_eq!(apply_bias(high, -100.0).pitch_semitones, -5.0);
        assert_eq!(apply_bias(high, f32::MAX).pitch_semitones, 5.0);
    }

    #[test]
    fn sentence_without_scores_uses_neutral_medium() {
        let record = SentenceRecord::new(0, "...", Vec::new());
        assert_eq!(
            sentence_parameters(&record, 0.0),
            lookup(EmotionLabel::Neutral, IntensityTier::Medium)
        );
    }

    #[test]
    fn sentence_parameters_follow_top_emotion_and_tier() {
        let record = SentenceRecord::new(
            0,
            "I am so happy today!",
            vec![
                EmotionScore::new(EmotionLabel::Neutral, 0.05),
                EmotionScore::new(EmotionLabel::Joy, 0.9),
            ],
        );
        let params = sentence_parameters(&record, 0.25);
        let table = lookup(EmotionLabel::Joy, IntensityTier::High);
        assert_eq!(params.speed, table.speed);
        assert_eq!(params.volume_db, table.volume_db);
        assert_eq!(params.pitch_semitones, table.pitch_semitones + 0.25);
    }
}
