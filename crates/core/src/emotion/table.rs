//! Fixed emotion → voice parameter table and per-label valence.
//!
//! Rows follow [`EmotionLabel::ALL`] order, columns follow tier order
//! (low, medium, high). `high` uses the most extreme values.

use crate::emotion::{EmotionLabel, IntensityTier};
use crate::prosody::VoiceParameters;

const fn vp(speed: f32, pitch_semitones: f32, volume_db: f32) -> VoiceParameters {
    VoiceParameters {
        speed,
        pitch_semitones,
        volume_db,
    }
}

const VOICE_TABLE: [[VoiceParameters; 3]; EmotionLabel::COUNT] = [
    // admiration
    [vp(1.05, 1.0, 0.5), vp(1.12, 2.0, 1.0), vp(1.25, 3.0, 2.5)],
    // amusement
    [vp(1.12, 1.0, 0.6), vp(1.18, 2.0, 1.5), vp(1.30, 3.0, 3.0)],
    // approval
    [vp(1.03, 0.0, 0.4), vp(1.10, 1.0, 1.0), vp(1.22, 2.0, 2.0)],
    // caring
    [vp(0.95, 0.0, 0.0), vp(1.00, 1.0, 0.5), vp(1.05, 2.0, 1.0)],
    // desire
    [vp(1.05, 0.0, 0.5), vp(1.15, 1.0, 1.0), vp(1.30, 2.0, 2.0)],
    // excitement
    [vp(1.12, 2.0, 1.0), vp(1.22, 3.0, 2.0), vp(1.35, 4.0, 4.0)],
    // gratitude
    [vp(1.00, 0.0, 0.5), vp(1.05, 1.0, 1.0), vp(1.12, 2.0, 2.0)],
    // joy
    [vp(1.08, 1.0, 1.0), vp(1.18, 2.0, 1.5), vp(1.30, 4.0, 3.0)],
    // love
    [vp(1.00, 1.0, 0.5), vp(1.08, 2.0, 1.0), vp(1.20, 3.0, 2.0)],
    // optimism
    [vp(1.05, 1.0, 0.5), vp(1.12, 2.0, 1.0), vp(1.25, 3.0, 2.0)],
    // pride
    [vp(1.00, 1.0, 0.5), vp(1.10, 1.0, 1.0), vp(1.20, 2.0, 2.5)],
    // relief
    [vp(0.95, 0.0, -0.2), vp(1.00, 0.0, 0.5), vp(1.05, 1.0, 1.0)],
    // anger
    [vp(1.05, 0.0, 1.0), vp(1.20, 1.0, 2.0), vp(1.35, 2.0, 4.5)],
    // annoyance
    [vp(1.02, 0.0, 0.2), vp(1.12, 0.0, 1.0), vp(1.22, 1.0, 2.0)],
    // disappointment
    [vp(0.95, -1.0, -0.6), vp(0.90, -1.0, -1.2), vp(0.82, -2.0, -2.5)],
    // disapproval
    [vp(0.98, 0.0, -0.3), vp(0.95, -1.0, -1.0), vp(0.88, -2.0, -1.8)],
    // disgust
    [vp(1.00, 0.0, -0.3), vp(0.95, -1.0, -1.0), vp(0.90, -2.0, -2.5)],
    // embarrassment
    [vp(0.95, -1.0, -1.0), vp(0.90, -2.0, -2.0), vp(0.85, -3.0, -3.0)],
    // fear
    [vp(1.00, 1.0, 0.0), vp(1.12, 2.0, -0.5), vp(1.25, 3.0, -1.0)],
    // grief
    [vp(0.90, -2.0, -1.0), vp(0.82, -3.0, -2.0), vp(0.75, -4.0, -4.0)],
    // nervousness
    [vp(1.05, 1.0, 0.0), vp(1.15, 2.0, -0.2), vp(1.28, 3.0, -0.5)],
    // remorse
    [vp(0.98, -1.0, -0.5), vp(0.92, -1.0, -1.2), vp(0.85, -2.0, -2.5)],
    // sadness
    [vp(0.95, -1.0, -0.6), vp(0.85, -2.0, -1.5), vp(0.78, -3.0, -3.0)],
    // confusion
    [vp(0.95, 0.0, 0.0), vp(0.98, 0.0, 0.0), vp(1.05, 1.0, -0.5)],
    // curiosity
    [vp(1.05, 1.0, 0.2), vp(1.12, 1.0, 0.5), vp(1.20, 2.0, 1.5)],
    // realization
    [vp(1.00, 0.0, 0.0), vp(1.08, 1.0, 0.5), vp(1.18, 2.0, 1.0)],
    // surprise
    [vp(1.12, 2.0, 1.0), vp(1.25, 3.0, 2.5), vp(1.40, 5.0, 5.5)],
    // neutral
    [vp(0.95, 0.0, -0.5), vp(0.98, 0.0, 0.0), vp(1.00, 0.0, 0.0)],
];

const VALENCE: [f32; EmotionLabel::COUNT] = [
    0.80,  // admiration
    0.88,  // amusement
    0.75,  // approval
    0.70,  // caring
    0.72,  // desire
    0.85,  // excitement
    0.80,  // gratitude
    0.90,  // joy
    0.95,  // love
    0.78,  // optimism
    0.82,  // pride
    0.65,  // relief
    -0.80, // anger
    -0.45, // annoyance
    -0.60, // disappointment
    -0.55, // disapproval
    -0.85, // disgust
    -0.65, // embarrassment
    -0.70, // fear
    -0.95, // grief
    -0.50, // nervousness
    -0.70, // remorse
    -0.75, // sadness
    -0.15, // confusion
    0.35,  // curiosity
    0.40,  // realization
    0.50,  // surprise
    0.0,   // neutral
];

pub fn lookup(label: EmotionLabel, tier: IntensityTier) -> VoiceParameters {
    VOICE_TABLE[label.index()][tier.index()]
}

/// Psychological positivity of `label` in `[-1, 1]`.
pub fn valence(label: EmotionLabel) -> f32 {
    VALENCE[label.index()]
}
