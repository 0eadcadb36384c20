use crate::audio::{AudioClip, DEFAULT_SAMPLE_RATE_HZ};
use crate::tts::{SpeechSynthesizer, SynthError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::f32::consts::PI;

const MS_PER_CHAR: usize = 60;
const MIN_DURATION_MS: usize = 500;
const TONE_HZ: f32 = 220.0;
const AMPLITUDE: f32 = 0.3;

/// Offline stand-in for a real voice: a sine tone whose length follows the
/// text length. Deterministic, so it also serves tests and demos.
#[derive(Clone, Debug)]
pub struct ToneSynthesizer {
    sample_rate_hz: u32,
}

impl ToneSynthesizer {
    pub fn new() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate_hz: u32) -> Self {
        self.sample_rate_hz = sample_rate_hz;
        self
    }

    pub fn render(&self, text: &str) -> AudioClip {
        let duration_ms = (text.chars().count() * MS_PER_CHAR).max(MIN_DURATION_MS);
        let rate = self.sample_rate_hz as usize;
        let samples = duration_ms * rate / 1000;

        let pcm = (0..samples)
            .map(|i| {
                let t = i as f32 / rate as f32;
                let amplitude = (2.0 * PI * TONE_HZ * t).sin() * AMPLITUDE;
                (amplitude * f32::from(i16::MAX)) as i16
            })
            .collect();

        AudioClip::new(self.sample_rate_hz, pcm)
    }
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for ToneSynthesizer {
    fn synthesize(&self, text: String) -> BoxFuture<'_, Result<AudioClip, SynthError>> {
        async move { Ok(self.render(&text)) }.boxed()
    }
}
