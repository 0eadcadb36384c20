//! Clamped speed, pitch and gain transforms.
//!
//! Speed and pitch share one mechanism: the samples are reinterpreted at a
//! scaled rate and then resampled back to the clip's own rate. Both therefore
//! change duration and pitch together. This is a known limitation of the
//! approach and concatenation timing relies on it.

use crate::audio::{samples_for_ms, AudioClip, AudioError, DEFAULT_SAMPLE_RATE_HZ};
use crate::prosody::VoiceParameters;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::ops::RangeInclusive;

pub const SPEED_RANGE: RangeInclusive<f32> = 0.7..=1.4;
pub const PITCH_RANGE: RangeInclusive<f32> = -5.0..=5.0;
pub const VOLUME_RANGE: RangeInclusive<f32> = -6.0..=6.0;

pub const DEFAULT_GAP_MS: u32 = 300;

/// Clamps into `range`; NaN maps to the transform's identity value.
fn bounded(value: f32, range: &RangeInclusive<f32>, identity: f32) -> f32 {
    if value.is_nan() {
        return identity;
    }
    value.clamp(*range.start(), *range.end())
}

/// Widens an `f32` setting through its decimal form, so `1.18` scales a rate
/// the same way the literal `1.18` would.
fn widen(value: f32) -> f64 {
    (f64::from(value) * 1e6).round() / 1e6
}

/// Rate the samples are reinterpreted at; truncated like an integer cast.
fn spawned_rate(rate_hz: u32, factor: f64) -> u32 {
    (f64::from(rate_hz) * factor) as u32
}

fn restate_rate(clip: &AudioClip, factor: f64) -> Result<AudioClip, AudioError> {
    let spawned = spawned_rate(clip.sample_rate_hz, factor);
    if spawned == clip.sample_rate_hz || spawned == 0 {
        return Ok(clip.clone());
    }
    let samples = resample(&clip.samples, spawned, clip.sample_rate_hz)?;
    Ok(AudioClip::new(clip.sample_rate_hz, samples))
}

pub fn apply_speed(clip: &AudioClip, speed: f32) -> Result<AudioClip, AudioError> {
    let speed = bounded(speed, &SPEED_RANGE, 1.0);
    restate_rate(clip, widen(speed))
}

pub fn apply_pitch(clip: &AudioClip, semitones: f32) -> Result<AudioClip, AudioError> {
    let semitones = bounded(semitones, &PITCH_RANGE, 0.0);
    if semitones == 0.0 {
        return Ok(clip.clone());
    }
    let ratio = 2f64.powf(widen(semitones) / 12.0);
    restate_rate(clip, ratio)
}

pub fn apply_volume(clip: &AudioClip, volume_db: f32) -> AudioClip {
    let volume_db = bounded(volume_db, &VOLUME_RANGE, 0.0);
    if volume_db == 0.0 {
        return clip.clone();
    }
    let gain = 10f32.powf(volume_db / 20.0);
    let samples = clip
        .samples
        .iter()
        .map(|&s| {
            (f32::from(s) * gain)
                .round()
                .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
        })
        .collect();
    AudioClip::new(clip.sample_rate_hz, samples)
}

/// Speed, then pitch, then volume. The order is fixed.
pub fn modulate(clip: &AudioClip, params: VoiceParameters) -> Result<AudioClip, AudioError> {
    let clip = apply_speed(clip, params.speed)?;
    let clip = apply_pitch(&clip, params.pitch_semitones)?;
    Ok(apply_volume(&clip, params.volume_db))
}

/// Joins clips in order with `gap_ms` of silence between neighbours.
///
/// The result uses the first clip's rate; clips at other rates are resampled.
pub fn concatenate(clips: &[AudioClip], gap_ms: u32) -> Result<AudioClip, AudioError> {
    let Some(first) = clips.first() else {
        return Ok(AudioClip::empty(DEFAULT_SAMPLE_RATE_HZ));
    };
    let rate = first.sample_rate_hz;
    let gap_len = samples_for_ms(rate, gap_ms);
    let total = clips.iter().map(AudioClip::len).sum::<usize>() + gap_len * (clips.len() - 1);

    let mut samples = Vec::with_capacity(total);
    for (i, clip) in clips.iter().enumerate() {
        if i > 0 {
            samples.resize(samples.len() + gap_len, 0);
        }
        if clip.sample_rate_hz == rate {
            samples.extend_from_slice(&clip.samples);
        } else {
            samples.extend(resample(&clip.samples, clip.sample_rate_hz, rate)?);
        }
    }
    Ok(AudioClip::new(rate, samples))
}

/// Linear-interpolation rate conversion through rubato.
///
/// Output length is `floor(len * to / from)`, at least one sample for a
/// non-empty input.
pub fn resample(
    samples: &[i16],
    from_rate_hz: u32,
    to_rate_hz: u32,
) -> Result<Vec<i16>, AudioError> {
    if from_rate_hz == to_rate_hz || samples.is_empty() || from_rate_hz == 0 || to_rate_hz == 0 {
        return Ok(samples.to_vec());
    }
    let target = resampled_len(samples.len(), from_rate_hz, to_rate_hz);
    let last = samples[samples.len() - 1];
    if samples.len() < 2 {
        return Ok(vec![last; target]);
    }

    let mut resampler = FastFixedIn::<f64>::new(
        f64::from(to_rate_hz) / f64::from(from_rate_hz),
        1.0,
        PolynomialDegree::Linear,
        samples.len(),
        1,
    )?;
    let input = vec![samples.iter().map(|&s| f64::from(s)).collect::<Vec<_>>()];
    let mut output = resampler
        .process(&input, None)?
        .into_iter()
        .next()
        .unwrap_or_default();
    let tail = resampler.process_partial(None::<&[Vec<f64>]>, None)?;
    output.extend(tail.into_iter().next().unwrap_or_default());

    let mut converted: Vec<i16> = output
        .into_iter()
        .skip(resampler.output_delay())
        .take(target)
        .map(|s| s.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16)
        .collect();
    let pad = converted.last().copied().unwrap_or(last);
    converted.resize(target, pad);
    Ok(converted)
}

fn resampled_len(len: usize, from_rate_hz: u32, to_rate_hz: u32) -> usize {
    let scaled = len as u64 * u64::from(to_rate_hz) / u64::from(from_rate_hz);
    usize::try_from(scaled).unwrap_or(usize::MAX).max(1)
}
