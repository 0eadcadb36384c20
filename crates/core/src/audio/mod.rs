mod transform;

use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};
use std::path::Path;
use std::time::Duration;

pub use transform::{
    apply_pitch, apply_speed, apply_volume, concatenate, modulate, resample,
    DEFAULT_GAP_MS, PITCH_RANGE, SPEED_RANGE, VOLUME_RANGE,
};

pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 22_050;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported wav format: {0}")]
    UnsupportedFormat(String),

    #[error("resampler setup failed: {0}")]
    ResamplerSetup(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioClip {
    pub sample_rate_hz: u32,
    pub samples: Vec<i16>,
}

impl AudioClip {
    pub fn new(sample_rate_hz: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate_hz,
            samples,
        }
    }

    pub fn empty(sample_rate_hz: u32) -> Self {
        Self::new(sample_rate_hz, Vec::new())
    }

    pub fn silence(sample_rate_hz: u32, duration_ms: u32) -> Self {
        let len = samples_for_ms(sample_rate_hz, duration_ms);
        Self::new(sample_rate_hz, vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate_hz == 0 {
            return Duration::from_secs(0);
        }
        let micros =
            (u128::from(self.samples.len() as u64) * 1_000_000u128) / u128::from(self.sample_rate_hz);
        Duration::from_micros(micros.min(u128::from(u64::MAX)) as u64)
    }

    pub fn peak(&self) -> i16 {
        self.samples
            .iter()
            .map(|s| s.saturating_abs())
            .max()
            .unwrap_or(0)
    }

    pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        let reader = hound::WavReader::open(path.as_ref())?;
        Self::from_reader(reader)
    }

    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, AudioError> {
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes))?;
        Self::from_reader(reader)
    }

    /// Decodes any integer or float WAV and downmixes it to mono 16-bit.
    fn from_reader<R: Read + Seek>(reader: hound::WavReader<R>) -> Result<Self, AudioError> {
        let spec = reader.spec();
        let channels = usize::from(spec.channels);
        if channels == 0 {
            return Err(AudioError::UnsupportedFormat("zero channels".to_owned()));
        }

        let interleaved: Vec<i16> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let bits = spec.bits_per_sample;
                if bits == 0 || bits > 32 {
                    return Err(AudioError::UnsupportedFormat(format!("{bits}-bit integer")));
                }
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| scale_int_sample(v, bits)))
                    .collect::<Result<_, _>>()?
            }
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.map(float_to_i16))
                .collect::<Result<_, _>>()?,
        };

        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                    (sum / frame.len() as i32) as i16
                })
                .collect()
        };

        Ok(Self::new(spec.sample_rate, samples))
    }

    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> Result<(), AudioError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

pub(crate) fn samples_for_ms(sample_rate_hz: u32, duration_ms: u32) -> usize {
    let samples = u64::from(sample_rate_hz) * u64::from(duration_ms) / 1000;
    usize::try_from(samples).unwrap_or(usize::MAX)
}

fn scale_int_sample(value: i32, bits: u16) -> i16 {
    if bits > 16 {
        (value >> (bits - 16)) as i16
    } else {
        (value << (16 - bits)) as i16
    }
}

fn float_to_i16(value: f32) -> i16 {
    (value * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}
