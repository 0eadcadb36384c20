mod basic;
mod http;
mod piper;

use crate::audio::{AudioClip, AudioError, DEFAULT_SAMPLE_RATE_HZ};
use crate::util::{is_http_retryable, retry_with_backoff, RetryConfig};
use futures::future::BoxFuture;

pub use basic::ToneSynthesizer;
pub use http::HttpSynthesizer;
pub use piper::PiperSynthesizer;

/// Sentences shorter than this (after trimming) are not sent to a synthesizer.
pub const MIN_SYNTH_CHARS: usize = 3;
pub const SHORT_TEXT_SILENCE_MS: u32 = 200;

#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("http error {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid audio: {0}")]
    InvalidAudio(#[from] AudioError),

    #[error("{0}")]
    Other(String),
}

impl SynthError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::HttpStatus { status, .. } => is_http_retryable(*status),
            Self::InvalidAudio(_) | Self::Other(_) => false,
        }
    }
}

/// Raw text-to-speech for a single sentence, producing a mono clip.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, text: String) -> BoxFuture<'_, Result<AudioClip, SynthError>>;
}

/// Synthesizes one sentence. Near-empty text becomes a short silence without
/// touching the synthesizer; transient failures are retried per `retry`.
pub async fn synthesize_sentence(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    retry: &RetryConfig,
) -> Result<AudioClip, SynthError> {
    let text = text.trim();
    if text.chars().count() < MIN_SYNTH_CHARS {
        return Ok(AudioClip::silence(DEFAULT_SAMPLE_RATE_HZ, SHORT_TEXT_SILENCE_MS));
    }
    retry_with_backoff(
        retry,
        "synthesize",
        || synthesizer.synthesize(text.to_owned()),
        SynthError::is_transient,
    )
    .await
}
