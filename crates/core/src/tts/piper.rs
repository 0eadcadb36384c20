use crate::audio::AudioClip;
use crate::tts::{SpeechSynthesizer, SynthError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const PIPER_SAMPLE_RATE: u32 = 22050;
const WAV_HEADER_BYTES: usize = 44;

/// Local synthesis through the Piper binary, one process per sentence.
#[derive(Clone, Debug)]
pub struct PiperSynthesizer {
    piper_binary: PathBuf,
    model_path: PathBuf,
}

impl PiperSynthesizer {
    #[must_use]
    pub fn new(piper_binary: PathBuf, model_path: PathBuf) -> Self {
        Self {
            piper_binary,
            model_path,
        }
    }
}

/// Piper's raw output is little-endian 16-bit mono; some builds still prefix a
/// WAV header, which is skipped.
fn decode_piper_output(raw: &[u8]) -> Result<AudioClip, SynthError> {
    if raw.is_empty() {
        return Err(SynthError::Other("piper produced no audio output".into()));
    }

    let pcm_bytes = if raw.len() > WAV_HEADER_BYTES && &raw[..4] == b"RIFF" {
        &raw[WAV_HEADER_BYTES..]
    } else {
        raw
    };

    let samples: Vec<i16> = pcm_bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    if samples.is_empty() {
        return Err(SynthError::Other("piper produced empty PCM data".into()));
    }

    Ok(AudioClip::new(PIPER_SAMPLE_RATE, samples))
}

impl SpeechSynthesizer for PiperSynthesizer {
    fn synthesize(&self, text: String) -> BoxFuture<'_, Result<AudioClip, SynthError>> {
        async move {
            let mut child = Command::new(&self.piper_binary)
                .arg("--model")
                .arg(&self.model_path)
                .arg("--output_raw")
                .stdin(std::process::Stdio::piped())
                .stdout(std::process::Stdio::piped())
                .stderr(std::process::Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    let path = self.piper_binary.display();
                    SynthError::Other(format!("failed to spawn piper at {path}: {e}"))
                })?;

            {
                let stdin = child
                    .stdin
                    .as_mut()
                    .ok_or_else(|| SynthError::Other("failed to open piper stdin".into()))?;
                stdin
                    .write_all(text.as_bytes())
                    .await
                    .map_err(|e| SynthError::Other(format!("piper stdin write failed: {e}")))?;
            }
            child.stdin.take();

            let output = child
                .wait_with_output()
                .await
                .map_err(|e| SynthError::Other(format!("piper process failed: {e}")))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let status = output.status;
                return Err(SynthError::Other(format!(
                    "piper exited with {status}: {stderr}"
                )));
            }

            decode_piper_output(&output.stdout)
        }
        .boxed()
    }
}
