use crate::audio::AudioClip;
use crate::config::ApiKey;
use crate::tts::{SpeechSynthesizer, SynthError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;
use url::Url;

/// Remote synthesis endpoint that answers a JSON request with a WAV body.
#[derive(Clone)]
pub struct HttpSynthesizer {
    client: Client,
    endpoint: Url,
    voice: Option<String>,
    token: Option<ApiKey>,
}

impl HttpSynthesizer {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            voice: None,
            token: None,
        }
    }

    pub fn with_voice(mut self, voice: String) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_token(mut self, token: ApiKey) -> Self {
        self.token = Some(token);
        self
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
}

impl SpeechSynthesizer for HttpSynthesizer {
    fn synthesize(&self, text: String) -> BoxFuture<'_, Result<AudioClip, SynthError>> {
        async move {
            let body = SynthesisRequest {
                text: &text,
                voice: self.voice.as_deref(),
            };
            let mut request = self
                .client
                .post(self.endpoint.clone())
                .header("Accept", "audio/wav")
                .json(&body);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token.expose());
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(SynthError::HttpStatus { status, body });
            }

            let audio = response.bytes().await?;
            Ok(AudioClip::from_wav_bytes(&audio)?)
        }
        .boxed()
    }
}
