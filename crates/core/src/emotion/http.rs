use crate::config::ApiKey;
use crate::emotion::{rank_scores, ClassifierError, EmotionClassifier, EmotionScore};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Text-classification inference endpoint (GoEmotions model).
///
/// The endpoint answers `[[{"label": .., "score": ..}, ..]]`, one inner list
/// per input. Nothing else is accepted.
#[derive(Clone)]
pub struct HttpEmotionClassifier {
    client: Client,
    endpoint: Url,
    token: Option<ApiKey>,
}

impl HttpEmotionClassifier {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            token: None,
        }
    }

    pub fn with_token(mut self, token: ApiKey) -> Self {
        self.token = Some(token);
        self
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
struct RawScore {
    label: String,
    score: f32,
}

fn into_scores(batches: Vec<Vec<RawScore>>) -> Result<Vec<EmotionScore>, ClassifierError> {
    let first = batches
        .into_iter()
        .next()
        .ok_or_else(|| ClassifierError::InvalidResponse("empty batch".to_owned()))?;
    Ok(rank_scores(first.into_iter().map(|s| (s.label, s.score))))
}

impl EmotionClassifier for HttpEmotionClassifier {
    fn classify(&self, sentence: String) -> BoxFuture<'_, Result<Vec<EmotionScore>, ClassifierError>> {
        async move {
            let mut request = self
                .client
                .post(self.endpoint.clone())
                .json(&ClassifyRequest { inputs: &sentence });
            if let Some(token) = &self.token {
                request = request.bearer_auth(token.expose());
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(match status {
                    401 | 403 | 404 => ClassifierError::ModelUnavailable(format!("HTTP {status}: {body}")),
                    _ => ClassifierError::HttpStatus { status, body },
                });
            }

            let batches: Vec<Vec<RawScore>> = response
                .json()
                .await
                .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;
            into_scores(batches)
        }
        .boxed()
    }
}
