use crate::emotion::{rank_scores, EmotionLabel, EmotionScore};
use crate::util::is_http_retryable;
use futures::future::BoxFuture;
use futures::FutureExt;
use unicode_segmentation::UnicodeSegmentation;

#[derive(thiserror::Error, Debug)]
pub enum ClassifierError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("http error {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),
}

impl ClassifierError {
    /// Failures worth another attempt: dropped connections, timeouts and
    /// retryable HTTP statuses (a model that is still loading answers 503).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::HttpStatus { status, .. } => is_http_retryable(*status),
            Self::ModelUnavailable(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// Sentence-level emotion classification.
///
/// Implementations return scores ranked by descending confidence.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, sentence: String) -> BoxFuture<'_, Result<Vec<EmotionScore>, ClassifierError>>;
}

const BASE_CONFIDENCE: f32 = 0.5;
const PER_HIT: f32 = 0.2;
const INTENSIFIER_BOOST: f32 = 0.1;
const EXCLAMATION_BOOST: f32 = 0.1;
const MAX_CONFIDENCE: f32 = 0.95;
const NEUTRAL_RESIDUAL: f32 = 0.05;
const NEUTRAL_ONLY: f32 = 0.9;

const INTENSIFIERS: &[&str] = &["so", "very", "really", "extremely", "totally", "incredibly"];

const LEXICON: &[(EmotionLabel, &[&str])] = &[
    (EmotionLabel::Admiration, &["amazing", "impressive", "brilliant", "admire", "wonderful"]),
    (EmotionLabel::Amusement, &["funny", "hilarious", "lol", "laugh", "laughed"]),
    (EmotionLabel::Approval, &["agree", "approve", "fine", "right", "okay"]),
    (EmotionLabel::Caring, &["care", "caring", "support", "help", "comfort"]),
    (EmotionLabel::Desire, &["want", "wish", "crave", "longing", "desire"]),
    (EmotionLabel::Excitement, &["excited", "thrilled", "can't", "wait", "pumped"]),
    (EmotionLabel::Gratitude, &["thank", "thanks", "grateful", "thankful", "appreciate"]),
    (EmotionLabel::Joy, &["happy", "joy", "glad", "delighted", "cheerful"]),
    (EmotionLabel::Love, &["love", "adore", "beloved", "darling", "sweetheart"]),
    (EmotionLabel::Optimism, &["hope", "hopeful", "optimistic", "motivated", "better"]),
    (EmotionLabel::Pride, &["proud", "pride", "accomplished", "achievement", "confident"]),
    (EmotionLabel::Relief, &["relieved", "relief", "finally", "phew", "safe"]),
    (EmotionLabel::Anger, &["angry", "furious", "mad", "rage", "hate"]),
    (EmotionLabel::Annoyance, &["annoyed", "annoying", "irritated", "ugh", "bothered"]),
    (EmotionLabel::Disappointment, &["disappointed", "disappointing", "letdown", "failed", "unfortunately"]),
    (EmotionLabel::Disapproval, &["wrong", "disapprove", "shouldn't", "unacceptable", "bad"]),
    (EmotionLabel::Disgust, &["disgusting", "gross", "disgust", "revolting", "nasty"]),
    (EmotionLabel::Embarrassment, &["embarrassed", "embarrassing", "ashamed", "awkward", "stumbled"]),
    (EmotionLabel::Fear, &["afraid", "scared", "fear", "terrified", "frightened"]),
    (EmotionLabel::Grief, &["grief", "mourning", "loss", "died", "funeral"]),
    (EmotionLabel::Nervousness, &["nervous", "anxious", "anxiety", "worried", "uneasy"]),
    (EmotionLabel::Remorse, &["sorry", "regret", "apologize", "guilty", "remorse"]),
    (EmotionLabel::Sadness, &["sad", "terrible", "unhappy", "depressed", "hurt"]),
    (EmotionLabel::Confusion, &["confused", "confusing", "unsure", "puzzled", "strange"]),
    (EmotionLabel::Curiosity, &["curious", "wonder", "why", "how", "interesting"]),
    (EmotionLabel::Realization, &["realize", "realized", "understand", "noticed", "oh"]),
    (EmotionLabel::Surprise, &["surprised", "surprise", "wow", "unexpected", "unexpectedly"]),
];

/// Offline lexicon scorer over the GoEmotions labels.
///
/// Each matched keyword raises its label's confidence; intensifiers and
/// exclamation marks push every matched label further. Sentences without any
/// match are scored as neutral.
#[derive(Clone, Debug, Default)]
pub struct KeywordEmotionClassifier;

impl KeywordEmotionClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, sentence: &str) -> Vec<EmotionScore> {
        let lower = sentence.to_lowercase();
        let words: Vec<&str> = lower.unicode_words().collect();

        let mut boost = 0.0;
        if words.iter().any(|w| INTENSIFIERS.contains(w)) {
            boost += INTENSIFIER_BOOST;
        }
        if sentence.contains('!') {
            boost += EXCLAMATION_BOOST;
        }

        let mut raw: Vec<(&str, f32)> = LEXICON
            .iter()
            .filter_map(|(label, keywords)| {
                let hits = words.iter().filter(|w| keywords.contains(*w)).count();
                (hits > 0).then(|| {
                    let confidence = BASE_CONFIDENCE + PER_HIT * hits as f32 + boost;
                    (label.as_str(), confidence.min(MAX_CONFIDENCE))
                })
            })
            .collect();

        if raw.is_empty() {
            raw.push((EmotionLabel::Neutral.as_str(), NEUTRAL_ONLY));
        } else {
            raw.push((EmotionLabel::Neutral.as_str(), NEUTRAL_RESIDUAL));
        }

        rank_scores(raw)
    }
}

impl EmotionClassifier for KeywordEmotionClassifier {
    fn classify(&self, sentence: String) -> BoxFuture<'_, Result<Vec<EmotionScore>, ClassifierError>> {
        async move { Ok(self.score(&sentence)) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::IntensityTier;

    #[tokio::test]
    async fn happy_sentence_is_joy() {
        let classifier = KeywordEmotionClassifier::new();
        let scores = classifier
            .classify("I am so happy today!".to_owned())
            .await
            .expect("classify");
        assert_eq!(scores[0].label, EmotionLabel::Joy);
        assert_eq!(
            IntensityTier::from_confidence(scores[0].confidence),
            IntensityTier::High
        );
    }

    #[test]
    fn terrible_sentence_is_sadness() {
        let scores = KeywordEmotionClassifier::new().score("But yesterday was terrible.");
        assert_eq!(scores[0].label, EmotionLabel::Sadness);
        assert_eq!(scores.last().map(|s| s.label), Some(EmotionLabel::Neutral));
    }

    #[test]
    fn plain_sentence_is_neutral() {
        let scores = KeywordEmotionClassifier::new().score("The train leaves at noon.");
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].label, EmotionLabel::Neutral);
        assert_eq!(scores[0].confidence, NEUTRAL_ONLY);
    }

    #[test]
    fn scores_are_ranked_and_bounded() {
        let scores = KeywordEmotionClassifier::new()
            .score("I love you, I adore you, darling, and I am scared!");
        assert_eq!(scores[0].label, EmotionLabel::Love);
        assert!(scores
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence));
        assert!(scores.iter().all(|s| s.confidence <= MAX_CONFIDENCE));
    }

    #[test]
    fn http_statuses_drive_transience() {
        let busy = ClassifierError::HttpStatus {
            status: 503,
            body: "loading".into(),
        };
        let missing = ClassifierError::HttpStatus {
            status: 400,
            body: "bad".into(),
        };
        assert!(busy.is_transient());
        assert!(!missing.is_transient());
        assert!(!ClassifierError::ModelUnavailable("gone".into()).is_transient());
    }
}
