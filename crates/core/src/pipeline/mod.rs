use crate::audio::{concatenate, modulate, AudioClip, AudioError};
use crate::config::AppConfig;
use crate::corpus::{CorpusStatistics, SentenceRecord, Timeline};
use crate::emotion::{ClassifierError, EmotionClassifier};
use crate::prosody::{sentence_parameters, VoiceParameters};
use crate::segment::Segmenter;
use crate::tts::{synthesize_sentence, SpeechSynthesizer};
use crate::util::{retry_with_backoff, RetryConfig};
use futures::{stream, Future, StreamExt};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const LOG_TARGET: &str = "pipeline";

pub const OUTPUT_PREFIX: &str = "empathy_output_";
const SCRATCH_PREFIX: &str = ".empathy-run-";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    TimelineBuilt,
    RawSynthesized,
    ParametersDerived,
    Modulated,
    Concatenated,
    Done,
    Failed,
}

impl PipelineStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::TimelineBuilt => "timeline_built",
            Self::RawSynthesized => "raw_synthesized",
            Self::ParametersDerived => "parameters_derived",
            Self::Modulated => "modulated",
            Self::Concatenated => "concatenated",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One consolidated failure per run. `stage` is the stage the run was
/// trying to reach.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("stage {stage}: collaborator unavailable: {details}")]
    CollaboratorUnavailable {
        stage: PipelineStage,
        details: String,
    },

    #[error("stage {stage}: could not persist audio: {source}")]
    ArtifactWrite {
        stage: PipelineStage,
        #[source]
        source: AudioError,
    },

    #[error("stage {stage}: worker task failed: {details}")]
    Task {
        stage: PipelineStage,
        details: String,
    },
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::InvalidInput(_) => PipelineStage::Start,
            Self::CollaboratorUnavailable { stage, .. }
            | Self::ArtifactWrite { stage, .. }
            | Self::Task { stage, .. } => *stage,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub gap_ms: u32,
    pub max_concurrency: usize,
    pub retry: RetryConfig,
}

impl PipelineConfig {
    pub fn from_app(app: &AppConfig) -> Self {
        Self {
            output_dir: app.output_dir.clone(),
            gap_ms: app.gap_ms,
            max_concurrency: app.max_concurrency.get(),
            retry: RetryConfig {
                max_attempts: app.retry_attempts.get(),
                ..RetryConfig::default()
            },
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

/// A sentence record together with the voice parameters it was rendered with.
#[derive(Clone, Debug, Serialize)]
pub struct SentenceVoice {
    #[serde(flatten)]
    pub record: SentenceRecord,
    pub voice_params: VoiceParameters,
}

#[derive(Clone, Debug, Serialize)]
pub struct CorpusAnalysis {
    pub statistics: CorpusStatistics,
    pub sentences: Vec<SentenceVoice>,
}

impl CorpusAnalysis {
    pub fn from_timeline(timeline: Timeline) -> Self {
        let statistics = CorpusStatistics::from_timeline(&timeline);
        let sentences = timeline
            .into_records()
            .into_iter()
            .map(|record| {
                let voice_params = sentence_parameters(&record, statistics.base_pitch_semitones);
                SentenceVoice {
                    record,
                    voice_params,
                }
            })
            .collect();
        Self {
            statistics,
            sentences,
        }
    }
}

/// Report of a successful run.
#[derive(Clone, Debug, Serialize)]
pub struct SpeechArtifact {
    pub output_path: PathBuf,
    pub duration_ms: u64,
    pub statistics: CorpusStatistics,
    pub sentences: Vec<SentenceVoice>,
}

impl SpeechArtifact {
    pub fn file_name(&self) -> Option<&str> {
        self.output_path.file_name().and_then(|n| n.to_str())
    }
}

/// The orchestrator. Collaborators are injected by the caller and shared
/// across runs; cloning is cheap.
///
/// Per-sentence work inside a stage runs up to `max_concurrency` at a time and
/// is reassembled in timeline order before the next stage starts.
#[derive(Clone)]
pub struct Pipeline {
    segmenter: Arc<dyn Segmenter>,
    classifier: Arc<dyn EmotionClassifier>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        segmenter: Arc<dyn Segmenter>,
        classifier: Arc<dyn EmotionClassifier>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            segmenter,
            classifier,
            synthesizer,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Classification and parameter derivation only; nothing is synthesized
    /// or written.
    pub async fn analyze(&self, text: &str) -> Result<CorpusAnalysis, PipelineError> {
        validate_input(text)?;
        let timeline = self.build_timeline(text).await?;
        Ok(CorpusAnalysis::from_timeline(timeline))
    }

    pub async fn run(&self, text: &str) -> Result<SpeechArtifact, PipelineError> {
        validate_input(text)?;
        let scratch = Scratch::create(&self.config.output_dir)?;
        let result = self.run_in(text, &scratch).await;
        scratch.release();

        match &result {
            Ok(artifact) => info!(
                target: LOG_TARGET,
                stage = %PipelineStage::Done,
                sentences = artifact.sentences.len(),
                duration_ms = artifact.duration_ms,
                path = %artifact.output_path.display(),
                "speech artifact written"
            ),
            Err(e) => error!(
                target: LOG_TARGET,
                stage = %PipelineStage::Failed,
                failed_stage = %e.stage(),
                error = %e,
                "pipeline run failed"
            ),
        }
        result
    }

    async fn run_in(&self, text: &str, scratch: &Scratch) -> Result<SpeechArtifact, PipelineError> {
        let timeline = self.build_timeline(text).await?;

        let raw_paths = self.synthesize_all(&timeline, scratch).await?;
        reached(PipelineStage::RawSynthesized, raw_paths.len());

        let analysis = CorpusAnalysis::from_timeline(timeline);
        reached(PipelineStage::ParametersDerived, analysis.sentences.len());

        let modulated_paths = self.modulate_all(raw_paths, &analysis, scratch).await?;
        reached(PipelineStage::Modulated, modulated_paths.len());

        let output_path = self.config.output_dir.join(artifact_name());
        let duration = write_concatenated(modulated_paths, self.config.gap_ms, output_path.clone()).await?;
        reached(PipelineStage::Concatenated, analysis.sentences.len());

        Ok(SpeechArtifact {
            output_path,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            statistics: analysis.statistics,
            sentences: analysis.sentences,
        })
    }

    async fn build_timeline(&self, text: &str) -> Result<Timeline, PipelineError> {
        let sentences = self.segmenter.segment(text);
        debug!(target: LOG_TARGET, sentences = sentences.len(), "text segmented");

        let jobs: Vec<_> = sentences
            .into_iter()
            .enumerate()
            .map(|(index, sentence)| {
                classify_sentence(
                    Arc::clone(&self.classifier),
                    self.config.retry.clone(),
                    index,
                    sentence,
                )
            })
            .collect();
        let records: Vec<SentenceRecord> = settle_in_order(jobs, self.concurrency()).await?;

        let timeline = Timeline::new(records);
        reached(PipelineStage::TimelineBuilt, timeline.len());
        Ok(timeline)
    }

    async fn synthesize_all(&self, timeline: &Timeline, scratch: &Scratch) -> Result<Vec<PathBuf>, PipelineError> {
        let jobs: Vec<_> = timeline
            .iter()
            .map(|record| {
                synthesize_to(
                    Arc::clone(&self.synthesizer),
                    self.config.retry.clone(),
                    record.sentence.clone(),
                    scratch.raw_path(record.index),
                )
            })
            .collect();
        settle_in_order(jobs, self.concurrency()).await
    }

    async fn modulate_all(
        &self,
        raw_paths: Vec<PathBuf>,
        analysis: &CorpusAnalysis,
        scratch: &Scratch,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let jobs: Vec<_> = raw_paths
            .into_iter()
            .zip(&analysis.sentences)
            .map(|(raw, sentence)| {
                modulate_file(
                    raw,
                    sentence.voice_params,
                    scratch.modulated_path(sentence.record.index),
                )
            })
            .collect();
        settle_in_order(jobs, self.concurrency()).await
    }

    fn concurrency(&self) -> usize {
        self.config.max_concurrency.max(1)
    }
}

/// Drives every job to completion before reporting, so no write is still in
/// flight when the scratch directory is released.
async fn settle_in_order<T, F>(jobs: Vec<F>, limit: usize) -> Result<Vec<T>, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    stream::iter(jobs)
        .buffered(limit)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect()
}

fn validate_input(text: &str) -> Result<(), PipelineError> {
    if text.trim().is_empty() {
        return Err(PipelineError::InvalidInput("text must be a non-empty string"));
    }
    Ok(())
}

fn reached(stage: PipelineStage, sentences: usize) {
    debug!(target: LOG_TARGET, stage = %stage, sentences, "stage reached");
}

fn artifact_name() -> String {
    let id: u32 = rand::rng().random();
    format!("{OUTPUT_PREFIX}{id:08x}.wav")
}

async fn classify_sentence(
    classifier: Arc<dyn EmotionClassifier>,
    retry: RetryConfig,
    index: usize,
    sentence: String,
) -> Result<SentenceRecord, PipelineError> {
    let scores = retry_with_backoff(
        &retry,
        "classify",
        || classifier.classify(sentence.clone()),
        ClassifierError::is_transient,
    )
    .await
    .map_err(|e| PipelineError::CollaboratorUnavailable {
        stage: PipelineStage::TimelineBuilt,
        details: format!("classifier: {e}"),
    })?;
    Ok(SentenceRecord::new(index, sentence, scores))
}

async fn synthesize_to(
    synthesizer: Arc<dyn SpeechSynthesizer>,
    retry: RetryConfig,
    sentence: String,
    path: PathBuf,
) -> Result<PathBuf, PipelineError> {
    let clip = synthesize_sentence(synthesizer.as_ref(), &sentence, &retry)
        .await
        .map_err(|e| PipelineError::CollaboratorUnavailable {
            stage: PipelineStage::RawSynthesized,
            details: format!("synthesizer: {e}"),
        })?;
    blocking(PipelineStage::RawSynthesized, move || {
        clip.write_wav(&path)?;
        Ok(path)
    })
    .await
}

async fn modulate_file(raw: PathBuf, params: VoiceParameters, out: PathBuf) -> Result<PathBuf, PipelineError> {
    blocking(PipelineStage::Modulated, move || {
        let clip = AudioClip::read_wav(&raw)?;
        modulate(&clip, params)?.write_wav(&out)?;
        Ok(out)
    })
    .await
}

async fn write_concatenated(
    clips: Vec<PathBuf>,
    gap_ms: u32,
    output_path: PathBuf,
) -> Result<Duration, PipelineError> {
    blocking(PipelineStage::Concatenated, move || {
        let clips = clips
            .iter()
            .map(AudioClip::read_wav)
            .collect::<Result<Vec<_>, _>>()?;
        let joined = concatenate(&clips, gap_ms)?;
        if let Err(e) = joined.write_wav(&output_path) {
            // never leave a truncated artifact behind
            let _ = std::fs::remove_file(&output_path);
            return Err(e);
        }
        Ok(joined.duration())
    })
    .await
}

async fn blocking<T, F>(stage: PipelineStage, f: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> Result<T, AudioError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::Task {
            stage,
            details: e.to_string(),
        })?
        .map_err(|source| PipelineError::ArtifactWrite { stage, source })
}

/// Per-run scratch directory. Dropping it also removes the directory, so a
/// cancelled run cleans up too.
struct Scratch {
    dir: tempfile::TempDir,
}

impl Scratch {
    fn create(output_dir: &Path) -> Result<Self, PipelineError> {
        let io_failure = |e: std::io::Error| PipelineError::ArtifactWrite {
            stage: PipelineStage::Start,
            source: AudioError::Io(e),
        };
        std::fs::create_dir_all(output_dir).map_err(io_failure)?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(output_dir)
            .map_err(io_failure)?;
        debug!(target: LOG_TARGET, path = %dir.path().display(), "scratch directory created");
        Ok(Self { dir })
    }

    fn raw_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("raw_{index:03}.wav"))
    }

    fn modulated_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("mod_{index:03}.wav"))
    }

    fn release(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(target: LOG_TARGET, path = %path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::samples_for_ms;
    use crate::emotion::{EmotionLabel, EmotionScore, KeywordEmotionClassifier};
    use crate::segment::UnicodeSentenceSegmenter;
    use crate::tts::SynthError;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingClassifier {
        inner: KeywordEmotionClassifier,
        calls: AtomicUsize,
    }

    impl CountingClassifier {
        fn new() -> Self {
            Self {
                inner: KeywordEmotionClassifier::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmotionClassifier for CountingClassifier {
        fn classify(&self, sentence: String) -> BoxFuture<'_, Result<Vec<EmotionScore>, ClassifierError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.inner.score(&sentence))
            }
            .boxed()
        }
    }

    struct UnavailableClassifier;

    impl EmotionClassifier for UnavailableClassifier {
        fn classify(&self, _sentence: String) -> BoxFuture<'_, Result<Vec<EmotionScore>, ClassifierError>> {
            async move { Err(ClassifierError::ModelUnavailable("model not loaded".into())) }.boxed()
        }
    }

    /// Constant-valued clip whose level is the sentence's character count.
    /// Earlier sentences finish later, so completion order differs from
    /// timeline order.
    struct LevelSynthesizer {
        calls: AtomicUsize,
    }

    impl LevelSynthesizer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SpeechSynthesizer for LevelSynthesizer {
        fn synthesize(&self, text: String) -> BoxFuture<'_, Result<AudioClip, SynthError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let level = text.chars().count();
                let delay = 40u64.saturating_sub(level as u64);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(AudioClip::new(22_050, vec![level as i16; 2_205]))
            }
            .boxed()
        }
    }

    struct BusySynthesizer {
        calls: AtomicUsize,
    }

    impl SpeechSynthesizer for BusySynthesizer {
        fn synthesize(&self, _text: String) -> BoxFuture<'_, Result<AudioClip, SynthError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(SynthError::HttpStatus {
                    status: 503,
                    body: "busy".into(),
                })
            }
            .boxed()
        }
    }

    /// Rejects sentences starting with "Broken"; the rest finish slowly.
    struct PartlyBrokenSynthesizer {
        finished: AtomicUsize,
    }

    impl SpeechSynthesizer for PartlyBrokenSynthesizer {
        fn synthesize(&self, text: String) -> BoxFuture<'_, Result<AudioClip, SynthError>> {
            async move {
                if text.starts_with("Broken") {
                    return Err(SynthError::HttpStatus {
                        status: 400,
                        body: "bad sentence".into(),
                    });
                }
                tokio::time::sleep(Duration::from_millis(60)).await;
                self.finished.fetch_add(1, Ordering::SeqCst);
                Ok(AudioClip::new(22_050, vec![3; 22_050]))
            }
            .boxed()
        }
    }

    struct NoSentences;

    impl Segmenter for NoSentences {
        fn segment(&self, _text: &str) -> Vec<String> {
            Vec::new()
        }
    }

    fn config(output_dir: &Path) -> PipelineConfig {
        PipelineConfig {
            output_dir: output_dir.to_path_buf(),
            gap_ms: 300,
            max_concurrency: 3,
            retry: RetryConfig::new(2, Duration::from_millis(1)),
        }
    }

    fn pipeline(
        classifier: Arc<dyn EmotionClassifier>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        output_dir: &Path,
    ) -> Pipeline {
        Pipeline::new(
            Arc::new(UnicodeSentenceSegmenter::new()),
            classifier,
            synthesizer,
            config(output_dir),
        )
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read output dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn blank_input_is_rejected_before_any_collaborator() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("out");
        let classifier = Arc::new(CountingClassifier::new());
        let synth = Arc::new(LevelSynthesizer::new());
        let pipeline = pipeline(classifier.clone(), synth.clone(), &output);

        for text in ["", "   \n"] {
            let err = pipeline.run(text).await.expect_err("blank text");
            assert!(matches!(err, PipelineError::InvalidInput(_)));
            assert_eq!(err.stage(), PipelineStage::Start);
        }
        assert!(matches!(
            pipeline.analyze("").await,
            Err(PipelineError::InvalidInput(_))
        ));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn two_sentence_run_writes_one_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let synth = Arc::new(LevelSynthesizer::new());
        let pipeline = pipeline(Arc::new(CountingClassifier::new()), synth.clone(), dir.path());

        let artifact = pipeline
            .run("I am so happy today! But yesterday was terrible.")
            .await
            .expect("run succeeds");

        assert_eq!(artifact.sentences.len(), 2);
        assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
        let tops: Vec<_> = artifact
            .sentences
            .iter()
            .map(|s| s.record.top_label())
            .collect();
        assert_eq!(tops, vec![Some(EmotionLabel::Joy), Some(EmotionLabel::Sadness)]);
        assert_eq!(artifact.statistics.volatility_score, 1.0);
        assert_eq!(artifact.statistics.base_pitch_semitones, 0.0);
        assert_eq!(artifact.statistics.dominant_emotion, EmotionLabel::Joy);

        let name = artifact.file_name().expect("file name");
        assert!(name.starts_with(OUTPUT_PREFIX) && name.ends_with(".wav"));
        assert_eq!(name.len(), OUTPUT_PREFIX.len() + 8 + 4);
        assert_eq!(entries(dir.path()), vec![name.to_owned()]);

        let written = AudioClip::read_wav(&artifact.output_path).expect("artifact readable");
        let expected: usize = artifact
            .sentences
            .iter()
            .map(|s| {
                let level = s.record.sentence.chars().count() as i16;
                modulate(&AudioClip::new(22_050, vec![level; 2_205]), s.voice_params)
                    .expect("modulate")
                    .len()
            })
            .sum::<usize>()
            + samples_for_ms(22_050, 300);
        assert_eq!(written.len(), expected);
        assert_eq!(
            artifact.duration_ms,
            written.duration().as_millis() as u64
        );
    }

    #[tokio::test]
    async fn concurrent_stages_keep_timeline_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = pipeline(
            Arc::new(CountingClassifier::new()),
            Arc::new(LevelSynthesizer::new()),
            dir.path(),
        );

        let artifact = pipeline
            .run("Hi there. Good morning everyone. See you.")
            .await
            .expect("run succeeds");
        let written = AudioClip::read_wav(&artifact.output_path).expect("artifact readable");

        let mut levels: Vec<i16> = written.samples.into_iter().filter(|s| *s != 0).collect();
        levels.dedup();
        assert_eq!(levels, vec![9, 22, 8]);
    }

    #[tokio::test]
    async fn neutral_corpus_has_no_bias() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = pipeline(
            Arc::new(CountingClassifier::new()),
            Arc::new(LevelSynthesizer::new()),
            dir.path(),
        );

        let analysis = pipeline
            .analyze("The table is brown. The door is open. It is Tuesday. The bus left. Lunch is at noon.")
            .await
            .expect("analysis");

        assert_eq!(analysis.sentences.len(), 5);
        assert_eq!(analysis.statistics.dominant_emotion, EmotionLabel::Neutral);
        assert_eq!(analysis.statistics.volatility_score, 0.0);
        assert_eq!(analysis.statistics.base_pitch_semitones, 0.0);
        for sentence in &analysis.sentences {
            assert_eq!(sentence.voice_params.pitch_semitones, 0.0);
        }
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn classifier_failure_fails_run_and_cleans_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let synth = Arc::new(LevelSynthesizer::new());
        let pipeline = pipeline(Arc::new(UnavailableClassifier), synth.clone(), dir.path());

        let err = pipeline.run("Hello there.").await.expect_err("classifier down");

        assert!(matches!(err, PipelineError::CollaboratorUnavailable { .. }));
        assert_eq!(err.stage(), PipelineStage::TimelineBuilt);
        assert!(err.to_string().contains("model not loaded"));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn synthesis_failure_is_retried_then_surfaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let synth = Arc::new(BusySynthesizer {
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline(Arc::new(CountingClassifier::new()), synth.clone(), dir.path());

        let err = pipeline.run("Hello there.").await.expect_err("synth busy");

        assert_eq!(err.stage(), PipelineStage::RawSynthesized);
        assert!(err.to_string().contains("503"));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn failed_sentence_waits_for_siblings_before_cleanup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let synth = Arc::new(PartlyBrokenSynthesizer {
            finished: AtomicUsize::new(0),
        });
        let pipeline = pipeline(Arc::new(CountingClassifier::new()), synth.clone(), dir.path());

        let err = pipeline
            .run("Broken sentence here. The next one is slow. So is this one.")
            .await
            .expect_err("first sentence rejected");

        assert_eq!(err.stage(), PipelineStage::RawSynthesized);
        assert_eq!(synth.finished.load(Ordering::SeqCst), 2);
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn empty_segmentation_yields_empty_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let synth = Arc::new(LevelSynthesizer::new());
        let pipeline = Pipeline::new(
            Arc::new(NoSentences),
            Arc::new(CountingClassifier::new()),
            synth.clone(),
            config(dir.path()),
        );

        let artifact = pipeline.run("...").await.expect("run succeeds");

        assert!(artifact.sentences.is_empty());
        assert_eq!(artifact.duration_ms, 0);
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
        let written = AudioClip::read_wav(&artifact.output_path).expect("artifact readable");
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn unwritable_output_dir_is_an_artifact_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").expect("write file");
        let classifier = Arc::new(CountingClassifier::new());
        let pipeline = pipeline(classifier.clone(), Arc::new(LevelSynthesizer::new()), &blocker);

        let err = pipeline.run("Hello there.").await.expect_err("output dir is a file");

        assert!(matches!(err, PipelineError::ArtifactWrite { .. }));
        assert_eq!(err.stage(), PipelineStage::Start);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn runs_get_distinct_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pipeline = pipeline(
            Arc::new(CountingClassifier::new()),
            Arc::new(LevelSynthesizer::new()),
            dir.path(),
        );

        let (a, b) = tokio::join!(pipeline.run("Hello there."), pipeline.run("Goodbye now."));
        let (a, b) = (a.expect("first"), b.expect("second"));

        assert_ne!(a.output_path, b.output_path);
        assert_eq!(entries(dir.path()).len(), 2);
    }

    #[test]
    fn config_follows_app_settings() {
        let app = AppConfig::default();
        let config = PipelineConfig::from_app(&app);
        assert_eq!(config.output_dir, PathBuf::from("static/audio"));
        assert_eq!(config.gap_ms, 300);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(PipelineStage::TimelineBuilt.to_string(), "timeline_built");
        assert_eq!(
            serde_json::to_string(&PipelineStage::ParametersDerived).expect("json"),
            "\"parameters_derived\""
        );
    }
}
