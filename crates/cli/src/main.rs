#![deny(warnings)]

mod server;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use empathy_engine_core::audio::DEFAULT_GAP_MS;
use empathy_engine_core::config::{
    resolve_api_key, resolve_endpoint, resolve_optional_string, resolve_string_with_default,
    AppConfig, ClassifierBackend, Concurrency, ConfigError, Env, RetryAttempts, StdEnv,
    SynthesizerBackend, DEFAULT_MAX_CONCURRENCY, DEFAULT_OUTPUT_DIR, DEFAULT_PIPER_BINARY,
    DEFAULT_RETRY_ATTEMPTS, ENV_API_TOKEN, ENV_CLASSIFIER_URL, ENV_OUTPUT_DIR, ENV_PIPER_BINARY,
    ENV_PIPER_MODEL, ENV_TTS_URL,
};
use empathy_engine_core::emotion::{EmotionClassifier, HttpEmotionClassifier, KeywordEmotionClassifier};
use empathy_engine_core::pipeline::{Pipeline, PipelineConfig};
use empathy_engine_core::segment::UnicodeSentenceSegmenter;
use empathy_engine_core::tts::{HttpSynthesizer, PiperSynthesizer, SpeechSynthesizer, ToneSynthesizer};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "empathy-engine")]
#[command(about = "Emotion-aware speech synthesis (classify -> derive prosody -> modulate)")]
struct Args {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Settings {
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Where artifacts are written [env: EMPATHY_OUTPUT_DIR] [default: static/audio]
    #[arg(long, global = true)]
    output_dir: Option<String>,

    #[arg(long, global = true, default_value_t = DEFAULT_GAP_MS)]
    gap_ms: u32,

    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    max_concurrency: usize,

    #[arg(long, global = true, default_value_t = DEFAULT_RETRY_ATTEMPTS)]
    retry_attempts: u32,

    #[arg(long, global = true, value_enum, default_value_t = SynthesizerKind::Tone)]
    synthesizer: SynthesizerKind,

    /// Speech endpoint for `--synthesizer http` [env: EMPATHY_TTS_URL]
    #[arg(long, global = true)]
    tts_url: Option<String>,

    #[arg(long, global = true)]
    voice: Option<String>,

    /// [env: PIPER_BINARY] [default: piper]
    #[arg(long, global = true)]
    piper_binary: Option<String>,

    /// [env: PIPER_MODEL]
    #[arg(long, global = true)]
    piper_model: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = ClassifierKind::Keyword)]
    classifier: ClassifierKind,

    /// Classification endpoint for `--classifier http` [env: EMPATHY_CLASSIFIER_URL]
    #[arg(long, global = true)]
    classifier_url: Option<String>,

    /// Bearer token for the HTTP backends [env: EMPATHY_API_TOKEN]
    #[arg(long, global = true)]
    api_token: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SynthesizerKind {
    Tone,
    Piper,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ClassifierKind {
    Keyword,
    Http,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize text and print the run report as JSON
    Speak(TextInput),
    /// Print the emotion timeline and derived voice parameters as JSON
    Analyze(TextInput),
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
}

#[derive(clap::Args, Debug)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .multiple(false)
        .args(["text", "file"])
))]
struct TextInput {
    #[arg(long)]
    text: Option<String>,

    #[arg(long)]
    file: Option<PathBuf>,
}

impl TextInput {
    async fn read(self) -> anyhow::Result<String> {
        match (self.text, self.file) {
            (Some(text), None) => Ok(text),
            (None, Some(path)) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display())),
            _ => anyhow::bail!("exactly one of --text or --file must be provided"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.settings.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args.settings, &env)?;

    tracing::info!(
        output_dir = %cfg.output_dir.display(),
        synthesizer = ?args.settings.synthesizer,
        classifier = ?args.settings.classifier,
        max_concurrency = cfg.max_concurrency.get(),
        "config loaded"
    );

    let pipeline = build_pipeline(&cfg);

    match args.command {
        Command::Speak(input) => {
            let text = input.read().await?;
            let artifact = pipeline.run(&text).await.context("speech generation failed")?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
        }
        Command::Analyze(input) => {
            let text = input.read().await?;
            let analysis = pipeline.analyze(&text).await.context("analysis failed")?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Command::Serve { bind } => server::serve(pipeline, bind).await?,
    }

    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(settings: &Settings, env: &impl Env) -> anyhow::Result<AppConfig> {
    let output_dir = resolve_string_with_default(
        settings.output_dir.clone(),
        ENV_OUTPUT_DIR,
        env,
        DEFAULT_OUTPUT_DIR,
    );

    let synthesizer = match settings.synthesizer {
        SynthesizerKind::Tone => SynthesizerBackend::Tone,
        SynthesizerKind::Piper => SynthesizerBackend::Piper {
            binary: PathBuf::from(resolve_string_with_default(
                settings.piper_binary.clone(),
                ENV_PIPER_BINARY,
                env,
                DEFAULT_PIPER_BINARY,
            )),
            model: resolve_optional_string(settings.piper_model.clone(), ENV_PIPER_MODEL, env)
                .map(PathBuf::from)
                .ok_or(ConfigError::Missing(ENV_PIPER_MODEL))?,
        },
        SynthesizerKind::Http => SynthesizerBackend::Http {
            endpoint: resolve_endpoint(settings.tts_url.clone(), ENV_TTS_URL, env)?,
            voice: settings.voice.clone(),
        },
    };

    let classifier = match settings.classifier {
        ClassifierKind::Keyword => ClassifierBackend::Keyword,
        ClassifierKind::Http => ClassifierBackend::Http {
            endpoint: resolve_endpoint(settings.classifier_url.clone(), ENV_CLASSIFIER_URL, env)?,
        },
    };

    Ok(AppConfig {
        output_dir: PathBuf::from(output_dir),
        gap_ms: settings.gap_ms,
        max_concurrency: Concurrency::new(settings.max_concurrency)?,
        retry_attempts: RetryAttempts::new(settings.retry_attempts)?,
        synthesizer,
        classifier,
        api_token: resolve_api_key(settings.api_token.clone(), ENV_API_TOKEN, env)?,
    })
}

/// Builds the collaborators once; the returned pipeline is shared by every run.
fn build_pipeline(cfg: &AppConfig) -> Pipeline {
    let classifier: Arc<dyn EmotionClassifier> = match &cfg.classifier {
        ClassifierBackend::Keyword => Arc::new(KeywordEmotionClassifier::new()),
        ClassifierBackend::Http { endpoint } => {
            let mut classifier = HttpEmotionClassifier::new(endpoint.clone());
            if let Some(token) = &cfg.api_token {
                classifier = classifier.with_token(token.clone());
            }
            Arc::new(classifier)
        }
    };

    let synthesizer: Arc<dyn SpeechSynthesizer> = match &cfg.synthesizer {
        SynthesizerBackend::Tone => Arc::new(ToneSynthesizer::new()),
        SynthesizerBackend::Piper { binary, model } => {
            Arc::new(PiperSynthesizer::new(binary.clone(), model.clone()))
        }
        SynthesizerBackend::Http { endpoint, voice } => {
            let mut synthesizer = HttpSynthesizer::new(endpoint.clone());
            if let Some(voice) = voice {
                synthesizer = synthesizer.with_voice(voice.clone());
            }
            if let Some(token) = &cfg.api_token {
                synthesizer = synthesizer.with_token(token.clone());
            }
            Arc::new(synthesizer)
        }
    };

    Pipeline::new(
        Arc::new(UnicodeSentenceSegmenter::new()),
        classifier,
        synthesizer,
        PipelineConfig::from_app(cfg),
    )
}
