use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fall_monitor::analysis::features::{column_names, FeatureExtractor};
use fall_monitor::audio::{AudioNormalizer, WavDecoder};
use fall_monitor::transcription::{NullTranscriber, StaticTranscriber, Transcriber};
use fall_monitor::{AudioClip, MonitorConfig, MonitorContext, Sensitivity};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fall_monitor_cli",
    about = "Offline fall and distress analysis for recorded clips"
)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full detection pipeline on a WAV file and print the result
    Analyze {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "cli")]
        subject: String,
        /// Start a monitoring session at this sensitivity before analysis
        #[arg(long)]
        sensitivity: Option<String>,
        /// Directory holding model artifacts
        #[arg(long)]
        model_dir: Option<PathBuf>,
        #[arg(long)]
        model_type: Option<String>,
        /// Known transcript for the clip
        #[arg(long)]
        transcript: Option<String>,
    },
    /// Print the feature vector of a WAV file
    Features {
        #[arg(long)]
        file: PathBuf,
    },
    /// Run the lexical keyword test on a piece of text
    Keywords {
        #[arg(long)]
        text: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = cli
        .config
        .as_deref()
        .map(MonitorConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Analyze {
            file,
            subject,
            sensitivity,
            model_dir,
            model_type,
            transcript,
        } => {
            if let Some(dir) = model_dir {
                config.model.artifact_dir = Some(dir);
            }
            if let Some(model_type) = model_type {
                config.model.model_type = model_type;
            }
            run_analyze(config, &file, &subject, sensitivity.as_deref(), transcript)
        }
        Commands::Features { file } => run_features(config, &file),
        Commands::Keywords { text } => run_keywords(config, &text),
    }
}

fn run_analyze(
    config: MonitorConfig,
    file: &Path,
    subject: &str,
    sensitivity: Option<&str>,
    transcript: Option<String>,
) -> Result<ExitCode> {
    let bytes = read_clip(file)?;
    let transcriber: Arc<dyn Transcriber> = match transcript {
        Some(text) => Arc::new(StaticTranscriber::new(text)),
        None => Arc::new(NullTranscriber),
    };
    let context = MonitorContext::with_collaborators(config, transcriber, Arc::new(WavDecoder));

    if let Some(sensitivity) = sensitivity {
        let sensitivity: Sensitivity = sensitivity
            .parse()
            .with_context(|| format!("parsing sensitivity {sensitivity:?}"))?;
        context
            .start_monitoring(subject, sensitivity)
            .with_context(|| format!("starting session for {subject}"))?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(context.process_clip(subject, bytes));

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::from(if result.fall_detected { 2 } else { 0 }))
}

fn run_features(config: MonitorConfig, file: &Path) -> Result<ExitCode> {
    let bytes = read_clip(file)?;
    let normalizer = AudioNormalizer::new(config.audio);
    let normalized = normalizer.normalize(&AudioClip::new(bytes));
    let features = FeatureExtractor::new(normalized.sample_rate)
        .try_analyze(&normalized.samples)
        .with_context(|| format!("extracting features from {}", file.display()))?;

    let columns: serde_json::Map<String, serde_json::Value> = column_names()
        .into_iter()
        .zip(features.vector.to_columns())
        .map(|(name, value)| (name, serde_json::Value::from(value)))
        .collect();

    let report = FeatureReport {
        file: file.display().to_string(),
        sample_rate: normalized.sample_rate,
        duration_secs: normalized.duration_secs(),
        decode_path: normalized.decode_path,
        features: columns,
        characteristics: features.characteristics,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_keywords(config: MonitorConfig, text: &str) -> Result<ExitCode> {
    let context = MonitorContext::new(config);
    let report = context
        .test_keyword_detection(text)
        .context("running keyword detection")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn read_clip(file: &Path) -> Result<Vec<u8>> {
    std::fs::read(file).with_context(|| format!("reading {}", file.display()))
}

#[derive(Serialize)]
struct FeatureReport {
    file: String,
    sample_rate: u32,
    duration_secs: f32,
    decode_path: fall_monitor::audio::DecodePath,
    features: serde_json::Map<String, serde_json::Value>,
    characteristics: fall_monitor::analysis::features::AudioCharacteristics,
}
