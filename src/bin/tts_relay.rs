//! tts-relay: 长文本语音合成命令行工具
//!
//! Usage:
//!   tts-relay run --text-file script.txt        Generate every segment, then assemble
//!   tts-relay generate --text-file script.txt   Generate segment artifacts only
//!   tts-relay assemble --basename narasi        Stitch existing artifacts together
//!   tts-relay split --text-file script.txt      Show the segments without calling the API

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use tts_relay::audio::{AudioAssembler, OutputEncoder, SegmentWriter};
use tts_relay::credentials::CredentialPool;
use tts_relay::resilience::{RequestExecutor, TokioSleeper};
use tts_relay::speech::GeminiTtsClient;
use tts_relay::{Orchestrator, RunConfig};

/// Long-form text-to-speech with key rotation and ordered assembly
#[derive(Parser, Debug)]
#[command(name = "tts-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML run configuration
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate all segments, then assemble the final output
    Run,
    /// Generate segment artifacts only
    Generate,
    /// Assemble previously generated artifacts
    Assemble,
    /// Print the segments that would be requested
    Split,
}

#[derive(Args, Debug, Default)]
struct Overrides {
    /// Inline script text
    #[arg(long, global = true)]
    text: Option<String>,
    /// Read the script from a file
    #[arg(long, value_name = "FILE", global = true)]
    text_file: Option<PathBuf>,
    /// Prebuilt voice name
    #[arg(long, global = true)]
    voice: Option<String>,
    #[arg(long, global = true)]
    temperature: Option<f32>,
    #[arg(long, global = true)]
    model: Option<String>,
    /// Artifact base name ({basename}_{index:02}.wav)
    #[arg(long, global = true)]
    basename: Option<String>,
    #[arg(long, value_name = "DIR", global = true)]
    output_dir: Option<PathBuf>,
    /// Maximum characters per segment
    #[arg(long, global = true)]
    max_chars: Option<usize>,
    /// Group this many lines per segment instead of bounding by characters
    #[arg(long, global = true)]
    paragraphs_per_chunk: Option<usize>,
    /// Backoff retries per key for transient failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
    /// Base backoff delay in seconds
    #[arg(long, global = true)]
    base_delay: Option<f64>,
    /// Backoff ceiling in seconds
    #[arg(long, global = true)]
    max_delay: Option<f64>,
    /// Pause between segment requests, in milliseconds
    #[arg(long, global = true)]
    pause_ms: Option<u64>,
    /// Final output file (.wav in-process, anything else through ffmpeg)
    #[arg(short = 'o', long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,
    /// Keep segment artifacts after assembly
    #[arg(long, global = true)]
    keep_intermediates: bool,
    /// Line-delimited API key file
    #[arg(long, value_name = "FILE", global = true)]
    credentials: Option<PathBuf>,
    #[arg(long, value_name = "PATH", global = true)]
    ffmpeg: Option<PathBuf>,
    #[arg(long, value_name = "URL", global = true)]
    api_base_url: Option<String>,
    /// Per-request HTTP timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

impl Overrides {
    fn apply(self, cfg: &mut RunConfig) {
        if let Some(v) = self.text {
            cfg.text = Some(v);
        }
        if let Some(v) = self.text_file {
            cfg.text_file = Some(v);
        }
        if let Some(v) = self.voice {
            cfg.voice = v;
        }
        if let Some(v) = self.temperature {
            cfg.temperature = v;
        }
        if let Some(v) = self.model {
            cfg.model = v;
        }
        if let Some(v) = self.basename {
            cfg.basename = v;
        }
        if let Some(v) = self.output_dir {
            cfg.output_dir = v;
        }
        if let Some(v) = self.max_chars {
            cfg.max_chars = v;
        }
        if let Some(v) = self.paragraphs_per_chunk {
            cfg.paragraphs_per_chunk = Some(v);
        }
        if let Some(v) = self.max_retries {
            cfg.max_retries = v;
        }
        if let Some(v) = self.base_delay {
            cfg.base_delay_secs = v;
            cfg.max_delay_secs = cfg.max_delay_secs.max(v);
        }
        if let Some(v) = self.max_delay {
            cfg.max_delay_secs = v;
        }
        if let Some(v) = self.pause_ms {
            cfg.request_pause_ms = v;
        }
        if let Some(v) = self.output {
            cfg.output = v;
        }
        if self.keep_intermediates {
            cfg.delete_intermediates = false;
        }
        if let Some(v) = self.credentials {
            cfg.credentials_file = v;
        }
        if let Some(v) = self.ffmpeg {
            cfg.ffmpeg_path = v;
        }
        if let Some(v) = self.api_base_url {
            cfg.api_base_url = Some(v);
        }
        if let Some(v) = self.timeout_secs {
            cfg.timeout_secs = v;
        }
    }
}

fn load_config(cli_config: Option<PathBuf>, overrides: Overrides) -> anyhow::Result<RunConfig> {
    let mut cfg = match cli_config {
        Some(path) => RunConfig::from_yaml_file(&path)?,
        None => RunConfig::default(),
    };
    cfg.apply_env()?;
    overrides.apply(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

async fn generate(cfg: &RunConfig) -> anyhow::Result<()> {
    let text = cfg.load_text()?;
    let pool = CredentialPool::from_file(&cfg.credentials_file)
        .context("no credentials available; nothing can be requested")?;

    let mut client = GeminiTtsClient::builder()
        .model(cfg.model.clone())
        .timeout(cfg.timeout());
    if let Some(url) = &cfg.api_base_url {
        client = client.base_url(url.clone());
    }

    let sleeper = Arc::new(TokioSleeper);
    let executor = RequestExecutor::new(
        pool,
        Arc::new(client.build()?),
        cfg.retry_policy(),
        sleeper.clone(),
    );
    let mut orchestrator = Orchestrator::new(
        cfg.segmenter()?,
        executor,
        SegmentWriter::new(&cfg.output_dir),
        sleeper,
    )
    .with_pause(cfg.request_pause());

    let summary = orchestrator
        .run(&text, &cfg.voice_parameters(), &cfg.basename)
        .await?;
    info!(run_id = %summary.run_id, artifacts = summary.artifacts.len(), "generation finished");
    Ok(())
}

fn assemble(cfg: &RunConfig) -> anyhow::Result<()> {
    let report = AudioAssembler::new(&cfg.output_dir)
        .with_encoder(OutputEncoder::new(&cfg.ffmpeg_path))
        .assemble(&cfg.basename, &cfg.output, cfg.delete_intermediates)?;
    println!(
        "{} ({} segments, {:.1}s)",
        report.output.display(),
        report.sources.len(),
        report.duration().as_secs_f64()
    );
    Ok(())
}

fn split(cfg: &RunConfig) -> anyhow::Result<()> {
    let text = cfg.load_text()?;
    let segments = cfg.segmenter()?.segment(&text);
    for (i, segment) in segments.iter().enumerate() {
        println!("--- segment {:02} ({} chars) ---", i + 1, segment.chars().count());
        println!("{segment}");
    }
    println!("{} segment(s)", segments.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config, cli.overrides)?;

    match cli.command {
        Commands::Run => {
            generate(&cfg).await?;
            assemble(&cfg)?;
        }
        Commands::Generate => generate(&cfg).await?,
        Commands::Assemble => assemble(&cfg)?,
        Commands::Split => split(&cfg)?,
    }
    Ok(())
}
