use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parley_gateway::api::{ApiServer, ApiState};
use parley_gateway::providers::{AssemblyAiTranscriber, GeminiGenerator, MurfSynthesizer};
use parley_gateway::{ChatOrchestrator, Config, SessionStore, Transcriber};

/// Parley - Voice chat gateway for conversational assistants
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Port to listen on (overrides `PARLEY_PORT`/`PORT`)
    #[arg(long)]
    port: Option<u16>,

    /// Directory of static web UI files
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize text with the configured voice and print the audio URL
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Transcribe an audio file and print the text
    Transcribe {
        /// Path to the audio file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley_gateway=info",
        1 => "info,parley_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_from(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.api_server.port = port;
    }
    if cli.static_dir.is_some() {
        config.api_server.static_dir = cli.static_dir;
    }
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::Transcribe { file } => transcribe(&config, &file).await,
        };
    }

    config.require_keys()?;

    let orchestrator = build_orchestrator(&config)?;
    let state = Arc::new(ApiState::new(
        Arc::new(orchestrator),
        config.api_server.api_key.clone(),
    ));

    if state.api_key.is_none() {
        tracing::warn!("PARLEY_API_KEY not set, session administration routes are open");
    }

    tracing::info!(
        port = config.api_server.port,
        voice_id = %config.providers.voice_id,
        "starting parley gateway"
    );

    ApiServer::new(state, config.api_server.port)
        .static_dir(config.api_server.static_dir.clone())
        .run()
        .await?;

    Ok(())
}

/// Wire the three providers into a chat orchestrator
fn build_orchestrator(config: &Config) -> anyhow::Result<ChatOrchestrator> {
    let transcriber = assemblyai(config)?;
    let generator = GeminiGenerator::new(
        config.api_keys.gemini.clone().unwrap_or_default(),
        config.providers.gemini_model.clone(),
        config.timeouts.llm,
    )?;
    let synthesizer = murf(config)?;

    Ok(ChatOrchestrator::new(
        Arc::new(SessionStore::new()),
        Arc::new(transcriber),
        Arc::new(generator),
        Arc::new(synthesizer),
    )
    .with_settings(config.chat_settings()))
}

fn assemblyai(config: &Config) -> anyhow::Result<AssemblyAiTranscriber> {
    AssemblyAiTranscriber::new(
        config.api_keys.assemblyai.clone().unwrap_or_default(),
        config.timeouts.stt,
    )
    .context("failed to create AssemblyAI transcriber")
}

fn murf(config: &Config) -> anyhow::Result<MurfSynthesizer> {
    MurfSynthesizer::new(
        config.api_keys.murf.clone().unwrap_or_default(),
        config.providers.murf_api_url.clone(),
        config.timeouts.tts,
    )
    .context("failed to create Murf synthesizer")
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    use parley_gateway::SpeechSynthesizer;

    let synthesizer = murf(config)?;
    println!("Synthesizing with voice {}: \"{text}\"", config.providers.voice_id);

    let url = synthesizer.synthesize(text, &config.providers.voice_id).await?;
    println!("Audio URL: {url}");

    Ok(())
}

/// Transcribe a local audio file
async fn transcribe(config: &Config, file: &Path) -> anyhow::Result<()> {
    let transcriber = assemblyai(config)?;
    let audio = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    println!("Transcribing {} ({} bytes)...", file.display(), audio.len());

    let transcription = transcriber.transcribe(&audio).await?;
    println!("{}", transcription.text);
    if let Some(confidence) = transcription.confidence {
        println!("(confidence: {confidence:.2})");
    }

    Ok(())
}
