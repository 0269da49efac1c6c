//! spkdet - GMM-UBM speaker verification and identification tool.

use clap::{Parser, Subcommand};

mod commands;

use commands::{
    AdaptCommand, EnrollCommand, IdentifyCommand, SpeakersCommand, TrainUbmCommand,
    VerifyCommand,
};

/// GMM-UBM speaker verification and identification tool.
///
/// Workflow:
///   1. train-ubm: build a universal background model from pooled audio
///   2. enroll:    adapt the background model into per-speaker models
///   3. verify:    test an utterance against one claimed speaker
///   4. identify:  find the best-matching enrolled speaker
///
/// Audio files are WAV (16-bit or float, matching the configured sample
/// rate) or raw 16-bit little-endian mono PCM. Speaker models live as
/// <id>.gmm files in a models directory.
#[derive(Parser)]
#[command(name = "spkdet")]
#[command(about = "GMM-UBM speaker verification and identification tool")]
#[command(version)]
pub struct Cli {
    /// Pipeline config file (YAML); built-in defaults when omitted
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a universal background model from audio files
    TrainUbm(TrainUbmCommand),
    /// Enroll a speaker from audio files
    Enroll(EnrollCommand),
    /// Re-adapt an enrolled speaker on further audio
    Adapt(AdaptCommand),
    /// Verify an utterance against a claimed speaker
    Verify(VerifyCommand),
    /// Identify the best-matching enrolled speaker
    Identify(IdentifyCommand),
    /// List enrolled speakers
    Speakers(SpeakersCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .init();
    }

    match &cli.command {
        Commands::TrainUbm(cmd) => cmd.run(&cli),
        Commands::Enroll(cmd) => cmd.run(&cli),
        Commands::Adapt(cmd) => cmd.run(&cli),
        Commands::Verify(cmd) => cmd.run(&cli),
        Commands::Identify(cmd) => cmd.run(&cli),
        Commands::Speakers(cmd) => cmd.run(&cli),
    }
}
