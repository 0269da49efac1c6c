//! Verification and identification commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{add_audio_files, load_speaker, load_speakers, open_session, output_score, print_verbose};
use crate::Cli;

/// Verify an utterance against one claimed speaker.
#[derive(Args)]
pub struct VerifyCommand {
    /// Claimed speaker id
    id: String,

    /// Audio files (WAV or raw 16-bit little-endian mono PCM)
    #[arg(required = true)]
    audio: Vec<PathBuf>,

    /// Background model file
    #[arg(long)]
    ubm: PathBuf,

    /// Speaker model directory
    #[arg(long)]
    models: PathBuf,
}

impl VerifyCommand {
    pub fn run(&self, cli: &Cli) -> Result<()> {
        let mut sys = open_session(cli, &self.ubm)?;
        load_speaker(&mut sys, &self.models, &self.id)?;
        let frames = add_audio_files(&mut sys, &self.audio)?;
        print_verbose(cli, &format!("scoring {frames} frames"));

        let result = sys.verify_speaker(&self.id)?;
        output_score(cli, &result)
    }
}

/// Score an utterance against every enrolled speaker.
#[derive(Args)]
pub struct IdentifyCommand {
    /// Audio files (WAV or raw 16-bit little-endian mono PCM)
    #[arg(required = true)]
    audio: Vec<PathBuf>,

    /// Background model file
    #[arg(long)]
    ubm: PathBuf,

    /// Speaker model directory
    #[arg(long)]
    models: PathBuf,
}

impl IdentifyCommand {
    pub fn run(&self, cli: &Cli) -> Result<()> {
        let mut sys = open_session(cli, &self.ubm)?;
        let loaded = load_speakers(&mut sys, &self.models)?;
        print_verbose(cli, &format!("loaded {loaded} speaker model(s)"));
        let frames = add_audio_files(&mut sys, &self.audio)?;
        print_verbose(cli, &format!("scoring {frames} frames"));

        let result = sys.identify_speaker()?;
        output_score(cli, &result)
    }
}
