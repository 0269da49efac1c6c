//! Speaker enrollment and management commands.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{
    add_audio_files, list_models, load_speaker, model_path, open_session, print_verbose,
};
use crate::Cli;

/// Enroll a speaker: adapt the background model on their audio.
#[derive(Args)]
pub struct EnrollCommand {
    /// Speaker id; the model is saved as <id>.gmm
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

impl EnrollCommand {
    pub fn run(&self, cli: &Cli) -> Result<()> {
        let mut sys = open_session(cli, &self.ubm)?;
        let frames = add_audio_files(&mut sys, &self.audio)?;
        print_verbose(cli, &format!("enrolling on {frames} frames"));

        sys.create_speaker_model(&self.id)?;
        fs::create_dir_all(&self.models)
            .with_context(|| format!("creating {}", self.models.display()))?;
        let path = model_path(&self.models, &self.id);
        sys.save_speaker_model(&self.id, &path)?;

        if cli.json {
            let summary = serde_json::json!({
                "speaker": self.id,
                "frames": frames,
                "model": path.display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("speaker '{}' enrolled -> {}", self.id, path.display());
        }
        Ok(())
    }
}

/// Refine an existing speaker model with further audio.
#[derive(Args)]
pub struct AdaptCommand {
    /// Speaker id of an enrolled speaker
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

impl AdaptCommand {
    pub fn run(&self, cli: &Cli) -> Result<()> {
        let mut sys = open_session(cli, &self.ubm)?;
        load_speaker(&mut sys, &self.models, &self.id)?;
        let frames = add_audio_files(&mut sys, &self.audio)?;
        print_verbose(cli, &format!("adapting on {frames} frames"));

        sys.adapt_speaker_model(&self.id)?;
        let path = model_path(&self.models, &self.id);
        sys.save_speaker_model(&self.id, &path)?;

        if cli.json {
            let summary = serde_json::json!({
                "speaker": self.id,
                "frames": frames,
                "model": path.display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("speaker '{}' adapted -> {}", self.id, path.display());
        }
        Ok(())
    }
}

/// List enrolled speakers.
#[derive(Args)]
pub struct SpeakersCommand {
    /// Speaker model directory
    #[arg(long)]
    models: PathBuf,
}

impl SpeakersCommand {
    pub fn run(&self, cli: &Cli) -> Result<()> {
        let models = list_models(&self.models)?;
        if cli.json {
            let ids: Vec<&str> = models.iter().map(|(id, _)| id.as_str()).collect();
            let summary = serde_json::json!({ "speakers": ids });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
        if models.is_empty() {
            println!("no speakers enrolled");
            return Ok(());
        }
        for (id, path) in &models {
            println!("{}  {}", id, path.display());
        }
        println!("{} speaker(s)", models.len());
        Ok(())
    }
}
