//! Background model training command.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use voxid_gmm::{train_ubm, write_gmm};
use voxid_spkdet::Extractor;

use super::{load_config, print_verbose, read_audio};
use crate::Cli;

/// Train a universal background model from pooled audio.
///
/// Feed it speech from as many different speakers as possible; every
/// enrolled speaker model is adapted from this one.
#[derive(Args)]
pub struct TrainUbmCommand {
    /// Audio files (WAV or raw 16-bit little-endian mono PCM)
    #[arg(required = true)]
    audio: Vec<PathBuf>,

    /// Where to write the trained model
    #[arg(short = 'o', long)]
    output: PathBuf,
}

impl TrainUbmCommand {
    pub fn run(&self, cli: &Cli) -> Result<()> {
        let cfg = load_config(cli)?;
        let extractor = Extractor::new(&cfg.mfcc)?;

        let mut frames = Vec::new();
        for path in &self.audio {
            let samples = read_audio(path, cfg.mfcc.sample_rate)?;
            let before = frames.len();
            frames.extend(extractor.frames(&samples));
            print_verbose(
                cli,
                &format!("{}: {} frames", path.display(), frames.len() - before),
            );
        }
        print_verbose(
            cli,
            &format!(
                "training {} components on {} frames",
                cfg.num_components,
                frames.len()
            ),
        );

        let ubm = train_ubm(&frames, &cfg.train_config())?;
        let mut file = fs::File::create(&self.output)
            .with_context(|| format!("creating {}", self.output.display()))?;
        write_gmm(&ubm, &mut file)?;

        if cli.json {
            let summary = serde_json::json!({
                "output": self.output.display().to_string(),
                "components": ubm.num_components(),
                "dim": ubm.dim(),
                "frames": frames.len(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "background model ({} components x {} dims, {} frames) written to {}",
                ubm.num_components(),
                ubm.dim(),
                frames.len(),
                self.output.display()
            );
        }
        Ok(())
    }
}
