//! Shared helpers for CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use voxid_spkdet::{ScoreResult, SpkDetConfig, SpkDetSystem};

use crate::Cli;

/// Loads the pipeline configuration named by `--config`, or the defaults.
pub fn load_config(cli: &Cli) -> Result<SpkDetConfig> {
    match &cli.config {
        Some(path) => {
            SpkDetConfig::load(path).with_context(|| format!("loading config {path}"))
        }
        None => Ok(SpkDetConfig::default()),
    }
}

/// Builds a session with the background model at `ubm` loaded.
pub fn open_session(cli: &Cli, ubm: &Path) -> Result<SpkDetSystem> {
    let cfg = load_config(cli)?;
    let mut sys = SpkDetSystem::new(cfg)?;
    let file =
        fs::File::open(ubm).with_context(|| format!("opening {}", ubm.display()))?;
    sys.load_background_model(file)?;
    Ok(sys)
}

/// Reads an audio file into mono samples at the configured rate.
///
/// WAV input is decoded with its header checked against `sample_rate`;
/// multi-channel audio is downmixed by averaging. Any other extension is
/// treated as raw 16-bit little-endian mono PCM.
pub fn read_audio(path: &Path, sample_rate: u32) -> Result<Vec<i16>> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    if !is_wav {
        let bytes =
            fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        if bytes.len() % 2 != 0 {
            bail!(
                "{}: not a whole number of 16-bit samples",
                path.display()
            );
        }
        return Ok(bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect());
    }

    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    if spec.sample_rate != sample_rate {
        bail!(
            "{}: sample rate {} does not match configured {}",
            path.display(),
            spec.sample_rate,
            sample_rate
        );
    }
    let samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => {
            if spec.bits_per_sample != 16 {
                bail!(
                    "{}: {}-bit integer WAV is not supported, want 16",
                    path.display(),
                    spec.bits_per_sample
                );
            }
            reader
                .samples::<i16>()
                .collect::<Result<_, _>>()
                .with_context(|| format!("decoding {}", path.display()))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16))
            .collect::<Result<_, _>>()
            .with_context(|| format!("decoding {}", path.display()))?,
    };
    if spec.channels > 1 {
        let ch = spec.channels as usize;
        return Ok(samples
            .chunks_exact(ch)
            .map(|frame| {
                (frame.iter().map(|&s| s as i32).sum::<i32>() / ch as i32) as i16
            })
            .collect());
    }
    Ok(samples)
}

/// Feeds audio files into the session, returning the frames buffered.
pub fn add_audio_files(sys: &mut SpkDetSystem, files: &[PathBuf]) -> Result<usize> {
    let rate = sys.config().mfcc.sample_rate;
    let mut frames = 0;
    for path in files {
        let samples = read_audio(path, rate)?;
        frames += sys.add_audio_samples(&samples);
    }
    if frames == 0 {
        bail!("no full analysis windows in the input audio");
    }
    Ok(frames)
}

/// Path of the model file for `id` inside `dir`.
pub fn model_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.gmm"))
}

/// Model files in `dir` with their speaker ids, in name order.
pub fn list_models(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut models = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("gmm") {
            continue;
        }
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("bad model file name: {}", path.display()))?
            .to_string();
        models.push((id, path));
    }
    models.sort();
    Ok(models)
}

/// Loads every model in `dir` into the session, returning how many.
pub fn load_speakers(sys: &mut SpkDetSystem, dir: &Path) -> Result<usize> {
    let models = list_models(dir)?;
    for (id, path) in &models {
        let file = fs::File::open(path)?;
        sys.load_speaker_model(id, file)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    Ok(models.len())
}

/// Loads only the model for `id` into the session.
pub fn load_speaker(sys: &mut SpkDetSystem, dir: &Path, id: &str) -> Result<()> {
    let path = model_path(dir, id);
    let file = fs::File::open(&path).with_context(|| {
        format!("speaker '{}' has no model at {}", id, path.display())
    })?;
    sys.load_speaker_model(id, file)
        .with_context(|| format!("loading {}", path.display()))
}

pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("{msg}");
    }
}

/// Prints a trial outcome, as JSON when `--json` is set.
pub fn output_score(cli: &Cli, result: &ScoreResult) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        let verdict = if result.matched { "ACCEPT" } else { "REJECT" };
        println!(
            "{}  score {:+.4}  {}",
            result.speaker_id, result.score, verdict
        );
    }
    Ok(())
}
