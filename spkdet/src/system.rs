//! Session facade tying together the front-end, the background model,
//! and the speaker registry.
//!
//! A session buffers features from incoming audio, enrolls speakers by
//! MAP-adapting the background model on the buffer, and scores the same
//! buffer against any number of enrolled models without re-extraction.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use voxid_gmm::{average_llr, map_adapt, read_gmm, Gmm};

use crate::buffer::FeatureBuffer;
use crate::config::SpkDetConfig;
use crate::error::SpkDetError;
use crate::mfcc::Extractor;
use crate::store::ModelStore;

/// Declared layout of incoming PCM bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Outcome of a verification or identification trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub speaker_id: String,
    /// Average per-frame log-likelihood ratio against the background model.
    pub score: f64,
    /// Whether `score` exceeded the decision threshold.
    pub matched: bool,
}

/// A speaker detection session.
///
/// The configuration is snapshotted at construction. Audio pushed through
/// any of the `add_audio_*` methods lands in one feature buffer, which
/// enrollment and scoring read; `reset_features` starts the next trial.
pub struct SpkDetSystem {
    cfg: SpkDetConfig,
    extractor: Extractor,
    ubm: Option<Arc<Gmm>>,
    store: ModelStore,
    features: FeatureBuffer,
    audio_samples: u64,
}

impl SpkDetSystem {
    pub fn new(cfg: SpkDetConfig) -> Result<Self, SpkDetError> {
        cfg.validate()?;
        let extractor = Extractor::new(&cfg.mfcc)?;
        let features = FeatureBuffer::new(cfg.mfcc.feature_dim());
        Ok(Self {
            cfg,
            extractor,
            ubm: None,
            store: ModelStore::new(),
            features,
            audio_samples: 0,
        })
    }

    /// Shape every model in this session must have.
    fn expected_shape(&self) -> (usize, usize) {
        (self.cfg.mfcc.feature_dim(), self.cfg.num_components)
    }

    // ---- audio & features ----

    /// Extracts features from one block of mono PCM samples and appends
    /// them to the feature buffer. A trailing partial window is dropped.
    /// Returns the number of frames appended.
    pub fn add_audio_samples(&mut self, samples: &[i16]) -> usize {
        let before = self.features.len();
        self.features.extend(self.extractor.frames(samples));
        self.audio_samples += samples.len() as u64;
        let added = self.features.len() - before;
        debug!("buffered {} frames from {} samples", added, samples.len());
        added
    }

    /// 16-bit little-endian mono PCM byte path.
    pub fn add_audio_bytes(&mut self, bytes: &[u8]) -> Result<usize, SpkDetError> {
        if bytes.len() % 2 != 0 {
            return Err(SpkDetError::InvalidAudioFormat(format!(
                "{} bytes is not a whole number of 16-bit samples",
                bytes.len()
            )));
        }
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(self.add_audio_samples(&samples))
    }

    /// Byte path with a declared format, rejected if it disagrees with
    /// the configured front-end.
    pub fn add_audio_with_format(
        &mut self,
        bytes: &[u8],
        format: PcmFormat,
    ) -> Result<usize, SpkDetError> {
        if format.sample_rate != self.cfg.mfcc.sample_rate {
            return Err(SpkDetError::InvalidAudioFormat(format!(
                "sample rate {} does not match configured {}",
                format.sample_rate, self.cfg.mfcc.sample_rate
            )));
        }
        if format.channels != 1 {
            return Err(SpkDetError::InvalidAudioFormat(format!(
                "expected mono audio, got {} channels",
                format.channels
            )));
        }
        self.add_audio_bytes(bytes)
    }

    /// Drains `r` and feeds it through the byte path.
    pub fn add_audio_reader(&mut self, mut r: impl Read) -> Result<usize, SpkDetError> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        self.add_audio_bytes(&bytes)
    }

    /// Zeroes the session sample count. Buffered features are kept.
    pub fn reset_audio(&mut self) {
        self.audio_samples = 0;
    }

    /// Clears the feature buffer. The sample count is kept.
    pub fn reset_features(&mut self) {
        self.features.clear();
    }

    // ---- background model ----

    /// Reads a background model and checks its shape against the
    /// configuration. On any failure the previous background model, if
    /// one was loaded, stays active.
    pub fn load_background_model(&mut self, mut r: impl Read) -> Result<(), SpkDetError> {
        let model =
            read_gmm(&mut r).map_err(|e| SpkDetError::UbmLoadFailed(e.to_string()))?;
        let (dim, k) = self.expected_shape();
        if model.dim() != dim || model.num_components() != k {
            return Err(SpkDetError::UbmLoadFailed(format!(
                "background model is {}x{}, configuration expects {}x{}",
                model.num_components(),
                model.dim(),
                k,
                dim
            )));
        }
        info!("background model loaded: {} components x {} dims", k, dim);
        self.ubm = Some(Arc::new(model));
        Ok(())
    }

    /// Installs an already-built background model.
    pub fn set_background_model(&mut self, model: Gmm) -> Result<(), SpkDetError> {
        let (dim, k) = self.expected_shape();
        if model.dim() != dim || model.num_components() != k {
            return Err(SpkDetError::ModelFormatMismatch(format!(
                "background model is {}x{}, configuration expects {}x{}",
                model.num_components(),
                model.dim(),
                k,
                dim
            )));
        }
        self.ubm = Some(Arc::new(model));
        Ok(())
    }

    pub fn is_ubm_loaded(&self) -> bool {
        self.ubm.is_some()
    }

    // ---- speaker lifecycle ----

    /// Enrolls a speaker: MAP-adapts the background model on the buffered
    /// features and stores the result under `id`, replacing any existing
    /// model with that id. The feature buffer is left intact.
    pub fn create_speaker_model(&mut self, id: &str) -> Result<(), SpkDetError> {
        let ubm = self.ubm.as_ref().ok_or(SpkDetError::UbmNotLoaded)?;
        if self.features.is_empty() {
            return Err(SpkDetError::InsufficientData);
        }
        let model = map_adapt(ubm, ubm, self.features.frames(), &self.cfg.map_config())?;
        self.store.put(id, model);
        info!(
            "speaker '{}' enrolled from {} frames",
            id,
            self.features.len()
        );
        Ok(())
    }

    /// Re-adapts an enrolled speaker on the buffered features, using the
    /// current model as the prior.
    pub fn adapt_speaker_model(&mut self, id: &str) -> Result<(), SpkDetError> {
        let ubm = self.ubm.as_ref().ok_or(SpkDetError::UbmNotLoaded)?;
        let prior = self
            .store
            .get(id)
            .ok_or_else(|| SpkDetError::UnknownSpeaker(id.to_string()))?;
        if self.features.is_empty() {
            return Err(SpkDetError::InsufficientData);
        }
        let model = map_adapt(ubm, &prior, self.features.frames(), &self.cfg.map_config())?;
        self.store.put(id, model);
        info!(
            "speaker '{}' adapted on {} more frames",
            id,
            self.features.len()
        );
        Ok(())
    }

    /// Writes the model for `id` to `path` atomically: the bytes land in
    /// a temporary file next to the destination, which is renamed over
    /// `path` only after a successful sync.
    pub fn save_speaker_model(
        &self,
        id: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), SpkDetError> {
        if !self.store.contains(id) {
            return Err(SpkDetError::UnknownSpeaker(id.to_string()));
        }
        let path = path.as_ref();
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = Path::new(&tmp_name);

        let written = (|| -> Result<(), SpkDetError> {
            let mut file = File::create(tmp)?;
            self.store.serialize(id, &mut file)?;
            file.sync_all()?;
            Ok(())
        })();
        if let Err(err) = written {
            let _ = fs::remove_file(tmp);
            return Err(err);
        }
        fs::rename(tmp, path)?;
        info!("speaker '{}' saved to {}", id, path.display());
        Ok(())
    }

    /// Reads a model, checks its shape against the configuration, and
    /// stores it under `id`.
    pub fn load_speaker_model(
        &mut self,
        id: &str,
        mut r: impl Read,
    ) -> Result<(), SpkDetError> {
        self.store
            .deserialize(id, &mut r, Some(self.expected_shape()))?;
        info!("speaker '{}' loaded", id);
        Ok(())
    }

    pub fn remove_speaker(&mut self, id: &str) -> Result<(), SpkDetError> {
        if !self.store.remove(id) {
            return Err(SpkDetError::UnknownSpeaker(id.to_string()));
        }
        info!("speaker '{}' removed", id);
        Ok(())
    }

    // ---- scoring ----

    /// Scores the buffered features for speaker `id` against the
    /// background model. `matched` is `score > threshold`, ties reject.
    pub fn verify_speaker(&self, id: &str) -> Result<ScoreResult, SpkDetError> {
        let ubm = self.ubm.as_ref().ok_or(SpkDetError::UbmNotLoaded)?;
        let model = self
            .store
            .get(id)
            .ok_or_else(|| SpkDetError::UnknownSpeaker(id.to_string()))?;
        if self.features.is_empty() {
            return Err(SpkDetError::InsufficientData);
        }
        let score = average_llr(&model, ubm, self.features.frames())?;
        debug!("verify '{}': score {:.4}", id, score);
        Ok(ScoreResult {
            speaker_id: id.to_string(),
            score,
            matched: score > self.cfg.threshold,
        })
    }

    /// Scores the buffered features against every enrolled speaker and
    /// returns the best. Ties go to the earliest enrollment.
    pub fn identify_speaker(&self) -> Result<ScoreResult, SpkDetError> {
        let ubm = self.ubm.as_ref().ok_or(SpkDetError::UbmNotLoaded)?;
        if self.store.is_empty() {
            return Err(SpkDetError::NoSpeakersEnrolled);
        }
        if self.features.is_empty() {
            return Err(SpkDetError::InsufficientData);
        }

        let mut best: Option<(String, f64)> = None;
        for (id, model) in self.store.snapshot() {
            let score = average_llr(&model, ubm, self.features.frames())?;
            debug!("identify candidate '{}': score {:.4}", id, score);
            match &best {
                Some((_, top)) if score <= *top => {}
                _ => best = Some((id, score)),
            }
        }
        let (speaker_id, score) = best.ok_or(SpkDetError::NoSpeakersEnrolled)?;
        Ok(ScoreResult {
            speaker_id,
            score,
            matched: score > self.cfg.threshold,
        })
    }

    // ---- introspection ----

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn audio_sample_count(&self) -> u64 {
        self.audio_samples
    }

    pub fn speaker_count(&self) -> usize {
        self.store.len()
    }

    /// Enrolled speaker ids in enrollment order.
    pub fn speaker_ids(&self) -> Vec<String> {
        self.store.ids()
    }

    pub fn feature_dim(&self) -> usize {
        self.cfg.mfcc.feature_dim()
    }

    pub fn config(&self) -> &SpkDetConfig {
        &self.cfg
    }
}
