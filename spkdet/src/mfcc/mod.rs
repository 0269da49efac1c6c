//! MFCC front-end: PCM samples to cepstral feature vectors.
//!
//! Per analysis window: DC removal, pre-emphasis, Hamming window, FFT,
//! power spectrum, triangular mel filterbank, log, and a DCT-II projection
//! keeping the configured number of cepstra. Log energy and delta
//! coefficients are optional appendices; an optional [`FrameGate`] drops
//! low-energy frames at emission.

mod dct;
mod fft;
mod mel;

use serde::{Deserialize, Serialize};

use crate::error::SpkDetError;

/// Floor applied before taking logs of power values.
const POWER_FLOOR: f64 = 1e-10;

/// Regression half-width for delta coefficients.
const DELTA_WINDOW: usize = 2;

/// Front-end settings.
///
/// Defaults give the classic 16 kHz setup: 25 ms windows every 10 ms,
/// 24 mel filters, 12 cepstra plus log energy, 13-dimensional vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MfccConfig {
    /// Expected input sample rate in Hz.
    pub sample_rate: u32,
    /// Analysis window length in samples.
    pub frame_length: usize,
    /// Hop between successive windows in samples.
    pub frame_shift: usize,
    /// Pre-emphasis coefficient.
    pub pre_emphasis: f64,
    /// Number of triangular mel filters.
    pub num_mel_filters: usize,
    /// Cepstral coefficients kept per frame, excluding energy.
    pub num_ceps: usize,
    /// Append the raw-frame log energy to each vector.
    pub append_energy: bool,
    /// Append regression deltas over the static coefficients.
    pub append_deltas: bool,
    /// Drop frames whose log energy falls below this value.
    pub energy_floor: Option<f64>,
    /// Lower mel-band edge in Hz.
    pub low_freq: f64,
    /// Upper mel-band edge in Hz; zero or negative means an offset from
    /// the Nyquist frequency.
    pub high_freq: f64,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            frame_length: 400,
            frame_shift: 160,
            pre_emphasis: 0.97,
            num_mel_filters: 24,
            num_ceps: 12,
            append_energy: true,
            append_deltas: false,
            energy_floor: None,
            low_freq: 20.0,
            high_freq: -400.0,
        }
    }
}

impl MfccConfig {
    /// Width of the vectors this configuration produces.
    pub fn feature_dim(&self) -> usize {
        let static_dim = self.num_ceps + usize::from(self.append_energy);
        if self.append_deltas {
            static_dim * 2
        } else {
            static_dim
        }
    }
}

/// Keep-or-drop decision over a frame's log energy.
pub trait FrameGate: Send + Sync {
    fn keep(&self, log_energy: f64) -> bool;
}

impl<F> FrameGate for F
where
    F: Fn(f64) -> bool + Send + Sync,
{
    fn keep(&self, log_energy: f64) -> bool {
        self(log_energy)
    }
}

/// Gate dropping frames below a fixed log-energy threshold.
#[derive(Debug, Clone, Copy)]
pub struct EnergyGate {
    pub min_log_energy: f64,
}

impl FrameGate for EnergyGate {
    fn keep(&self, log_energy: f64) -> bool {
        log_energy >= self.min_log_energy
    }
}

/// MFCC extractor with tables precomputed from an [`MfccConfig`].
///
/// Construction validates the front-end geometry and builds the window,
/// filterbank, and DCT basis once. Extraction is deterministic: the same
/// samples and config always produce bit-identical output.
pub struct Extractor {
    cfg: MfccConfig,
    fft_size: usize,
    window: Vec<f64>,
    mel_bank: Vec<Vec<f64>>,
    dct: Vec<Vec<f64>>,
    gate: Option<Box<dyn FrameGate>>,
}

impl Extractor {
    pub fn new(cfg: &MfccConfig) -> Result<Self, SpkDetError> {
        if cfg.frame_shift == 0 || cfg.frame_length < cfg.frame_shift {
            return Err(SpkDetError::Config(format!(
                "frame geometry {}/{} is not usable",
                cfg.frame_length, cfg.frame_shift
            )));
        }
        if cfg.num_ceps == 0 || cfg.num_ceps > cfg.num_mel_filters {
            return Err(SpkDetError::Config(format!(
                "{} cepstra cannot come from {} mel filters",
                cfg.num_ceps, cfg.num_mel_filters
            )));
        }
        if cfg.sample_rate == 0 {
            return Err(SpkDetError::Config("sample rate must be positive".into()));
        }
        let nyquist = cfg.sample_rate as f64 / 2.0;
        let high = if cfg.high_freq <= 0.0 {
            nyquist + cfg.high_freq
        } else {
            cfg.high_freq
        };
        if !(cfg.low_freq >= 0.0 && cfg.low_freq < high && high <= nyquist) {
            return Err(SpkDetError::Config(format!(
                "mel band {}..{} Hz does not fit under {} Hz",
                cfg.low_freq, high, nyquist
            )));
        }

        let fft_size = cfg.frame_length.next_power_of_two();
        let gate = cfg
            .energy_floor
            .map(|min| Box::new(EnergyGate { min_log_energy: min }) as Box<dyn FrameGate>);
        Ok(Self {
            window: mel::hamming_window(cfg.frame_length),
            mel_bank: mel::mel_filter_bank(
                cfg.num_mel_filters,
                fft_size,
                cfg.sample_rate as f64,
                cfg.low_freq,
                high,
            ),
            dct: dct::dct_basis(cfg.num_ceps, cfg.num_mel_filters),
            fft_size,
            gate,
            cfg: cfg.clone(),
        })
    }

    /// Replaces the frame gate.
    pub fn with_gate(mut self, gate: Box<dyn FrameGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Width of the vectors this extractor produces.
    pub fn feature_dim(&self) -> usize {
        self.cfg.feature_dim()
    }

    pub fn config(&self) -> &MfccConfig {
        &self.cfg
    }

    /// Lazily walks `samples`, yielding one feature vector per analysis
    /// window. Trailing samples that do not fill a window are dropped.
    /// Calling again restarts from the first window of the same input.
    pub fn frames<'a>(&'a self, samples: &'a [i16]) -> Frames<'a> {
        Frames::new(self, samples)
    }

    /// Eager variant of [`Extractor::frames`].
    pub fn extract(&self, samples: &[i16]) -> Vec<Vec<f32>> {
        self.frames(samples).collect()
    }

    /// Static coefficients plus raw log energy for the window at `start`.
    fn static_frame(&self, samples: &[i16], start: usize) -> (Vec<f32>, f64) {
        let n = self.cfg.frame_length;
        let frame = &samples[start..start + n];

        // raw log energy, before any conditioning
        let mut energy = 0.0f64;
        let mut buf: Vec<f64> = Vec::with_capacity(n);
        for &s in frame {
            let v = s as f64 / 32768.0;
            energy += v * v;
            buf.push(v);
        }
        let log_energy = energy.max(POWER_FLOOR).ln();

        // DC removal
        let mean = buf.iter().sum::<f64>() / n as f64;
        for v in buf.iter_mut() {
            *v -= mean;
        }

        // pre-emphasis, back to front so each sample sees its original
        // left neighbor
        for i in (1..n).rev() {
            buf[i] -= self.cfg.pre_emphasis * buf[i - 1];
        }
        buf[0] *= 1.0 - self.cfg.pre_emphasis;

        // window, zero-padded FFT, one-sided power spectrum
        let mut re = vec![0.0f64; self.fft_size];
        let mut im = vec![0.0f64; self.fft_size];
        for i in 0..n {
            re[i] = buf[i] * self.window[i];
        }
        fft::fft(&mut re, &mut im);
        let bins = self.fft_size / 2 + 1;
        let power: Vec<f64> = (0..bins).map(|k| re[k] * re[k] + im[k] * im[k]).collect();

        // log mel energies
        let mels: Vec<f64> = self
            .mel_bank
            .iter()
            .map(|filter| {
                let e: f64 = filter.iter().zip(&power).map(|(w, p)| w * p).sum();
                e.max(POWER_FLOOR).ln()
            })
            .collect();

        // cepstral projection
        let mut out: Vec<f32> = dct::apply_dct(&self.dct, &mels)
            .iter()
            .map(|&c| c as f32)
            .collect();
        if self.cfg.append_energy {
            out.push(log_energy as f32);
        }
        (out, log_energy)
    }
}

/// Lazy iterator over the feature vectors of one sample slice.
///
/// Static coefficients are computed on demand; when deltas are enabled a
/// small lookahead of static frames is kept for the regression window.
/// Gated frames are skipped at emission, after deltas are formed, so the
/// delta context stays unbroken.
pub struct Frames<'a> {
    ex: &'a Extractor,
    samples: &'a [i16],
    /// Start offset of the next window not yet run through the DSP chain.
    next_start: usize,
    /// Index of the next frame to emit.
    emit: usize,
    /// Static vectors and energies computed so far.
    statics: Vec<(Vec<f32>, f64)>,
    total: usize,
}

impl<'a> Frames<'a> {
    fn new(ex: &'a Extractor, samples: &'a [i16]) -> Self {
        let total = if samples.len() < ex.cfg.frame_length {
            0
        } else {
            (samples.len() - ex.cfg.frame_length) / ex.cfg.frame_shift + 1
        };
        Self {
            ex,
            samples,
            next_start: 0,
            emit: 0,
            statics: Vec::new(),
            total,
        }
    }

    /// Number of analysis windows in the input, before gating.
    pub fn total_windows(&self) -> usize {
        self.total
    }

    fn fill_to(&mut self, idx: usize) {
        while self.statics.len() <= idx && self.statics.len() < self.total {
            let s = self.ex.static_frame(self.samples, self.next_start);
            self.next_start += self.ex.cfg.frame_shift;
            self.statics.push(s);
        }
    }

    fn assemble(&mut self, idx: usize) -> (Vec<f32>, f64) {
        if !self.ex.cfg.append_deltas {
            self.fill_to(idx);
            let (vec, energy) = &self.statics[idx];
            return (vec.clone(), *energy);
        }

        self.fill_to(idx + DELTA_WINDOW);
        let (base, energy) = self.statics[idx].clone();
        let dim = base.len();
        let mut out = base;
        out.reserve(dim);
        let denom: f64 = 2.0 * (1..=DELTA_WINDOW).map(|t| (t * t) as f64).sum::<f64>();
        for d in 0..dim {
            let mut acc = 0.0f64;
            for tau in 1..=DELTA_WINDOW {
                let fwd = (idx + tau).min(self.total - 1);
                let bwd = idx.saturating_sub(tau);
                acc += tau as f64 * (self.statics[fwd].0[d] as f64 - self.statics[bwd].0[d] as f64);
            }
            out.push((acc / denom) as f32);
        }
        (out, energy)
    }
}

impl Iterator for Frames<'_> {
    type Item = Vec<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.emit < self.total {
            let idx = self.emit;
            self.emit += 1;
            let (vec, energy) = self.assemble(idx);
            match &self.ex.gate {
                Some(gate) if !gate.keep(energy) => continue,
                _ => return Some(vec),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.emit;
        match self.ex.gate {
            Some(_) => (0, Some(remaining)),
            None => (remaining, Some(remaining)),
        }
    }
}
