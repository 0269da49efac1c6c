//! Text-independent speaker verification and identification.
//!
//! # Architecture
//!
//! The pipeline processes audio in three stages:
//!
//! 1. [`Extractor::frames`]: PCM16 16kHz mono audio -> MFCC feature vectors
//! 2. [`SpkDetSystem::create_speaker_model`]: features + background model
//!    -> MAP-adapted speaker model
//! 3. [`SpkDetSystem::verify_speaker`] / [`SpkDetSystem::identify_speaker`]:
//!    features -> average log-likelihood ratio and accept/reject decision
//!
//! # Scoring
//!
//! Every trial is scored against a universal background model (UBM), a
//! Gaussian mixture trained offline over many speakers. A claimed
//! speaker's score is
//!
//! ```text
//! score = (1/T) * sum_t [ log p(x_t | speaker) - log p(x_t | UBM) ]
//! ```
//!
//! and the decision is `score > threshold`. Identification scores all
//! enrolled speakers and keeps the best, earliest-enrolled on ties.
//!
//! # Feature Extraction
//!
//! The [`mfcc`] module provides classic MFCC extraction:
//! - DC removal and pre-emphasis 0.97
//! - Hamming window
//! - Radix-2 FFT
//! - Mel triangular filterbank
//! - DCT-II cepstra, optional log energy and deltas

mod buffer;
mod config;
mod error;
pub mod mfcc;
mod store;
mod system;

pub use buffer::FeatureBuffer;
pub use config::SpkDetConfig;
pub use error::SpkDetError;
pub use mfcc::{EnergyGate, Extractor, FrameGate, Frames, MfccConfig};
pub use store::ModelStore;
pub use system::{PcmFormat, ScoreResult, SpkDetSystem};
