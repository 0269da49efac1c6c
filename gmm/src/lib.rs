//! Diagonal-covariance Gaussian mixture modeling for speaker recognition.
//!
//! # Architecture
//!
//! The GMM-UBM toolchain has four stages:
//!
//! 1. [`train_ubm`]: pooled feature frames -> background model ([`Gmm`])
//! 2. [`map_adapt`]: background model + enrollment frames -> speaker model
//! 3. [`average_llr`]: speaker model vs. background over test frames -> score
//! 4. [`write_gmm`] / [`read_gmm`]: versioned binary persistence
//!
//! Densities are evaluated in f64 with cached normalizers and log-sum-exp,
//! so any finite frame scores to a finite value. Scoring takes `&self` and
//! `Gmm` is `Send + Sync`; one model can serve many threads at once.

mod adapt;
mod error;
mod gmm;
mod gmm_io;
mod score;
mod train;

pub use adapt::{map_adapt, MapConfig};
pub use error::GmmError;
pub use gmm::Gmm;
pub use gmm_io::{read_gmm, write_gmm};
pub use score::{average_llr, average_log_likelihood};
pub use train::{train_ubm, TrainConfig};
