//! Diagonal-covariance Gaussian mixture model.

use crate::error::GmmError;

const LOG_2PI: f64 = 1.8378770664093453;

/// A Gaussian mixture with diagonal covariances.
///
/// Parameters are stored per component: `weights[i]` is the mixture weight,
/// `means[i]` and `vars[i]` the mean and variance rows of component `i`.
/// The constructor validates the parameters and caches the per-component
/// log normalizers and inverse variances, so density evaluation is a pure
/// read. `Gmm` is `Send + Sync`; one model can be scored from many threads
/// at once.
#[derive(Debug, Clone)]
pub struct Gmm {
    dim: usize,
    weights: Vec<f64>,
    means: Vec<Vec<f64>>,
    vars: Vec<Vec<f64>>,
    /// Per component: `ln(w_i) - 0.5 * sum_d ln(2*pi*var_id)`.
    log_norm: Vec<f64>,
    inv_vars: Vec<Vec<f64>>,
}

impl Gmm {
    /// Builds a mixture from raw parameters.
    ///
    /// Requires at least one component, equal row widths, finite means,
    /// strictly positive finite variances, and non-negative weights
    /// summing to 1 within a small tolerance. A weight sum that is more
    /// than accumulation error away from 1 is renormalized.
    pub fn new(
        weights: Vec<f64>,
        means: Vec<Vec<f64>>,
        vars: Vec<Vec<f64>>,
    ) -> Result<Self, GmmError> {
        let k = weights.len();
        if k == 0 {
            return Err(GmmError::InvalidModel("no components".into()));
        }
        if means.len() != k || vars.len() != k {
            return Err(GmmError::InvalidModel(format!(
                "component count disagrees: {} weights, {} means, {} variances",
                k,
                means.len(),
                vars.len()
            )));
        }
        let dim = means[0].len();
        if dim == 0 {
            return Err(GmmError::InvalidModel("zero-dimensional mean".into()));
        }
        for (i, row) in means.iter().enumerate() {
            if row.len() != dim {
                return Err(GmmError::DimensionMismatch {
                    expected: dim,
                    got: row.len(),
                });
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(GmmError::InvalidModel(format!(
                    "non-finite mean in component {i}"
                )));
            }
        }
        for (i, row) in vars.iter().enumerate() {
            if row.len() != dim {
                return Err(GmmError::DimensionMismatch {
                    expected: dim,
                    got: row.len(),
                });
            }
            if row.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                return Err(GmmError::InvalidModel(format!(
                    "non-positive variance in component {i}"
                )));
            }
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(GmmError::InvalidModel("negative weight".into()));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-4 {
            return Err(GmmError::InvalidModel(format!(
                "weights sum to {sum}, expected 1"
            )));
        }
        // A sum already within accumulation error stays untouched, so
        // rebuilding a model from its own parameters is bit-exact.
        let weights: Vec<f64> = if (sum - 1.0).abs() > 1e-9 {
            weights.iter().map(|w| w / sum).collect()
        } else {
            weights
        };

        let inv_vars: Vec<Vec<f64>> = vars
            .iter()
            .map(|row| row.iter().map(|v| 1.0 / v).collect())
            .collect();
        let log_norm: Vec<f64> = weights
            .iter()
            .zip(&vars)
            .map(|(w, row)| {
                let log_det: f64 = row.iter().map(|v| LOG_2PI + v.ln()).sum();
                w.ln() - 0.5 * log_det
            })
            .collect();

        Ok(Self {
            dim,
            weights,
            means,
            vars,
            log_norm,
            inv_vars,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_components(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn means(&self) -> &[Vec<f64>] {
        &self.means
    }

    pub fn vars(&self) -> &[Vec<f64>] {
        &self.vars
    }

    /// Log-density of one frame under the mixture, via log-sum-exp over
    /// the per-component log densities.
    ///
    /// The frame width must match the model dimension. Any finite frame
    /// yields a finite score; a frame far from every component comes out
    /// very negative, never `-inf` or NaN.
    pub fn log_likelihood(&self, frame: &[f32]) -> f64 {
        let mut buf = Vec::with_capacity(self.num_components());
        self.component_log_densities(frame, &mut buf);
        log_sum_exp(&buf)
    }

    /// Posterior responsibility of each component for one frame, plus the
    /// frame log-likelihood. Shared by EM re-estimation and MAP statistics.
    pub fn component_posteriors(&self, frame: &[f32]) -> (Vec<f64>, f64) {
        let mut buf = Vec::with_capacity(self.num_components());
        self.component_log_densities(frame, &mut buf);
        let ll = log_sum_exp(&buf);
        for v in buf.iter_mut() {
            *v = (*v - ll).exp();
        }
        (buf, ll)
    }

    fn component_log_densities(&self, frame: &[f32], out: &mut Vec<f64>) {
        assert_eq!(
            frame.len(),
            self.dim,
            "frame width {} does not match model dimension {}",
            frame.len(),
            self.dim
        );
        out.clear();
        for i in 0..self.weights.len() {
            let mean = &self.means[i];
            let inv_var = &self.inv_vars[i];
            let mut mahal = 0.0;
            for d in 0..self.dim {
                let diff = frame[d] as f64 - mean[d];
                mahal += diff * diff * inv_var[d];
            }
            out.push(self.log_norm[i] - 0.5 * mahal);
        }
    }
}

/// Numerically stable `ln(sum_i exp(v_i))`.
pub(crate) fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}
