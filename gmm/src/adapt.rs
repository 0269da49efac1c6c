//! MAP adaptation of speaker models from a background model.

use crate::error::GmmError;
use crate::gmm::Gmm;

/// Settings for [`map_adapt`].
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Relevance factor `r`: the effective frame count a component needs
    /// before the observed statistics outweigh the prior.
    pub relevance: f64,
    pub adapt_means: bool,
    pub adapt_variances: bool,
    pub adapt_weights: bool,
    /// Lower bound applied to adapted variances.
    pub var_floor: f64,
    /// Components accumulating less responsibility than this keep the
    /// prior's parameters untouched.
    pub occupancy_floor: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            relevance: 16.0,
            adapt_means: true,
            adapt_variances: false,
            adapt_weights: false,
            var_floor: 1e-4,
            occupancy_floor: 1e-6,
        }
    }
}

/// Derives a speaker model from `prior` using Baum-Welch statistics of
/// `frames` collected under `background`.
///
/// Responsibilities always come from the background model; `prior` is the
/// blend base. Fresh enrollment passes the background model itself as the
/// prior, incremental adaptation passes the speaker's current model. Per
/// component, `alpha = n / (n + relevance)` weighs the observed statistics
/// against the prior, so sparsely observed components stay close to what
/// they were. The inputs are untouched; a new model is returned with the
/// same geometry as the background model.
pub fn map_adapt(
    background: &Gmm,
    prior: &Gmm,
    frames: &[Vec<f32>],
    cfg: &MapConfig,
) -> Result<Gmm, GmmError> {
    if prior.dim() != background.dim() || prior.num_components() != background.num_components() {
        return Err(GmmError::InvalidModel(format!(
            "prior is {}x{}, background is {}x{}",
            prior.num_components(),
            prior.dim(),
            background.num_components(),
            background.dim()
        )));
    }
    if frames.is_empty() {
        return Err(GmmError::InsufficientData);
    }
    let dim = background.dim();
    let k = background.num_components();
    for frame in frames {
        if frame.len() != dim {
            return Err(GmmError::DimensionMismatch {
                expected: dim,
                got: frame.len(),
            });
        }
    }

    let mut occ = vec![0.0f64; k];
    let mut sum = vec![vec![0.0f64; dim]; k];
    let mut sq_sum = if cfg.adapt_variances {
        vec![vec![0.0f64; dim]; k]
    } else {
        Vec::new()
    };
    for frame in frames {
        let (post, _) = background.component_posteriors(frame);
        for i in 0..k {
            let g = post[i];
            if g == 0.0 {
                continue;
            }
            occ[i] += g;
            let row = &mut sum[i];
            for d in 0..dim {
                row[d] += g * frame[d] as f64;
            }
            if cfg.adapt_variances {
                let row = &mut sq_sum[i];
                for d in 0..dim {
                    let x = frame[d] as f64;
                    row[d] += g * x * x;
                }
            }
        }
    }

    let total = frames.len() as f64;
    let mut weights = Vec::with_capacity(k);
    let mut means = Vec::with_capacity(k);
    let mut vars = Vec::with_capacity(k);
    for i in 0..k {
        let n = occ[i];
        if n < cfg.occupancy_floor {
            weights.push(prior.weights()[i]);
            means.push(prior.means()[i].clone());
            vars.push(prior.vars()[i].clone());
            continue;
        }
        let alpha = n / (n + cfg.relevance);
        let prior_mean = &prior.means()[i];
        let prior_var = &prior.vars()[i];

        if cfg.adapt_weights {
            weights.push(alpha * n / total + (1.0 - alpha) * prior.weights()[i]);
        } else {
            weights.push(prior.weights()[i]);
        }

        let mean: Vec<f64> = if cfg.adapt_means {
            (0..dim)
                .map(|d| alpha * (sum[i][d] / n) + (1.0 - alpha) * prior_mean[d])
                .collect()
        } else {
            prior_mean.clone()
        };

        if cfg.adapt_variances {
            // blend second moments, then recenter on the adapted mean
            let var: Vec<f64> = (0..dim)
                .map(|d| {
                    let obs = sq_sum[i][d] / n;
                    let pri = prior_var[d] + prior_mean[d] * prior_mean[d];
                    (alpha * obs + (1.0 - alpha) * pri - mean[d] * mean[d]).max(cfg.var_floor)
                })
                .collect();
            vars.push(var);
        } else {
            vars.push(prior_var.clone());
        }
        means.push(mean);
    }
    if cfg.adapt_weights {
        let wsum: f64 = weights.iter().sum();
        for w in weights.iter_mut() {
            *w /= wsum;
        }
    }
    Gmm::new(weights, means, vars)
}
