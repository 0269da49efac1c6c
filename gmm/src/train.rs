//! Background-model training by binary-splitting EM.

use crate::error::GmmError;
use crate::gmm::Gmm;

/// Components accumulating less responsibility than this in one EM pass
/// keep their previous parameters.
const MIN_OCCUPANCY: f64 = 1e-6;

/// Settings for [`train_ubm`].
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Target mixture size.
    pub num_components: usize,
    /// Full EM passes after each split round.
    pub em_iterations: usize,
    /// Lower bound applied to every re-estimated variance.
    pub var_floor: f64,
    /// Mean perturbation applied when a component splits, in units of the
    /// component's standard deviation.
    pub split_offset: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            num_components: 512,
            em_iterations: 4,
            var_floor: 1e-4,
            split_offset: 0.2,
        }
    }
}

/// Trains a diagonal mixture on pooled feature frames.
///
/// Deterministic LBG-style estimation: start from the global mean and
/// variance, then alternate component splitting and EM refinement until
/// the target mixture size is reached. No randomness is involved; the
/// same frames and config always produce the same model. If the target
/// is not a power of two, the last round splits only the heaviest
/// components to land exactly on it.
pub fn train_ubm(frames: &[Vec<f32>], cfg: &TrainConfig) -> Result<Gmm, GmmError> {
    if cfg.num_components == 0 {
        return Err(GmmError::InvalidModel("mixture size must be at least 1".into()));
    }
    if frames.len() < cfg.num_components {
        return Err(GmmError::InsufficientData);
    }
    let dim = frames[0].len();
    if dim == 0 {
        return Err(GmmError::InvalidModel("zero-dimensional frames".into()));
    }
    for frame in frames {
        if frame.len() != dim {
            return Err(GmmError::DimensionMismatch {
                expected: dim,
                got: frame.len(),
            });
        }
    }

    let mut gmm = global_gaussian(frames, dim, cfg.var_floor)?;
    while gmm.num_components() < cfg.num_components {
        gmm = split(&gmm, cfg.num_components, cfg.split_offset)?;
        for _ in 0..cfg.em_iterations {
            gmm = em_step(frames, &gmm, cfg.var_floor)?.0;
        }
    }
    Ok(gmm)
}

/// Single-component model matching the sample mean and variance.
fn global_gaussian(frames: &[Vec<f32>], dim: usize, var_floor: f64) -> Result<Gmm, GmmError> {
    let n = frames.len() as f64;
    let mut mean = vec![0.0f64; dim];
    for frame in frames {
        for d in 0..dim {
            mean[d] += frame[d] as f64;
        }
    }
    for m in mean.iter_mut() {
        *m /= n;
    }
    let mut var = vec![0.0f64; dim];
    for frame in frames {
        for d in 0..dim {
            let diff = frame[d] as f64 - mean[d];
            var[d] += diff * diff;
        }
    }
    for v in var.iter_mut() {
        *v = (*v / n).max(var_floor);
    }
    Gmm::new(vec![1.0], vec![mean], vec![var])
}

/// Splits components toward `target`, each into a pair perturbed along its
/// own standard deviation. When fewer than a full doubling is needed, the
/// heaviest components split first.
fn split(gmm: &Gmm, target: usize, offset: f64) -> Result<Gmm, GmmError> {
    let k = gmm.num_components();
    let n_split = (target - k).min(k);
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| {
        gmm.weights()[b]
            .total_cmp(&gmm.weights()[a])
            .then(a.cmp(&b))
    });
    let mut chosen = vec![false; k];
    for &i in order.iter().take(n_split) {
        chosen[i] = true;
    }

    let mut weights = Vec::with_capacity(k + n_split);
    let mut means = Vec::with_capacity(k + n_split);
    let mut vars = Vec::with_capacity(k + n_split);
    for i in 0..k {
        if !chosen[i] {
            weights.push(gmm.weights()[i]);
            means.push(gmm.means()[i].clone());
            vars.push(gmm.vars()[i].clone());
            continue;
        }
        let mean = &gmm.means()[i];
        let var = &gmm.vars()[i];
        let mut lo = Vec::with_capacity(mean.len());
        let mut hi = Vec::with_capacity(mean.len());
        for d in 0..mean.len() {
            let delta = offset * var[d].sqrt();
            lo.push(mean[d] - delta);
            hi.push(mean[d] + delta);
        }
        let half = gmm.weights()[i] / 2.0;
        weights.push(half);
        means.push(lo);
        vars.push(var.clone());
        weights.push(half);
        means.push(hi);
        vars.push(var.clone());
    }
    Gmm::new(weights, means, vars)
}

/// One full EM pass. Returns the re-estimated model and the average
/// per-frame log-likelihood of the input model over the frames.
fn em_step(frames: &[Vec<f32>], gmm: &Gmm, var_floor: f64) -> Result<(Gmm, f64), GmmError> {
    let k = gmm.num_components();
    let dim = gmm.dim();
    let mut occ = vec![0.0f64; k];
    let mut sum = vec![vec![0.0f64; dim]; k];
    let mut sq_sum = vec![vec![0.0f64; dim]; k];
    let mut total_ll = 0.0;
    for frame in frames {
        let (post, ll) = gmm.component_posteriors(frame);
        total_ll += ll;
        for i in 0..k {
            let g = post[i];
            if g == 0.0 {
                continue;
            }
            occ[i] += g;
            let sum_row = &mut sum[i];
            let sq_row = &mut sq_sum[i];
            for d in 0..dim {
                let x = frame[d] as f64;
                sum_row[d] += g * x;
                sq_row[d] += g * x * x;
            }
        }
    }

    let total = frames.len() as f64;
    let mut weights = Vec::with_capacity(k);
    let mut means = Vec::with_capacity(k);
    let mut vars = Vec::with_capacity(k);
    for i in 0..k {
        if occ[i] < MIN_OCCUPANCY {
            weights.push(gmm.weights()[i]);
            means.push(gmm.means()[i].clone());
            vars.push(gmm.vars()[i].clone());
            continue;
        }
        weights.push(occ[i] / total);
        let mut mean = Vec::with_capacity(dim);
        let mut var = Vec::with_capacity(dim);
        for d in 0..dim {
            let m = sum[i][d] / occ[i];
            mean.push(m);
            var.push((sq_sum[i][d] / occ[i] - m * m).max(var_floor));
        }
        means.push(mean);
        vars.push(var);
    }
    let wsum: f64 = weights.iter().sum();
    for w in weights.iter_mut() {
        *w /= wsum;
    }
    Ok((Gmm::new(weights, means, vars)?, total_ll / total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::average_log_likelihood;

    fn lcg(seed: &mut u64) -> f64 {
        *seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (*seed >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Frames scattered around fixed cluster centers.
    fn clustered(centers: &[[f64; 2]], per_cluster: usize, spread: f64, seed: u64) -> Vec<Vec<f32>> {
        let mut seed = seed;
        let mut frames = Vec::new();
        for center in centers {
            for _ in 0..per_cluster {
                frames.push(vec![
                    (center[0] + (lcg(&mut seed) - 0.5) * spread) as f32,
                    (center[1] + (lcg(&mut seed) - 0.5) * spread) as f32,
                ]);
            }
        }
        frames
    }

    fn quick(k: usize) -> TrainConfig {
        TrainConfig {
            num_components: k,
            em_iterations: 4,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_single_component_matches_global_stats() {
        let frames = clustered(&[[1.0, -1.0]], 200, 2.0, 7);
        let g = train_ubm(&frames, &quick(1)).unwrap();
        assert_eq!(g.num_components(), 1);
        let n = frames.len() as f64;
        let mean_x: f64 = frames.iter().map(|f| f[0] as f64).sum::<f64>() / n;
        assert!((g.means()[0][0] - mean_x).abs() < 1e-9);
    }

    #[test]
    fn test_finds_separated_clusters() {
        let centers = [[-12.0, 0.0], [-4.0, 1.0], [4.0, -1.0], [12.0, 0.0]];
        let frames = clustered(&centers, 100, 1.0, 11);
        let g = train_ubm(&frames, &quick(4)).unwrap();
        assert_eq!(g.num_components(), 4);
        // every cluster center should have a component within a unit
        for center in &centers {
            let closest = g
                .means()
                .iter()
                .map(|m| (m[0] - center[0]).hypot(m[1] - center[1]))
                .fold(f64::INFINITY, f64::min);
            assert!(closest < 1.0, "no component near {center:?}, closest {closest}");
        }
        for w in g.weights() {
            assert!((w - 0.25).abs() < 0.05, "unbalanced weight {w}");
        }
    }

    #[test]
    fn test_likelihood_never_decreases() {
        let frames = clustered(&[[-5.0, 0.0], [5.0, 0.0]], 150, 4.0, 3);
        let mut gmm = train_ubm(&frames, &quick(2)).unwrap();
        let mut prev = f64::NEG_INFINITY;
        for _ in 0..6 {
            let (next, ll) = em_step(&frames, &gmm, 1e-4).unwrap();
            assert!(ll >= prev - 1e-9, "likelihood dropped: {prev} -> {ll}");
            prev = ll;
            gmm = next;
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let frames = clustered(&[[-3.0, 1.0], [4.0, -2.0]], 80, 2.0, 19);
        let a = train_ubm(&frames, &quick(4)).unwrap();
        let b = train_ubm(&frames, &quick(4)).unwrap();
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.means(), b.means());
        assert_eq!(a.vars(), b.vars());
    }

    #[test]
    fn test_non_power_of_two_target() {
        let frames = clustered(&[[-6.0, 0.0], [0.0, 1.0], [6.0, 0.0]], 100, 1.5, 23);
        let g = train_ubm(&frames, &quick(3)).unwrap();
        assert_eq!(g.num_components(), 3);
        assert!((g.weights().iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_more_components_fit_better() {
        let frames = clustered(&[[-8.0, -8.0], [8.0, 8.0]], 200, 1.0, 31);
        let one = train_ubm(&frames, &quick(1)).unwrap();
        let two = train_ubm(&frames, &quick(2)).unwrap();
        let ll1 = average_log_likelihood(&one, &frames).unwrap();
        let ll2 = average_log_likelihood(&two, &frames).unwrap();
        assert!(ll2 > ll1 + 1.0, "split did not help: {ll1} vs {ll2}");
    }

    #[test]
    fn test_insufficient_frames_rejected() {
        let frames = clustered(&[[0.0, 0.0]], 3, 1.0, 5);
        assert!(matches!(
            train_ubm(&frames, &quick(8)),
            Err(GmmError::InsufficientData)
        ));
        assert!(matches!(
            train_ubm(&[], &quick(1)),
            Err(GmmError::InsufficientData)
        ));
    }

    #[test]
    fn test_ragged_frames_rejected() {
        let frames = vec![vec![0.0f32, 1.0], vec![0.5]];
        assert!(matches!(
            train_ubm(&frames, &quick(1)),
            Err(GmmError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }
}
