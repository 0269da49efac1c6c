//! Type-II discrete cosine transform for the cepstral projection.

use std::f64::consts::PI;

/// Precomputed DCT-II rows mapping `num_filters` log-mel energies to
/// `num_ceps` cepstral coefficients. Row `k` holds the basis for
/// coefficient `k + 1`; the zeroth coefficient (overall energy) is not
/// part of the basis.
pub fn dct_basis(num_ceps: usize, num_filters: usize) -> Vec<Vec<f64>> {
    let n = num_filters as f64;
    (1..=num_ceps)
        .map(|k| {
            (0..num_filters)
                .map(|m| (PI / n * (m as f64 + 0.5) * k as f64).cos())
                .collect()
        })
        .collect()
}

/// Projects log filterbank energies through a [`dct_basis`].
pub fn apply_dct(basis: &[Vec<f64>], energies: &[f64]) -> Vec<f64> {
    basis
        .iter()
        .map(|row| 2.0 * row.iter().zip(energies).map(|(c, e)| c * e).sum::<f64>())
        .collect()
}
