//! Analysis window and mel filterbank tables.

use std::f64::consts::PI;

/// Hamming window of length `n`.
pub fn hamming_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over the one-sided power spectrum.
///
/// Returns `[num_filters][fft_size / 2 + 1]` weights. Band edges are in Hz
/// and must satisfy `0 <= low < high <= sample_rate / 2`; the caller
/// resolves any offset-from-Nyquist convention first. Every filter is
/// forced to span at least one bin so none is identically zero.
pub fn mel_filter_bank(
    num_filters: usize,
    fft_size: usize,
    sample_rate: f64,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let num_bins = fft_size / 2 + 1;
    let low_mel = hz_to_mel(low_freq);
    let high_mel = hz_to_mel(high_freq);
    let step = (high_mel - low_mel) / (num_filters + 1) as f64;

    // edge frequencies on the mel scale, mapped to FFT bins
    let mut edges: Vec<usize> = (0..num_filters + 2)
        .map(|i| {
            let hz = mel_to_hz(low_mel + step * i as f64);
            let bin = (hz * fft_size as f64 / sample_rate).round() as usize;
            bin.min(num_bins - 1)
        })
        .collect();
    for i in 1..edges.len() {
        if edges[i] <= edges[i - 1] {
            edges[i] = edges[i - 1] + 1;
        }
    }

    let mut bank = Vec::with_capacity(num_filters);
    for m in 0..num_filters {
        let mut filter = vec![0.0f64; num_bins];
        let left = edges[m];
        let center = edges[m + 1];
        let right = edges[m + 2];

        for k in left..center.min(num_bins) {
            filter[k] = (k - left) as f64 / (center - left) as f64;
        }
        for k in center..=right.min(num_bins - 1) {
            filter[k] = (right - k) as f64 / (right - center) as f64;
        }
        bank.push(filter);
    }
    bank
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_window_shape() {
        let w = hamming_window(400);
        assert_eq!(w.len(), 400);
        for i in 0..200 {
            assert!((w[i] - w[399 - i]).abs() < 1e-12, "asymmetry at {i}");
        }
        assert!((w[0] - 0.08).abs() < 0.01);
        assert!((w[199] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_hz_mel_roundtrip() {
        assert_eq!(hz_to_mel(0.0), 0.0);
        for &hz in &[50.0, 300.0, 1000.0, 4000.0, 7600.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6, "roundtrip failed for {hz} Hz");
        }
    }

    #[test]
    fn test_filter_bank_shape_and_coverage() {
        let bank = mel_filter_bank(24, 512, 16000.0, 20.0, 7600.0);
        assert_eq!(bank.len(), 24);
        assert_eq!(bank[0].len(), 257);
        for (m, filter) in bank.iter().enumerate() {
            assert!(
                filter.iter().any(|&v| v > 0.0),
                "filter {m} is identically zero"
            );
            for &v in filter {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_narrow_band_still_builds() {
        // many filters squeezed into a narrow band force one-bin triangles
        let bank = mel_filter_bank(16, 256, 8000.0, 100.0, 600.0);
        assert_eq!(bank.len(), 16);
        for filter in &bank {
            assert!(filter.iter().any(|&v| v > 0.0));
        }
    }
}
