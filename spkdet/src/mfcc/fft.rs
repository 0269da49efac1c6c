//! In-place radix-2 Cooley-Tukey transform.

use std::f64::consts::PI;

/// Forward FFT over split real/imaginary buffers.
///
/// Both slices must share the same power-of-two length.
pub fn fft(real: &mut [f64], imag: &mut [f64]) {
    let n = real.len();
    assert_eq!(n, imag.len(), "real/imaginary length mismatch");
    assert!(n.is_power_of_two(), "fft length must be a power of two");
    if n < 2 {
        return;
    }

    // bit-reversal permutation
    let shift = usize::BITS - n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> shift;
        if i < j {
            real.swap(i, j);
            imag.swap(i, j);
        }
    }

    // butterfly stages, twiddles advanced by recurrence
    let mut size = 2;
    while size <= n {
        let half = size / 2;
        let step = -2.0 * PI / size as f64;
        let (step_re, step_im) = (step.cos(), step.sin());

        let mut base = 0;
        while base < n {
            let mut tw_re = 1.0;
            let mut tw_im = 0.0;
            for k in 0..half {
                let a = base + k;
                let b = a + half;

                let rot_re = tw_re * real[b] - tw_im * imag[b];
                let rot_im = tw_re * imag[b] + tw_im * real[b];

                real[b] = real[a] - rot_re;
                imag[b] = imag[a] - rot_im;
                real[a] += rot_re;
                imag[a] += rot_im;

                let next_re = tw_re * step_re - tw_im * step_im;
                tw_im = tw_re * step_im + tw_im * step_re;
                tw_re = next_re;
            }
            base += size;
        }
        size <<= 1;
    }
}
