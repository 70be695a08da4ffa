// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Kaiser-window synthesis of band-limited FIR responses.
//!
//! [`window_filter`] takes a desired frequency response sampled on the full
//! N-point grid, limits its impulse response to M taps under a Kaiser window,
//! and returns the realizable response on the same grid. "Time zero" (the
//! center of the impulse response) is placed at index M/2 so the filter is
//! causal within its block. [`window_rfilter`] is the half-spectrum
//! counterpart for Hermitian (real-impulse) responses.

use num_complex::Complex;
use rustfft::FftPlanner;
use realfft::RealFftPlanner;
use std::f64::consts::PI;

/// Modified Bessel function of the first kind, order zero.
///
/// Truncated power series; stops when the term falls below 1e-12 of the
/// running sum (at most 40 terms).
pub fn i0(x: f64) -> f64 {
    let t = 0.25 * x * x;
    let mut sum = 1.0 + t;
    let mut term = t;
    for k in 2..40 {
        term *= t / ((k * k) as f64);
        sum += term;
        if term < 1e-12 * sum {
            break;
        }
    }
    sum
}

/// Kaiser window of length `m` with shape parameter `beta`, evaluated at tap `n`.
pub fn kaiser(n: usize, m: usize, beta: f64) -> f64 {
    let p = 2.0 * n as f64 / (m - 1) as f64 - 1.0;
    i0(PI * beta * (1.0 - p * p).max(0.0).sqrt()) / i0(PI * beta)
}

/// Window a complex frequency response in place.
///
/// `response` holds N = L + M - 1 bins at the input sample rate. The 1/N²
/// scale folds the unnormalized inverse/forward transform pair together with
/// the forward gain of the convolution engine, leaving the overall filter
/// chain at unity passband gain.
pub fn window_filter(l: usize, m: usize, response: &mut [Complex<f32>], beta: f64) {
    let n = l + m - 1;
    debug_assert_eq!(response.len(), n);

    let mut planner = FftPlanner::<f32>::new();
    let inv = planner.plan_fft_inverse(n);
    let fwd = planner.plan_fft_forward(n);

    // To time domain
    let mut time: Vec<Complex<f32>> = response.to_vec();
    inv.process(&mut time);

    // Shift time zero to M/2, window, scale; zero beyond M taps
    let scale = 1.0 / ((n * n) as f32);
    let mut buf = vec![Complex::new(0.0f32, 0.0); n];
    for (tap, slot) in buf.iter_mut().enumerate().take(m) {
        let src = (tap + n - m / 2) % n;
        *slot = time[src] * (kaiser(tap, m, beta) as f32) * scale;
    }

    // Back to frequency domain
    fwd.process(&mut buf);
    response.copy_from_slice(&buf);
}

/// Half-spectrum counterpart of [`window_filter`].
///
/// `response` holds the N/2 + 1 non-negative frequency bins of a Hermitian
/// response; negative frequencies are implicitly the conjugate.
pub fn window_rfilter(l: usize, m: usize, response: &mut [Complex<f32>], beta: f64) {
    let n = l + m - 1;
    debug_assert_eq!(response.len(), n / 2 + 1);

    let mut planner = RealFftPlanner::<f32>::new();
    let c2r = planner.plan_fft_inverse(n);
    let r2c = planner.plan_fft_forward(n);

    // To time domain (c2r destroys its input)
    let mut spectrum: Vec<Complex<f32>> = response.to_vec();
    spectrum[0].im = 0.0;
    if n % 2 == 0 {
        spectrum[n / 2].im = 0.0;
    }
    let mut time = vec![0.0f32; n];
    c2r.process(&mut spectrum, &mut time).ok();

    // Shift time zero to M/2, window, scale; zero beyond M taps
    let scale = 1.0 / ((n * n) as f32);
    let mut buf = vec![0.0f32; n];
    for (tap, slot) in buf.iter_mut().enumerate().take(m) {
        let src = (tap + n - m / 2) % n;
        *slot = time[src] * (kaiser(tap, m, beta) as f32) * scale;
    }

    let mut out = vec![Complex::new(0.0f32, 0.0); n / 2 + 1];
    r2c.process(&mut buf, &mut out).ok();
    response.copy_from_slice(&out);
}
