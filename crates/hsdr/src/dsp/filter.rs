// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Overlap-save fast-convolution channel filter with integer decimation.
//!
//! Successive blocks of L new samples are filtered against an M-tap impulse
//! response by multiplying in the frequency domain; the leading M - 1 samples
//! of each N = L + M - 1 input buffer are the tail of the previous block.
//! Decimation by D falls out of the inverse transform size: only the N/D
//! low-frequency bins are carried into an N/D-point inverse FFT, so no
//! separate decimator is needed and the passband response stays flat.
//!
//! Three output flavors share the machinery:
//!
//! - `Complex`: both sidebands through the response, complex output.
//! - `Real`: positive bins become `Hp·Xp + conj(Hn·Xn)` so the c2r inverse
//!   transform folds both sides onto a real output (SSB, VSB).
//! - `CrossConj`: the independent-sideband hack; after the inverse transform
//!   the I channel carries the lower sideband and Q the upper, at no extra
//!   filter cost.

use num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner};
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::dsp::window::window_filter;
use crate::error::{RadioError, Result};

/// Output flavor of the convolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Complex baseband output.
    Complex,
    /// Real output via c2r inverse transform.
    Real,
    /// Independent sideband: LSB on I, USB on Q.
    CrossConj,
}

/// Overlap-save FFT filter with decimation.
pub struct FastConvolver {
    mode: OutputMode,
    l: usize,
    m: usize,
    decimate: usize,
    n: usize,
    n_dec: usize,
    /// N complex samples; leading M - 1 are the previous block's tail.
    input: Vec<Complex<f32>>,
    /// Forward-transform scratch/result, N bins.
    fdomain: Vec<Complex<f32>>,
    /// Decimated spectrum. N/D bins for complex modes, N/D/2 + 1 for real.
    fdomain_dec: Vec<Complex<f32>>,
    /// Frequency-domain response on the full N-bin grid, None until synthesized.
    response: Option<Vec<Complex<f32>>>,
    out_real: Vec<f32>,
    fwd: Arc<dyn Fft<f32>>,
    inv: Arc<dyn Fft<f32>>,
    inv_real: Arc<dyn ComplexToReal<f32>>,
    fwd_scratch: Vec<Complex<f32>>,
    inv_scratch: Vec<Complex<f32>>,
    noise_gain: f32,
}

impl FastConvolver {
    /// Create a convolver for block size `l`, impulse length `m` and
    /// decimation `decimate`. Plans are owned here and recreated only when
    /// the geometry changes (by constructing a new convolver).
    pub fn new(l: usize, m: usize, decimate: usize, mode: OutputMode) -> Result<Self> {
        if l == 0 || m == 0 || decimate == 0 {
            return Err(RadioError::BadFilterParams(format!(
                "L={l} M={m} decimate={decimate}"
            )));
        }
        let n = l + m - 1;
        let n_dec = n / decimate;
        if n_dec < 2 {
            return Err(RadioError::BadFilterParams(format!(
                "N={n} too small for decimation {decimate}"
            )));
        }
        // Both should hold for the output window to land on sample
        // boundaries; violations degrade the first output samples only.
        if n % decimate != 0 {
            log::warn!("[FILTER] FFT size {n} not divisible by decimation ratio {decimate}");
        }
        if (m - 1) % decimate != 0 {
            log::warn!("[FILTER] impulse length {m} - 1 not divisible by decimation ratio {decimate}");
        }

        let mut planner = FftPlanner::<f32>::new();
        let fwd = planner.plan_fft_forward(n);
        let inv = planner.plan_fft_inverse(n_dec);
        let inv_real = RealFftPlanner::<f32>::new().plan_fft_inverse(n_dec);

        let fwd_scratch = vec![Complex::default(); fwd.get_inplace_scratch_len()];
        let inv_scratch = vec![Complex::default(); inv.get_inplace_scratch_len()];

        let spectrum_len = match mode {
            OutputMode::Real => n_dec / 2 + 1,
            _ => n_dec,
        };

        Ok(FastConvolver {
            mode,
            l,
            m,
            decimate,
            n,
            n_dec,
            input: vec![Complex::default(); n],
            fdomain: vec![Complex::default(); n],
            fdomain_dec: vec![Complex::default(); spectrum_len],
            response: None,
            out_real: vec![0.0; n_dec],
            fwd,
            inv,
            inv_real,
            fwd_scratch,
            inv_scratch,
            noise_gain: 0.0,
        })
    }

    /// Input block size L.
    pub fn blocksize_in(&self) -> usize {
        self.l
    }

    /// Output block size L / D.
    pub fn blocksize_out(&self) -> usize {
        self.l / self.decimate
    }

    /// Decimation ratio.
    pub fn decimate(&self) -> usize {
        self.decimate
    }

    /// Output mode.
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Equivalent-noise power gain of the current response.
    ///
    /// Multiplied by the input sample rate this gives the noise bandwidth in
    /// Hz. Zero until a response is synthesized.
    pub fn noise_gain(&self) -> f32 {
        self.noise_gain
    }

    /// The L-sample window new input is written into.
    pub fn input_mut(&mut self) -> &mut [Complex<f32>] {
        &mut self.input[self.m - 1..]
    }

    /// Input spectrum of the most recent block (all N bins, pre-response).
    /// Valid after `execute`; used by the noise-density estimator.
    pub fn spectrum(&self) -> &[Complex<f32>] {
        &self.fdomain
    }

    /// Synthesize and install a Kaiser-windowed response with passband
    /// `low_hz..high_hz` at input sample rate `samprate`.
    ///
    /// Re-synthesis always starts from the ideal brick-wall response, so
    /// repeated calls with the same parameters are exactly idempotent.
    pub fn set_response(&mut self, samprate: f64, low_hz: f64, high_hz: f64, beta: f64) -> Result<()> {
        if high_hz < low_hz {
            return Err(RadioError::BadFilterParams(format!(
                "low {low_hz} above high {high_hz}"
            )));
        }
        let n = self.n;
        // Real and cross-conjugate outputs fold both sidebands together;
        // pre-scale 3 dB down so folded power comes out right.
        let gain = match self.mode {
            OutputMode::Complex => 1.0f32,
            OutputMode::Real | OutputMode::CrossConj => std::f32::consts::FRAC_1_SQRT_2,
        };
        let mut response = vec![Complex::new(0.0f32, 0.0); n];
        for (k, r) in response.iter_mut().enumerate() {
            let f = if k <= n / 2 {
                k as f64 * samprate / n as f64
            } else {
                (k as f64 - n as f64) * samprate / n as f64
            };
            if f >= low_hz && f <= high_hz {
                *r = Complex::new(gain, 0.0);
            }
        }
        window_filter(self.l, self.m, &mut response, beta);

        // Parseval: sum of |H|^2 over the grid, compensated for the 1/N
        // magnitude convention of window_filter.
        self.noise_gain = response.iter().map(|h| h.norm_sqr()).sum::<f32>() * n as f32;
        self.response = Some(response);
        Ok(())
    }

    /// Run one block: forward FFT, tail shift, response multiply with
    /// decimation fold, inverse FFT.
    ///
    /// Returns an error until a response has been installed.
    pub fn execute(&mut self) -> Result<()> {
        let response = self
            .response
            .as_ref()
            .ok_or_else(|| RadioError::BadFilterParams("no response installed".into()))?;
        let n = self.n;
        let n_dec = self.n_dec;

        self.fdomain.copy_from_slice(&self.input);
        self.fwd
            .process_with_scratch(&mut self.fdomain, &mut self.fwd_scratch);

        // Save the tail for the next block
        self.input.copy_within(self.l.., 0);

        let fd = &self.fdomain;
        let out = &mut self.fdomain_dec;
        out[0] = fd[0] * response[0]; // DC
        match self.mode {
            OutputMode::Complex => {
                for p in 1..n_dec / 2 {
                    out[p] = response[p] * fd[p]; // positive frequency
                    out[n_dec - p] = response[n - p] * fd[n - p]; // negative frequency
                }
            }
            OutputMode::CrossConj => {
                // ISB: fold the sidebands cross-conjugated so I carries LSB
                // and Q carries USB after the inverse transform.
                for p in 1..n_dec / 2 {
                    let pos = response[p] * fd[p];
                    let neg = response[n - p] * fd[n - p];
                    out[p] = pos + neg.conj();
                    out[n_dec - p] = neg - pos.conj();
                }
            }
            OutputMode::Real => {
                // c2r assumes Hermitian symmetry; writing the conjugate-folded
                // positive bins aliases both sidebands onto the real output.
                for p in 1..n_dec / 2 {
                    out[p] = response[p] * fd[p] + (response[n - p] * fd[n - p]).conj();
                }
            }
        }
        out[n_dec / 2] = fd[n_dec / 2] * response[n_dec / 2]; // decimated Nyquist

        match self.mode {
            OutputMode::Real => {
                // realfft ignores these imaginary parts; zero them anyway so
                // the fold stays exactly Hermitian.
                out[0].im = 0.0;
                out[n_dec / 2].im = 0.0;
                self.inv_real
                    .process(&mut self.fdomain_dec, &mut self.out_real)
                    .ok();
            }
            _ => {
                self.inv
                    .process_with_scratch(&mut self.fdomain_dec, &mut self.inv_scratch);
            }
        }
        Ok(())
    }

    /// Complex output window: starts at (M - 1)/D, length L/D.
    pub fn output(&self) -> &[Complex<f32>] {
        let start = (self.m - 1) / self.decimate;
        &self.fdomain_dec[start..start + self.blocksize_out()]
    }

    /// Real output window (Real mode only).
    pub fn output_real(&self) -> &[f32] {
        let start = (self.m - 1) / self.decimate;
        &self.out_real[start..start + self.blocksize_out()]
    }
}
