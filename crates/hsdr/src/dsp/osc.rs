// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Numerically-controlled oscillator.
//!
//! A unit-modulus complex phasor advanced by a complex step per sample.
//! A non-zero sweep rate adds a quadratic phase term by stepping the step
//! itself. Phase drift from repeated multiplication is arrested by an
//! unconditional renormalization once per block.

use num_complex::Complex;
use std::f64::consts::TAU;

/// Phase-accurate NCO with frequency and optional linear frequency rate.
///
/// Frequencies are in cycles per sample; the rate is in cycles per sample
/// squared. A rate of zero makes `step()` a single complex multiply.
#[derive(Debug, Clone)]
pub struct Oscillator {
    freq: f64,
    rate: f64,
    phase: Complex<f64>,
    step: Complex<f64>,
    rate_step: Complex<f64>,
}

impl Oscillator {
    /// New oscillator at rest (zero frequency, zero rate, phase 1+0i).
    pub fn new() -> Self {
        Oscillator {
            freq: 0.0,
            rate: 0.0,
            phase: Complex::new(1.0, 0.0),
            step: Complex::new(1.0, 0.0),
            rate_step: Complex::new(1.0, 0.0),
        }
    }

    /// Set frequency (cycles/sample) and sweep rate (cycles/sample^2).
    ///
    /// The running phase is preserved so retuning is click-free.
    pub fn set(&mut self, freq: f64, rate: f64) {
        self.freq = freq;
        self.rate = rate;
        self.step = Complex::from_polar(1.0, TAU * freq);
        self.rate_step = if rate != 0.0 {
            Complex::from_polar(1.0, TAU * rate)
        } else {
            Complex::new(1.0, 0.0)
        };
    }

    /// Current frequency in cycles per sample.
    pub fn freq(&self) -> f64 {
        self.freq
    }

    /// Current sweep rate in cycles per sample squared.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Advance one sample and return the new phasor.
    #[inline]
    pub fn step(&mut self) -> Complex<f64> {
        self.phase *= self.step;
        if self.rate != 0.0 {
            self.step *= self.rate_step;
        }
        self.phase
    }

    /// Current phasor without advancing.
    #[inline]
    pub fn phase(&self) -> Complex<f64> {
        self.phase
    }

    /// Divide the phasor (and, when sweeping, the step) by its magnitude.
    ///
    /// Must run at least once per block; repeated complex multiplies walk
    /// the modulus away from 1.
    pub fn renormalize(&mut self) {
        let n = self.phase.norm();
        if n > 0.0 {
            self.phase /= n;
        }
        if self.rate != 0.0 {
            let n = self.step.norm();
            if n > 0.0 {
                self.step /= n;
            }
        }
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}
