// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Per-block channel pipeline: fill, spin down, measure, filter.
//!
//! Each demodulator drives one [`Channel`] per block:
//!
//! 1. `fillbuf` pulls the next L samples from the I/Q ring (blocking),
//! 2. the second-LO (and, when active, doppler) oscillator spins the block
//!    down to baseband,
//! 3. IF power is measured as the mean squared magnitude,
//! 4. the fast convolver runs,
//! 5. the noise density estimate is folded into `n0` with 0.01 smoothing.
//!
//! The oscillators are renormalized once per block, unconditionally.

use num_complex::Complex;
use std::sync::Arc;

use super::ring::IqRing;
use super::state::{Demod, RadioState};
use crate::config::N0_SMOOTH;
use crate::dsp::{FastConvolver, Oscillator, OutputMode};
use crate::error::Result;

/// The front half of a demodulator thread: convolver plus mixing chain.
pub struct Channel {
    pub filt: FastConvolver,
    second_lo: Oscillator,
    doppler: Oscillator,
    /// Values the oscillators were last programmed from, to detect retunes.
    lo2_hz: f64,
    doppler_hz: f64,
    doppler_rate: f64,
    samprate: f64,
}

impl Channel {
    /// Build a channel from the current state record.
    ///
    /// `mode` picks the convolver output flavor (the demodulator knows what
    /// it wants). The filter response is synthesized immediately from the
    /// record's edges and beta.
    pub fn new(ds: &Demod, mode: OutputMode) -> Result<Channel> {
        let decimate = ds.filter.decimate.max(1) as usize;
        let mut filt = FastConvolver::new(ds.filter.l, ds.filter.m, decimate, mode)?;
        let samprate = f64::from(ds.input.samprate.max(1));
        filt.set_response(
            samprate,
            f64::from(ds.filter.low),
            f64::from(ds.filter.high),
            f64::from(ds.filter.kaiser_beta),
        )?;
        let mut ch = Channel {
            filt,
            second_lo: Oscillator::new(),
            doppler: Oscillator::new(),
            lo2_hz: f64::NAN,
            doppler_hz: f64::NAN,
            doppler_rate: f64::NAN,
            samprate,
        };
        ch.retune(ds);
        Ok(ch)
    }

    /// Input sample rate the channel was built for.
    pub fn samprate(&self) -> f64 {
        self.samprate
    }

    /// Output (decimated) sample rate.
    pub fn output_samprate(&self) -> f64 {
        self.samprate / self.filt.decimate() as f64
    }

    /// Track oscillator settings against the state record. Cheap; called
    /// every block so command-side retunes take effect at the next block
    /// boundary, never mid-block.
    fn retune(&mut self, ds: &Demod) {
        if ds.tune.second_lo != self.lo2_hz {
            self.lo2_hz = ds.tune.second_lo;
            // Spin *down*: negate the LO frequency
            self.second_lo.set(-self.lo2_hz / self.samprate, 0.0);
        }
        if ds.tune.doppler != self.doppler_hz || ds.tune.doppler_rate != self.doppler_rate {
            self.doppler_hz = ds.tune.doppler;
            self.doppler_rate = ds.tune.doppler_rate;
            self.doppler.set(
                -self.doppler_hz / self.samprate,
                -self.doppler_rate / (self.samprate * self.samprate),
            );
        }
    }

    /// Run one block. Returns false when the terminate flag interrupted the
    /// ring fill; measurements are written back into the state record.
    pub fn process_block(&mut self, ring: &Arc<IqRing>, state: &Arc<RadioState>) -> Result<bool> {
        {
            let ds = state.ds.lock();
            self.retune(&ds);
        }

        if !ring.fill(self.filt.input_mut(), state.terminate_flag()) {
            return Ok(false);
        }

        // Spin down by the second LO, plus doppler when sweeping
        let doppler_active = self.doppler_hz != 0.0 || self.doppler_rate != 0.0;
        let mut power_acc = 0.0f64;
        for s in self.filt.input_mut().iter_mut() {
            let mut lo = self.second_lo.step();
            if doppler_active {
                lo *= self.doppler.step();
            }
            *s *= Complex::new(lo.re as f32, lo.im as f32);
            power_acc += f64::from(s.norm_sqr());
        }
        self.second_lo.renormalize();
        self.doppler.renormalize();
        let if_power = (power_acc / self.filt.blocksize_in() as f64) as f32;

        self.filt.execute()?;

        let n0_est = self.compute_n0();
        {
            let mut ds = state.ds.lock();
            ds.sig.if_power = if_power;
            ds.sig.n0 = if ds.sig.n0.is_nan() {
                n0_est
            } else {
                ds.sig.n0 + N0_SMOOTH * (n0_est - ds.sig.n0)
            };
            ds.filter.noise_bandwidth = (self.samprate * f64::from(self.filt.noise_gain())) as f32;
        }
        Ok(true)
    }

    /// Noise power spectral density estimate from the input spectrum.
    ///
    /// The mean power of the quietest tenth of the bins is taken as the
    /// noise floor; discrete signals occupy few bins and fall out of the
    /// low decile.
    fn compute_n0(&self) -> f32 {
        let spectrum = self.filt.spectrum();
        let n = spectrum.len();
        let mut powers: Vec<f32> = spectrum.iter().map(|c| c.norm_sqr()).collect();
        let decile = (n / 10).max(1);
        powers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let floor: f64 = powers[..decile].iter().map(|&p| f64::from(p)).sum::<f64>()
            / decile as f64;
        // E|X_k|^2 = N * sigma^2 for white noise; density = sigma^2 / samprate
        (floor / (n as f64 * self.samprate)) as f32
    }
}
