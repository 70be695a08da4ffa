// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Linear demodulator: SSB, CW, DSB, raw IQ and ISB, with optional carrier
//! PLL and hang AGC.
//!
//! Without the PLL this is a frequency translation (the post-detection
//! shift oscillator) followed by channel selection: I alone for mono, I/Q
//! as a stereo pair, or the cross-conjugate filter's LSB/USB split for
//! independent sideband. With the PLL a second-order Costas-style loop
//! strips the residual carrier; the square option squares the input ahead
//! of the phase detector so a suppressed-carrier (DSB/BPSK) signal locks
//! at twice the phase. Lock is declared after the loop error stays small
//! for several consecutive blocks.

use num_complex::Complex;
use std::f64::consts::TAU;
use std::sync::Arc;

use super::super::output::PcmOutput;
use super::super::pipeline::Channel;
use super::super::ring::IqRing;
use super::super::state::{DemodKind, RadioState};
use super::{check_reconfig, Agc, BlockCheck, Edges, Geometry};
use crate::dsp::{Oscillator, OutputMode};
use crate::error::Result;

/// PLL natural loop bandwidth, Hz.
const PLL_BANDWIDTH: f64 = 30.0;
/// Mean loop error below this (radians) counts toward lock.
const LOCK_THRESHOLD: f64 = 0.2;
/// Consecutive quiet blocks before lock is declared.
const LOCK_BLOCKS: u32 = 4;

struct Pll {
    phase: f64,
    /// Loop integrator, radians/sample.
    freq: f64,
    kp: f64,
    ki: f64,
    square: bool,
    quiet_blocks: u32,
}

impl Pll {
    fn new(out_rate: f64, square: bool) -> Self {
        // Second-order loop, critically damped
        let wn = TAU * PLL_BANDWIDTH / out_rate;
        Pll {
            phase: 0.0,
            freq: 0.0,
            kp: std::f64::consts::SQRT_2 * wn,
            ki: wn * wn,
            square,
            quiet_blocks: 0,
        }
    }

    /// Advance on one sample; returns the carrier-stripped sample and the
    /// absolute phase error.
    #[inline]
    fn step(&mut self, x: Complex<f32>) -> (Complex<f32>, f64) {
        let (sin, cos) = self.phase.sin_cos();
        let lo = Complex::new(cos as f32, -sin as f32);
        let y = x * lo;
        let err = if self.square {
            let y2 = Complex::new(
                f64::from(y.re * y.re - y.im * y.im),
                f64::from(2.0 * y.re * y.im),
            );
            y2.arg() / 2.0
        } else {
            f64::from(y.arg())
        };
        self.freq += self.ki * err;
        self.phase = (self.phase + self.freq + self.kp * err) % TAU;
        (y, err.abs())
    }

    /// Loop frequency in Hz at the given sample rate.
    fn freq_hz(&self, out_rate: f64) -> f64 {
        self.freq * out_rate / TAU
    }
}

pub fn run(state: &Arc<RadioState>, ring: &Arc<IqRing>, out: &mut PcmOutput) -> Result<()> {
    let geom = Geometry::capture(state);
    let (mut ch, mut agc, pll_on, square, agc_on) = {
        let mut ds = state.ds.lock();
        ds.output.samprate = geom.samprate / geom.decimate.max(1);
        ds.sig.pll_lock = false;
        let mode = if ds.filter.isb {
            OutputMode::CrossConj
        } else {
            OutputMode::Complex
        };
        let ch = Channel::new(&ds, mode)?;
        let agc = Agc::new(&ds.agc);
        (ch, agc, ds.opt.pll, ds.opt.square, ds.opt.agc)
    };
    let mut edges = {
        let ds = state.ds.lock();
        Edges {
            low: ds.filter.low,
            high: ds.filter.high,
            beta: ds.filter.kaiser_beta,
        }
    };

    let out_rate = ch.output_samprate();
    let mut pll = Pll::new(out_rate, square);
    let mut shift_osc = Oscillator::new();
    let mut shift_hz = f64::NAN;
    let isb = geom.isb;

    let blocksize = ch.filt.blocksize_out();
    let mut stereo = vec![Complex::new(0.0f32, 0.0); blocksize];
    let mut mono = vec![0.0f32; blocksize];

    loop {
        if !ch.process_block(ring, state)? {
            return Ok(());
        }

        // Commands apply at block boundaries: shift retunes in place,
        // channels/env take effect directly, a PLL or square toggle needs
        // fresh loop state so the whole demodulator restarts.
        let (shift, manual_gain, channels, env, now_pll, now_square) = {
            let ds = state.ds.lock();
            (
                ds.tune.shift,
                ds.agc.gain,
                ds.output.channels,
                ds.opt.env,
                ds.opt.pll,
                ds.opt.square,
            )
        };
        if now_pll != pll_on || now_square != square {
            return Ok(());
        }
        if shift != shift_hz {
            shift_hz = shift;
            shift_osc.set(shift_hz / out_rate, 0.0);
        }
        let shifting = shift_hz != 0.0;

        let mut bb_power = 0.0f64;
        let mut err_sum = 0.0f64;
        let output = ch.filt.output();
        for (n, &sample) in output.iter().enumerate() {
            let mut y = sample;
            if pll_on {
                let (stripped, err) = pll.step(y);
                y = stripped;
                err_sum += err;
            }
            if shifting {
                let lo = shift_osc.step();
                y *= Complex::new(lo.re as f32, lo.im as f32);
            }
            bb_power += f64::from(y.norm_sqr());
            stereo[n] = y;
        }
        if shifting {
            shift_osc.renormalize();
        }
        let count = output.len();
        bb_power /= count as f64;

        // Gain: hang AGC applied per sample, or the manual setting applied
        // at send time
        let (gain, send_gain) = if agc_on {
            for s in stereo.iter_mut() {
                let g = agc.update(s.norm());
                *s *= g;
            }
            (agc.gain(), 1.0)
        } else {
            (manual_gain, manual_gain)
        };

        // Measurements
        {
            let mut ds = state.ds.lock();
            ds.sig.bb_power = bb_power as f32;
            ds.agc.gain = gain;
            if pll_on {
                let mean_err = err_sum / count as f64;
                if mean_err < LOCK_THRESHOLD {
                    pll.quiet_blocks = pll.quiet_blocks.saturating_add(1);
                } else {
                    pll.quiet_blocks = 0;
                }
                ds.sig.pll_lock = pll.quiet_blocks >= LOCK_BLOCKS;
                ds.sig.foffset = pll.freq_hz(out_rate) as f32;
                ds.sig.cphase = (pll.phase % TAU) as f32;
                // Carrier SNR against the noise in the channel bandwidth
                let nb = f64::from(ds.filter.noise_bandwidth).max(1.0);
                let n0 = f64::from(ds.sig.n0);
                ds.sig.snr = if n0 > 0.0 {
                    ((bb_power / (n0 * nb) - 1.0).max(0.0)) as f32
                } else {
                    f32::NAN
                };
            }
        }

        // Hand off per output shape
        if env {
            // Envelope output (synchronous AM listening): strip the DC term
            let mut avg = 0.0f32;
            for (n, s) in stereo.iter().enumerate() {
                mono[n] = s.norm();
                avg += mono[n];
            }
            avg /= count as f32;
            for m in mono.iter_mut() {
                *m -= avg;
            }
            out.send_mono(state, &mono, send_gain);
        } else if channels == 2 {
            out.send_stereo(state, &stereo, send_gain);
        } else {
            // Mono: I channel, or both sidebands mixed for ISB
            for (n, s) in stereo.iter().enumerate() {
                mono[n] = if isb { 0.5 * (s.re + s.im) } else { s.re };
            }
            out.send_mono(state, &mono, send_gain);
        }

        if matches!(
            check_reconfig(&mut ch, state, DemodKind::Linear, geom, &mut edges)?,
            BlockCheck::Rebuild
        ) {
            return Ok(());
        }
    }
}
