// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! FM discriminator.
//!
//! The differential phase between successive post-filter samples is the
//! instantaneous frequency; its block mean is the frequency offset and its
//! peak the deviation. SNR comes from the envelope statistics: a clean FM
//! carrier has constant magnitude, so the variance of the envelope measures
//! the noise riding on it. A one-pole de-emphasis filter shapes the audio
//! unless the flat option is set.

use num_complex::Complex;
use std::sync::Arc;

use super::super::output::PcmOutput;
use super::super::pipeline::Channel;
use super::super::ring::IqRing;
use super::super::state::{DemodKind, RadioState};
use super::{check_reconfig, BlockCheck, Edges, Geometry};
use crate::dsp::OutputMode;
use crate::error::Result;

/// De-emphasis time constant (NBFM voice).
const DEEMPH_TC: f64 = 530.5e-6;

pub fn run(state: &Arc<RadioState>, ring: &Arc<IqRing>, out: &mut PcmOutput) -> Result<()> {
    let geom = Geometry::capture(state);
    let mut ch = {
        let mut ds = state.ds.lock();
        ds.output.channels = 1;
        ds.output.samprate = geom.samprate / geom.decimate.max(1);
        ds.sig.pll_lock = false;
        ds.agc.gain = 1.0; // discriminator output is already normalized
        Channel::new(&ds, OutputMode::Complex)?
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
    let hz_per_radian = (out_rate / std::f64::consts::TAU) as f32;
    let deemph_alpha = (1.0 - (-1.0 / (out_rate * DEEMPH_TC)).exp()) as f32;

    let mut prev = Complex::new(0.0f32, 0.0);
    let mut deemph_state = 0.0f32;
    let mut audio = vec![0.0f32; ch.filt.blocksize_out()];

    loop {
        if !ch.process_block(ring, state)? {
            return Ok(());
        }
        let flat = state.ds.lock().opt.flat;

        let mut bb_power = 0.0f64;
        let mut amp_sum = 0.0f64;
        let mut amp_sq_sum = 0.0f64;
        let mut dphi_sum = 0.0f64;
        let mut peak = 0.0f32;
        let output = ch.filt.output();
        for (n, &x) in output.iter().enumerate() {
            bb_power += f64::from(x.norm_sqr());
            let a = x.norm();
            amp_sum += f64::from(a);
            amp_sq_sum += f64::from(a * a);

            let dphi = (x * prev.conj()).arg();
            prev = x;
            dphi_sum += f64::from(dphi);
            peak = peak.max(dphi.abs());
            // Full scale at half the output Nyquist in either direction
            audio[n] = dphi / std::f32::consts::PI;
        }
        let count = output.len() as f64;
        bb_power /= count;
        let amp_mean = amp_sum / count;
        let amp_var = (amp_sq_sum / count - amp_mean * amp_mean).max(0.0);

        if !flat {
            for a in audio.iter_mut() {
                deemph_state += deemph_alpha * (*a - deemph_state);
                *a = deemph_state;
            }
        }

        {
            let mut ds = state.ds.lock();
            ds.sig.bb_power = bb_power as f32;
            ds.sig.foffset = (dphi_sum / count) as f32 * hz_per_radian;
            ds.sig.pdeviation = peak * hz_per_radian;
            // Envelope-variance SNR, clamped before anyone logs it in dB
            ds.sig.snr = if amp_var > 0.0 {
                (((amp_mean * amp_mean) / (2.0 * amp_var) - 1.0).max(0.0)) as f32
            } else {
                f32::NAN
            };
        }

        out.send_mono(state, &audio, 1.0);

        if matches!(
            check_reconfig(&mut ch, state, DemodKind::Fm, geom, &mut edges)?,
            BlockCheck::Rebuild
        ) {
            return Ok(());
        }
    }
}
