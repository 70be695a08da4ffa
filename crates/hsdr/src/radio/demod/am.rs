// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! AM envelope demodulator.
//!
//! Magnitude detection with carrier-driven gain: the block-average envelope
//! *is* the carrier, so gain is simply 0.5/average and the same average is
//! subtracted to strip the carrier from the audio. No separate AGC.

use std::sync::Arc;

use super::super::output::PcmOutput;
use super::super::pipeline::Channel;
use super::super::ring::IqRing;
use super::super::state::{DemodKind, RadioState};
use super::{check_reconfig, BlockCheck, Edges, Geometry};
use crate::dsp::OutputMode;
use crate::error::Result;

pub fn run(state: &Arc<RadioState>, ring: &Arc<IqRing>, out: &mut PcmOutput) -> Result<()> {
    let geom = Geometry::capture(state);
    let mut ch = {
        let mut ds = state.ds.lock();
        // Envelope detection is inherently mono
        ds.output.channels = 1;
        ds.output.samprate = geom.samprate / geom.decimate.max(1);
        ds.sig.foffset = 0.0; // not measured by this demodulator
        ds.sig.pdeviation = f32::NAN;
        ds.sig.snr = f32::NAN;
        ds.sig.pll_lock = false;
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

    let mut audio = vec![0.0f32; ch.filt.blocksize_out()];
    loop {
        if !ch.process_block(ring, state)? {
            return Ok(()); // terminated
        }

        let mut bb_power = 0.0f64;
        let mut average = 0.0f64;
        let output = ch.filt.output();
        for (n, x) in output.iter().enumerate() {
            let mag2 = x.norm_sqr();
            bb_power += f64::from(mag2);
            let a = mag2.sqrt();
            audio[n] = a;
            average += f64::from(a);
        }
        bb_power /= output.len() as f64;
        average /= output.len() as f64;

        // Carrier-driven gain; guard dead air
        let gain = if average > 0.0 {
            (0.5 / average) as f32
        } else {
            0.0
        };
        // Remove the carrier component
        let avg = average as f32;
        for a in audio.iter_mut() {
            *a -= avg;
        }

        {
            let mut ds = state.ds.lock();
            ds.sig.bb_power = bb_power as f32;
            ds.agc.gain = gain;
        }
        out.send_mono(state, &audio, gain);

        if matches!(
            check_reconfig(&mut ch, state, DemodKind::Am, geom, &mut edges)?,
            BlockCheck::Rebuild
        ) {
            return Ok(());
        }
    }
}
