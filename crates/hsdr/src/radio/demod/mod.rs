// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! The demodulator family and its thread.
//!
//! Exactly one demodulator runs at a time. The thread body is a small state
//! machine: RUNNING(kind) executes one kind's block loop until the state
//! record names a different kind (or a filter geometry change forces a
//! rebuild), then tears the channel down and starts the next one —
//! SWITCHING is just the gap between the two loops. Commands that only move
//! the filter edges or beta are applied in place at a block boundary; the
//! channelizer is never touched mid-block.

pub mod agc;
pub mod am;
pub mod fm;
pub mod linear;

use std::sync::Arc;

use super::output::PcmOutput;
use super::pipeline::Channel;
use super::ring::IqRing;
use super::state::{DemodKind, RadioState};
use crate::error::Result;

pub use agc::Agc;

/// Filter settings that force a full channel rebuild when they move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    l: usize,
    m: usize,
    decimate: u32,
    isb: bool,
    samprate: u32,
}

impl Geometry {
    fn capture(state: &Arc<RadioState>) -> Geometry {
        let ds = state.ds.lock();
        Geometry {
            l: ds.filter.l,
            m: ds.filter.m,
            decimate: ds.filter.decimate,
            isb: ds.filter.isb,
            samprate: ds.input.samprate,
        }
    }
}

/// Response parameters that can be applied in place.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Edges {
    low: f32,
    high: f32,
    beta: f32,
}

/// Per-block decision for a running demodulator.
enum BlockCheck {
    Continue,
    /// Kind or geometry changed (or shutdown): leave the block loop.
    Rebuild,
}

fn check_reconfig(
    ch: &mut Channel,
    state: &Arc<RadioState>,
    my_kind: DemodKind,
    geom: Geometry,
    edges: &mut Edges,
) -> Result<BlockCheck> {
    if state.is_terminated() {
        return Ok(BlockCheck::Rebuild);
    }
    let (kind, now_geom, now_edges) = {
        let ds = state.ds.lock();
        (
            ds.demod_type,
            Geometry {
                l: ds.filter.l,
                m: ds.filter.m,
                decimate: ds.filter.decimate,
                isb: ds.filter.isb,
                samprate: ds.input.samprate,
            },
            Edges {
                low: ds.filter.low,
                high: ds.filter.high,
                beta: ds.filter.kaiser_beta,
            },
        )
    };
    if kind != my_kind || now_geom != geom {
        return Ok(BlockCheck::Rebuild);
    }
    if now_edges != *edges {
        log::debug!(
            "[DEMOD] filter edges {}..{} beta {}",
            now_edges.low,
            now_edges.high,
            now_edges.beta
        );
        ch.filt.set_response(
            ch.samprate(),
            f64::from(now_edges.low),
            f64::from(now_edges.high),
            f64::from(now_edges.beta),
        )?;
        *edges = now_edges;
    }
    Ok(BlockCheck::Continue)
}

/// Demodulator thread body: run kinds back to back until shutdown.
///
/// A fatal error (socket gone, impossible filter parameters from a preset)
/// terminates the whole process after logging, per the error design: a
/// receiver with no demodulator is not limping, it is down.
pub fn run(state: &Arc<RadioState>, ring: &Arc<IqRing>, out: &mut PcmOutput) {
    log::info!("[DEMOD] demodulator thread running");
    while !state.is_terminated() {
        let kind = state.ds.lock().demod_type;
        log::info!("[DEMOD] starting {:?}", kind);
        let res = match kind {
            DemodKind::Am => am::run(state, ring, out),
            DemodKind::Fm => fm::run(state, ring, out),
            DemodKind::Linear => linear::run(state, ring, out),
        };
        if let Err(e) = res {
            log::error!("[DEMOD] fatal: {e}");
            state.terminate();
        }
    }
    log::info!("[DEMOD] demodulator thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::state::Demod;

    #[test]
    fn test_geometry_capture_tracks_record() {
        let mut ds = Demod::default();
        ds.filter.l = 1_024;
        ds.filter.m = 129;
        ds.filter.decimate = 2;
        ds.input.samprate = 96_000;
        let state = Arc::new(RadioState::new(ds));
        let g = Geometry::capture(&state);
        assert_eq!(g.l, 1_024);
        assert_eq!(g.decimate, 2);
        state.ds.lock().filter.decimate = 4;
        assert_ne!(Geometry::capture(&state), g);
    }
}
