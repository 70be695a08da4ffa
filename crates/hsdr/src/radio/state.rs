// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Canonical demodulator state.
//!
//! One [`Demod`] record holds every tunable and measurable quantity of the
//! receiver, grouped the way the status protocol reports them. The record
//! is conceptually single-writer-per-field: the status thread owns the SDR
//! and command-side fields, the demodulator thread owns the measurements
//! and AGC gain. A single narrow mutex guards the record; the two
//! cross-thread edges (SDR status updated, demod type changed) each get a
//! condition variable. Locks are held only long enough to copy fields in
//! or out, never across a block or a socket operation.

use parking_lot::{Condvar, Mutex};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::transport::rtp::RtpSession;

/// Demodulator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DemodKind {
    /// Envelope detection with carrier-driven gain.
    Am = 0,
    /// Phase-difference discriminator.
    Fm = 1,
    /// Coherent/linear demod: SSB, CW, DSB, IQ, ISB, optional PLL.
    Linear = 2,
}

impl DemodKind {
    pub fn from_u8(v: u8) -> Option<DemodKind> {
        match v {
            0 => Some(DemodKind::Am),
            1 => Some(DemodKind::Fm),
            2 => Some(DemodKind::Linear),
            _ => None,
        }
    }

    /// Parse a demodulator name from the preset table (prefix,
    /// case-insensitive, matching the table loader's convention).
    pub fn from_name(name: &str) -> Option<DemodKind> {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("am") {
            Some(DemodKind::Am)
        } else if lower.starts_with("fm") {
            Some(DemodKind::Fm)
        } else if lower.starts_with("linear") {
            Some(DemodKind::Linear)
        } else {
            None
        }
    }
}

/// I/Q ingress side.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Sample rate the DSP chain actually runs at.
    pub samprate: u32,
    /// Free-form description from the front end.
    pub description: String,
    pub rtp: RtpSession,
    pub metadata_packets: u64,
    pub samples: u64,
    pub data_source: Option<SocketAddr>,
    pub data_dest: Option<SocketAddr>,
    pub metadata_source: Option<SocketAddr>,
    pub metadata_dest: Option<SocketAddr>,
}

/// Front-end (SDR) state as last reported on the metadata channel.
#[derive(Debug, Clone)]
pub struct SdrState {
    /// First LO frequency as reported, Hz (before TCXO calibration).
    pub first_lo: f64,
    /// Nominal A/D sample rate, Hz.
    pub nominal_samprate: u32,
    pub lna_gain: u8,
    pub mixer_gain: u8,
    pub if_gain: u8,
    pub dc_i: f32,
    pub dc_q: f32,
    pub imbalance: f32,
    pub sinphi: f32,
    /// TCXO calibration; the true first LO is `first_lo * (1 + calibration)`.
    pub calibration: f64,
    pub gps_time: u64,
    /// Aliasing-safe IF band, Hz relative to the first LO.
    pub min_if: f32,
    pub max_if: f32,
    pub direct_conversion: bool,
    pub gain_factor: f32,
}

impl Default for SdrState {
    fn default() -> Self {
        SdrState {
            first_lo: 0.0,
            nominal_samprate: 0,
            lna_gain: 0,
            mixer_gain: 0,
            if_gain: 0,
            dc_i: 0.0,
            dc_q: 0.0,
            imbalance: 0.0,
            sinphi: 0.0,
            calibration: 0.0,
            gps_time: 0,
            min_if: 0.0,
            max_if: 0.0,
            direct_conversion: false,
            gain_factor: 1.0,
        }
    }
}

/// User-visible tuning terms.
#[derive(Debug, Clone, Default)]
pub struct TuneState {
    /// Carrier frequency the user sees, Hz.
    pub freq: f64,
    /// Post-detection shift, Hz (CW offset and friends).
    pub shift: f64,
    /// Software second LO, Hz.
    pub second_lo: f64,
    /// Doppler correction, Hz, and its rate, Hz/s.
    pub doppler: f64,
    pub doppler_rate: f64,
    /// Hardware tuner pinned: LO1 requests are suppressed.
    pub lock: bool,
    /// UI cursor position and tuning step (log10 Hz), carried for clients.
    pub item: u32,
    pub step: i32,
}

/// Channel filter parameters.
#[derive(Debug, Clone)]
pub struct FilterState {
    /// Block size L, input samples per FFT block.
    pub l: usize,
    /// Impulse response length M.
    pub m: usize,
    pub low: f32,
    pub high: f32,
    pub kaiser_beta: f32,
    pub interpolate: u32,
    pub decimate: u32,
    pub isb: bool,
    /// Equivalent noise bandwidth of the current response, Hz.
    pub noise_bandwidth: f32,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            l: crate::config::DEFAULT_BLOCKSIZE,
            m: crate::config::DEFAULT_FIR_LENGTH,
            low: -5_000.0,
            high: 5_000.0,
            kaiser_beta: crate::config::DEFAULT_KAISER_BETA,
            interpolate: 1,
            decimate: 1,
            isb: false,
            noise_bandwidth: 0.0,
        }
    }
}

/// AGC parameters in DSP-native units: amplitude ratios per output sample
/// and a hang time in output samples. The wire and the preset file carry
/// dB/s and seconds; conversion happens on apply.
#[derive(Debug, Clone)]
pub struct AgcState {
    pub gain: f32,
    pub headroom: f32,
    /// Per-sample amplitude ratio, < 1.
    pub attack_rate: f32,
    /// Per-sample amplitude ratio, > 1.
    pub recovery_rate: f32,
    /// Output samples to hold gain after an attack.
    pub hangtime: f32,
}

impl Default for AgcState {
    fn default() -> Self {
        AgcState {
            gain: 1.0,
            headroom: 0.316, // -10 dB
            attack_rate: 0.9977, // -50 dB/s at 24 kHz
            recovery_rate: 1.000_057, // +6 dB/s at 24 kHz
            hangtime: 26_400.0, // 1.1 s at 24 kHz
        }
    }
}

/// Option flags.
#[derive(Debug, Clone, Default)]
pub struct OptState {
    pub pll: bool,
    pub square: bool,
    pub flat: bool,
    pub agc: bool,
    pub env: bool,
}

/// Signal measurements, written by the demodulator thread.
#[derive(Debug, Clone)]
pub struct SigState {
    /// Pre-filter power, linear.
    pub if_power: f32,
    /// Post-filter baseband power, linear.
    pub bb_power: f32,
    /// Noise power spectral density estimate, linear per Hz.
    pub n0: f32,
    pub snr: f32,
    pub foffset: f32,
    pub pdeviation: f32,
    pub cphase: f32,
    pub plfreq: f32,
    pub pll_lock: bool,
}

impl Default for SigState {
    fn default() -> Self {
        SigState {
            if_power: 0.0,
            bb_power: 0.0,
            n0: f32::NAN,
            snr: f32::NAN,
            foffset: f32::NAN,
            pdeviation: f32::NAN,
            cphase: f32::NAN,
            plfreq: f32::NAN,
            pll_lock: false,
        }
    }
}

/// PCM egress side.
#[derive(Debug, Clone)]
pub struct OutputState {
    pub ssrc: u32,
    pub samprate: u32,
    /// 1 = mono, 2 = stereo.
    pub channels: u8,
    pub rtp_packets: u64,
    pub metadata_packets: u64,
    pub samples: u64,
    /// Smoothed output power, linear.
    pub level: f32,
    pub commands: u64,
    pub command_tag: u64,
    pub ttl: u32,
    pub data_source: Option<SocketAddr>,
    pub data_dest: Option<SocketAddr>,
}

impl Default for OutputState {
    fn default() -> Self {
        OutputState {
            ssrc: 0,
            samprate: 0,
            channels: 1,
            rtp_packets: 0,
            metadata_packets: 0,
            samples: 0,
            level: 0.0,
            commands: 0,
            command_tag: 0,
            ttl: crate::config::DEFAULT_MCAST_TTL,
            data_source: None,
            data_dest: None,
        }
    }
}

/// The whole demodulator state record.
#[derive(Debug, Clone, Default)]
pub struct Demod {
    pub input: InputState,
    pub sdr: SdrState,
    pub tune: TuneState,
    pub filter: FilterState,
    pub agc: AgcState,
    pub opt: OptState,
    pub sig: SigState,
    pub output: OutputState,
    pub demod_type: DemodKind,
}

impl Default for DemodKind {
    fn default() -> Self {
        DemodKind::Am
    }
}

/// Shared handle: the record, its two event edges, and the shutdown flag.
pub struct RadioState {
    pub ds: Mutex<Demod>,
    /// Signaled after the status thread applies a front-end status update.
    pub sdr_status: Condvar,
    /// Signaled when a command or preset changes the demodulator type.
    pub demod_change: Condvar,
    terminate: AtomicBool,
}

impl RadioState {
    pub fn new(ds: Demod) -> Self {
        RadioState {
            ds: Mutex::new(ds),
            sdr_status: Condvar::new(),
            demod_change: Condvar::new(),
            terminate: AtomicBool::new(false),
        }
    }

    /// Raise the shutdown flag and wake every waiter. Safe to call from a
    /// signal-handler context thread; touches no other state.
    pub fn terminate(&self) {
        self.terminate.store(true, Ordering::SeqCst);
        self.sdr_status.notify_all();
        self.demod_change.notify_all();
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// The raw flag, for waits that must observe shutdown (ring fills).
    pub fn terminate_flag(&self) -> &AtomicBool {
        &self.terminate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demod_kind_wire_values() {
        assert_eq!(DemodKind::Am as u8, 0);
        assert_eq!(DemodKind::Fm as u8, 1);
        assert_eq!(DemodKind::Linear as u8, 2);
        assert_eq!(DemodKind::from_u8(2), Some(DemodKind::Linear));
        assert_eq!(DemodKind::from_u8(3), None);
    }

    #[test]
    fn test_demod_kind_from_name() {
        assert_eq!(DemodKind::from_name("AM"), Some(DemodKind::Am));
        assert_eq!(DemodKind::from_name("fm"), Some(DemodKind::Fm));
        assert_eq!(DemodKind::from_name("Linear"), Some(DemodKind::Linear));
        assert_eq!(DemodKind::from_name("wavelet"), None);
    }

    #[test]
    fn test_undefined_measurements_start_nan() {
        let d = Demod::default();
        assert!(d.sig.snr.is_nan());
        assert!(d.sig.foffset.is_nan());
        assert!(!d.sig.pll_lock);
    }

    #[test]
    fn test_terminate_flag() {
        let st = RadioState::new(Demod::default());
        assert!(!st.is_terminated());
        st.terminate();
        assert!(st.is_terminated());
    }
}
