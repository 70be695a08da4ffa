// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Process-wide configuration.
//!
//! Two levels, both read-only after startup:
//!
//! - compile-time constants shared by every component (ports, ring size,
//!   default filter geometry, status cadence);
//! - a [`RadioConfig`] record built once from the command line and passed to
//!   each thread. No module-level mutable state.

use std::path::PathBuf;

/// Default UDP port for RTP streams (I/Q ingress and PCM egress).
pub const DEFAULT_RTP_PORT: u16 = 5004;

/// Default UDP port for TLV status/command channels.
pub const DEFAULT_STATUS_PORT: u16 = 5006;

/// I/Q ring capacity in complex samples. Power of two.
pub const RING_SIZE: usize = 65_536;

/// Default filter block size L (signal samples per FFT block).
pub const DEFAULT_BLOCKSIZE: usize = 3_840;

/// Default filter impulse response length M.
pub const DEFAULT_FIR_LENGTH: usize = 961;

/// Default Kaiser window shape parameter.
pub const DEFAULT_KAISER_BETA: f32 = 3.0;

/// Default multicast TTL for output sockets.
pub const DEFAULT_MCAST_TTL: u32 = 1;

/// Status service poll timeout. Slightly longer than the front end's 100 ms
/// status cadence so the front end usually triggers the cycle.
pub const STATUS_POLL_MS: u64 = 120;

/// Every Nth status emission is a full (non-delta) packet.
pub const FULL_STATUS_INTERVAL: u32 = 10;

/// Largest datagram either status channel accepts.
pub const STATUS_BUFSIZE: usize = 8_192;

/// PCM frames per output RTP packet (keeps packets under typical MTU).
pub const PCM_FRAMES_PER_PACKET: usize = 240;

/// Hard ceiling on AGC gain, 120 dB as an amplitude ratio.
pub const MAX_GAIN: f32 = 1.0e6;

/// N0 smoothing factor applied once per filter block.
pub const N0_SMOOTH: f32 = 0.01;

/// Default directory for the preset file and other shared data.
pub const DEFAULT_LIBDIR: &str = "/usr/local/share/hsdr";

/// Default preset file name inside the libdir.
pub const MODE_FILE: &str = "modes.txt";

/// Startup configuration, constructed once in `main` and read-only after.
#[derive(Debug, Clone)]
pub struct RadioConfig {
    /// Multicast group carrying I/Q sample RTP datagrams.
    pub iq_target: String,
    /// Multicast group carrying the front end's TLV metadata (and accepting
    /// its commands).
    pub sdr_status_target: String,
    /// Multicast group we send PCM RTP datagrams to.
    pub pcm_target: String,
    /// Multicast group for our own TLV status/command channel.
    pub status_target: String,
    /// TTL applied to output sockets.
    pub mcast_ttl: u32,
    /// Join multicast groups we only send to (IGMP-snooping workaround).
    pub passive_join: bool,
    /// Directory holding the mode preset file.
    pub libdir: PathBuf,
    /// SSRC for the PCM output session.
    pub output_ssrc: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        RadioConfig {
            iq_target: String::new(),
            sdr_status_target: String::new(),
            pcm_target: String::new(),
            status_target: String::new(),
            mcast_ttl: DEFAULT_MCAST_TTL,
            passive_join: true,
            libdir: PathBuf::from(DEFAULT_LIBDIR),
            output_ssrc: 0,
        }
    }
}
