// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! PCM egress: frame demodulated audio into RTP and send it to the output
//! multicast group.
//!
//! Mono goes out as payload type 11, stereo as 10, both 16-bit big-endian.
//! Blocks are chunked so a packet never exceeds a typical MTU. The output
//! level published on the status channel is a smoothed mean square of what
//! was actually sent.

use num_complex::Complex;
use std::net::UdpSocket;
use std::sync::Arc;

use super::state::RadioState;
use crate::config::PCM_FRAMES_PER_PACKET;
use crate::transport::rtp::{RtpSender, PCM_MONO_PT, PCM_STEREO_PT, RTP_MIN_SIZE};

/// Level smoothing per packet.
const LEVEL_SMOOTH: f32 = 0.05;

pub struct PcmOutput {
    sock: UdpSocket,
    sender: RtpSender,
    level: f32,
}

fn clamp_i16(x: f32) -> i16 {
    (x * 32_767.0).clamp(-32_767.0, 32_767.0) as i16
}

impl PcmOutput {
    pub fn new(sock: UdpSocket, ssrc: u32) -> Self {
        PcmOutput {
            sock,
            sender: RtpSender::new(ssrc),
            level: 0.0,
        }
    }

    /// Send a block of mono samples scaled by `gain`.
    pub fn send_mono(&mut self, state: &Arc<RadioState>, samples: &[f32], gain: f32) {
        let mut buf = [0u8; RTP_MIN_SIZE + PCM_FRAMES_PER_PACKET * 2];
        for chunk in samples.chunks(PCM_FRAMES_PER_PACKET) {
            let h = self
                .sender
                .next_header(PCM_MONO_PT, chunk.len() as u32, false);
            let mut at = h.emit(&mut buf);
            let mut sum = 0.0f32;
            for &s in chunk {
                let v = s * gain;
                sum += v * v;
                buf[at..at + 2].copy_from_slice(&clamp_i16(v).to_be_bytes());
                at += 2;
            }
            self.level += LEVEL_SMOOTH * (sum / chunk.len() as f32 - self.level);
            if let Err(e) = self.sock.send(&buf[..at]) {
                log::warn!("[OUTPUT] PCM send failed: {e}");
            }
        }
        self.update(state, samples.len() as u64);
    }

    /// Send a block of complex samples as stereo (I left, Q right), scaled
    /// by `gain`.
    pub fn send_stereo(&mut self, state: &Arc<RadioState>, samples: &[Complex<f32>], gain: f32) {
        let mut buf = [0u8; RTP_MIN_SIZE + PCM_FRAMES_PER_PACKET * 4];
        for chunk in samples.chunks(PCM_FRAMES_PER_PACKET) {
            let h = self
                .sender
                .next_header(PCM_STEREO_PT, chunk.len() as u32, false);
            let mut at = h.emit(&mut buf);
            let mut sum = 0.0f32;
            for s in chunk {
                let l = s.re * gain;
                let r = s.im * gain;
                sum += (l * l + r * r) / 2.0;
                buf[at..at + 2].copy_from_slice(&clamp_i16(l).to_be_bytes());
                buf[at + 2..at + 4].copy_from_slice(&clamp_i16(r).to_be_bytes());
                at += 4;
            }
            self.level += LEVEL_SMOOTH * (sum / chunk.len() as f32 - self.level);
            if let Err(e) = self.sock.send(&buf[..at]) {
                log::warn!("[OUTPUT] PCM send failed: {e}");
            }
        }
        self.update(state, samples.len() as u64);
    }

    fn update(&self, state: &Arc<RadioState>, samples: u64) {
        let mut ds = state.ds.lock();
        ds.output.rtp_packets = self.sender.packets;
        ds.output.samples += samples;
        ds.output.level = self.level;
    }
}
