// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! I/Q ingress thread.
//!
//! Reads RTP datagrams from the front end's data group, tracks the RTP
//! session, converts the payload to complex floats and appends to the ring.
//! This thread never blocks on the ring; if the demodulator cannot keep up,
//! samples are lapped there.

use num_complex::Complex;
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

use super::ring::IqRing;
use super::state::RadioState;
use crate::transport::rtp::{Ingest, RtpHeader, IQ_FLOAT_PT, IQ_PT};

/// Largest I/Q datagram we accept; comfortably above jumbo-frame payloads.
const BUFSIZE: usize = 16_384;

/// Convert a big-endian i16 interleaved I/Q payload.
fn convert_i16(payload: &[u8], out: &mut Vec<Complex<f32>>) {
    out.clear();
    for pair in payload.chunks_exact(4) {
        let i = i16::from_be_bytes([pair[0], pair[1]]);
        let q = i16::from_be_bytes([pair[2], pair[3]]);
        out.push(Complex::new(
            f32::from(i) / 32_768.0,
            f32::from(q) / 32_768.0,
        ));
    }
}

/// Convert a big-endian f32 interleaved I/Q payload.
fn convert_f32(payload: &[u8], out: &mut Vec<Complex<f32>>) {
    out.clear();
    for pair in payload.chunks_exact(8) {
        let i = f32::from_be_bytes([pair[0], pair[1], pair[2], pair[3]]);
        let q = f32::from_be_bytes([pair[4], pair[5], pair[6], pair[7]]);
        out.push(Complex::new(i, q));
    }
}

/// Ingress thread body. Returns when the terminate flag goes up.
pub fn run(sock: &UdpSocket, ring: &Arc<IqRing>, state: &Arc<RadioState>) {
    // Poll the terminate flag between datagrams
    if let Err(e) = sock.set_read_timeout(Some(Duration::from_millis(100))) {
        log::error!("[INPUT] cannot set socket timeout: {e}");
        return;
    }
    let mut buf = [0u8; BUFSIZE];
    let mut samples: Vec<Complex<f32>> = Vec::with_capacity(BUFSIZE / 4);

    log::info!("[INPUT] ingress thread running");
    while !state.is_terminated() {
        let (len, from) = match sock.recv_from(&mut buf) {
            Ok(r) => r,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue, // EINTR: retry silently
            Err(e) => {
                log::warn!("[INPUT] recv error: {e}; retrying");
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
        };

        let (header, payload_at) = match RtpHeader::parse(&buf[..len]) {
            Ok(r) => r,
            Err(_) => {
                // Runt datagram; don't spin on a babbling sender
                std::thread::sleep(Duration::from_micros(500));
                continue;
            }
        };
        let payload = &buf[payload_at..len];
        match header.payload_type {
            IQ_PT => convert_i16(payload, &mut samples),
            IQ_FLOAT_PT => convert_f32(payload, &mut samples),
            other => {
                log::debug!("[INPUT] unknown payload type {other}, dropped");
                continue;
            }
        }

        {
            let mut ds = state.ds.lock();
            ds.input.data_source = Some(from);
            if ds.input.rtp.ingest(&header, samples.len() as u32) == Ingest::Dupe {
                continue;
            }
            ds.input.samples += samples.len() as u64;
        }
        ring.push(&samples);
    }
    log::info!("[INPUT] ingress thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_i16_scaling() {
        // Full-scale positive I, half-scale negative Q
        let payload = [0x7f, 0xff, 0xc0, 0x00];
        let mut out = Vec::new();
        convert_i16(&payload, &mut out);
        assert_eq!(out.len(), 1);
        assert!((out[0].re - 0.99997).abs() < 1e-4);
        assert!((out[0].im + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_convert_i16_ignores_trailing_bytes() {
        let payload = [0, 1, 0, 2, 0xff]; // one pair + runt tail
        let mut out = Vec::new();
        convert_i16(&payload, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_convert_f32_roundtrip() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0.25f32.to_be_bytes());
        payload.extend_from_slice(&(-1.0f32).to_be_bytes());
        let mut out = Vec::new();
        convert_f32(&payload, &mut out);
        assert_eq!(out, vec![Complex::new(0.25, -1.0)]);
    }
}
