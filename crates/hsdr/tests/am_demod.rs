// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors
//
// End-to-end AM demodulation: a 20% modulated carrier pushed through the
// ring, channel pipeline and envelope demodulator, PCM collected from a
// loopback socket and analyzed. No multicast involved; everything runs
// in-process.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::unreadable_literal)]

use num_complex::Complex;
use std::f64::consts::TAU;
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

use hsdr::radio::demod;
use hsdr::radio::state::{Demod, DemodKind, RadioState};
use hsdr::radio::{IqRing, PcmOutput};
use hsdr::transport::rtp::{RtpHeader, PCM_MONO_PT};

const SAMPRATE: u32 = 48_000;
const L: usize = 12_288;
const M: usize = 4_097;
const MOD_FREQ: f64 = 1_000.0;
const MOD_INDEX: f64 = 0.2;

fn am_block(start: usize, len: usize) -> Vec<Complex<f32>> {
    (0..len)
        .map(|i| {
            let t = (start + i) as f64 / f64::from(SAMPRATE);
            let envelope = 1.0 + MOD_INDEX * (TAU * MOD_FREQ * t).cos();
            // Carrier at 0 Hz: the envelope rides on a DC phasor
            Complex::new(envelope as f32, 0.0)
        })
        .collect()
}

fn drain_pcm(rx: &UdpSocket, audio: &mut Vec<f32>) {
    let mut buf = [0u8; 2_048];
    loop {
        match rx.recv(&mut buf) {
            Ok(n) => {
                let Ok((h, at)) = RtpHeader::parse(&buf[..n]) else {
                    continue;
                };
                assert_eq!(h.payload_type, PCM_MONO_PT, "AM output must be mono PCM");
                for pair in buf[at..n].chunks_exact(2) {
                    audio.push(f32::from(i16::from_be_bytes([pair[0], pair[1]])) / 32_767.0);
                }
            }
            Err(_) => return, // drained (nonblocking)
        }
    }
}

#[test]
fn test_am_tone_demodulation() {
    let mut ds = Demod::default();
    ds.demod_type = DemodKind::Am;
    ds.input.samprate = SAMPRATE;
    ds.output.samprate = SAMPRATE;
    ds.filter.l = L;
    ds.filter.m = M;
    ds.filter.decimate = 1;
    ds.filter.low = -5_000.0;
    ds.filter.high = 5_000.0;
    ds.filter.kaiser_beta = 11.0;
    let state = Arc::new(RadioState::new(ds));
    let ring = Arc::new(IqRing::new(65_536));

    let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
    rx.set_nonblocking(true).unwrap();
    let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
    tx.connect(rx.local_addr().unwrap()).unwrap();

    let demod_thread = {
        let state = state.clone();
        let ring = ring.clone();
        std::thread::spawn(move || {
            let mut out = PcmOutput::new(tx, 1);
            demod::run(&state, &ring, &mut out);
        })
    };

    // One second of signal plus settling, fed a block at a time so the
    // consumer keeps pace with the ring
    let mut audio = Vec::new();
    let blocks = 5;
    for b in 0..blocks {
        ring.push(&am_block(b * L, L));
        // Give the demodulator time to drain the block
        for _ in 0..100 {
            if ring.depth() < L {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        drain_pcm(&rx, &mut audio);
    }
    std::thread::sleep(Duration::from_millis(50));
    drain_pcm(&rx, &mut audio);
    state.terminate();
    demod_thread.join().unwrap();

    assert!(
        audio.len() >= L * (blocks - 1),
        "collected only {} samples",
        audio.len()
    );

    // Analyze the steady-state half
    let steady = &audio[audio.len() / 2..];
    let peak = steady.iter().fold(0.0f32, |a, &x| a.max(x.abs()));
    // Envelope average 1.0 -> gain 0.5; modulation 0.2 -> audio peak 0.1
    assert!(
        (peak - 0.1).abs() < 0.02,
        "audio peak {peak}, expected ~0.1 (modulation x carrier-driven gain)"
    );

    // The modulation tone must dominate: correlate against 1 kHz
    let n = steady.len();
    let (mut c, mut s) = (0.0f64, 0.0f64);
    for (i, &x) in steady.iter().enumerate() {
        let ph = TAU * MOD_FREQ * i as f64 / f64::from(SAMPRATE);
        c += f64::from(x) * ph.cos();
        s += f64::from(x) * ph.sin();
    }
    let tone_amp = 2.0 * (c * c + s * s).sqrt() / n as f64;
    assert!(
        (tone_amp - 0.1).abs() < 0.02,
        "1 kHz component {tone_amp}, expected ~0.1"
    );
    let rms = (steady.iter().map(|&x| f64::from(x * x)).sum::<f64>() / n as f64).sqrt();
    let tone_rms = tone_amp / std::f64::consts::SQRT_2;
    assert!(
        rms < tone_rms * 1.2,
        "output energy {rms} not dominated by the tone {tone_rms}"
    );

    // Measurements left in the record
    let ds = state.ds.lock();
    assert!(
        (ds.agc.gain - 0.5).abs() < 0.05,
        "carrier-driven gain {} vs 0.5/carrier",
        ds.agc.gain
    );
    // bb_power ~ carrier^2 * (1 + m^2/2)
    assert!(
        (ds.sig.bb_power - 1.02).abs() < 0.03,
        "bb_power {} vs ~1.02",
        ds.sig.bb_power
    );
    assert_eq!(ds.sig.foffset, 0.0, "AM publishes no frequency offset");
    assert!(ds.sig.pdeviation.is_nan());
}
