// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors
//
// RTP session accounting driven from the wire: datagrams are emitted,
// parsed back and ingested, exactly as the ingress thread does.

#![allow(clippy::unreadable_literal)]

use hsdr::transport::rtp::{Ingest, RtpHeader, RtpSession, IQ_PT};

fn datagram(seq: u16, ts: u32, ssrc: u32, payload_samples: usize) -> Vec<u8> {
    let mut h = RtpHeader::new(IQ_PT, ssrc);
    h.seq = seq;
    h.timestamp = ts;
    let mut buf = vec![0u8; 12 + payload_samples * 4];
    let at = h.emit(&mut buf);
    assert_eq!(at, 12);
    buf
}

fn feed(session: &mut RtpSession, wire: &[u8]) -> Ingest {
    let (h, at) = RtpHeader::parse(wire).unwrap();
    let samples = ((wire.len() - at) / 4) as u32;
    session.ingest(&h, samples)
}

#[test]
fn test_clean_stream_no_drops_no_dupes() {
    let mut s = RtpSession::new(0xabcd, 0, 0);
    for seq in 0..1_000u16 {
        let wire = datagram(seq, u32::from(seq) * 240, 0xabcd, 240);
        assert_eq!(feed(&mut s, &wire), Ingest::Accept);
    }
    assert_eq!(s.packets, 1_000);
    assert_eq!(s.drops, 0);
    assert_eq!(s.dupes, 0);
    assert_eq!(s.expected_ts, 240_000);
}

#[test]
fn test_gap_drops_and_resync() {
    // Sequence numbers 0, 1, 2, 5: two lost packets
    let mut s = RtpSession::new(0xabcd, 0, 0);
    for &seq in &[0u16, 1, 2, 5] {
        feed(&mut s, &datagram(seq, 0, 0xabcd, 240));
    }
    assert_eq!(s.drops, 2);
    assert_eq!(s.dupes, 0);
    assert_eq!(s.expected_seq, 6);
}

#[test]
fn test_dupe_discarded_within_window() {
    // Sequence numbers 10, 11, 10, 12: the replay is discarded
    let mut s = RtpSession::new(0xabcd, 10, 0);
    let results: Vec<Ingest> = [10u16, 11, 10, 12]
        .iter()
        .map(|&seq| feed(&mut s, &datagram(seq, 0, 0xabcd, 240)))
        .collect();
    assert_eq!(
        results,
        vec![Ingest::Accept, Ingest::Accept, Ingest::Dupe, Ingest::Accept]
    );
    assert_eq!(s.packets, 3);
    assert_eq!(s.drops, 0);
    assert_eq!(s.dupes, 1);
}

#[test]
fn test_old_packet_outside_window_resyncs() {
    // A packet 100 behind is not a dupe; the session resynchronizes
    let mut s = RtpSession::new(0xabcd, 1_000, 0);
    feed(&mut s, &datagram(1_000, 0, 0xabcd, 240));
    assert_eq!(feed(&mut s, &datagram(900, 0, 0xabcd, 240)), Ingest::Accept);
    assert_eq!(s.expected_seq, 901);
    assert!(s.drops > 0);
}
