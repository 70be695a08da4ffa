// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Delta compression for the status channel.
//!
//! The sender remembers the last value it emitted per tag. Incremental
//! packets carry only tags whose value changed; full packets (boot, every
//! Nth, right after a command) carry everything and refresh the cache.
//! This bounds steady-state status traffic to the handful of signal
//! measurements that actually move.

use super::tags::StatusTag;

/// Per-tag cache of the last emitted value bytes.
pub struct StatusCache {
    last: Vec<Option<Vec<u8>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        StatusCache {
            last: vec![None; 256],
        }
    }

    /// Bookkeeping tags survive compaction so receivers can always correlate
    /// a status packet with the command that triggered it.
    fn always_keep(tag: u8) -> bool {
        tag == StatusTag::CommandTag as u8 || tag == StatusTag::Commands as u8
    }

    /// Rewrite an encoded packet, dropping unchanged items unless `full`.
    ///
    /// The input is a complete datagram (direction byte, TLV items, EOL);
    /// the output has the same shape. The cache updates from every item
    /// either way, so a later incremental send compares against what was
    /// last put on the wire by *any* packet.
    pub fn compact(&mut self, packet: &[u8], full: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(packet.len());
        let Some((&cr, body)) = packet.split_first() else {
            return out;
        };
        out.push(cr);

        let mut pos = 0;
        while pos < body.len() {
            let tag = body[pos];
            if tag == StatusTag::Eol as u8 {
                break;
            }
            if pos + 1 >= body.len() {
                break;
            }
            let len = body[pos + 1] as usize;
            let end = pos + 2 + len;
            if end > body.len() {
                break;
            }
            let value = &body[pos + 2..end];
            let changed = self.last[tag as usize].as_deref() != Some(value);
            if full || changed || Self::always_keep(tag) {
                out.extend_from_slice(&body[pos..end]);
            }
            if changed {
                self.last[tag as usize] = Some(value.to_vec());
            }
            pos = end;
        }
        out.push(StatusTag::Eol as u8);
        out
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{Decoder, Encoder};
    use crate::protocol::tags::PacketType;

    fn status_packet(packets: u64, freq: f64) -> Vec<u8> {
        let mut e = Encoder::new(PacketType::Response);
        e.int(StatusTag::CommandTag, 0x42)
            .int(StatusTag::Commands, 3)
            .double(StatusTag::RadioFrequency, freq)
            .int(StatusTag::OutputDataPackets, packets);
        e.finish()
    }

    #[test]
    fn test_full_packet_keeps_everything() {
        let mut cache = StatusCache::new();
        let p = status_packet(100, 14.25e6);
        let out = cache.compact(&p, true);
        assert_eq!(out, p);
    }

    #[test]
    fn test_delta_keeps_only_changed_tags() {
        let mut cache = StatusCache::new();
        let _ = cache.compact(&status_packet(100, 14.25e6), true);
        // Only the packet counter moved
        let out = cache.compact(&status_packet(101, 14.25e6), false);
        let tags: Vec<u8> = Decoder::new(&out[1..]).map(|i| i.raw_tag).collect();
        assert_eq!(
            tags,
            vec![
                StatusTag::CommandTag as u8,
                StatusTag::Commands as u8,
                StatusTag::OutputDataPackets as u8,
            ],
            "delta must carry the changed tag plus bookkeeping only"
        );
    }

    #[test]
    fn test_delta_then_full_resends_all() {
        let mut cache = StatusCache::new();
        let _ = cache.compact(&status_packet(100, 14.25e6), true);
        let _ = cache.compact(&status_packet(101, 14.25e6), false);
        let out = cache.compact(&status_packet(101, 14.25e6), true);
        let n = Decoder::new(&out[1..]).count();
        assert_eq!(n, 4, "full packet resends unchanged tags too");
    }

    #[test]
    fn test_unchanged_delta_is_bookkeeping_only() {
        let mut cache = StatusCache::new();
        let p = status_packet(100, 14.25e6);
        let _ = cache.compact(&p, true);
        let out = cache.compact(&p, false);
        let tags: Vec<u8> = Decoder::new(&out[1..]).map(|i| i.raw_tag).collect();
        assert_eq!(
            tags,
            vec![StatusTag::CommandTag as u8, StatusTag::Commands as u8]
        );
    }
}
