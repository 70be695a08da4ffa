// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! hsdr-tune - one-shot command sender for an hsdr radio channel
//!
//! Builds a single TLV command packet from the command line and sends it to
//! a radio's status/command group. Frequencies accept the compact notation
//! with a scale letter in place of the decimal point: `147m435` is
//! 147.435 MHz, `7k2` is 7.2 kHz, `14m250` is 14.250 MHz.

use anyhow::{bail, Context, Result};
use clap::Parser;

use hsdr::protocol::{Encoder, PacketType, StatusTag};
use hsdr::radio::DemodKind;
use hsdr::transport::multicast;

/// Send a tuning/command packet to a radio
#[derive(Parser, Debug)]
#[command(name = "hsdr-tune")]
#[command(version = hsdr::VERSION)]
struct Args {
    /// Radio status/command multicast group (host:port)
    target: String,

    /// Carrier frequency (Hz, or compact form like 147m435)
    #[arg(short, long)]
    freq: Option<String>,

    /// Demodulator kind: am, fm, linear
    #[arg(short, long)]
    demod: Option<String>,

    /// Filter low edge, Hz
    #[arg(long)]
    low: Option<f32>,

    /// Filter high edge, Hz
    #[arg(long)]
    high: Option<f32>,

    /// Kaiser window beta
    #[arg(long)]
    beta: Option<f32>,

    /// Post-detection shift, Hz
    #[arg(long)]
    shift: Option<f64>,

    /// Enable (1) or disable (0) the carrier PLL
    #[arg(long)]
    pll: Option<u8>,

    /// Opaque tag echoed in the radio's answering status
    #[arg(long, default_value_t = 0x5d0)]
    tag: u64,
}

/// Parse a frequency entry: `12345` (Hz), `12k345` (12.345 kHz), `12m345`
/// (12.345 MHz), `12g345` (12.345 GHz). A bare number below 100 kHz gets a
/// band heuristic: under 500 it is read as MHz, under 100,000 as kHz.
fn parse_frequency(s: &str) -> Option<f64> {
    let lower = s.to_ascii_lowercase();
    let (mult, cooked) = if let Some(i) = lower.find('g') {
        (1e9, replace_at(&lower, i))
    } else if let Some(i) = lower.find('m') {
        (1e6, replace_at(&lower, i))
    } else if let Some(i) = lower.find('k') {
        (1e3, replace_at(&lower, i))
    } else {
        (1.0, lower)
    };
    let f: f64 = cooked.parse().ok()?;
    if f == 0.0 {
        return None;
    }
    if mult != 1.0 || f >= 1e5 {
        return Some(f * mult);
    }
    // No scale letter and suspiciously small: guess for the 100 kHz - 2 GHz
    // coverage range
    Some(if f < 100.0 {
        f * 1e6 // only MHz can be in band
    } else if f < 500.0 {
        f * 1e6 // MHz or kHz; assume MHz
    } else if f < 2_000.0 {
        f * 1e3 // kHz or MHz; assume kHz
    } else {
        f * 1e3 // only kHz can be in band
    })
}

fn replace_at(s: &str, i: usize) -> String {
    let mut out = s.to_string();
    out.replace_range(i..=i, ".");
    out
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut e = Encoder::new(PacketType::Command);
    e.int(StatusTag::CommandTag, args.tag);
    if let Some(entry) = &args.freq {
        let f = parse_frequency(entry)
            .with_context(|| format!("unparsable frequency {entry:?}"))?;
        e.double(StatusTag::RadioFrequency, f);
    }
    if let Some(name) = &args.demod {
        let Some(kind) = DemodKind::from_name(name) else {
            bail!("unknown demodulator {name:?} (am, fm, linear)");
        };
        e.int(StatusTag::DemodType, kind as u64);
    }
    if let Some(low) = args.low {
        e.float(StatusTag::LowEdge, low);
    }
    if let Some(high) = args.high {
        e.float(StatusTag::HighEdge, high);
    }
    if let Some(beta) = args.beta {
        e.float(StatusTag::KaiserBeta, beta);
    }
    if let Some(shift) = args.shift {
        e.double(StatusTag::ShiftFrequency, shift);
    }
    if let Some(pll) = args.pll {
        e.int(StatusTag::PllEnable, u64::from(pll.min(1)));
    }
    let packet = e.finish();

    let sock = multicast::connect(&args.target, 1, true)
        .with_context(|| format!("cannot reach {}", args.target))?;
    sock.send(&packet).context("send")?;
    println!("sent {} bytes to {}", packet.len(), args.target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_letters() {
        assert_eq!(parse_frequency("147m435"), Some(147_435_000.0));
        assert_eq!(parse_frequency("14m250"), Some(14_250_000.0));
        assert_eq!(parse_frequency("7k2"), Some(7_200.0));
        assert_eq!(parse_frequency("1g296"), Some(1_296_000_000.0));
    }

    #[test]
    fn test_plain_hertz() {
        assert_eq!(parse_frequency("146520000"), Some(146_520_000.0));
        assert_eq!(parse_frequency("100000"), Some(100_000.0));
    }

    #[test]
    fn test_band_heuristic() {
        assert_eq!(parse_frequency("14.25"), Some(14_250_000.0)); // MHz
        assert_eq!(parse_frequency("146.52"), Some(146_520_000.0)); // MHz
        assert_eq!(parse_frequency("600"), Some(600_000.0)); // kHz
        assert_eq!(parse_frequency("7100"), Some(7_100_000.0)); // kHz
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(parse_frequency(""), None);
        assert_eq!(parse_frequency("xyz"), None);
        assert_eq!(parse_frequency("0"), None);
    }
}
