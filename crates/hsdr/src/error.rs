// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Crate-wide error type.
//!
//! One enum covers the failure families the receiver distinguishes:
//! configuration (fatal at startup), transport, and DSP parameterization.
//! Protocol decode problems are not errors at all: a malformed TLV stream
//! is truncated at the first bad length and the rest of the datagram is
//! ignored. Worker threads never propagate errors across thread
//! boundaries; they log, clean up, and exit on the terminate flag.

use std::fmt;
use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RadioError>;

/// Receiver error kinds, named by what they mean.
#[derive(Debug)]
pub enum RadioError {
    // ========================================================================
    // Configuration errors (fatal at startup, non-fatal afterwards)
    // ========================================================================
    /// Multicast target did not parse/resolve to a usable address.
    BadAddress(String),
    /// Mode name not present in the preset table.
    UnknownMode(String),
    /// Preset file missing or unreadable.
    PresetFile(String),
    /// Filter parameters are structurally invalid (e.g. `high < low`, L or M zero).
    BadFilterParams(String),

    // ========================================================================
    // Transport errors
    // ========================================================================
    /// Socket setup or send/recv failure.
    Io(io::Error),
    /// Datagram shorter than the RTP fixed header.
    ShortDatagram(usize),
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioError::BadAddress(s) => write!(f, "unusable multicast target: {s}"),
            RadioError::UnknownMode(s) => write!(f, "unknown mode: {s}"),
            RadioError::PresetFile(s) => write!(f, "preset file: {s}"),
            RadioError::BadFilterParams(s) => write!(f, "bad filter parameters: {s}"),
            RadioError::Io(e) => write!(f, "i/o error: {e}"),
            RadioError::ShortDatagram(n) => write!(f, "datagram too short: {n} bytes"),
        }
    }
}

impl std::error::Error for RadioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RadioError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RadioError {
    fn from(e: io::Error) -> Self {
        RadioError::Io(e)
    }
}
