// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! # hsdr - multicast software-defined radio receiver
//!
//! A distributed SDR receiver in pure Rust. A front-end process publishes
//! complex baseband I/Q over RTP multicast; one or more `hsdr-radiod`
//! processes subscribe, translate and channel-filter the stream with an
//! overlap-save fast convolver, demodulate (AM envelope, FM discriminator,
//! or coherent linear with optional PLL and independent sideband), and
//! publish PCM audio to another multicast group. A sibling TLV channel
//! carries status out and commands in, with delta compression keeping the
//! steady-state traffic small.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        hsdr-radiod process                         |
//! |  ingress thread      demodulator thread        status thread       |
//! |  RTP I/Q -> ring --> spindown -> channelizer   TLV in/out, tuning  |
//! |                       -> demod -> PCM RTP                          |
//! +--------------------------------------------------------------------+
//! |                          core library                              |
//! |   dsp: NCO | Kaiser FIR synthesis | overlap-save convolver         |
//! |   transport: multicast sockets | RTP framing + session tracking    |
//! |   protocol: TLV tags | codec | delta cache                         |
//! |   radio: state record | tuning | presets | pipeline | demods       |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`radio::Demod`] | The canonical state record: every tunable and measurable quantity |
//! | [`radio::RadioState`] | Shared handle: narrow mutex, event conditions, terminate flag |
//! | [`dsp::FastConvolver`] | Overlap-save channel filter with decimation |
//! | [`protocol::Encoder`] / [`protocol::Decoder`] | TLV status/command codec |
//! | [`status::StatusService`] | The control-plane thread |

/// Process-wide configuration: constants and the startup record.
pub mod config;
/// Signal processing: NCO, Kaiser windows, fast convolution.
pub mod dsp;
/// Crate-wide error type.
pub mod error;
/// TLV status/command protocol (tags, codec, delta cache).
pub mod protocol;
/// Receiver state, tuning, presets, pipeline and demodulators.
pub mod radio;
/// Status service thread (protocol endpoint and tuning logic).
pub mod status;
/// Multicast sockets and RTP framing.
pub mod transport;

pub use config::RadioConfig;
pub use error::{RadioError, Result};
pub use radio::{Demod, DemodKind, RadioState};

/// hsdr version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
