// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! The receiver proper: canonical state, tuning arithmetic, mode presets,
//! the I/Q ring and ingress thread, the per-block channel pipeline, the
//! demodulator family and the PCM egress.

pub mod demod;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod presets;
pub mod ring;
pub mod state;
pub mod tuning;

pub use output::PcmOutput;
pub use pipeline::Channel;
pub use presets::{Mode, ModeTable};
pub use ring::IqRing;
pub use state::{Demod, DemodKind, RadioState};
pub use tuning::Retune;
