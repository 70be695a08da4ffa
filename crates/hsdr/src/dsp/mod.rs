// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Signal-processing primitives: NCO, Kaiser-windowed FIR synthesis, and the
//! overlap-save fast-convolution channel filter.

pub mod filter;
pub mod osc;
pub mod window;

pub use filter::{FastConvolver, OutputMode};
pub use osc::Oscillator;
pub use window::{i0, kaiser, window_filter, window_rfilter};
