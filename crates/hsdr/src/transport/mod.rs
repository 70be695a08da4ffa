// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Network transport: multicast socket management and RTP framing.

pub mod multicast;
pub mod rtp;

pub use rtp::{Ingest, RtpHeader, RtpSession};
