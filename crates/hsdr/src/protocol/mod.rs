// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! TLV status/command protocol.
//!
//! Every tunable and measurable quantity of the receiver travels as a typed
//! item on a multicast status channel; the same catalog of tags, sent the
//! other way with the command direction byte, forms the control surface.
//! See [`tags::StatusTag`] for the catalog, [`codec`] for the wire format
//! and [`cache`] for the delta compression applied to steady-state status.

pub mod cache;
pub mod codec;
pub mod tags;

pub use cache::StatusCache;
pub use codec::{split_packet, Decoder, Encoder, Item};
pub use tags::{PacketType, StatusTag};
