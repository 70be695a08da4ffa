// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! hsdr-metadump - dump an hsdr TLV status/command channel
//!
//! Subscribes to a status multicast group and pretty-prints every TLV item
//! of every datagram, with its direction byte. Useful for watching what a
//! radio and its controllers are actually saying to each other.

use anyhow::{Context, Result};
use clap::Parser;

use hsdr::protocol::{split_packet, Decoder, PacketType, StatusTag};
use hsdr::transport::multicast;

/// Dump a TLV status/command multicast channel
#[derive(Parser, Debug)]
#[command(name = "hsdr-metadump")]
#[command(version = hsdr::VERSION)]
struct Args {
    /// Status multicast group (host:port)
    target: String,

    /// Also dump raw value bytes
    #[arg(short, long)]
    verbose: bool,
}

fn type_name(item: &hsdr::protocol::Item<'_>) -> String {
    match item.tag {
        Some(tag) => format!("{tag:?}"),
        None => format!("unknown({})", item.raw_tag),
    }
}

/// Render a value by the natural width of its tag family: socket tags as
/// addresses, short items as integers, 4/8-byte items as float/double too
/// (the receiver cannot know which without the catalog semantics, so show
/// both readings like metadump does).
fn render(item: &hsdr::protocol::Item<'_>) -> String {
    if matches!(
        item.tag,
        Some(
            StatusTag::InputDataSourceSocket
                | StatusTag::InputDataDestSocket
                | StatusTag::InputMetadataSourceSocket
                | StatusTag::InputMetadataDestSocket
                | StatusTag::OutputDataSourceSocket
                | StatusTag::OutputDataDestSocket
        )
    ) {
        if let Some(addr) = item.as_socket() {
            return addr.to_string();
        }
    }
    if item.tag == Some(StatusTag::Description) {
        return format!("{:?}", item.as_string());
    }
    match item.value.len() {
        0..=3 => format!("{}", item.as_int()),
        4 => format!("{} ({})", item.as_int(), item.as_float()),
        8 => format!("{} ({})", item.as_int(), item.as_double()),
        _ => format!("{} bytes", item.value.len()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let sock = multicast::listen(&args.target)
        .with_context(|| format!("cannot subscribe to {}", args.target))?;

    let mut buf = [0u8; 8_192];
    loop {
        let (len, from) = sock.recv_from(&mut buf).context("recv")?;
        let Some((pt, body)) = split_packet(&buf[..len]) else {
            println!("{from}: {len} bytes, no direction byte");
            continue;
        };
        let dir = match pt {
            PacketType::Response => "STATUS",
            PacketType::Command => "CMD",
        };
        println!("{from} {dir} {len} bytes");
        for item in Decoder::new(body) {
            println!("  {} = {}", type_name(&item), render(&item));
            if args.verbose {
                println!("    raw: {:02x?}", item.value);
            }
        }
    }
}
