// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 hsdr contributors

//! Multicast UDP socket setup for the four receiver streams.
//!
//! Input sockets bind the group address and join it; output sockets connect
//! to the group and carry the configured TTL with loopback enabled. Both
//! kinds get SO_REUSEADDR, SO_REUSEPORT and SO_LINGER off so several
//! receiver processes can share one machine and one group.
//!
//! Output sockets optionally *also* join the group they send to ("passive
//! join"). Strictly this is unnecessary, but IGMP-snooping switches that
//! discard unsubscribed groups will otherwise drop our own traffic — or,
//! configured the other way, flood it everywhere. Subscribing to our own
//! transmissions keeps a membership report on the wire and sidesteps both
//! behaviors. It is on by default and exposed as a setting.

use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use crate::config::DEFAULT_RTP_PORT;
use crate::error::{RadioError, Result};

/// Resolve a `host:port` or bare `host` target to a socket address.
///
/// IPv4 and IPv6 are both accepted; the address family of the result drives
/// the socket domain. A missing port falls back to `default_port`.
pub fn resolve_target(target: &str, default_port: u16) -> Result<SocketAddr> {
    // Try the string as-is (host:port, [v6]:port), then with the default port.
    if let Ok(mut addrs) = target.to_socket_addrs() {
        if let Some(addr) = addrs.next() {
            return Ok(addr);
        }
    }
    if let Ok(mut addrs) = (target, default_port).to_socket_addrs() {
        if let Some(addr) = addrs.next() {
            return Ok(addr);
        }
    }
    Err(RadioError::BadAddress(target.to_string()))
}

/// Common socket options shared by input and output sockets.
fn base_socket(addr: SocketAddr) -> Result<Socket> {
    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let sock = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    // Failures past this point would only lose the sharing niceties, but
    // these options are portable; treat errors as real.
    sock.set_reuse_address(true)?;
    #[cfg(unix)]
    sock.set_reuse_port(true)?;
    sock.set_linger(None)?;
    Ok(sock)
}

fn join_group(sock: &UdpSocket, addr: SocketAddr) {
    let res = match addr.ip() {
        IpAddr::V4(group) => {
            if !group.is_multicast() {
                return;
            }
            sock.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
        }
        IpAddr::V6(group) => {
            if !group.is_multicast() {
                return;
            }
            sock.join_multicast_v6(&group, 0)
        }
    };
    // Non-fatal: unicast test targets and interface quirks land here.
    if let Err(e) = res {
        log::warn!("[MCAST] join {} failed (non-fatal): {}", addr.ip(), e);
    }
}

/// Create a receive socket bound to `target` and joined to its group.
pub fn listen(target: &str) -> Result<UdpSocket> {
    let addr = resolve_target(target, DEFAULT_RTP_PORT)?;
    let sock = base_socket(addr)?;
    sock.bind(&addr.into())?;
    let sock: UdpSocket = sock.into();
    join_group(&sock, addr);
    log::debug!("[MCAST] listening on {}", addr);
    Ok(sock)
}

/// Create a send socket connected to `target` with the given TTL.
///
/// `passive_join` subscribes the sending socket to its own group (see module
/// docs for why that is the default).
pub fn connect(target: &str, ttl: u32, passive_join: bool) -> Result<UdpSocket> {
    let addr = resolve_target(target, DEFAULT_RTP_PORT)?;
    let sock = base_socket(addr)?;
    match addr.ip() {
        IpAddr::V4(_) => {
            sock.set_multicast_ttl_v4(ttl)?;
            sock.set_multicast_loop_v4(true)?;
        }
        IpAddr::V6(_) => {
            sock.set_multicast_hops_v6(ttl)?;
            sock.set_multicast_loop_v6(true)?;
        }
    }
    sock.connect(&addr.into())?;
    let sock: UdpSocket = sock.into();
    if passive_join {
        join_group(&sock, addr);
    }
    log::debug!("[MCAST] sending to {} ttl={}", addr, ttl);
    Ok(sock)
}
