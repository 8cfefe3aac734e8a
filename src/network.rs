// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tunnel subnet arithmetic and firewall rule synthesis.
//!
//! The rules produced here are embedded as `PostUp` lines in the rendered
//! interface configuration and executed by the WireGuard runtime when the
//! interface comes up. Nothing in this module touches the host firewall.

use crate::constants::EGRESS_INTERFACE;
use crate::errors::{Error, Result};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// First and last usable host of a tunnel subnet, each as a `/32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBounds {
    pub first: Ipv4Net,
    pub last: Ipv4Net,
}

/// Parse an IPv4 CIDR. A bare address is accepted as a `/32`.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] when the value is neither.
pub fn parse_cidr(value: &str) -> Result<Ipv4Net> {
    let trimmed = value.trim();
    if let Ok(net) = trimmed.parse::<Ipv4Net>() {
        return Ok(net);
    }
    trimmed
        .parse::<Ipv4Addr>()
        .map(Ipv4Net::from)
        .map_err(|e| Error::InvalidAddress {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Tunnel address of a single host, always returned as a `/32`.
///
/// Peers may declare their address with or without a prefix length; only the
/// host part is kept.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] when the value is not an IPv4 address or CIDR.
pub fn host_address(value: &str) -> Result<Ipv4Net> {
    let net = parse_cidr(value)?;
    Ok(single_host(net.addr()))
}

/// Compute the first and last usable host of `cidr`.
///
/// The network and broadcast addresses are excluded. `/31` and `/32` have no
/// such addresses and return their own bounds.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] when `cidr` does not parse.
pub fn host_bounds(cidr: &str) -> Result<HostBounds> {
    let net = parse_cidr(cidr)?;
    let network = u32::from(net.network());
    let broadcast = u32::from(net.broadcast());

    let (first, last) = if net.prefix_len() >= 31 {
        (network, broadcast)
    } else {
        (network + 1, broadcast - 1)
    };

    Ok(HostBounds {
        first: single_host(Ipv4Addr::from(first)),
        last: single_host(Ipv4Addr::from(last)),
    })
}

/// First usable host of `cidr` as a `/32`.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] when `cidr` does not parse.
pub fn first_host(cidr: &str) -> Result<Ipv4Net> {
    host_bounds(cidr).map(|bounds| bounds.first)
}

/// Last usable host of `cidr` as a `/32`.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] when `cidr` does not parse.
pub fn last_host(cidr: &str) -> Result<Ipv4Net> {
    host_bounds(cidr).map(|bounds| bounds.last)
}

fn single_host(addr: Ipv4Addr) -> Ipv4Net {
    Ipv4Net::from(addr)
}

/// Build the firewall rules for a tunnel whose traffic originates from `source`.
///
/// Always contains, in order: the inbound and outbound forward-accept rules for
/// the tunnel interface, the NAT masquerade rule for `source` leaving through
/// the primary interface, then one forward-drop rule per entry of `drop_to`.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] for any entry of `drop_to` that does not parse.
pub fn firewall_rules(source: Ipv4Net, drop_to: &[String]) -> Result<Vec<String>> {
    let mut rules = vec![
        "iptables --append FORWARD --in-interface %i --jump ACCEPT".to_string(),
        "iptables --append FORWARD --out-interface %i --jump ACCEPT".to_string(),
        format!(
            "iptables --table nat --append POSTROUTING --source {source} --out-interface {EGRESS_INTERFACE} --jump MASQUERADE"
        ),
    ];

    for target in drop_to {
        let destination = parse_cidr(target)?;
        rules.push(format!(
            "iptables --insert FORWARD --source {source} --destination {destination} --jump DROP"
        ));
    }

    Ok(rules)
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod network_tests;
