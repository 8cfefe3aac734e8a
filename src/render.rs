// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration text rendering.
//!
//! Templates are embedded at compile time and expanded with plain placeholder
//! substitution. Rendering is pure: the same inputs always produce byte-identical
//! output, which is what lets the reconcilers detect drift by comparing text.

use crate::constants::UPSTREAM_RESOLVERS;
use ipnet::Ipv4Net;

// Embed configuration templates at compile time
const PEER_CONF_TEMPLATE: &str = include_str!("../templates/wg-peer.conf.tmpl");
const SERVER_CONF_TEMPLATE: &str = include_str!("../templates/wg-server.conf.tmpl");
const UNBOUND_CONF_TEMPLATE: &str = include_str!("../templates/unbound.conf.tmpl");

/// Inputs for a client-side interface configuration.
#[derive(Debug, Clone)]
pub struct PeerConfig<'a> {
    /// Tunnel address of the peer (`/32`)
    pub address: Ipv4Net,
    pub private_key: &'a str,
    pub dns: &'a str,
    /// Public key of the server the peer dials
    pub server_public_key: &'a str,
    /// `<host>:<port>` of the server
    pub endpoint: &'a str,
    pub allowed_ips: &'a str,
    /// Firewall rules run when the interface comes up
    pub post_up: &'a [String],
}

/// Inputs for the server-side interface configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig<'a> {
    /// Tunnel address of the server (`/32`)
    pub address: Ipv4Net,
    pub listen_port: i32,
    pub private_key: &'a str,
    /// Public key of the built-in default peer
    pub peer_public_key: &'a str,
    /// Tunnel address routed to the default peer (`/32`)
    pub peer_address: Ipv4Net,
    pub post_up: &'a [String],
}

/// Render a peer's `wg-quick` configuration.
#[must_use]
pub fn render_peer_config(config: &PeerConfig<'_>) -> String {
    PEER_CONF_TEMPLATE
        .replace("{{ADDRESS}}", &config.address.to_string())
        .replace("{{PRIVATE_KEY}}", config.private_key)
        .replace("{{DNS}}", config.dns)
        .replace("{{POST_UP}}", &post_up_lines(config.post_up))
        .replace("{{PEER_PUBLIC_KEY}}", config.server_public_key)
        .replace("{{ENDPOINT}}", config.endpoint)
        .replace("{{ALLOWED_IPS}}", config.allowed_ips)
}

/// Render the server's `wg-quick` configuration.
#[must_use]
pub fn render_server_config(config: &ServerConfig<'_>) -> String {
    SERVER_CONF_TEMPLATE
        .replace("{{ADDRESS}}", &config.address.to_string())
        .replace("{{LISTEN_PORT}}", &config.listen_port.to_string())
        .replace("{{PRIVATE_KEY}}", config.private_key)
        .replace("{{POST_UP}}", &post_up_lines(config.post_up))
        .replace("{{PEER_PUBLIC_KEY}}", config.peer_public_key)
        .replace("{{PEER_ALLOWED_IPS}}", &config.peer_address.to_string())
}

/// Render the resolver configuration for the DNS sidecar.
///
/// The resolver answers on loopback and on the tunnel address, accepts queries
/// from the tunnel subnet, and forwards everything upstream.
#[must_use]
pub fn render_unbound_config(tunnel_address: Ipv4Net, tunnel_subnet: Ipv4Net) -> String {
    let forward_addrs = UPSTREAM_RESOLVERS
        .iter()
        .map(|addr| format!("  forward-addr: {addr}"))
        .collect::<Vec<_>>()
        .join("\n");

    UNBOUND_CONF_TEMPLATE
        .replace("{{TUNNEL_ADDRESS}}", &tunnel_address.addr().to_string())
        .replace("{{TUNNEL_SUBNET}}", &tunnel_subnet.trunc().to_string())
        .replace("{{FORWARD_ADDRS}}", &forward_addrs)
}

// One `PostUp = <rule>` line per rule, each newline-terminated.
fn post_up_lines(rules: &[String]) -> String {
    rules.iter().map(|rule| format!("PostUp = {rule}\n")).collect()
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod render_tests;
