// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # WireGuard Operator for Kubernetes
//!
//! A Kubernetes operator written in Rust that runs WireGuard VPN servers and
//! their peers from two Custom Resource Definitions in the `vpn.ahova.com` group.
//!
//! ## Overview
//!
//! For every `Wireguard` server and every `WireguardPeer` the operator keeps four
//! children in step with the spec: a key Secret holding the rendered `wg-quick`
//! configuration, a ConfigMap for the DNS sidecar, a Deployment running the
//! tunnel, and a UDP Service exposing it. A server publishes its public key and
//! endpoint in status; its peers render their client configuration from them.
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - The reconciliation pass shared by both kinds
//! - [`wireguard_resources`] - Builders and drift checks for the managed children
//! - [`network`] - Address arithmetic and firewall rules
//! - [`render`] - `wg-quick` and resolver configuration templates
//! - [`keys`] - X25519 key generation
//! - [`context`] - Collaborators injected into the reconcilers
//!
//! ## Example
//!
//! ```rust,no_run
//! use wireguard_operator::crd::WireguardSpec;
//!
//! let spec: WireguardSpec = serde_json::from_value(serde_json::json!({
//!     "replicas": 2,
//!     "address": "10.8.0.0/24",
//!     "dropConnectionsTo": ["10.0.0.0/8"],
//! }))
//! .unwrap();
//! assert_eq!(spec.listen_port, 51820);
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod keys;
pub mod labels;
pub mod metrics;
pub mod network;
pub mod reconcilers;
pub mod render;
pub mod server;
pub mod status_reasons;
pub mod wireguard_resources;

#[cfg(test)]
pub(crate) mod test_fixtures;
