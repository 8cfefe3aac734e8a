// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for WireGuard tunnels.
//!
//! This module defines the Kubernetes Custom Resource Definitions used to run
//! WireGuard VPN servers and their peers declaratively.
//!
//! # Resource Types
//!
//! - [`Wireguard`] - A VPN server: key material, tunnel pods and a public Service
//! - [`WireguardPeer`] - A peer attached to a server through `wireguardRef`
//!
//! # Example: Creating a server and a peer
//!
//! ```yaml
//! apiVersion: vpn.ahova.com/v1alpha1
//! kind: Wireguard
//! metadata:
//!   name: office
//!   namespace: vpn
//! spec:
//!   replicas: 1
//!   address: 192.168.254.253/30
//!   dropConnectionsTo:
//!     - 10.0.0.0/8
//! ---
//! apiVersion: vpn.ahova.com/v1alpha1
//! kind: WireguardPeer
//! metadata:
//!   name: laptop
//!   namespace: vpn
//! spec:
//!   wireguardRef: office
//!   address: 192.168.254.2
//! ```

use crate::constants::{
    DEFAULT_LISTEN_PORT, DEFAULT_PEER_ADDRESS, DEFAULT_SERVER_ADDRESS, DEFAULT_SERVICE_TYPE,
    DEFAULT_UNBOUND_IMAGE, MIN_REPLICAS,
};
use k8s_openapi::api::core::v1::{Affinity, Container};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition: Available or Degraded.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// DNS resolver sidecar settings.
///
/// When enabled, an unbound container runs next to the tunnel and the pod resolves
/// exclusively through it on `127.0.0.1`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDns {
    /// Run the resolver sidecar.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Resolver image.
    #[serde(default = "default_unbound_image")]
    pub image: String,
}

impl Default for ExternalDns {
    fn default() -> Self {
        Self {
            enabled: true,
            image: default_unbound_image(),
        }
    }
}

/// DNS server advertised to peers of a server.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    /// Address written into the `DNS =` line of every peer configuration.
    pub address: String,
}

/// `Wireguard` runs a WireGuard VPN server.
///
/// The operator mints the server key pair, renders the interface configuration
/// with forwarding and NAT rules, and exposes the tunnel through a UDP Service.
/// A default peer is provisioned alongside the server; supply `peerPublicKey`
/// to keep that peer's private key outside the cluster.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vpn.ahova.com",
    version = "v1alpha1",
    kind = "Wireguard",
    namespaced,
    shortname = "wg",
    doc = "Wireguard runs a WireGuard VPN server with its key material, tunnel Deployment and UDP Service.",
    printcolumn = r#"{"name":"Endpoint","type":"string","jsonPath":".status.endpoint"}"#,
    printcolumn = r#"{"name":"Available","type":"string","jsonPath":".status.conditions[?(@.type=='Available')].status"}"#
)]
#[kube(status = "WireguardStatus")]
#[serde(rename_all = "camelCase")]
pub struct WireguardSpec {
    /// Number of tunnel pods.
    #[serde(default = "default_replicas")]
    #[schemars(range(min = 1, max = 3))]
    pub replicas: i32,

    /// UDP port the tunnel listens on.
    #[serde(default = "default_listen_port")]
    #[schemars(range(min = 1, max = 65535))]
    pub listen_port: i32,

    /// Tunnel subnet in CIDR form. The first host is the server, the last host
    /// is handed to the default peer.
    #[serde(default = "default_server_address")]
    pub address: String,

    /// Public host peers dial. Falls back to the Service's load balancer
    /// ingress, then to `localhost`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_address: Option<String>,

    /// Resolver sidecar settings.
    #[serde(default)]
    pub external_dns: ExternalDns,

    /// DNS server advertised to peers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsConfig>,

    /// Extra containers appended to the tunnel pod after the built-in ones.
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_list")]
    pub sidecars: Vec<Container>,

    /// Destinations the tunnel refuses to forward to (CIDR form).
    #[serde(default)]
    pub drop_connections_to: Vec<String>,

    /// Scheduling constraints for the tunnel pods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub affinity: Option<Affinity>,

    /// Annotations copied onto the Service, e.g. for cloud load balancers.
    #[serde(default)]
    pub service_annotations: BTreeMap<String, String>,

    /// Service type used to expose the tunnel.
    #[serde(default = "default_service_type")]
    pub service_type: String,

    /// Public key of the default peer. When set, the operator never generates
    /// or stores that peer's private key or client configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_public_key: Option<String>,
}

/// `Wireguard` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireguardStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Server public key, mirrored from the live key Secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// `<host>:<port>` peers dial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// `WireguardPeer` attaches a client to a `Wireguard` server.
///
/// The peer's client configuration is rendered from its parent's published
/// public key and endpoint, so a peer converges only after its server has.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "vpn.ahova.com",
    version = "v1alpha1",
    kind = "WireguardPeer",
    namespaced,
    shortname = "wgp",
    doc = "WireguardPeer is a client of a Wireguard server, referenced by wireguardRef.",
    printcolumn = r#"{"name":"Server","type":"string","jsonPath":".spec.wireguardRef"}"#,
    printcolumn = r#"{"name":"Available","type":"string","jsonPath":".status.conditions[?(@.type=='Available')].status"}"#
)]
#[kube(status = "WireguardPeerStatus")]
#[serde(rename_all = "camelCase")]
pub struct WireguardPeerSpec {
    /// Name of the `Wireguard` server in the same namespace.
    pub wireguard_ref: String,

    /// Tunnel address of this peer.
    #[serde(default = "default_peer_address")]
    pub address: String,

    /// Bring-your-own public key. When set, no private key or client
    /// configuration is ever generated or stored for this peer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// Resolver sidecar settings.
    #[serde(default)]
    pub external_dns: ExternalDns,

    /// Extra containers appended to the peer pod after the built-in ones.
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_list")]
    pub sidecars: Vec<Container>,

    /// Destinations this peer's tunnel refuses to forward to (CIDR form).
    #[serde(default)]
    pub drop_connections_to: Vec<String>,
}

/// `WireguardPeer` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireguardPeerStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_replicas() -> i32 {
    MIN_REPLICAS
}

fn default_listen_port() -> i32 {
    DEFAULT_LISTEN_PORT
}

fn default_server_address() -> String {
    DEFAULT_SERVER_ADDRESS.to_string()
}

fn default_peer_address() -> String {
    DEFAULT_PEER_ADDRESS.to_string()
}

fn default_service_type() -> String {
    DEFAULT_SERVICE_TYPE.to_string()
}

fn default_unbound_image() -> String {
    DEFAULT_UNBOUND_IMAGE.to_string()
}

// Core/v1 types are kept opaque in the CRD schema; the API server validates them
// when the Deployment is created.
fn preserve_unknown_list(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "array",
        "items": {
            "type": "object",
            "x-kubernetes-preserve-unknown-fields": true
        }
    })
}

fn preserve_unknown_object(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "nullable": true,
        "x-kubernetes-preserve-unknown-fields": true
    })
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
