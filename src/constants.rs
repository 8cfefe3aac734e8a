// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the WireGuard operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all WireGuard CRDs
pub const API_GROUP: &str = "vpn.ahova.com";

/// API version for all WireGuard CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "vpn.ahova.com/v1alpha1";

/// Kind name for the `Wireguard` server resource
pub const KIND_WIREGUARD: &str = "Wireguard";

/// Kind name for the `WireguardPeer` resource
pub const KIND_WIREGUARD_PEER: &str = "WireguardPeer";

/// Kind names for managed children, used in logs, metrics and errors
pub const KIND_SECRET: &str = "Secret";
pub const KIND_CONFIGMAP: &str = "ConfigMap";
pub const KIND_DEPLOYMENT: &str = "Deployment";
pub const KIND_SERVICE: &str = "Service";

// ============================================================================
// Finalizers
// ============================================================================

/// Deletion guard attached to both resource kinds
pub const FINALIZER_WIREGUARD: &str = "vpn.ahova.com/finalizer";

// ============================================================================
// WireGuard Defaults
// ============================================================================

/// Default UDP listen port of the tunnel interface
pub const DEFAULT_LISTEN_PORT: i32 = 51820;

/// Default server tunnel subnet
pub const DEFAULT_SERVER_ADDRESS: &str = "192.168.254.253/30";

/// Default peer tunnel address
pub const DEFAULT_PEER_ADDRESS: &str = "192.168.254.2";

/// Endpoint host used when neither the spec nor the Service provides one
pub const DEFAULT_ENDPOINT_ADDRESS: &str = "localhost";

/// DNS server written into peer configuration when the parent declares none
pub const DEFAULT_PEER_DNS: &str = "127.0.0.1";

/// Routes pushed to peers
pub const DEFAULT_ALLOWED_IPS: &str = "0.0.0.0/0";

/// Default Service type for server resources
pub const DEFAULT_SERVICE_TYPE: &str = "LoadBalancer";

/// Service type for peer resources
pub const PEER_SERVICE_TYPE: &str = "ClusterIP";

/// Egress interface used by the NAT masquerade rule
pub const EGRESS_INTERFACE: &str = "eth0";

/// Replica bounds for server resources
pub const MIN_REPLICAS: i32 = 1;
pub const MAX_REPLICAS: i32 = 3;

/// Peers always run a single tunnel pod
pub const PEER_REPLICAS: i32 = 1;

// ============================================================================
// External DNS (unbound sidecar)
// ============================================================================

/// Default resolver image for the DNS sidecar
pub const DEFAULT_UNBOUND_IMAGE: &str = "docker.io/klutchell/unbound:v1.17.1";

/// Nameserver the pod resolves through when the DNS sidecar is enabled
pub const LOCAL_NAMESERVER: &str = "127.0.0.1";

/// Upstream resolvers the DNS sidecar forwards to
pub const UPSTREAM_RESOLVERS: [&str; 2] = ["1.1.1.1", "8.8.8.8"];

// ============================================================================
// Container and Volume Names
// ============================================================================

pub const CONTAINER_NAME_WIREGUARD: &str = "wireguard";
pub const CONTAINER_NAME_UNBOUND: &str = "unbound";

pub const VOLUME_WIREGUARD_CONFIG: &str = "wireguard-config";
pub const VOLUME_UNBOUND_CONFIG: &str = "unbound-config";

pub const WIREGUARD_CONFIG_MOUNT_PATH: &str = "/etc/wireguard";
pub const UNBOUND_CONFIG_MOUNT_PATH: &str = "/etc/unbound/custom.conf.d";

/// File name the tunnel container reads its interface configuration from
pub const WIREGUARD_CONFIG_FILENAME: &str = "wg0.conf";

/// Name of the container port exposed by the tunnel container
pub const WIREGUARD_PORT_NAME: &str = "wireguard";

/// Sysctl enabling packet forwarding inside the tunnel pod
pub const SYSCTL_IP_FORWARD: &str = "net.ipv4.ip_forward";

/// Capabilities the tunnel container needs to manage interfaces and routes
pub const WIREGUARD_CAPABILITIES: [&str; 2] = ["NET_ADMIN", "SYS_MODULE"];

// ============================================================================
// Secret and ConfigMap Keys
// ============================================================================

/// Rendered client configuration (generated key mode only)
pub const SECRET_KEY_CONFIG: &str = "config";

/// Private key of the peer (generated key mode only)
pub const SECRET_KEY_PRIVATE_KEY: &str = "private-key";

/// Public key of the peer, present in both key modes
pub const SECRET_KEY_PUBLIC_KEY: &str = "public-key";

/// Rendered server interface configuration
pub const SECRET_KEY_SERVER_CONFIG: &str = "wg-server";

/// Server key pair
pub const SECRET_KEY_SERVER_PRIVATE_KEY: &str = "server-private-key";
pub const SECRET_KEY_SERVER_PUBLIC_KEY: &str = "server-public-key";

/// Resolver configuration consumed by the DNS sidecar
pub const CONFIGMAP_KEY_UNBOUND: &str = "unbound.conf";

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Re-check delay after creating a managed child (covers missed watch events)
pub const CHILD_CREATED_REQUEUE_SECS: u64 = 60;

/// Re-check delay while a peer waits for its server to publish key and endpoint
pub const PARENT_WAIT_REQUEUE_SECS: u64 = 30;

/// Upper bound on state machine steps within a single reconciliation pass
pub const MAX_STEPS_PER_PASS: usize = 8;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Environment variable naming the WireGuard runtime image
pub const ENV_WIREGUARD_IMAGE: &str = "WIREGUARD_IMAGE";

/// Reporting component on published Kubernetes events
pub const CONTROLLER_NAME: &str = "wireguard-operator";

/// Event reason published before a resource's finalizer is released
pub const EVENT_REASON_DELETING: &str = "Deleting";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";

/// Liveness probe path
pub const HEALTH_PATH: &str = "/healthz";

/// Readiness probe path
pub const READY_PATH: &str = "/readyz";
