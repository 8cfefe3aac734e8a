// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label constants used across both reconcilers.
//!
//! This module defines the standard Kubernetes labels attached to every managed
//! child so they can be selected and attributed to their owning resource.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "server", "peer")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Standard label for the current version of the application
pub const K8S_VERSION: &str = "app.kubernetes.io/version";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Application name for tunnel pods
pub const APP_NAME_WIREGUARD: &str = "wireguard";

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_WIREGUARD_OPERATOR: &str = "wireguard-operator";

/// Component value for server tunnels
pub const COMPONENT_SERVER: &str = "server";

/// Component value for peer tunnels
pub const COMPONENT_PEER: &str = "peer";

// ============================================================================
// Kubernetes Standard Label Values - Managed By
// ============================================================================

/// Value for `app.kubernetes.io/managed-by` on children of a `Wireguard`
pub const MANAGED_BY_WIREGUARD: &str = "Wireguard";

/// Value for `app.kubernetes.io/managed-by` on children of a `WireguardPeer`
pub const MANAGED_BY_WIREGUARD_PEER: &str = "WireguardPeer";
