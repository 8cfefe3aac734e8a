// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status conditions for `Wireguard` and `WireguardPeer`.
//!
//! This module defines the condition types, statuses and reasons the operator
//! records, following Kubernetes conventions. Reasons are programmatic
//! identifiers in CamelCase that explain why a condition has a particular status.
//!
//! # Condition Types
//!
//! - `Available` reports whether the tunnel's managed children match the spec.
//! - `Degraded` is only recorded while the resource is being deleted.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   publicKey: 3wvQ...=
//!   endpoint: vpn.example.com:51820
//!   conditions:
//!     - type: Available
//!       status: "True"
//!       reason: Reconciling
//!       message: "Deployment for custom resource (office) with 1 replicas created successfully"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Primary condition type indicating the tunnel is provisioned.
pub const CONDITION_TYPE_AVAILABLE: &str = "Available";

/// Condition type recorded while the finalizer runs.
pub const CONDITION_TYPE_DEGRADED: &str = "Degraded";

// ============================================================================
// Condition Statuses
// ============================================================================

pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";
pub const STATUS_UNKNOWN: &str = "Unknown";

// ============================================================================
// Reasons
// ============================================================================

/// Reconciliation is in progress, has converged, or failed while creating a child.
pub const REASON_RECONCILING: &str = "Reconciling";

/// Changing the replica count of the Deployment failed.
pub const REASON_RESIZING: &str = "Resizing";

/// Patching drifted child configuration failed.
pub const REASON_UPDATING: &str = "Updating";

/// The finalizer is running.
pub const REASON_FINALIZING: &str = "Finalizing";

/// A peer's server has not published its public key and endpoint yet.
pub const REASON_WAITING_FOR_PARENT: &str = "WaitingForParent";

// ============================================================================
// Messages
// ============================================================================

pub const MESSAGE_STARTING: &str = "Starting reconciliation";

/// Message recorded once every child matches the spec.
///
/// # Example
///
/// ```rust
/// use wireguard_operator::status_reasons::available_message;
///
/// assert_eq!(
///     available_message("office", 2),
///     "Deployment for custom resource (office) with 2 replicas created successfully"
/// );
/// ```
#[must_use]
pub fn available_message(name: &str, replicas: i32) -> String {
    format!("Deployment for custom resource ({name}) with {replicas} replicas created successfully")
}

/// Message recorded when mutating a child failed.
#[must_use]
pub fn failure_message(action: &str, kind: &str, name: &str, error: &str) -> String {
    format!("Failed to {action} {kind} for the custom resource ({name}): ({error})")
}

#[must_use]
pub fn finalizing_message(kind: &str, name: &str) -> String {
    format!("Performing finalizer operations for {kind} ({name}) before deletion")
}

#[must_use]
pub fn finalized_message(name: &str) -> String {
    format!("Finalizer operations for custom resource ({name}) were successfully accomplished")
}

#[must_use]
pub fn waiting_for_parent_message(parent: &str) -> String {
    format!("Waiting for Wireguard ({parent}) to publish its public key and endpoint")
}

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
