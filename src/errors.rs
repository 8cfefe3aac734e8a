// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the WireGuard operator.
//!
//! Reconciliation distinguishes errors by how the scheduler should react to them:
//! - vanished objects are treated as success
//! - optimistic-concurrency conflicts are retried from a fresh fetch
//! - configuration errors are surfaced and block progress until fixed
//! - failed child mutations are recorded in status and retried with backoff

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Mutation attempted on a managed child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildAction {
    Create,
    Update,
}

impl std::fmt::Display for ChildAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// Errors raised while reconciling `Wireguard` and `WireguardPeer` resources.
#[derive(Error, Debug)]
pub enum Error {
    /// Object vanished between fetch and use (HTTP 404)
    ///
    /// Reconcilers treat this as a successful no-op pass.
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// Write rejected because the object changed since it was read (HTTP 409)
    ///
    /// The pass is aborted and retried from a fresh fetch; the write is never forced.
    #[error("{kind} {namespace}/{name} was modified concurrently")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
    },

    /// Required operator configuration is missing or invalid
    ///
    /// Not auto-correctable; the operator refuses to start.
    #[error("Invalid operator configuration: {0}")]
    Configuration(String),

    /// Creating or updating a managed child failed
    #[error("Failed to {action} {kind} {namespace}/{name}: {source}")]
    ChildMutation {
        action: ChildAction,
        kind: String,
        namespace: String,
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// A tunnel or firewall address in the resource spec is not a valid IPv4 address or CIDR
    #[error("Invalid address '{value}': {reason}")]
    InvalidAddress { value: String, reason: String },

    /// A key Secret exists but lacks an entry the operator wrote when it created it
    ///
    /// Keys are never regenerated, so a damaged Secret must be repaired or deleted by hand.
    #[error("Secret {namespace}/{name} is missing key '{key}'")]
    MissingSecretKey {
        namespace: String,
        name: String,
        key: &'static str,
    },

    /// Any other Kubernetes API failure
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Object could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Map a Kubernetes API error for a named object onto the operator taxonomy.
    #[must_use]
    pub fn from_kube(err: kube::Error, kind: &str, namespace: &str, name: &str) -> Self {
        match &err {
            kube::Error::Api(response) if response.code == 404 => Self::NotFound {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(response) if response.code == 409 => Self::Conflict {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            _ => Self::Kube(err),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for conflicts, including conflicts wrapped by a child mutation.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::ChildMutation { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    /// Stable label for the `errors_total` metric.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Configuration(_) => "configuration",
            Self::ChildMutation { .. } => "child_mutation",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::MissingSecretKey { .. } => "missing_secret_key",
            Self::Kube(_) => "kube_api",
            Self::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
