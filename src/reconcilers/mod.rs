// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for `Wireguard` and `WireguardPeer` resources.
//!
//! Both kinds share one reconciliation pass ([`reconcile`]) and differ only in
//! how they converge their managed children. Each pass:
//!
//! 1. **Fetches** the resource and classifies it into a lifecycle [`state::Phase`]
//! 2. **Initializes** status and attaches the finalizer on first sight
//! 3. **Converges** the Secret, ConfigMap, Deployment and Service, creating what
//!    is missing and patching what drifted
//! 4. **Reports** the outcome in the `Available` and `Degraded` conditions
//!
//! Deleting a guarded resource runs the pre-delete hook, records it in status
//! and releases the finalizer; the children go with their owner.
//!
//! All reads and writes go through [`store::ObjectStore`], so the pass can be
//! exercised without a cluster.
//!
//! # Example
//!
//! ```rust,no_run
//! use wireguard_operator::crd::Wireguard;
//! use wireguard_operator::context::Context;
//! use wireguard_operator::reconcilers::{reconcile, store::KubeStore};
//!
//! async fn reconcile_office(ctx: &Context<KubeStore>) -> wireguard_operator::errors::Result<()> {
//!     let requeue = reconcile::<Wireguard, _>(ctx, "vpn", "office").await?;
//!     println!("next check: {requeue:?}");
//!     Ok(())
//! }
//! ```

pub mod finalizers;
pub mod lifecycle;
pub mod resources;
pub mod state;
pub mod status;
pub mod store;
pub mod wireguard;
pub mod wireguard_peer;

#[cfg(test)]
pub(crate) mod memory_store;

pub use lifecycle::{reconcile, Requeue, TunnelResource};
pub use wireguard::resolve_endpoint;
