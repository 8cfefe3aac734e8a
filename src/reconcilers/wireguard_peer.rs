// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `WireguardPeer` convergence.
//!
//! A peer renders its client configuration from the public key and endpoint
//! its server publishes in status. Until both are there the peer records
//! `Available=False/WaitingForParent` and checks again later; nothing is
//! created for it in the meantime.

use super::lifecycle::{Requeue, TunnelResource};
use super::resources::{ensure_children, Children};
use super::status::StatusUpdater;
use super::store::ObjectStore;
use crate::constants::{KIND_WIREGUARD_PEER, PARENT_WAIT_REQUEUE_SECS, SECRET_KEY_PUBLIC_KEY};
use crate::context::Context;
use crate::crd::{Wireguard, WireguardPeer};
use crate::errors::Result;
use crate::status_reasons::{
    available_message, waiting_for_parent_message, CONDITION_TYPE_AVAILABLE, REASON_RECONCILING,
    REASON_WAITING_FOR_PARENT, STATUS_FALSE, STATUS_TRUE,
};
use crate::wireguard_resources::{
    build_peer_secret, key_mode_change, render_peer_secret_data, secret_drift, secret_string_data,
    ParentInfo, Tunnel,
};
use async_trait::async_trait;
use kube::ResourceExt;
use std::time::Duration;
use tracing::info;

impl WireguardPeer {
    /// Look up what this peer needs from its server.
    ///
    /// Returns `None` while the server is missing or has not published yet.
    async fn parent_info<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<Option<ParentInfo>> {
        let parent = self.spec.wireguard_ref.trim();
        if parent.is_empty() {
            return Ok(None);
        }
        let namespace = self.namespace().unwrap_or_default();
        let server: Option<Wireguard> = ctx.store.get(&namespace, parent).await?;
        Ok(server.as_ref().and_then(ParentInfo::from_server))
    }
}

#[async_trait]
impl TunnelResource for WireguardPeer {
    async fn converge<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<Requeue> {
        let tunnel = Tunnel::for_peer(self)?;
        let namespace = tunnel.namespace.as_str();
        let name = tunnel.name.as_str();

        let Some(parent) = self.parent_info(ctx).await? else {
            info!(
                "WireguardPeer {}/{} is waiting for Wireguard {}",
                namespace, name, self.spec.wireguard_ref
            );
            let mut updater = StatusUpdater::new(self);
            updater.set_condition(
                CONDITION_TYPE_AVAILABLE,
                STATUS_FALSE,
                REASON_WAITING_FOR_PARENT,
                &waiting_for_parent_message(&self.spec.wireguard_ref),
            );
            updater.apply(&ctx.store).await?;
            return Ok(Requeue::After(Duration::from_secs(PARENT_WAIT_REQUEUE_SECS)));
        };

        let children = ensure_children(
            ctx,
            &tunnel,
            || build_peer_secret(self, &tunnel, &ctx.config, ctx.keys.as_ref(), &parent),
            |current| {
                let stored = secret_string_data(current);
                let change = key_mode_change(&stored, self.spec.public_key.as_deref());
                ctx.report_key_mode_change(KIND_WIREGUARD_PEER, namespace, name, change);
                let desired = render_peer_secret_data(self, &tunnel, &stored, &parent)?;
                Ok(secret_drift(current, &desired))
            },
        )
        .await?;
        let secret = match children {
            Children::Pending(requeue) => return Ok(requeue),
            Children::Converged { secret } => secret,
        };

        let mut updater = StatusUpdater::new(self);
        updater.set_condition(
            CONDITION_TYPE_AVAILABLE,
            STATUS_TRUE,
            REASON_RECONCILING,
            &available_message(&self.name_any(), tunnel.replicas),
        );
        updater.status_mut().public_key = secret_string_data(&secret)
            .remove(SECRET_KEY_PUBLIC_KEY)
            .filter(|k| !k.is_empty());
        updater.apply(&ctx.store).await?;

        Ok(Requeue::None)
    }
}

#[cfg(test)]
#[path = "wireguard_peer_tests.rs"]
mod wireguard_peer_tests;
