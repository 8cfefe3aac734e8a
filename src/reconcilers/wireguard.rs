// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Wireguard` server convergence.
//!
//! Once every child matches the spec, the server publishes its public key and
//! endpoint in status for its peers to consume.

use super::lifecycle::{Requeue, TunnelResource};
use super::resources::{ensure_children, Children};
use super::status::StatusUpdater;
use super::store::ObjectStore;
use crate::constants::{DEFAULT_ENDPOINT_ADDRESS, KIND_WIREGUARD, SECRET_KEY_SERVER_PUBLIC_KEY};
use crate::context::Context;
use crate::crd::Wireguard;
use crate::errors::Result;
use crate::status_reasons::{
    available_message, CONDITION_TYPE_AVAILABLE, REASON_RECONCILING, STATUS_TRUE,
};
use crate::wireguard_resources::{
    build_server_secret, key_mode_change, render_server_secret_data, secret_drift,
    secret_string_data, Tunnel,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use tracing::debug;

/// Address peers dial, as `<host>:<port>`.
///
/// `endpointAddress` wins; otherwise the first load-balancer ingress of the
/// Service, IP before hostname; otherwise `localhost`.
#[must_use]
pub fn resolve_endpoint(wg: &Wireguard, service: Option<&Service>) -> String {
    let configured = wg
        .spec
        .endpoint_address
        .as_deref()
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string);

    let ingress = || {
        service
            .and_then(|svc| svc.status.as_ref())
            .and_then(|status| status.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .and_then(|ingress| ingress.first())
            .and_then(|first| {
                first
                    .ip
                    .clone()
                    .filter(|ip| !ip.is_empty())
                    .or_else(|| first.hostname.clone().filter(|h| !h.is_empty()))
            })
    };

    let host = configured
        .or_else(ingress)
        .unwrap_or_else(|| DEFAULT_ENDPOINT_ADDRESS.to_string());
    format!("{host}:{}", wg.spec.listen_port)
}

#[async_trait]
impl TunnelResource for Wireguard {
    async fn converge<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<Requeue> {
        let tunnel = Tunnel::for_server(self)?;
        let namespace = tunnel.namespace.as_str();
        let name = tunnel.name.as_str();

        let service: Option<Service> = ctx.store.get(namespace, name).await?;
        let endpoint = resolve_endpoint(self, service.as_ref());
        debug!(endpoint = %endpoint, "Resolved endpoint for Wireguard {}/{}", namespace, name);

        let children = ensure_children(
            ctx,
            &tunnel,
            || build_server_secret(self, &tunnel, &ctx.config, ctx.keys.as_ref(), &endpoint),
            |current| {
                let stored = secret_string_data(current);
                let change = key_mode_change(&stored, self.spec.peer_public_key.as_deref());
                ctx.report_key_mode_change(KIND_WIREGUARD, namespace, name, change);
                let desired = render_server_secret_data(self, &tunnel, &stored, &endpoint)?;
                Ok(secret_drift(current, &desired))
            },
        )
        .await?;
        let secret = match children {
            Children::Pending(requeue) => return Ok(requeue),
            Children::Converged { secret } => secret,
        };

        let public_key = secret_string_data(&secret)
            .remove(SECRET_KEY_SERVER_PUBLIC_KEY)
            .filter(|k| !k.is_empty());

        let mut updater = StatusUpdater::new(self);
        updater.set_condition(
            CONDITION_TYPE_AVAILABLE,
            STATUS_TRUE,
            REASON_RECONCILING,
            &available_message(&self.name_any(), tunnel.replicas),
        );
        // Follows the live Secret, which only changes key when it is recreated
        let status = updater.status_mut();
        if public_key.is_some() {
            status.public_key = public_key;
        }
        status.endpoint = Some(endpoint);
        updater.apply(&ctx.store).await?;

        Ok(Requeue::None)
    }
}

#[cfg(test)]
#[path = "wireguard_tests.rs"]
mod wireguard_tests;
