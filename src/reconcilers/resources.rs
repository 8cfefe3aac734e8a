// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic create-or-patch helper for managed children.
//!
//! A child is looked up by name. When absent, its full desired definition is
//! built and created. When present, only the fields this operator manages are
//! compared, and the child is replaced (conditional on its resource version)
//! when they drifted. Failures are wrapped in [`Error::ChildMutation`] so the
//! reconciler can report which child and which action failed.
//!
//! [`ensure_children`] walks the four children of a tunnel in order Secret,
//! ConfigMap, Deployment, Service. All absent children are created in one pass,
//! which then asks for a delayed re-check. The first drifted child is patched
//! and the pass ends there with an immediate re-check.

use super::lifecycle::Requeue;
use super::store::{ObjectStore, StoreObject};
use crate::constants::CHILD_CREATED_REQUEUE_SECS;
use crate::context::Context;
use crate::errors::{ChildAction, Error, Result};
use crate::metrics;
use crate::wireguard_resources::{
    build_configmap, build_deployment, build_service, configmap_drift, deployment_drift,
    service_drift, Tunnel,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use std::time::Duration;
use tracing::{debug, info};

/// What [`ensure_child`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    Created,
    Patched,
    Unchanged,
}

/// A child after [`ensure_child`], as last written or observed.
#[derive(Debug, Clone)]
pub struct Ensured<T> {
    pub outcome: ChildOutcome,
    pub object: T,
}

/// Create the child if absent, patch it if its managed fields drifted.
///
/// `build` is only called when the child does not exist, so it may mint key
/// material. `drift` returns the patched object, or `None` when the live child
/// already matches.
///
/// # Errors
///
/// Returns [`Error::ChildMutation`] when building, creating, diffing or
/// replacing the child fails, and store errors from the lookup as-is.
pub async fn ensure_child<S, T, B, D>(
    store: &S,
    namespace: &str,
    name: &str,
    build: B,
    drift: D,
) -> Result<Ensured<T>>
where
    S: ObjectStore,
    T: StoreObject,
    B: FnOnce() -> Result<T> + Send,
    D: FnOnce(&T) -> Result<Option<T>> + Send,
{
    let kind = T::kind(&()).to_string();
    let wrap = |action: ChildAction| {
        let kind = kind.clone();
        move |source: Error| Error::ChildMutation {
            action,
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            source: Box::new(source),
        }
    };

    let Some(current) = store.get::<T>(namespace, name).await? else {
        debug!("{} {}/{} does not exist, creating", kind, namespace, name);
        let desired = build().map_err(wrap(ChildAction::Create))?;
        let object = store
            .create(namespace, &desired)
            .await
            .map_err(wrap(ChildAction::Create))?;
        info!("Created {} {}/{}", kind, namespace, name);
        metrics::record_resource_created(&kind);
        return Ok(Ensured {
            outcome: ChildOutcome::Created,
            object,
        });
    };

    match drift(&current).map_err(wrap(ChildAction::Update))? {
        None => Ok(Ensured {
            outcome: ChildOutcome::Unchanged,
            object: current,
        }),
        Some(patched) => {
            let object = store
                .replace(namespace, &patched)
                .await
                .map_err(wrap(ChildAction::Update))?;
            info!("Patched drifted {} {}/{}", kind, namespace, name);
            metrics::record_resource_updated(&kind);
            Ok(Ensured {
                outcome: ChildOutcome::Patched,
                object,
            })
        }
    }
}

/// Outcome of [`ensure_children`].
#[derive(Debug)]
pub enum Children {
    /// A child was created or patched; look again as directed
    Pending(Requeue),
    /// Every child matches the spec
    Converged { secret: Secret },
}

/// Ensure the four children of `tunnel`.
///
/// The Secret's build and drift functions are supplied by the caller, since
/// they depend on the owner kind; the other children derive from `tunnel`.
///
/// # Errors
///
/// Propagates the first error from [`ensure_child`].
pub async fn ensure_children<S, B, D>(
    ctx: &Context<S>,
    tunnel: &Tunnel,
    build_secret: B,
    drift_secret: D,
) -> Result<Children>
where
    S: ObjectStore,
    B: FnOnce() -> Result<Secret> + Send,
    D: FnOnce(&Secret) -> Result<Option<Secret>> + Send,
{
    let namespace = tunnel.namespace.as_str();
    let name = tunnel.name.as_str();
    let mut created = false;

    let secret = ensure_child(&ctx.store, namespace, name, build_secret, drift_secret).await?;
    if settle(secret.outcome, &mut created) {
        return Ok(Children::Pending(Requeue::Immediate));
    }

    let desired = build_configmap(tunnel, &ctx.config);
    let configmap = ensure_child::<_, ConfigMap, _, _>(
        &ctx.store,
        namespace,
        name,
        || Ok(desired.clone()),
        |current| Ok(configmap_drift(current, &desired)),
    )
    .await?;
    if settle(configmap.outcome, &mut created) {
        return Ok(Children::Pending(Requeue::Immediate));
    }

    let desired = build_deployment(tunnel, &ctx.config);
    let deployment = ensure_child::<_, Deployment, _, _>(
        &ctx.store,
        namespace,
        name,
        || Ok(desired.clone()),
        |current| Ok(deployment_drift(current, &desired)),
    )
    .await?;
    if settle(deployment.outcome, &mut created) {
        return Ok(Children::Pending(Requeue::Immediate));
    }

    let desired = build_service(tunnel, &ctx.config);
    let service = ensure_child::<_, Service, _, _>(
        &ctx.store,
        namespace,
        name,
        || Ok(desired.clone()),
        |current| Ok(service_drift(current, &desired)),
    )
    .await?;
    if settle(service.outcome, &mut created) {
        return Ok(Children::Pending(Requeue::Immediate));
    }

    if created {
        return Ok(Children::Pending(Requeue::After(Duration::from_secs(
            CHILD_CREATED_REQUEUE_SECS,
        ))));
    }
    Ok(Children::Converged {
        secret: secret.object,
    })
}

// True when the child was patched and the pass should stop.
fn settle(outcome: ChildOutcome, created: &mut bool) -> bool {
    match outcome {
        ChildOutcome::Patched => true,
        ChildOutcome::Created => {
            *created = true;
            false
        }
        ChildOutcome::Unchanged => false,
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
