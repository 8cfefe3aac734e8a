// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation pass shared by `Wireguard` and `WireguardPeer`.
//!
//! A pass fetches the resource, classifies it into a [`Phase`] and performs the
//! step for that phase. Steps that only touch the resource itself (recording
//! the first condition, attaching the finalizer) are followed by a fresh fetch
//! and another step, so a new resource is initialized, guarded and converged
//! in a single pass. Every write is conditional on the version just fetched;
//! a conflict aborts the pass and the scheduler retries it from scratch.
//!
//! Kind-specific work lives behind [`TunnelResource::converge`].

use super::finalizers::{ensure_finalizer, has_finalizer, is_deleting, remove_finalizer};
use super::state::{Phase, Step};
use super::status::{HasStatus, StatusUpdater};
use super::store::ObjectStore;
use crate::constants::{FINALIZER_WIREGUARD, KIND_DEPLOYMENT, MAX_STEPS_PER_PASS};
use crate::metrics::{REQUEUE_REASON_DELAYED, REQUEUE_REASON_PATCHED};
use crate::context::{deleting_message, Context};
use crate::errors::{ChildAction, Error, Result};
use crate::status_reasons::{
    failure_message, finalized_message, finalizing_message, CONDITION_TYPE_AVAILABLE,
    CONDITION_TYPE_DEGRADED, MESSAGE_STARTING, REASON_FINALIZING, REASON_RECONCILING,
    REASON_RESIZING, REASON_UPDATING, STATUS_FALSE, STATUS_TRUE, STATUS_UNKNOWN,
};
use async_trait::async_trait;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use std::time::Duration;
use tracing::{debug, info, warn};

/// When the scheduler should look at a resource again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// Converged; wait for the next watch event
    None,
    /// Something was patched; re-check right away
    Immediate,
    /// Re-check after a fixed delay
    After(Duration),
}

impl Requeue {
    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            Self::None => Action::await_change(),
            Self::Immediate => Action::requeue(Duration::ZERO),
            Self::After(delay) => Action::requeue(delay),
        }
    }

    /// Label for the requeue counter; `None` when nothing is requeued.
    #[must_use]
    pub fn metric_reason(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Immediate => Some(REQUEUE_REASON_PATCHED),
            Self::After(_) => Some(REQUEUE_REASON_DELAYED),
        }
    }
}

/// A custom resource that owns one tunnel's managed children.
#[async_trait]
pub trait TunnelResource: HasStatus {
    /// Diff the managed children against the spec and report status.
    ///
    /// Called only for guarded resources that are not being deleted.
    async fn converge<S: ObjectStore>(&self, ctx: &Context<S>) -> Result<Requeue>;
}

/// Classify a fetched resource.
#[must_use]
pub fn phase_of<K: HasStatus>(resource: &K) -> Phase {
    Phase::observe(
        is_deleting(resource),
        has_finalizer(resource, FINALIZER_WIREGUARD),
        !resource.conditions().is_empty(),
    )
}

/// Run one reconciliation pass for the named resource.
///
/// A resource that vanished at any point counts as success.
///
/// # Errors
///
/// Returns conflicts for retry from a fresh fetch, and any other failure after
/// recording it in status where possible.
pub async fn reconcile<K, S>(ctx: &Context<S>, namespace: &str, name: &str) -> Result<Requeue>
where
    K: TunnelResource,
    S: ObjectStore,
{
    match run_pass::<K, S>(ctx, namespace, name).await {
        Err(e) if e.is_not_found() => {
            debug!("{} {}/{} vanished during reconciliation", K::kind(&()), namespace, name);
            Ok(Requeue::None)
        }
        other => other,
    }
}

async fn run_pass<K, S>(ctx: &Context<S>, namespace: &str, name: &str) -> Result<Requeue>
where
    K: TunnelResource,
    S: ObjectStore,
{
    let mut previous: Option<Phase> = None;

    for _ in 0..MAX_STEPS_PER_PASS {
        let Some(resource) = ctx.store.get::<K>(namespace, name).await? else {
            debug!("{} {}/{} not found, nothing to do", K::kind(&()), namespace, name);
            return Ok(Requeue::None);
        };

        let phase = phase_of(&resource);
        if let Some(previous) = previous {
            if !previous.allows(phase) {
                warn!(
                    from = %previous,
                    to = %phase,
                    "{} {}/{} did not progress, retrying from a fresh fetch",
                    K::kind(&()),
                    namespace,
                    name
                );
                return Ok(Requeue::Immediate);
            }
        }
        debug!(phase = %phase, "Reconciling {} {}/{}", K::kind(&()), namespace, name);

        match phase.step() {
            Step::Idle => return Ok(Requeue::None),
            Step::InitializeStatus => initialize(ctx, &resource).await?,
            Step::AttachFinalizer => {
                ensure_finalizer(&ctx.store, &resource, FINALIZER_WIREGUARD).await?;
            }
            Step::Finalize => finalize(ctx, &resource).await?,
            Step::Converge => return converge_and_report(ctx, &resource).await,
        }
        previous = Some(phase);
    }

    Ok(Requeue::Immediate)
}

async fn initialize<K, S>(ctx: &Context<S>, resource: &K) -> Result<()>
where
    K: TunnelResource,
    S: ObjectStore,
{
    let mut updater = StatusUpdater::new(resource);
    updater.set_condition(
        CONDITION_TYPE_AVAILABLE,
        STATUS_UNKNOWN,
        REASON_RECONCILING,
        MESSAGE_STARTING,
    );
    updater.apply(&ctx.store).await?;
    Ok(())
}

/// Pre-delete hook: record progress, notify, then release the finalizer.
async fn finalize<K, S>(ctx: &Context<S>, resource: &K) -> Result<()>
where
    K: TunnelResource,
    S: ObjectStore,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let kind = K::kind(&());
    info!("Performing finalizer operations for {} {}/{}", kind, namespace, name);

    let mut updater = StatusUpdater::new(resource);
    updater.set_condition(
        CONDITION_TYPE_DEGRADED,
        STATUS_UNKNOWN,
        REASON_FINALIZING,
        &finalizing_message(&kind, &name),
    );
    updater.apply(&ctx.store).await?;

    ctx.notifier
        .deleting(&resource.object_ref(&()), deleting_message(&name, &namespace))
        .await;

    // The status write above changed the resource version
    let Some(fresh) = ctx.store.get::<K>(&namespace, &name).await? else {
        return Ok(());
    };

    let mut updater = StatusUpdater::new(&fresh);
    updater.set_condition(
        CONDITION_TYPE_DEGRADED,
        STATUS_TRUE,
        REASON_FINALIZING,
        &finalized_message(&name),
    );
    let fresh = updater.apply(&ctx.store).await?.unwrap_or(fresh);

    remove_finalizer(&ctx.store, &fresh, FINALIZER_WIREGUARD).await?;
    info!("Released finalizer of {} {}/{}", kind, namespace, name);
    Ok(())
}

async fn converge_and_report<K, S>(ctx: &Context<S>, resource: &K) -> Result<Requeue>
where
    K: TunnelResource,
    S: ObjectStore,
{
    match resource.converge(ctx).await {
        Ok(requeue) => Ok(requeue),
        Err(err) if err.is_conflict() || err.is_not_found() => Err(err),
        Err(err) => {
            record_failure(ctx, resource, &err).await;
            Err(err)
        }
    }
}

/// Best-effort `Available=False` carrying the error text.
async fn record_failure<K, S>(ctx: &Context<S>, resource: &K, err: &Error)
where
    K: TunnelResource,
    S: ObjectStore,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let (reason, message) = match err {
        Error::ChildMutation {
            action,
            kind,
            source,
            ..
        } => {
            let reason = match (action, kind.as_str()) {
                (ChildAction::Update, KIND_DEPLOYMENT) => REASON_RESIZING,
                (ChildAction::Update, _) => REASON_UPDATING,
                (ChildAction::Create, _) => REASON_RECONCILING,
            };
            let message = failure_message(&action.to_string(), kind, &name, &source.to_string());
            (reason, message)
        }
        other => (
            REASON_RECONCILING,
            failure_message("reconcile", &K::kind(&()), &name, &other.to_string()),
        ),
    };

    // Children may have been written in this pass; start from the latest version
    let fresh = match ctx.store.get::<K>(&namespace, &name).await {
        Ok(Some(fresh)) => fresh,
        Ok(None) => return,
        Err(e) => {
            warn!("Failed to re-fetch {} {}/{}: {}", K::kind(&()), namespace, name, e);
            return;
        }
    };

    let mut updater = StatusUpdater::new(&fresh);
    updater.set_condition(CONDITION_TYPE_AVAILABLE, STATUS_FALSE, reason, &message);
    if let Err(e) = updater.apply(&ctx.store).await {
        warn!(
            "Failed to record failure in {} {}/{} status: {}",
            K::kind(&()),
            namespace,
            name,
            e
        );
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod lifecycle_tests;
