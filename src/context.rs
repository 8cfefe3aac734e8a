// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for both controllers.
//!
//! All reconcilers receive an `Arc<Context<S>>` that contains:
//! - the [`ObjectStore`] every read and write goes through
//! - the [`KeyProvider`], the only source of randomness
//! - the [`Notifier`] used by the pre-delete hook
//! - the validated [`OperatorConfig`]
//! - the [`WarnOnce`] ledger for warnings that would otherwise repeat every resync
//!
//! Only the warning ledger is mutable, and it never influences what a pass writes.

use crate::config::OperatorConfig;
use crate::constants::{CONTROLLER_NAME, EVENT_REASON_DELETING};
use crate::crd::{Wireguard, WireguardPeer};
use crate::keys::KeyProvider;
use crate::reconcilers::store::ObjectStore;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::runtime::reflector::ObjectRef;
use kube::{Client, ResourceExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Shared context passed to all controllers.
pub struct Context<S> {
    /// Object store for API operations
    pub store: S,

    /// Key pair source for new Secrets
    pub keys: Arc<dyn KeyProvider>,

    /// Pre-delete notification sink
    pub notifier: Arc<dyn Notifier>,

    /// Operator configuration, validated at startup
    pub config: OperatorConfig,

    /// Ignored key-mode switches already reported, keyed by kind/namespace/name
    pub key_mode_reports: WarnOnce,
}

impl<S: ObjectStore> Context<S> {
    #[must_use]
    pub fn new(
        store: S,
        keys: Arc<dyn KeyProvider>,
        notifier: Arc<dyn Notifier>,
        config: OperatorConfig,
    ) -> Self {
        Self {
            store,
            keys,
            notifier,
            config,
            key_mode_reports: WarnOnce::default(),
        }
    }

    /// Log an ignored key-mode switch at `warn` once, then at `debug` on later passes.
    ///
    /// Passing `None` clears the entry so a later switch is reported again.
    pub fn report_key_mode_change(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        change: Option<&str>,
    ) {
        let key = format!("{kind}/{namespace}/{name}");
        match change {
            Some(change) if self.key_mode_reports.first(&key) => {
                warn!("{} {}/{}: {}", kind, namespace, name, change);
            }
            Some(change) => debug!("{} {}/{}: {}", kind, namespace, name, change),
            None => self.key_mode_reports.clear(&key),
        }
    }
}

/// Remembers which warnings were already emitted.
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: Mutex<HashSet<String>>,
}

impl WarnOnce {
    /// `true` the first time `key` is seen since it was last cleared.
    pub fn first(&self, key: &str) -> bool {
        match self.seen.lock() {
            Ok(mut seen) => seen.insert(key.to_string()),
            Err(_) => true,
        }
    }

    pub fn clear(&self, key: &str) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.remove(key);
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.seen.lock().is_ok_and(|seen| seen.contains(key))
    }
}

/// Sink for the notification sent before a resource's finalizer is released.
///
/// Notifications are fire-and-forget: a failed notification is logged and
/// never blocks deletion.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deleting(&self, resource: &ObjectReference, message: String);
}

/// Publishes a `Warning` event through the Kubernetes events API.
pub struct EventNotifier {
    recorder: Recorder,
}

impl EventNotifier {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: None,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl Notifier for EventNotifier {
    async fn deleting(&self, resource: &ObjectReference, message: String) {
        let event = Event {
            type_: EventType::Warning,
            reason: EVENT_REASON_DELETING.to_string(),
            note: Some(message),
            action: EVENT_REASON_DELETING.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource).await {
            warn!(
                name = ?resource.name,
                namespace = ?resource.namespace,
                error = %e,
                "Failed to publish deletion event"
            );
        }
    }
}

/// Message carried by the pre-delete notification.
#[must_use]
pub fn deleting_message(name: &str, namespace: &str) -> String {
    format!("Custom Resource {name} is being deleted from the namespace {namespace}")
}

/// Peers that must be re-reconciled when `wg` changes.
///
/// A peer renders its configuration from its server's published key and
/// endpoint, so every peer naming `wg` in the same namespace is affected.
#[must_use]
pub fn peers_referencing(
    peers: &[Arc<WireguardPeer>],
    wg: &Wireguard,
) -> Vec<ObjectRef<WireguardPeer>> {
    let name = wg.name_any();
    let namespace = wg.namespace();
    peers
        .iter()
        .filter(|peer| peer.spec.wireguard_ref == name && peer.namespace() == namespace)
        .map(|peer| ObjectRef::from_obj(peer.as_ref()))
        .collect()
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
