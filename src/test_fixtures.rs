// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared builders for unit tests.

use crate::config::OperatorConfig;
use crate::constants::API_GROUP_VERSION;
use crate::context::{Context, Notifier};
use crate::crd::{Wireguard, WireguardPeer, WireguardStatus};
use crate::keys::FixedKeyProvider;
use crate::reconcilers::memory_store::MemoryStore;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use serde_json::json;
use std::sync::{Arc, Mutex};

pub const TEST_NAMESPACE: &str = "vpn";
pub const TEST_IMAGE: &str = "ghcr.io/example/wireguard:1.0.20210914";

pub fn operator_config() -> OperatorConfig {
    OperatorConfig::new(TEST_IMAGE).unwrap()
}

/// A server with every field defaulted, as `kubectl apply` would store it.
pub fn server(name: &str) -> Wireguard {
    server_with_spec(name, json!({}))
}

pub fn server_with_spec(name: &str, spec: serde_json::Value) -> Wireguard {
    serde_json::from_value(json!({
        "apiVersion": API_GROUP_VERSION,
        "kind": "Wireguard",
        "metadata": {
            "name": name,
            "namespace": TEST_NAMESPACE,
            "uid": format!("{name}-uid"),
        },
        "spec": spec,
    }))
    .unwrap()
}

/// A server that has published its key and endpoint.
pub fn published_server(name: &str, dns: Option<&str>) -> Wireguard {
    let spec = match dns {
        Some(address) => json!({ "dns": { "address": address } }),
        None => json!({}),
    };
    let mut wg = server_with_spec(name, spec);
    wg.status = Some(WireguardStatus {
        conditions: vec![],
        public_key: Some("c2VydmVyLXB1YmxpYy1rZXk=".into()),
        endpoint: Some("vpn.example.com:51820".into()),
    });
    wg
}

pub fn peer(name: &str, wireguard_ref: &str) -> WireguardPeer {
    peer_with_spec(name, json!({ "wireguardRef": wireguard_ref }))
}

pub fn peer_with_spec(name: &str, spec: serde_json::Value) -> WireguardPeer {
    serde_json::from_value(json!({
        "apiVersion": API_GROUP_VERSION,
        "kind": "WireguardPeer",
        "metadata": {
            "name": name,
            "namespace": TEST_NAMESPACE,
            "uid": format!("{name}-uid"),
        },
        "spec": spec,
    }))
    .unwrap()
}

/// Notifier that remembers what it was told.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deleting(&self, _resource: &ObjectReference, message: String) {
        self.messages.lock().unwrap().push(message);
    }
}

pub const KEY_SEED: u8 = 1;

/// Reconciler context over an empty in-memory store, with handles on its collaborators.
pub struct Harness {
    pub ctx: Context<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub keys: Arc<FixedKeyProvider>,
}

impl Harness {
    pub fn store(&self) -> &MemoryStore {
        &self.ctx.store
    }

    /// Key pairs minted so far.
    pub fn keys_minted(&self) -> u8 {
        self.keys.peek() - KEY_SEED
    }
}

pub fn harness() -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let keys = Arc::new(FixedKeyProvider::new(KEY_SEED));
    let ctx = Context::new(
        MemoryStore::new(),
        keys.clone(),
        notifier.clone(),
        operator_config(),
    );
    Harness {
        ctx,
        notifier,
        keys,
    }
}
