// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests for the WireGuard operator
//!
//! These tests verify the operator is working correctly in a Kubernetes cluster
//! with the CRDs installed and the operator running.
//!
//! Run with: cargo test --test simple_integration -- --ignored

#![allow(clippy::items_after_statements)]
#![allow(clippy::manual_let_else)]

mod common;

use common::{
    cleanup_test_namespace, create_test_namespace, get_kube_client_or_skip, wait_for,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Secret, Service};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::client::Client;
use serde_json::json;
use std::time::Duration;
use wireguard_operator::constants::{
    API_GROUP, SECRET_KEY_CONFIG, SECRET_KEY_SERVER_PUBLIC_KEY,
};
use wireguard_operator::crd::{Wireguard, WireguardPeer};
use wireguard_operator::wireguard_resources::secret_string_data;

const CONVERGE_TIMEOUT: Duration = Duration::from_secs(120);

fn test_server(namespace: &str, name: &str) -> Wireguard {
    serde_json::from_value(json!({
        "apiVersion": "vpn.ahova.com/v1alpha1",
        "kind": "Wireguard",
        "metadata": { "name": name, "namespace": namespace },
        "spec": {
            "endpointAddress": "vpn.example.com",
            "serviceType": "ClusterIP",
            "externalDns": { "enabled": false }
        }
    }))
    .unwrap()
}

fn test_peer(namespace: &str, name: &str, server: &str) -> WireguardPeer {
    serde_json::from_value(json!({
        "apiVersion": "vpn.ahova.com/v1alpha1",
        "kind": "WireguardPeer",
        "metadata": { "name": name, "namespace": namespace },
        "spec": {
            "wireguardRef": server,
            "address": "192.168.254.2",
            "externalDns": { "enabled": false }
        }
    }))
    .unwrap()
}

async fn published_server(client: &Client, namespace: &str, name: &str) -> Option<Wireguard> {
    let api: Api<Wireguard> = Api::namespaced(client.clone(), namespace);
    wait_for(
        &format!("Wireguard {namespace}/{name} published its key and endpoint"),
        CONVERGE_TIMEOUT,
        || {
            let api = api.clone();
            async move {
                let wg = api.get_opt(name).await.ok().flatten()?;
                let status = wg.status.as_ref()?;
                (status.public_key.is_some() && status.endpoint.is_some()).then_some(wg)
            }
        },
    )
    .await
}

// ============================================================================
// Basic Connectivity Tests
// ============================================================================

#[tokio::test]
#[ignore] // Run with: cargo test --test simple_integration -- --ignored
async fn test_kubernetes_connectivity() {
    println!("\n=== Test: Kubernetes Connectivity ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };

    let namespaces: Api<Namespace> = Api::all(client);
    let ns_list = namespaces
        .list(&ListParams::default().limit(5))
        .await
        .expect("Failed to list namespaces");
    assert!(!ns_list.items.is_empty(), "Expected at least one namespace");

    println!("\n✓ Test passed\n");
}

#[tokio::test]
#[ignore]
async fn test_crds_installed() {
    println!("\n=== Test: WireGuard CRDs Installed ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };

    let crds: Api<CustomResourceDefinition> = Api::all(client);
    let crd_list = match crds.list(&ListParams::default()).await {
        Ok(list) => list,
        Err(e) => {
            println!("⚠ Could not check CRDs: {e}");
            println!("  This is expected if you don't have CRD permissions");
            return;
        }
    };

    let kinds: Vec<String> = crd_list
        .items
        .iter()
        .filter(|crd| crd.spec.group == API_GROUP)
        .map(|crd| crd.spec.names.kind.clone())
        .collect();

    if kinds.is_empty() {
        println!(
            "⚠ Warning: No WireGuard CRDs found. Install with: kubectl apply -f deploy/crds/"
        );
        return;
    }
    for expected in ["Wireguard", "WireguardPeer"] {
        assert!(kinds.iter().any(|k| k == expected), "missing CRD {expected}");
    }

    println!("\n✓ Test passed\n");
}

// ============================================================================
// Reconciliation Tests
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_server_and_peer_converge() {
    println!("\n=== Test: Server and Peer Converge ===\n");

    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };

    let namespace = "wireguard-integration-test";
    create_test_namespace(&client, namespace)
        .await
        .expect("Failed to create test namespace");

    let servers: Api<Wireguard> = Api::namespaced(client.clone(), namespace);
    let peers: Api<WireguardPeer> = Api::namespaced(client.clone(), namespace);
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);

    servers
        .create(&PostParams::default(), &test_server(namespace, "office"))
        .await
        .expect("Failed to create Wireguard");

    let server = published_server(&client, namespace, "office")
        .await
        .expect("server never published its key and endpoint");
    let status = server.status.unwrap_or_default();
    assert_eq!(status.endpoint.as_deref(), Some("vpn.example.com:51820"));

    let secret = secrets.get("office").await.expect("server Secret missing");
    assert_eq!(
        secret_string_data(&secret).get(SECRET_KEY_SERVER_PUBLIC_KEY),
        status.public_key.as_ref()
    );

    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let services: Api<Service> = Api::namespaced(client.clone(), namespace);
    assert!(deployments.get_opt("office").await.unwrap().is_some());
    assert!(services.get_opt("office").await.unwrap().is_some());

    peers
        .create(&PostParams::default(), &test_peer(namespace, "laptop", "office"))
        .await
        .expect("Failed to create WireguardPeer");

    let config = wait_for("peer configuration rendered", CONVERGE_TIMEOUT, || {
        let secrets = secrets.clone();
        async move {
            let secret = secrets.get_opt("laptop").await.ok().flatten()?;
            secret_string_data(&secret).remove(SECRET_KEY_CONFIG)
        }
    })
    .await
    .expect("peer Secret never rendered a configuration");
    assert!(config.contains("Endpoint = vpn.example.com:51820"));

    servers
        .delete("office", &DeleteParams::default())
        .await
        .expect("Failed to delete Wireguard");
    let gone = wait_for("Wireguard finalizer released", CONVERGE_TIMEOUT, || {
        let servers = servers.clone();
        async move {
            match servers.get_opt("office").await {
                Ok(None) => Some(()),
                _ => None,
            }
        }
    })
    .await;
    assert!(gone.is_some(), "Wireguard was never released");

    cleanup_test_namespace(&client, namespace).await;
    println!("\n✓ Test passed\n");
}
