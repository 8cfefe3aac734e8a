// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object storage used by the reconcilers.
//!
//! Reconcilers never talk to `kube::Api` directly; they go through an
//! [`ObjectStore`], so the same reconciliation code runs against the API server
//! in production and against an in-memory store in unit tests.
//!
//! Every write is conditional: `replace` and `replace_status` carry the
//! `metadata.resourceVersion` of the object they were built from, and a stale
//! version is rejected with [`Error::Conflict`] rather than overwritten.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use kube::api::{Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use tracing::debug;

/// Namespaced Kubernetes object the store can hold.
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Read and conditionally write namespaced objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object, returning `None` when it does not exist.
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Create an object. Fails with [`Error::Conflict`] when it already exists.
    async fn create<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K>;

    /// Replace an object, conditional on its resource version.
    async fn replace<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K>;

    /// Replace the status subresource, conditional on the resource version.
    async fn replace_status<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K>;
}

/// [`ObjectStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| Error::from_kube(e, &K::kind(&()), namespace, name))
    }

    async fn create<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K> {
        let name = object.name_any();
        debug!("Creating {} {}/{}", K::kind(&()), namespace, name);
        self.api::<K>(namespace)
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| Error::from_kube(e, &K::kind(&()), namespace, &name))
    }

    async fn replace<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K> {
        let name = object.name_any();
        debug!(
            "Replacing {} {}/{} at resourceVersion {:?}",
            K::kind(&()),
            namespace,
            name,
            object.resource_version()
        );
        self.api::<K>(namespace)
            .replace(&name, &PostParams::default(), object)
            .await
            .map_err(|e| Error::from_kube(e, &K::kind(&()), namespace, &name))
    }

    async fn replace_status<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K> {
        let name = object.name_any();
        let value = serde_json::to_value(object)?;

        // A merge patch carrying resourceVersion is rejected with 409 when stale
        let patch = json!({
            "metadata": { "resourceVersion": object.resource_version() },
            "status": value.get("status").cloned().unwrap_or_default(),
        });

        self.api::<K>(namespace)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube(e, &K::kind(&()), namespace, &name))
    }
}
