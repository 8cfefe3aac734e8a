// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic finalizer management for the operator's custom resources.
//!
//! The finalizer keeps a resource in the store after deletion is requested,
//! until the pre-delete hook has run and recorded its outcome in status.
//! Writes go through an [`ObjectStore`] and are conditional on the resource
//! version of the object passed in.
//!
//! # Example
//!
//! ```rust,ignore
//! use wireguard_operator::reconcilers::finalizers::{ensure_finalizer, is_deleting};
//! use wireguard_operator::constants::FINALIZER_WIREGUARD;
//!
//! if !is_deleting(&wg) {
//!     ensure_finalizer(&store, &wg, FINALIZER_WIREGUARD).await?;
//! }
//! ```

use super::store::{ObjectStore, StoreObject};
use crate::errors::Result;
use kube::ResourceExt;
use tracing::info;

/// True when `finalizer` is attached to `resource`.
#[must_use]
pub fn has_finalizer<T: ResourceExt>(resource: &T, finalizer: &str) -> bool {
    resource.finalizers().iter().any(|f| f == finalizer)
}

/// True once deletion of `resource` has been requested.
#[must_use]
pub fn is_deleting<T: ResourceExt>(resource: &T) -> bool {
    resource.meta().deletion_timestamp.is_some()
}

/// Add a finalizer to a resource if not already present.
///
/// Returns the updated resource, or `None` when the finalizer was already there.
///
/// # Errors
///
/// Returns [`crate::errors::Error::Conflict`] if `resource` is stale, or any
/// other store error.
pub async fn ensure_finalizer<S, T>(store: &S, resource: &T, finalizer: &str) -> Result<Option<T>>
where
    S: ObjectStore,
    T: StoreObject,
{
    if has_finalizer(resource, finalizer) {
        return Ok(None);
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Adding finalizer {} to {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let mut updated = resource.clone();
    updated.finalizers_mut().push(finalizer.to_string());
    store.replace(&namespace, &updated).await.map(Some)
}

/// Remove a finalizer from a resource if present.
///
/// Once the last finalizer of a resource being deleted is removed, the platform
/// deletes it and garbage-collects its children.
///
/// # Errors
///
/// Returns [`crate::errors::Error::Conflict`] if `resource` is stale, or any
/// other store error.
pub async fn remove_finalizer<S, T>(store: &S, resource: &T, finalizer: &str) -> Result<Option<T>>
where
    S: ObjectStore,
    T: StoreObject,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(None);
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(
        "Removing finalizer {} from {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let mut updated = resource.clone();
    updated.finalizers_mut().retain(|f| f != finalizer);
    store.replace(&namespace, &updated).await.map(Some)
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
