// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ObjectStore`] for reconciler tests.
//!
//! Behaves like the API server where the reconcilers can observe it: resource
//! versions are enforced on every write, the status subresource is written
//! separately from the rest of the object, deletion waits for finalizers, and
//! removing an object cascades to everything it owns.

use super::store::{ObjectStore, StoreObject};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

const DELETION_TIMESTAMP: &str = "2025-01-01T00:00:00Z";

type Key = (String, String, String);

#[derive(Default)]
struct Inner {
    objects: BTreeMap<Key, Value>,
    next_version: u64,
    next_uid: u64,
    writes: Vec<(String, String)>,
    conflict_next_write: bool,
    failing_kind: Option<String>,
}

impl Inner {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn assign_identity(&mut self, value: &mut Value) {
        if value.pointer("/metadata/uid").and_then(Value::as_str).is_none() {
            self.next_uid += 1;
            value["metadata"]["uid"] = json!(format!("uid-{}", self.next_uid));
        }
        value["metadata"]["resourceVersion"] = json!(self.bump_version());
    }

    fn check_injected(&mut self, kind: &str, namespace: &str, name: &str) -> Result<()> {
        if self.conflict_next_write {
            self.conflict_next_write = false;
            return Err(conflict(kind, namespace, name));
        }
        if self.failing_kind.as_deref() == Some(kind) {
            return Err(Error::Kube(kube::Error::Api(Box::new(kube::core::response::Status {
                status: Some(kube::core::response::StatusSummary::Failure),
                message: format!("injected failure writing {kind}"),
                reason: "InternalError".to_string(),
                code: 500,
                metadata: None,
                details: None,
            }))));
        }
        Ok(())
    }

    fn check_version(&self, key: &Key, value: &Value) -> Result<()> {
        let stored = self
            .objects
            .get(key)
            .ok_or_else(|| not_found(&key.0, &key.1, &key.2))?;
        if stored.pointer("/metadata/resourceVersion") != value.pointer("/metadata/resourceVersion")
        {
            return Err(conflict(&key.0, &key.1, &key.2));
        }
        Ok(())
    }

    fn record_write(&mut self, kind: &str, name: &str) {
        self.writes.push((kind.to_string(), name.to_string()));
    }

    // Drop the object once it is being deleted and nothing guards it any more.
    fn collect_if_released(&mut self, key: &Key) {
        let Some(value) = self.objects.get(key) else {
            return;
        };
        let deleting = value.pointer("/metadata/deletionTimestamp").is_some();
        let guarded = value
            .pointer("/metadata/finalizers")
            .and_then(Value::as_array)
            .is_some_and(|f| !f.is_empty());
        if deleting && !guarded {
            self.remove_cascading(key);
        }
    }

    fn remove_cascading(&mut self, key: &Key) {
        let Some(removed) = self.objects.remove(key) else {
            return;
        };
        let Some(uid) = removed.pointer("/metadata/uid").and_then(Value::as_str) else {
            return;
        };

        let owned: Vec<Key> = self
            .objects
            .iter()
            .filter(|(_, v)| {
                v.pointer("/metadata/ownerReferences")
                    .and_then(Value::as_array)
                    .is_some_and(|refs| refs.iter().any(|r| r["uid"] == uid))
            })
            .map(|(k, _)| k.clone())
            .collect();
        for child in owned {
            self.remove_cascading(&child);
        }
    }
}

fn not_found(kind: &str, namespace: &str, name: &str) -> Error {
    Error::NotFound {
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn conflict(kind: &str, namespace: &str, name: &str) -> Error {
    Error::Conflict {
        kind: kind.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn key_of<K: StoreObject>(namespace: &str, name: &str) -> Key {
    (K::kind(&()).to_string(), namespace.to_string(), name.to_string())
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object as if a user had applied it. Not counted as a write.
    pub fn insert<K: StoreObject>(&self, object: &K) -> K {
        let mut inner = self.inner.lock().unwrap();
        let namespace = object.namespace().unwrap_or_default();
        let mut value = serde_json::to_value(object).unwrap();
        inner.assign_identity(&mut value);
        inner
            .objects
            .insert(key_of::<K>(&namespace, &object.name_any()), value.clone());
        serde_json::from_value(value).unwrap()
    }

    pub fn fetch<K: StoreObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let inner = self.inner.lock().unwrap();
        inner
            .objects
            .get(&key_of::<K>(namespace, name))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    /// Change an object out of band, as another client would.
    pub fn mutate<K: StoreObject>(&self, namespace: &str, name: &str, f: impl FnOnce(&mut K)) {
        let mut inner = self.inner.lock().unwrap();
        let key = key_of::<K>(namespace, name);
        let mut object: K = serde_json::from_value(inner.objects[&key].clone()).unwrap();
        f(&mut object);
        let mut value = serde_json::to_value(&object).unwrap();
        value["metadata"]["resourceVersion"] = json!(inner.bump_version());
        inner.objects.insert(key, value);
    }

    /// Request deletion. Objects with finalizers only get a deletion timestamp.
    pub fn delete<K: StoreObject>(&self, namespace: &str, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        let key = key_of::<K>(namespace, name);
        let version = inner.bump_version();
        if let Some(value) = inner.objects.get_mut(&key) {
            value["metadata"]["deletionTimestamp"] = json!(DELETION_TIMESTAMP);
            value["metadata"]["resourceVersion"] = json!(version);
        }
        inner.collect_if_released(&key);
    }

    pub fn contains<K: StoreObject>(&self, namespace: &str, name: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.objects.contains_key(&key_of::<K>(namespace, name))
    }

    /// Number of successful writes since the store was created.
    pub fn writes(&self) -> usize {
        self.inner.lock().unwrap().writes.len()
    }

    /// Successful writes as `(kind, name)` in the order they happened.
    pub fn write_log(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn fail_next_write_with_conflict(&self) {
        self.inner.lock().unwrap().conflict_next_write = true;
    }

    /// Make every create or replace of `kind` fail with a server error.
    pub fn fail_writes_of(&self, kind: &str) {
        self.inner.lock().unwrap().failing_kind = Some(kind.to_string());
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        Ok(self.fetch(namespace, name))
    }

    async fn create<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K> {
        let mut inner = self.inner.lock().unwrap();
        let name = object.name_any();
        let key = key_of::<K>(namespace, &name);
        inner.check_injected(&key.0, namespace, &name)?;
        if inner.objects.contains_key(&key) {
            return Err(conflict(&key.0, namespace, &name));
        }

        let mut value = serde_json::to_value(object)?;
        value["metadata"]["namespace"] = json!(namespace);
        inner.assign_identity(&mut value);
        inner.objects.insert(key.clone(), value.clone());
        inner.record_write(&key.0, &name);
        Ok(serde_json::from_value(value)?)
    }

    async fn replace<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K> {
        let mut inner = self.inner.lock().unwrap();
        let name = object.name_any();
        let key = key_of::<K>(namespace, &name);
        inner.check_injected(&key.0, namespace, &name)?;
        let mut value = serde_json::to_value(object)?;
        inner.check_version(&key, &value)?;

        let stored = &inner.objects[&key];
        let status = stored.get("status").cloned();
        let deletion = stored.pointer("/metadata/deletionTimestamp").cloned();
        let uid = stored.pointer("/metadata/uid").cloned();
        match status {
            Some(status) => value["status"] = status,
            None => {
                if let Some(map) = value.as_object_mut() {
                    map.remove("status");
                }
            }
        }
        if let Some(deletion) = deletion {
            value["metadata"]["deletionTimestamp"] = deletion;
        }
        if let Some(uid) = uid {
            value["metadata"]["uid"] = uid;
        }
        value["metadata"]["resourceVersion"] = json!(inner.bump_version());

        inner.objects.insert(key.clone(), value.clone());
        inner.record_write(&key.0, &name);
        inner.collect_if_released(&key);
        Ok(serde_json::from_value(value)?)
    }

    async fn replace_status<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K> {
        let mut inner = self.inner.lock().unwrap();
        let name = object.name_any();
        let key = key_of::<K>(namespace, &name);
        inner.check_injected(&key.0, namespace, &name)?;
        let value = serde_json::to_value(object)?;
        inner.check_version(&key, &value)?;

        let version = inner.bump_version();
        let stored = inner
            .objects
            .get_mut(&key)
            .ok_or_else(|| not_found(&key.0, namespace, &name))?;
        stored["status"] = value.get("status").cloned().unwrap_or_default();
        stored["metadata"]["resourceVersion"] = json!(version);
        let updated = stored.clone();

        inner.record_write(&key.0, &name);
        Ok(serde_json::from_value(updated)?)
    }
}
