// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `Wireguard` and `WireguardPeer`.
//!
//! This module provides utility functions for creating and managing Kubernetes
//! status conditions following the standard conventions.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (`Available`, `Degraded`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed
//!
//! Conditions are keyed by type: an update replaces the entry of the same type
//! in place and never reorders the others.
//!
//! # Example
//!
//! ```rust,no_run
//! use wireguard_operator::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Available",
//!     "True",
//!     "Reconciling",
//!     "Deployment for custom resource (office) with 1 replicas created successfully"
//! );
//! ```

use super::store::{ObjectStore, StoreObject};
use crate::crd::{Condition, Wireguard, WireguardPeer, WireguardPeerStatus, WireguardStatus};
use crate::errors::Result;
use chrono::Utc;
use kube::ResourceExt;
use tracing::debug;

/// Create a new Kubernetes condition with the current timestamp.
///
/// # Example
///
/// ```rust,no_run
/// # use wireguard_operator::reconcilers::status::create_condition;
/// let condition = create_condition("Degraded", "Unknown", "Finalizing", "Cleaning up");
/// assert_eq!(condition.r#type, "Degraded");
/// assert_eq!(condition.status, "Unknown");
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// This function modifies the conditions list in-place by either updating an existing
/// condition or adding a new one. It preserves the `lastTransitionTime` if the status
/// hasn't changed, or sets a new timestamp if it has.
///
/// **Important:** This function does NOT make any Kubernetes API calls. Persist the
/// result through a [`StatusUpdater`].
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        // Preserve lastTransitionTime if status hasn't changed
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists to check if they are semantically equal.
///
/// Ignores `lastTransitionTime` and compares type, status, reason and message.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        current
            .iter()
            .find(|c| c.r#type == new_cond.r#type)
            .is_some_and(|curr_cond| {
                curr_cond.status == new_cond.status
                    && curr_cond.reason == new_cond.reason
                    && curr_cond.message == new_cond.message
            })
    })
}

/// Status subresource carrying a condition list.
pub trait ConditionedStatus: Default + Clone + Send + Sync {
    fn conditions(&self) -> &[Condition];
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    /// True when both statuses carry the same information, ignoring timestamps.
    fn same_as(&self, other: &Self) -> bool;
}

impl ConditionedStatus for WireguardStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }

    fn same_as(&self, other: &Self) -> bool {
        self.public_key == other.public_key
            && self.endpoint == other.endpoint
            && conditions_equal(&self.conditions, &other.conditions)
    }
}

impl ConditionedStatus for WireguardPeerStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.conditions
    }

    fn same_as(&self, other: &Self) -> bool {
        self.public_key == other.public_key
            && conditions_equal(&self.conditions, &other.conditions)
    }
}

/// Resource with a typed status subresource.
pub trait HasStatus: StoreObject {
    type Status: ConditionedStatus;

    fn status(&self) -> Option<&Self::Status>;
    fn status_mut(&mut self) -> &mut Option<Self::Status>;

    /// Conditions currently recorded on the resource.
    fn conditions(&self) -> &[Condition] {
        self.status().map_or(&[], ConditionedStatus::conditions)
    }
}

impl HasStatus for Wireguard {
    type Status = WireguardStatus;

    fn status(&self) -> Option<&WireguardStatus> {
        self.status.as_ref()
    }

    fn status_mut(&mut self) -> &mut Option<WireguardStatus> {
        &mut self.status
    }
}

impl HasStatus for WireguardPeer {
    type Status = WireguardPeerStatus;

    fn status(&self) -> Option<&WireguardPeerStatus> {
        self.status.as_ref()
    }

    fn status_mut(&mut self) -> &mut Option<WireguardPeerStatus> {
        &mut self.status
    }
}

/// Centralized status updater.
///
/// Collects all status changes for one resource in memory and persists them in a
/// single conditional write, and only when something semantically changed. Two
/// passes that reach the same conclusions therefore write nothing the second time.
pub struct StatusUpdater<K: HasStatus> {
    resource: K,
    current_status: Option<K::Status>,
    new_status: K::Status,
}

impl<K: HasStatus> StatusUpdater<K> {
    /// Start from the status currently recorded on `resource`.
    #[must_use]
    pub fn new(resource: &K) -> Self {
        let current_status = resource.status().cloned();
        let new_status = current_status.clone().unwrap_or_default();
        Self {
            resource: resource.clone(),
            current_status,
            new_status,
        }
    }

    /// Update or add a condition (in-memory only, no API call).
    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        update_condition_in_memory(
            self.new_status.conditions_mut(),
            condition_type,
            status,
            reason,
            message,
        );
    }

    /// Mutable access to the pending status for kind-specific fields.
    pub fn status_mut(&mut self) -> &mut K::Status {
        &mut self.new_status
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        self.new_status.conditions()
    }

    /// Check if the pending status differs from the recorded one.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => !current.same_as(&self.new_status),
        }
    }

    /// Persist the pending status if it changed.
    ///
    /// The write is conditional on the resource version the updater was built
    /// from. Returns the updated resource, or `None` when nothing was written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::Error::Conflict`] when the resource changed since
    /// it was read, or any other store error.
    pub async fn apply<S: ObjectStore>(self, store: &S) -> Result<Option<K>> {
        let namespace = self.resource.namespace().unwrap_or_default();
        let name = self.resource.name_any();

        if !self.has_changes() {
            debug!(
                "{} {}/{} status unchanged, skipping update",
                K::kind(&()),
                namespace,
                name
            );
            return Ok(None);
        }

        let conditions = self.new_status.conditions().len();
        let mut resource = self.resource;
        *resource.status_mut() = Some(self.new_status);
        let updated = store.replace_status(&namespace, &resource).await?;

        debug!(
            "Updated {} {}/{} status: {} condition(s)",
            K::kind(&()),
            namespace,
            name,
            conditions
        );

        Ok(Some(updated))
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
