// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lifecycle phases of a reconciled resource.
//!
//! The phase is never stored; it is derived from three observable facts on the
//! fetched object: whether it carries a deletion timestamp, whether the operator
//! finalizer is attached, and whether any status condition has been recorded.
//!
//! ```text
//!   Uninitialized ──▶ GuardAbsent ──▶ Converging
//!        │                │               │
//!        └────────────────┴───────┬───────┘
//!                                 ▼
//!                            Terminating ──▶ Released
//! ```
//!
//! Deletion is checked first, so a resource being deleted is never initialized
//! or converged again.

use std::fmt;

/// Where a resource stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No status condition recorded yet
    Uninitialized,
    /// Initialized, but the finalizer is not attached
    GuardAbsent,
    /// Guarded and live; children are diffed against the spec
    Converging,
    /// Deletion requested while the finalizer is still attached
    Terminating,
    /// Deletion requested and nothing left for this operator to do
    Released,
}

/// Work performed for a resource observed in a given phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Record `Available=Unknown` and persist
    InitializeStatus,
    /// Attach the finalizer and persist
    AttachFinalizer,
    /// Diff and mutate managed children, then report status
    Converge,
    /// Run the pre-delete hook and detach the finalizer
    Finalize,
    /// Nothing to do
    Idle,
}

impl Phase {
    /// Classify a resource from its observable facts.
    #[must_use]
    pub fn observe(deleting: bool, guarded: bool, initialized: bool) -> Self {
        match (deleting, guarded, initialized) {
            (true, true, _) => Self::Terminating,
            (true, false, _) => Self::Released,
            (false, _, false) => Self::Uninitialized,
            (false, false, true) => Self::GuardAbsent,
            (false, true, true) => Self::Converging,
        }
    }

    #[must_use]
    pub fn step(self) -> Step {
        match self {
            Self::Uninitialized => Step::InitializeStatus,
            Self::GuardAbsent => Step::AttachFinalizer,
            Self::Converging => Step::Converge,
            Self::Terminating => Step::Finalize,
            Self::Released => Step::Idle,
        }
    }

    /// Phases a resource may be observed in after this phase's step ran.
    ///
    /// Deletion can be requested at any moment by another client, so every live
    /// phase may move to `Terminating` or `Released`.
    #[must_use]
    pub fn successors(self) -> &'static [Phase] {
        match self {
            Self::Uninitialized => &[
                Self::GuardAbsent,
                Self::Converging,
                Self::Terminating,
                Self::Released,
            ],
            Self::GuardAbsent => &[Self::Converging, Self::Terminating, Self::Released],
            Self::Converging => &[Self::Converging, Self::Terminating, Self::Released],
            Self::Terminating => &[Self::Released],
            Self::Released => &[],
        }
    }

    #[must_use]
    pub fn allows(self, next: Phase) -> bool {
        self.successors().contains(&next)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::GuardAbsent => "GuardAbsent",
            Self::Converging => "Converging",
            Self::Terminating => "Terminating",
            Self::Released => "Released",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
