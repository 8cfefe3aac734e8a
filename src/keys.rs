// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! WireGuard key provisioning.
//!
//! Key generation is the only source of randomness in the operator, so it sits
//! behind [`KeyProvider`]. Production code uses [`X25519KeyProvider`]; tests
//! substitute [`FixedKeyProvider`] to get reproducible Secrets.
//!
//! Keys are Curve25519 scalars and points encoded as standard base64, the
//! format `wg genkey` and `wg pubkey` produce.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use std::sync::atomic::{AtomicU8, Ordering};
use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};

/// Length of a WireGuard key in bytes
pub const KEY_SIZE: usize = 32;

/// A base64-encoded WireGuard key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl KeyPair {
    /// Derive a key pair from raw private key bytes.
    #[must_use]
    pub fn from_private_bytes(mut private: [u8; KEY_SIZE]) -> Self {
        clamp(&mut private);
        let public = x25519(private, X25519_BASEPOINT_BYTES);
        Self {
            private_key: BASE64.encode(private),
            public_key: BASE64.encode(public),
        }
    }
}

/// Source of fresh key pairs.
pub trait KeyProvider: Send + Sync {
    fn generate(&self) -> KeyPair;
}

/// Generates key pairs from the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct X25519KeyProvider;

impl KeyProvider for X25519KeyProvider {
    fn generate(&self) -> KeyPair {
        let mut rng = rand::thread_rng();
        let mut private = [0u8; KEY_SIZE];
        rng.fill(&mut private);
        KeyPair::from_private_bytes(private)
    }
}

/// Deterministic provider: the n-th call derives its key from the byte `seed + n`.
#[derive(Debug, Default)]
pub struct FixedKeyProvider {
    next: AtomicU8,
}

impl FixedKeyProvider {
    #[must_use]
    pub fn new(seed: u8) -> Self {
        Self {
            next: AtomicU8::new(seed),
        }
    }

    /// Number of key pairs handed out so far, relative to the seed.
    #[must_use]
    pub fn peek(&self) -> u8 {
        self.next.load(Ordering::SeqCst)
    }
}

impl KeyProvider for FixedKeyProvider {
    fn generate(&self) -> KeyPair {
        let byte = self.next.fetch_add(1, Ordering::SeqCst);
        KeyPair::from_private_bytes([byte; KEY_SIZE])
    }
}

// RFC 7748 scalar clamping, as applied by `wg genkey`.
fn clamp(scalar: &mut [u8; KEY_SIZE]) {
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod keys_tests;
