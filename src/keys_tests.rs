// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `keys.rs`

#[cfg(test)]
mod tests {
    use crate::keys::{FixedKeyProvider, KeyPair, KeyProvider, X25519KeyProvider, KEY_SIZE};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    #[test]
    fn test_generated_keys_are_base64_32_bytes() {
        let pair = X25519KeyProvider.generate();

        let private = BASE64.decode(&pair.private_key).unwrap();
        let public = BASE64.decode(&pair.public_key).unwrap();
        assert_eq!(private.len(), KEY_SIZE);
        assert_eq!(public.len(), KEY_SIZE);
        // 32 bytes encode to 44 base64 characters, as wg(8) prints them
        assert_eq!(pair.private_key.len(), 44);
    }

    #[test]
    fn test_generated_private_key_is_clamped() {
        let pair = X25519KeyProvider.generate();
        let private = BASE64.decode(&pair.private_key).unwrap();
        assert_eq!(private[0] & 7, 0);
        assert_eq!(private[31] & 128, 0);
        assert_eq!(private[31] & 64, 64);
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = X25519KeyProvider.generate();
        let b = X25519KeyProvider.generate();
        assert_ne!(a.private_key, b.private_key);
        assert_ne!(a.public_key, b.public_key);
    }

    #[test]
    fn test_public_key_derivation_is_deterministic() {
        let a = KeyPair::from_private_bytes([7u8; KEY_SIZE]);
        let b = KeyPair::from_private_bytes([7u8; KEY_SIZE]);
        assert_eq!(a, b);
        assert_ne!(a.private_key, a.public_key);
    }

    #[test]
    fn test_fixed_provider_sequence() {
        let provider = FixedKeyProvider::new(1);
        let first = provider.generate();
        let second = provider.generate();

        assert_ne!(first, second);
        assert_eq!(first, KeyPair::from_private_bytes([1u8; KEY_SIZE]));
        assert_eq!(second, KeyPair::from_private_bytes([2u8; KEY_SIZE]));
        assert_eq!(provider.peek(), 3);
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let pair = KeyPair::from_private_bytes([9u8; KEY_SIZE]);
        let rendered = format!("{pair:?}");
        assert!(!rendered.contains(&pair.private_key));
        assert!(rendered.contains(&pair.public_key));
    }
}
