// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use alloy::primitives::U256;
use anyhow::{anyhow, bail, Result};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::handle::Handle;

/// Domain tag mixed into every response key.
const SEAL_DOMAIN: &[u8] = b"shade-user-decrypt-v1";
pub const NONCE_LEN: usize = 12;

/// Ephemeral X25519 keypair receiving one decryption response.
pub struct KeyPair {
    private_key: Zeroizing<[u8; 32]>,
    public_key: [u8; 32],
}

impl KeyPair {
    pub fn generate() -> Self {
        let mut private_key = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut *private_key);
        Self::from_private_key(private_key)
    }

    pub fn from_private_key(private_key: Zeroizing<[u8; 32]>) -> Self {
        let secret = StaticSecret::from(*private_key);
        let public_key = PublicKey::from(&secret).to_bytes();
        Self {
            private_key,
            public_key,
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public_key
    }

    /// `0x` prefixed hex of the public key.
    pub fn public_key_hex(&self) -> String {
        shade_utils::encode_hex_prefixed(&self.public_key)
    }

    pub fn private_key(&self) -> &Zeroizing<[u8; 32]> {
        &self.private_key
    }

    fn response_key(&self, ephemeral_public: &[u8; 32]) -> Zeroizing<[u8; 32]> {
        let secret = StaticSecret::from(*self.private_key);
        let shared = secret.diffie_hellman(&PublicKey::from(*ephemeral_public));
        derive_key(shared.as_bytes())
    }

    /// Open a response sealed to this keypair.
    pub fn open(&self, sealed: &SealedValue) -> Result<U256> {
        let key = self.response_key(&sealed.ephemeral_public_key);
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| anyhow!("Failed to create AES-GCM cipher: {}", e))?;
        let handle = sealed.handle.as_b256();
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&sealed.nonce),
                Payload {
                    msg: &sealed.ciphertext,
                    aad: handle.as_slice(),
                },
            )
            .map_err(|_| anyhow!("sealed value for {} failed authentication", sealed.handle))?;
        let plaintext = Zeroizing::new(plaintext);
        if plaintext.len() != 32 {
            bail!(
                "sealed value for {} has {} bytes, expected 32",
                sealed.handle,
                plaintext.len()
            );
        }
        Ok(U256::from_be_slice(&plaintext))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn derive_key(shared: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(SEAL_DOMAIN);
    hasher.update(shared);
    Zeroizing::new(hasher.finalize().into())
}

/// One decrypted value encrypted to the requester's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    pub handle: Handle,
    pub ephemeral_public_key: [u8; 32],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

/// Seal `value` to `recipient`. The decryption service side of [`KeyPair::open`].
pub fn seal(recipient: &[u8; 32], handle: Handle, value: U256) -> Result<SealedValue> {
    let ephemeral = StaticSecret::random_from_rng(OsRng);
    let ephemeral_public_key = PublicKey::from(&ephemeral).to_bytes();
    let shared = ephemeral.diffie_hellman(&PublicKey::from(*recipient));
    let key = derive_key(shared.as_bytes());

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| anyhow!("Failed to create AES-GCM cipher: {}", e))?;
    let plaintext = Zeroizing::new(value.to_be_bytes::<32>());
    let b256 = handle.as_b256();
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext.as_slice(),
                aad: b256.as_slice(),
            },
        )
        .map_err(|e| anyhow!("AES-GCM encryption failed: {}", e))?;

    Ok(SealedValue {
        handle,
        ephemeral_public_key,
        nonce,
        ciphertext,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::FheType;

    fn handle() -> Handle {
        Handle::compose([0x42; 21], 0, 31337, FheType::Uint64)
    }

    #[test]
    fn test_seal_then_open() -> Result<()> {
        let keypair = KeyPair::generate();
        let sealed = seal(&keypair.public_key(), handle(), U256::from(1000))?;
        assert_eq!(keypair.open(&sealed)?, U256::from(1000));
        Ok(())
    }

    #[test]
    fn test_wrong_keypair_cannot_open() -> Result<()> {
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        let sealed = seal(&keypair.public_key(), handle(), U256::from(7))?;
        assert!(other.open(&sealed).is_err());
        Ok(())
    }

    #[test]
    fn test_handle_is_bound_to_ciphertext() -> Result<()> {
        let keypair = KeyPair::generate();
        let mut sealed = seal(&keypair.public_key(), handle(), U256::from(7))?;
        sealed.handle = Handle::compose([0x43; 21], 0, 31337, FheType::Uint64);
        assert!(keypair.open(&sealed).is_err());
        Ok(())
    }

    #[test]
    fn test_keypairs_are_fresh() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.public_key(), b.public_key());
        assert_ne!(**a.private_key(), **b.private_key());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let keypair = KeyPair::generate();
        let printed = format!("{:?}", keypair);
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains(&hex::encode(&**keypair.private_key())));
    }
}
