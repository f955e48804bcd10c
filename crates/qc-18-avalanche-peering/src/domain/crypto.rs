//! # Keys, Signatures and Identity Hashing (secp256k1)
//!
//! Stake signatures, delegation levels and the avahello challenge are all
//! secp256k1 ECDSA signatures over 32-byte double-SHA256 digests.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization on signing, high-S rejected on verification
//! - Verification is pure and side-effect free; callers run it outside locks

use k256::ecdsa::{
    signature::{Signer, Verifier},
    Signature as EcdsaSignature, SigningKey, VerifyingKey,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};
use std::fmt;

use super::errors::AvalancheError;

/// 256-bit digest.
pub type Hash256 = [u8; 32];

/// Double SHA-256 of `data`.
pub fn double_sha256(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Incremental writer producing a double SHA-256 digest.
///
/// Integers are written little-endian so identities are stable across
/// platforms.
#[derive(Clone, Default)]
pub struct HashWriter {
    inner: Sha256,
}

impl HashWriter {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_bytes(&[u8::from(value)])
    }

    /// Finalize as double SHA-256.
    pub fn finalize(self) -> Hash256 {
        let first = self.inner.finalize();
        Sha256::digest(first).into()
    }
}

/// Compressed secp256k1 public key (33 bytes).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(#[serde_as(as = "Bytes")] [u8; 33]);

impl PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, AvalancheError> {
        VerifyingKey::from_sec1_bytes(&bytes)
            .map_err(|_| AvalancheError::InvalidKey("not a compressed secp256k1 point".into()))?;
        Ok(Self(bytes))
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, AvalancheError> {
        let raw = hex::decode(s.trim()).map_err(|e| AvalancheError::InvalidKey(e.to_string()))?;
        let bytes: [u8; 33] = raw
            .try_into()
            .map_err(|_| AvalancheError::InvalidKey("public key must be 33 bytes".into()))?;
        Self::from_bytes(bytes)
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify `signature` over a 32-byte digest.
    ///
    /// Returns `false` for undecodable keys or signatures rather than erroring:
    /// callers only care whether the claim holds.
    pub fn verify(&self, digest: &Hash256, signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(&self.0) else {
            return false;
        };
        let Ok(sig) = EcdsaSignature::from_slice(&signature.0) else {
            return false;
        };
        verifying_key.verify(&digest[..], &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde_as(as = "Bytes")] [u8; 64]);

impl Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

/// secp256k1 keypair used for the local master/session key.
///
/// The secret scalar is zeroized by `k256` on drop.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, AvalancheError> {
        let signing_key = SigningKey::from_bytes((&bytes).into())
            .map_err(|_| AvalancheError::InvalidKey("secret key out of range".into()))?;
        Ok(Self { signing_key })
    }

    /// Parse a hex-encoded 32-byte secret.
    pub fn from_secret_hex(s: &str) -> Result<Self, AvalancheError> {
        let raw = hex::decode(s.trim()).map_err(|e| AvalancheError::InvalidKey(e.to_string()))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| AvalancheError::InvalidKey("secret key must be 32 bytes".into()))?;
        Self::from_secret_bytes(bytes)
    }

    /// Compressed public key.
    pub fn public_key(&self) -> PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        PublicKey(bytes)
    }

    /// Sign a 32-byte digest (deterministic RFC 6979).
    pub fn sign(&self, digest: &Hash256) -> Signature {
        let sig: EcdsaSignature = self.signing_key.sign(&digest[..]);
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&sig.to_bytes());
        Signature(bytes)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
