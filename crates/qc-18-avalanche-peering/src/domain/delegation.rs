//! # Key Delegation
//!
//! A delegation lets a proof's master key hand its authority to another key,
//! possibly through several levels. Each level is signed by the previous
//! key over the rolling delegation id:
//!
//! ```text
//! dgid_0 = proof_id
//! dgid_i = H(dgid_{i-1} || pubkey_i)
//! level i signature = sign_{key_{i-1}}(dgid_i)
//! ```
//!
//! The last key in the chain is the session key that signs avahello
//! messages. A delegation with no levels resolves to the master itself.

use serde::{Deserialize, Serialize};

use super::crypto::{HashWriter, KeyPair, PublicKey, Signature};
use super::errors::DelegationError;
use super::proof::{compute_proof_id, Proof};
use super::value_objects::{DelegationId, LimitedProofId, ProofId};
use crate::wire::codec;

/// Key that signs a connection's avahello.
pub type SessionKey = PublicKey;

/// One hop in a delegation chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationLevel {
    pub pubkey: PublicKey,
    pub signature: Signature,
}

fn next_id(previous: &DelegationId, pubkey: &PublicKey) -> DelegationId {
    let mut writer = HashWriter::new();
    writer
        .write_bytes(previous.as_bytes())
        .write_bytes(pubkey.as_bytes());
    DelegationId::new(writer.finalize())
}

/// Chain of authority from a proof master to a session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    limited_proof_id: LimitedProofId,
    proof_master: PublicKey,
    levels: Vec<DelegationLevel>,
}

impl Delegation {
    pub fn new(
        limited_proof_id: LimitedProofId,
        proof_master: PublicKey,
        levels: Vec<DelegationLevel>,
    ) -> Self {
        Self {
            limited_proof_id,
            proof_master,
            levels,
        }
    }

    /// Delegation sent by a node without a proof: zero limited id, the
    /// session key standing in as master.
    pub fn no_proof(session: PublicKey) -> Self {
        Self::new(LimitedProofId::zero(), session, Vec::new())
    }

    pub fn declares_no_proof(&self) -> bool {
        self.limited_proof_id.is_zero()
    }

    pub fn limited_proof_id(&self) -> LimitedProofId {
        self.limited_proof_id
    }

    pub fn proof_master(&self) -> &PublicKey {
        &self.proof_master
    }

    pub fn levels(&self) -> &[DelegationLevel] {
        &self.levels
    }

    /// Id of the proof this delegation belongs to.
    pub fn proof_id(&self) -> ProofId {
        compute_proof_id(&self.limited_proof_id, &self.proof_master)
    }

    /// Whether this delegation was issued for `proof`.
    pub fn matches(&self, proof: &Proof) -> bool {
        self.limited_proof_id == proof.limited_proof_id() && &self.proof_master == proof.master()
    }

    /// Delegation id after the last level.
    pub fn id(&self) -> DelegationId {
        self.levels
            .iter()
            .fold(DelegationId::new(*self.proof_id().as_bytes()), |id, level| {
                next_id(&id, &level.pubkey)
            })
    }

    /// Verify every level and return the final (session) key.
    pub fn resolve(&self, max_levels: usize) -> Result<SessionKey, DelegationError> {
        if self.levels.len() > max_levels {
            return Err(DelegationError::TooManyLevels {
                levels: self.levels.len(),
                max: max_levels,
            });
        }

        let mut key = self.proof_master;
        let mut id = DelegationId::new(*self.proof_id().as_bytes());
        for (index, level) in self.levels.iter().enumerate() {
            id = next_id(&id, &level.pubkey);
            if !key.verify(id.as_bytes(), &level.signature) {
                return Err(DelegationError::BrokenChain { level: index + 1 });
            }
            key = level.pubkey;
        }
        Ok(key)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DelegationError> {
        codec::decode(bytes).map_err(|e| DelegationError::Malformed(e.to_string()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, DelegationError> {
        let bytes =
            hex::decode(s.trim()).map_err(|e| DelegationError::Malformed(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

/// Extends a delegation one level at a time.
#[derive(Debug, Clone)]
pub struct DelegationBuilder {
    delegation: Delegation,
    tip_key: PublicKey,
    tip_id: DelegationId,
}

impl DelegationBuilder {
    /// Start a chain at `proof`'s master key.
    pub fn new(proof: &Proof) -> Self {
        Self::from_delegation(Delegation::new(
            proof.limited_proof_id(),
            *proof.master(),
            Vec::new(),
        ))
    }

    /// Continue an existing chain. The caller is trusted to pass a chain
    /// that resolves.
    pub fn from_delegation(delegation: Delegation) -> Self {
        let tip_key = delegation
            .levels
            .last()
            .map(|l| l.pubkey)
            .unwrap_or(delegation.proof_master);
        let tip_id = delegation.id();
        Self {
            delegation,
            tip_key,
            tip_id,
        }
    }

    /// Delegate from the current tip key (held by `signer`) to `delegated`.
    pub fn add_level(
        &mut self,
        signer: &KeyPair,
        delegated: PublicKey,
    ) -> Result<(), DelegationError> {
        if signer.public_key() != self.tip_key {
            return Err(DelegationError::BrokenChain {
                level: self.delegation.levels.len() + 1,
            });
        }
        let id = next_id(&self.tip_id, &delegated);
        self.delegation.levels.push(DelegationLevel {
            pubkey: delegated,
            signature: signer.sign(id.as_bytes()),
        });
        self.tip_key = delegated;
        self.tip_id = id;
        Ok(())
    }

    pub fn build(self) -> Delegation {
        self.delegation
    }
}
