//! avahello verification (security-critical).
//!
//! SECURITY-CRITICAL: decides whether a peer controls the proof it claims.
//! Pure; callers run it without holding any lock.

use super::types::{ConnectionNonces, Hello};
use crate::domain::{AvalancheError, Delegation, KeyPair, ProofId};

/// What a verified hello established about the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelloVerdict {
    /// Peer declared it holds no proof
    NoProof,
    /// Peer controls the session key delegated from this proof's master
    Proof { proof_id: ProofId },
}

/// Verify a received hello.
///
/// # Algorithm
/// 1. Walk the delegation chain to the session key
/// 2. Check the signature over this connection's inbound challenge
/// 3. A zero limited proof id is a "no proof" declaration; no pool lookup
pub fn verify_hello(
    hello: &Hello,
    nonces: &ConnectionNonces,
    max_delegation_levels: usize,
) -> Result<HelloVerdict, AvalancheError> {
    let session = hello.delegation.resolve(max_delegation_levels)?;
    let challenge = nonces.inbound_challenge(&hello.delegation.id());
    if !session.verify(&challenge, &hello.signature) {
        return Err(AvalancheError::InvalidHandshakeSignature);
    }

    if hello.delegation.declares_no_proof() {
        Ok(HelloVerdict::NoProof)
    } else {
        Ok(HelloVerdict::Proof {
            proof_id: hello.delegation.proof_id(),
        })
    }
}

/// Sign a hello for this connection with the session key at the end of
/// `delegation`.
pub fn build_hello(
    delegation: Delegation,
    session_key: &KeyPair,
    nonces: &ConnectionNonces,
) -> Hello {
    let signature = session_key.sign(&nonces.outbound_challenge(&delegation.id()));
    Hello {
        delegation,
        signature,
    }
}
