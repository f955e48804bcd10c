//! Handshake data types.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Delegation, DelegationId, Hash256, HashWriter, NodeId, ProofId, ServiceFlags, Signature,
};

/// The avahello message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub delegation: Delegation,
    pub signature: Signature,
}

/// Challenge a hello signature commits to.
pub fn hello_challenge(
    delegation_id: &DelegationId,
    sender_nonce: u64,
    receiver_nonce: u64,
    sender_entropy: u64,
    receiver_entropy: u64,
) -> Hash256 {
    let mut writer = HashWriter::new();
    writer
        .write_bytes(delegation_id.as_bytes())
        .write_u64(sender_nonce)
        .write_u64(receiver_nonce)
        .write_u64(sender_entropy)
        .write_u64(receiver_entropy);
    writer.finalize()
}

/// Nonces and entropy exchanged during the version handshake, seen from
/// this node's side of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionNonces {
    pub local_nonce: u64,
    pub remote_nonce: u64,
    pub local_entropy: u64,
    pub remote_entropy: u64,
}

impl ConnectionNonces {
    pub fn new(local_nonce: u64, remote_nonce: u64, local_entropy: u64, remote_entropy: u64) -> Self {
        Self {
            local_nonce,
            remote_nonce,
            local_entropy,
            remote_entropy,
        }
    }

    /// Same connection seen from the remote side.
    pub fn mirrored(&self) -> Self {
        Self::new(
            self.remote_nonce,
            self.local_nonce,
            self.remote_entropy,
            self.local_entropy,
        )
    }

    /// Challenge for a hello this node sends.
    pub fn outbound_challenge(&self, delegation_id: &DelegationId) -> Hash256 {
        hello_challenge(
            delegation_id,
            self.local_nonce,
            self.remote_nonce,
            self.local_entropy,
            self.remote_entropy,
        )
    }

    /// Challenge for a hello this node receives.
    pub fn inbound_challenge(&self, delegation_id: &DelegationId) -> Hash256 {
        self.mirrored().outbound_challenge(delegation_id)
    }
}

/// Per-connection handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Connected; no hello received yet
    AwaitingHello,
    /// Hello verified; `None` when the peer declared no proof
    Verified { proof_id: Option<ProofId> },
    /// Hello verified and the claimed proof is valid in the pool
    Bound { proof_id: ProofId },
    /// Hello rejected; the connection is being dropped
    Failed,
    Disconnected,
}

/// Handshake session for one connection.
#[derive(Debug, Clone)]
pub struct HandshakeSession {
    node: NodeId,
    remote_services: ServiceFlags,
    nonces: ConnectionNonces,
    state: HandshakeState,
}

impl HandshakeSession {
    pub fn new(node: NodeId, remote_services: ServiceFlags, nonces: ConnectionNonces) -> Self {
        Self {
            node,
            remote_services,
            nonces,
            state: HandshakeState::AwaitingHello,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn remote_services(&self) -> ServiceFlags {
        self.remote_services
    }

    pub fn nonces(&self) -> &ConnectionNonces {
        &self.nonces
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Only the first hello on a connection is processed.
    pub fn accepts_hello(&self) -> bool {
        self.state == HandshakeState::AwaitingHello
    }

    /// Whether non-handshake avalanche messages are accepted.
    pub fn is_verified(&self) -> bool {
        matches!(
            self.state,
            HandshakeState::Verified { .. } | HandshakeState::Bound { .. }
        )
    }

    /// Proof the peer's hello claimed, if any.
    pub fn claimed_proof(&self) -> Option<ProofId> {
        match self.state {
            HandshakeState::Verified { proof_id } => proof_id,
            HandshakeState::Bound { proof_id } => Some(proof_id),
            _ => None,
        }
    }

    pub(crate) fn mark_verified(&mut self, proof_id: Option<ProofId>) {
        if self.accepts_hello() {
            self.state = HandshakeState::Verified { proof_id };
        }
    }

    pub(crate) fn mark_failed(&mut self) {
        if self.accepts_hello() {
            self.state = HandshakeState::Failed;
        }
    }

    /// Follow the pool: bound when `bound` holds, else back to verified.
    pub(crate) fn sync_binding(&mut self, bound: bool) {
        if let Some(proof_id) = self.claimed_proof() {
            self.state = if bound {
                HandshakeState::Bound { proof_id }
            } else {
                HandshakeState::Verified {
                    proof_id: Some(proof_id),
                }
            };
        }
    }

    pub(crate) fn mark_disconnected(&mut self) {
        self.state = HandshakeState::Disconnected;
    }
}
