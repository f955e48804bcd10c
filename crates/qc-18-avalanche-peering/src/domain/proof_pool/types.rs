//! Proof pool types.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::{NodeId, Proof, ProofId};

/// Pool record for one proof.
#[derive(Debug, Clone)]
pub(super) struct PoolEntry {
    pub proof: Arc<Proof>,
    pub valid: bool,
    pub bound: BTreeSet<NodeId>,
}

/// Result of inserting a proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Proof entered the pool
    Added {
        proof_id: ProofId,
        /// Connections bound by this insertion
        bound: Vec<NodeId>,
        /// Conflicting proofs evicted in favour of this one
        superseded: Vec<ProofId>,
        /// Connections that lost their binding to an evicted proof
        unbound: Vec<NodeId>,
    },
    /// Proof was already in the pool; nothing changed
    AlreadyKnown(ProofId),
}

impl InsertResult {
    pub fn proof_id(&self) -> ProofId {
        match self {
            Self::Added { proof_id, .. } | Self::AlreadyKnown(proof_id) => *proof_id,
        }
    }

    pub fn bound(&self) -> &[NodeId] {
        match self {
            Self::Added { bound, .. } => bound,
            Self::AlreadyKnown(_) => &[],
        }
    }

    pub fn unbound(&self) -> &[NodeId] {
        match self {
            Self::Added { unbound, .. } => unbound,
            Self::AlreadyKnown(_) => &[],
        }
    }
}

/// Why a claimed proof does not bind yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingReason {
    /// Proof not in the pool; fetch it
    Unknown,
    /// Proof in the pool but not currently valid
    Invalid,
}

/// Result of resolving a connection to a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    Pending(PendingReason),
    /// Connection already closed; nothing recorded
    NotConnected,
}

/// Re-evaluation result for a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofValidity {
    Valid,
    /// Immature or missing UTXO; kept but unbound
    Provisional,
    /// Permanently invalid; evicted
    Invalid,
}

/// A live connection bound to a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PeerBinding {
    pub node: NodeId,
    pub proof_id: ProofId,
}

/// A valid proof with the number of connections bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRosterEntry {
    pub proof_id: ProofId,
    pub proof: Arc<Proof>,
    pub node_count: usize,
}

/// Changes produced by re-evaluating the pool after a chain event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorgReport {
    pub became_valid: Vec<ProofId>,
    pub became_invalid: Vec<ProofId>,
    pub removed: Vec<ProofId>,
    pub bound: Vec<NodeId>,
    pub unbound: Vec<NodeId>,
}

impl ReorgReport {
    pub fn is_empty(&self) -> bool {
        self.became_valid.is_empty()
            && self.became_invalid.is_empty()
            && self.removed.is_empty()
            && self.bound.is_empty()
            && self.unbound.is_empty()
    }
}
