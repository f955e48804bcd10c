//! Relay gating types.

use std::collections::HashSet;

use crate::domain::{NodeId, Timestamp};

/// How this node learned about a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofOrigin {
    /// The node's own configured proof
    Local,
    /// Received from a peer
    Received(NodeId),
    /// Submitted through the API
    Submitted,
}

/// Relay bookkeeping for one known proof.
#[derive(Debug, Clone)]
pub(super) struct RelayEntry {
    pub origin: ProofOrigin,
    pub announced_to: HashSet<NodeId>,
    pub unconditional_after: Timestamp,
}

/// Outcome of a getdata request for a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeDecision {
    /// Proof was announced to the requester
    Announced,
    /// Relay delay has elapsed
    Unconditional,
    /// Known, but neither announced to the requester nor old enough
    TooEarly,
    /// Not a proof this node relays
    Unknown,
}

impl ServeDecision {
    pub fn is_served(&self) -> bool {
        matches!(self, Self::Announced | Self::Unconditional)
    }
}

/// A proof requested from a peer and not yet received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFetch {
    pub peer: NodeId,
    pub deadline: Timestamp,
}
