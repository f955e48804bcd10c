//! Domain Errors for Avalanche Peering
//!
//! Error taxonomy:
//! - `Immature` and `MissingUtxo` are provisional: the proof is kept and
//!   re-checked on every chain-tip change.
//! - `InvalidHandshakeSignature` and `BrokenChain` (during a handshake) are
//!   fatal to the connection, never to the node.
//! - `UnknownProof` and `FetchTimeout` are local and recoverable.

use thiserror::Error;

use super::value_objects::{Amount, NodeId, OutPoint, ProofId};

/// Reasons a proof fails validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProofError {
    /// Undecodable bytes or a structural rule violation
    #[error("malformed proof: {0}")]
    Malformed(String),

    /// A stake signature does not verify under the stake's key
    #[error("invalid stake signature at index {index}")]
    InvalidSignature { index: usize },

    /// Total staked amount is below the dust threshold
    #[error("insufficient staked value: {total} < {threshold}")]
    InsufficientValue { total: Amount, threshold: Amount },

    /// A stake's block does not have enough confirmations yet
    #[error("immature stake {utxo}: {confirmations} of {required} confirmations")]
    Immature {
        utxo: OutPoint,
        confirmations: u32,
        required: u32,
    },

    /// Proof expiration time has passed
    #[error("proof expired at {expiration_time}")]
    Expired { expiration_time: i64 },

    /// The staked output is not in the UTXO set (yet, or anymore)
    #[error("missing utxo {utxo}")]
    MissingUtxo { utxo: OutPoint },

    /// The staked output exists but does not match the stake's claims
    #[error("utxo {utxo} does not match stake: {reason}")]
    UtxoMismatch { utxo: OutPoint, reason: &'static str },

    /// A conflicting proof with a better sequence is already known
    #[error("conflicts with preferred proof {0}")]
    Conflicting(ProofId),
}

impl ProofError {
    /// Provisional failures keep the proof in the pool flagged invalid.
    pub fn is_provisional(&self) -> bool {
        matches!(self, Self::Immature { .. } | Self::MissingUtxo { .. })
    }
}

/// Reasons a delegation chain fails to resolve.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DelegationError {
    /// Undecodable delegation bytes
    #[error("malformed delegation: {0}")]
    Malformed(String),

    /// Level `level` (1-based) is not signed by the previous key
    #[error("broken delegation chain at level {level}")]
    BrokenChain { level: usize },

    /// Chain is longer than the configured maximum
    #[error("delegation has {levels} levels, maximum is {max}")]
    TooManyLevels { levels: usize, max: usize },

    /// Delegation does not belong to the expected proof
    #[error("delegation does not match proof {0}")]
    ProofMismatch(ProofId),
}

/// Top-level errors for the avalanche peering subsystem.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AvalancheError {
    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Delegation(#[from] DelegationError),

    /// avahello signature does not verify under the resolved session key
    #[error("invalid avahello signature")]
    InvalidHandshakeSignature,

    /// Proof is not in the pool
    #[error("unknown proof {0}")]
    UnknownProof(ProofId),

    /// A proof fetch went unanswered
    #[error("fetch of proof {proof_id} from peer {peer} timed out")]
    FetchTimeout { proof_id: ProofId, peer: NodeId },

    /// Connection attempt from a banned address
    #[error("peer {0} is banned")]
    PeerBanned(NodeId),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AvalancheError {
    /// Errors that must drop the connection and penalise the peer.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            Self::InvalidHandshakeSignature
                | Self::Delegation(DelegationError::BrokenChain { .. })
                | Self::Delegation(DelegationError::TooManyLevels { .. })
        )
    }
}
