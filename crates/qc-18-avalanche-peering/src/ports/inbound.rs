//! # Driving Ports (Inbound API)
//!
//! Status and command API the node's RPC layer drives.

use std::net::IpAddr;
use std::sync::Arc;

use crate::domain::{
    AvalancheError, LimitedProofId, PeerRosterEntry, Proof, ProofError, ProofId, ServiceFlags,
};

/// Status of the node's own proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalProofStatus {
    pub proof_id: ProofId,
    pub limited_proof_id: LimitedProofId,
    pub proof: Arc<Proof>,
    /// Whether the proof is currently valid against the active chain
    pub valid: bool,
    /// Why the proof is not valid, when it is not
    pub error: Option<ProofError>,
}

/// Primary API for the avalanche peering subsystem.
///
/// # Example
///
/// ```rust,ignore
/// use qc_18_avalanche_peering::ports::AvalancheApi;
///
/// fn print_roster<T: AvalancheApi>(api: &T) {
///     for entry in api.peer_roster() {
///         println!("{} nodes={}", entry.proof_id, entry.node_count);
///     }
/// }
/// ```
pub trait AvalancheApi: Send + Sync {
    /// The configured local proof, if any.
    fn local_proof(&self) -> Option<LocalProofStatus>;

    /// Valid proofs with the number of connections bound to each, the local
    /// proof included.
    fn peer_roster(&self) -> Vec<PeerRosterEntry>;

    /// Whether connections from `address` are currently refused.
    fn is_banned(&self, address: &IpAddr) -> bool;

    /// Validate and add a serialized proof, relaying it to every connected
    /// peer when valid.
    ///
    /// # Returns
    ///
    /// - `Ok(proof_id)` when the proof is valid and pooled
    /// - `Err(Proof(Immature | MissingUtxo))` when the proof is kept but not
    ///   yet valid
    /// - any other `Err` when the proof is rejected outright
    fn submit_proof(&self, raw: &[u8]) -> Result<ProofId, AvalancheError>;

    /// Serve a known proof to any requester from now on, skipping the
    /// unconditional relay delay.
    fn fetch_by_id_now(&self, proof_id: &ProofId) -> Result<(), AvalancheError>;

    /// Service flags to advertise; `NODE_AVALANCHE` only while the local
    /// proof is valid.
    fn local_services(&self) -> ServiceFlags;
}
