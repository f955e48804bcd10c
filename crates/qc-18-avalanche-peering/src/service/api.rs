use std::net::IpAddr;
use std::sync::Arc;

use crate::domain::{
    AvalancheError, PeerRosterEntry, Proof, ProofId, ProofOrigin, ServiceFlags,
};
use crate::ports::{AvalancheApi, ChainState, LocalProofStatus, PeerNetwork};
use crate::service::AvalancheService;

impl<C, N> AvalancheApi for AvalancheService<C, N>
where
    C: ChainState,
    N: PeerNetwork,
{
    fn local_proof(&self) -> Option<LocalProofStatus> {
        let local = self.local.as_ref()?;
        let error = self.local_error.read().clone();
        Some(LocalProofStatus {
            proof_id: local.proof_id,
            limited_proof_id: local.proof.limited_proof_id(),
            proof: Arc::clone(&local.proof),
            valid: self.pool.is_valid(&local.proof_id) == Some(true),
            error,
        })
    }

    fn peer_roster(&self) -> Vec<PeerRosterEntry> {
        self.pool.roster()
    }

    fn is_banned(&self, address: &IpAddr) -> bool {
        self.scorer.is_banned(address, self.now())
    }

    fn submit_proof(&self, raw: &[u8]) -> Result<ProofId, AvalancheError> {
        let proof = Proof::from_bytes(raw)?;
        let acceptance = self.accept_proof(Arc::new(proof), ProofOrigin::Submitted)?;
        match acceptance.pending {
            Some(err) => Err(err.into()),
            None => Ok(acceptance.proof_id),
        }
    }

    fn fetch_by_id_now(&self, proof_id: &ProofId) -> Result<(), AvalancheError> {
        if self.relay.force_unconditional(proof_id, self.now()) {
            Ok(())
        } else {
            Err(AvalancheError::UnknownProof(*proof_id))
        }
    }

    fn local_services(&self) -> ServiceFlags {
        let valid = self
            .local_proof_id()
            .is_some_and(|id| self.pool.is_valid(&id) == Some(true));
        if valid {
            ServiceFlags::NODE_NETWORK | ServiceFlags::NODE_AVALANCHE
        } else {
            ServiceFlags::NODE_NETWORK
        }
    }
}
