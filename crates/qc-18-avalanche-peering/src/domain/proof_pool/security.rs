//! Conflict resolution between proofs staking the same outputs.
//!
//! SECURITY-CRITICAL: must be deterministic so every node converges on the
//! same winner regardless of arrival order.

use crate::domain::{Proof, ProofId};

/// Whether `candidate` should replace `incumbent`.
pub fn is_preferred(
    candidate: &Proof,
    candidate_id: &ProofId,
    incumbent: &Proof,
    incumbent_id: &ProofId,
) -> bool {
    match candidate.sequence().cmp(&incumbent.sequence()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate_id < incumbent_id,
    }
}
