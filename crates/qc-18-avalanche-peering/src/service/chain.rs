//! Chain tracking: re-evaluates pooled proofs whenever the active tip moves.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::core::AvalancheService;
use crate::domain::{
    check_against_chain, Proof, ProofConfig, ProofError, ProofOrigin, ProofValidity, ReorgReport,
};
use crate::ports::{ChainState, PeerNetwork};

/// Chain engine notification. Heights are informational; every event
/// triggers a full re-evaluation against the current tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEvent {
    BlockConnected { height: u32 },
    BlockDisconnected { height: u32 },
    BlockInvalidated { height: u32 },
    BlockReconsidered { height: u32 },
}

impl ChainEvent {
    pub fn height(&self) -> u32 {
        match self {
            Self::BlockConnected { height }
            | Self::BlockDisconnected { height }
            | Self::BlockInvalidated { height }
            | Self::BlockReconsidered { height } => *height,
        }
    }
}

/// Serializes re-evaluation passes.
#[derive(Debug, Default)]
pub struct ChainTracker {
    passes: Mutex<u64>,
}

impl ChainTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed passes.
    pub fn passes(&self) -> u64 {
        *self.passes.lock()
    }

    /// Exclude re-evaluation passes while the guard lives. Held while a
    /// proof is checked against the chain and inserted, so no tip change
    /// is processed in between.
    pub(crate) fn exclusive(&self) -> MutexGuard<'_, u64> {
        self.passes.lock()
    }
}

/// Classify a proof against the current chain.
pub(crate) fn evaluate<C: ChainState + ?Sized>(
    proof: &Proof,
    chain: &C,
    config: &ProofConfig,
) -> (ProofValidity, Option<ProofError>) {
    match check_against_chain(proof, chain, config) {
        Ok(()) => (ProofValidity::Valid, None),
        Err(err) if err.is_provisional() => (ProofValidity::Provisional, Some(err)),
        Err(err) => (ProofValidity::Invalid, Some(err)),
    }
}

impl<C, N> AvalancheService<C, N>
where
    C: ChainState,
    N: PeerNetwork,
{
    /// Re-evaluate every pooled proof after a chain event.
    ///
    /// Passes never interleave. Validity is computed from a snapshot before
    /// the pool lock is taken and applied in a single write. Idempotent.
    pub fn on_chain_event(&self, event: ChainEvent) -> ReorgReport {
        let mut passes = self.tracker.exclusive();

        let updates: Vec<_> = self
            .pool
            .snapshot()
            .iter()
            .map(|(proof, _)| {
                let (validity, _) = evaluate(&**proof, &*self.chain, &self.config.proof);
                (proof.proof_id(), validity)
            })
            .collect();
        let mut report = self.pool.apply_validity(&updates);
        for removed in &report.removed {
            self.relay.forget_proof(removed);
        }
        self.refresh_local_status(&mut report);

        *passes += 1;
        if report.is_empty() {
            debug!(height = event.height(), "[qc-18] Chain event, no proof changes");
        } else {
            info!(
                height = event.height(),
                became_valid = report.became_valid.len(),
                became_invalid = report.became_invalid.len(),
                removed = report.removed.len(),
                bound = report.bound.len(),
                unbound = report.unbound.len(),
                "[qc-18] Re-evaluated proofs after {:?}",
                event
            );
        }
        report
    }

    /// Record the local proof's status, putting it back in the pool if an
    /// earlier pass evicted it and it is valid again.
    fn refresh_local_status(&self, report: &mut ReorgReport) {
        let Some(local) = &self.local else {
            return;
        };
        let (validity, error) = evaluate(&*local.proof, &*self.chain, &self.config.proof);

        if validity == ProofValidity::Valid && !self.pool.contains(&local.proof_id) {
            match self.pool.insert(Arc::clone(&local.proof), true) {
                Ok(result) => {
                    self.relay
                        .record_known(local.proof_id, ProofOrigin::Local, self.now());
                    report.became_valid.push(local.proof_id);
                    report.bound.extend_from_slice(result.bound());
                }
                Err(err) => warn!("[qc-18] Local proof {} not restored: {}", local.proof_id, err),
            }
        }

        let mut local_error = self.local_error.write();
        if *local_error != error {
            match &error {
                None => info!("[qc-18] Local proof {} is now valid", local.proof_id),
                Some(err) => warn!("[qc-18] Local proof {} is not valid: {}", local.proof_id, err),
            }
            *local_error = error;
        }
    }
}
