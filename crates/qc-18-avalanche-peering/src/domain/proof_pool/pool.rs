//! Proof pool implementation.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use super::security::is_preferred;
use super::types::{
    BindOutcome, InsertResult, PeerBinding, PeerRosterEntry, PendingReason, PoolEntry,
    ProofValidity, ReorgReport,
};
use crate::domain::{LimitedProofId, NodeId, OutPoint, Proof, ProofError, ProofId};

#[derive(Debug, Default)]
struct PoolState {
    entries: HashMap<ProofId, PoolEntry>,
    by_limited: HashMap<LimitedProofId, ProofId>,
    by_utxo: HashMap<OutPoint, ProofId>,
    connected: HashSet<NodeId>,
    /// Proof each open connection's handshake resolved to
    resolved: HashMap<NodeId, ProofId>,
}

impl PoolState {
    fn waiting_on(&self, proof_id: &ProofId) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .resolved
            .iter()
            .filter(|(node, id)| *id == proof_id && self.connected.contains(*node))
            .map(|(node, _)| *node)
            .collect();
        nodes.sort();
        nodes
    }

    /// Bind every connection waiting on a now-valid proof.
    fn bind_waiting(&mut self, proof_id: &ProofId) -> Vec<NodeId> {
        let waiting = self.waiting_on(proof_id);
        let Some(entry) = self.entries.get_mut(proof_id) else {
            return Vec::new();
        };
        if !entry.valid {
            return Vec::new();
        }
        waiting
            .into_iter()
            .filter(|node| entry.bound.insert(*node))
            .collect()
    }

    fn unbind_all(&mut self, proof_id: &ProofId) -> Vec<NodeId> {
        self.entries
            .get_mut(proof_id)
            .map(|entry| std::mem::take(&mut entry.bound).into_iter().collect())
            .unwrap_or_default()
    }

    fn remove_entry(&mut self, proof_id: &ProofId) -> Option<PoolEntry> {
        let entry = self.entries.remove(proof_id)?;
        let limited = entry.proof.limited_proof_id();
        if self.by_limited.get(&limited) == Some(proof_id) {
            self.by_limited.remove(&limited);
        }
        for signed in entry.proof.stakes() {
            if self.by_utxo.get(&signed.stake.utxo) == Some(proof_id) {
                self.by_utxo.remove(&signed.stake.utxo);
            }
        }
        Some(entry)
    }
}

/// Pool of known proofs and the connections bound to them.
///
/// Internally synchronized; readers never block each other.
#[derive(Debug, Default)]
pub struct ProofPool {
    state: RwLock<PoolState>,
}

impl ProofPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a proof that has passed chain-independent validation.
    ///
    /// `valid` is false for provisional proofs. Conflicting proofs that lose
    /// to `proof` are evicted; if any conflicting proof is preferred,
    /// nothing changes and `Conflicting` is returned.
    pub fn insert(&self, proof: Arc<Proof>, valid: bool) -> Result<InsertResult, ProofError> {
        let proof_id = proof.proof_id();
        let mut state = self.state.write();
        if state.entries.contains_key(&proof_id) {
            return Ok(InsertResult::AlreadyKnown(proof_id));
        }

        let conflicts: BTreeSet<ProofId> = proof
            .stakes()
            .iter()
            .filter_map(|s| state.by_utxo.get(&s.stake.utxo).copied())
            .collect();
        for conflict_id in &conflicts {
            if let Some(incumbent) = state.entries.get(conflict_id) {
                if !is_preferred(&proof, &proof_id, &incumbent.proof, conflict_id) {
                    return Err(ProofError::Conflicting(*conflict_id));
                }
            }
        }

        let mut superseded = Vec::with_capacity(conflicts.len());
        let mut unbound = Vec::new();
        for conflict_id in conflicts {
            if let Some(evicted) = state.remove_entry(&conflict_id) {
                info!("[qc-18] Proof {} superseded by {}", conflict_id, proof_id);
                unbound.extend(evicted.bound);
                superseded.push(conflict_id);
            }
        }
        unbound.sort();

        state
            .by_limited
            .insert(proof.limited_proof_id(), proof_id);
        for signed in proof.stakes() {
            state.by_utxo.insert(signed.stake.utxo, proof_id);
        }
        state.entries.insert(
            proof_id,
            PoolEntry {
                proof,
                valid,
                bound: BTreeSet::new(),
            },
        );
        let bound = state.bind_waiting(&proof_id);

        debug!(
            "[qc-18] Added proof {} (valid={}, bound {} peers)",
            proof_id,
            valid,
            bound.len()
        );
        Ok(InsertResult::Added {
            proof_id,
            bound,
            superseded,
            unbound,
        })
    }

    pub fn get(&self, proof_id: &ProofId) -> Option<Arc<Proof>> {
        self.state
            .read()
            .entries
            .get(proof_id)
            .map(|e| Arc::clone(&e.proof))
    }

    pub fn contains(&self, proof_id: &ProofId) -> bool {
        self.state.read().entries.contains_key(proof_id)
    }

    /// `None` when the proof is not in the pool.
    pub fn is_valid(&self, proof_id: &ProofId) -> Option<bool> {
        self.state.read().entries.get(proof_id).map(|e| e.valid)
    }

    pub fn lookup_limited(&self, limited: &LimitedProofId) -> Option<ProofId> {
        self.state.read().by_limited.get(limited).copied()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register an open connection.
    pub fn connect(&self, node: NodeId) {
        self.state.write().connected.insert(node);
    }

    /// Forget a closed connection and every binding it held. Idempotent.
    pub fn disconnect(&self, node: NodeId) -> Option<ProofId> {
        let mut state = self.state.write();
        state.connected.remove(&node);
        let claimed = state.resolved.remove(&node)?;
        if let Some(entry) = state.entries.get_mut(&claimed) {
            entry.bound.remove(&node);
        }
        Some(claimed)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.state.read().connected.contains(&node)
    }

    pub fn connected_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.state.read().connected.iter().copied().collect();
        nodes.sort();
        nodes
    }

    /// Record that `node`'s handshake resolved to `proof_id` and bind it if
    /// the proof is valid.
    pub fn resolve_node(&self, node: NodeId, proof_id: ProofId) -> BindOutcome {
        let mut state = self.state.write();
        if !state.connected.contains(&node) {
            return BindOutcome::NotConnected;
        }
        if let Some(previous) = state.resolved.insert(node, proof_id) {
            if previous != proof_id {
                if let Some(entry) = state.entries.get_mut(&previous) {
                    entry.bound.remove(&node);
                }
            }
        }
        match state.entries.get_mut(&proof_id) {
            Some(entry) if entry.valid => {
                entry.bound.insert(node);
                BindOutcome::Bound
            }
            Some(_) => BindOutcome::Pending(PendingReason::Invalid),
            None => BindOutcome::Pending(PendingReason::Unknown),
        }
    }

    /// Proof `node` claimed, bound or not.
    pub fn claimed_proof(&self, node: NodeId) -> Option<ProofId> {
        self.state.read().resolved.get(&node).copied()
    }

    /// Proof `node` is currently bound to.
    pub fn bound_proof(&self, node: NodeId) -> Option<ProofId> {
        let state = self.state.read();
        let proof_id = state.resolved.get(&node)?;
        state
            .entries
            .get(proof_id)
            .filter(|e| e.bound.contains(&node))
            .map(|_| *proof_id)
    }

    pub fn node_count(&self, proof_id: &ProofId) -> usize {
        self.state
            .read()
            .entries
            .get(proof_id)
            .map_or(0, |e| e.bound.len())
    }

    /// Every current binding, ordered by node.
    pub fn bindings(&self) -> Vec<PeerBinding> {
        let state = self.state.read();
        let mut bindings: Vec<PeerBinding> = state
            .entries
            .iter()
            .flat_map(|(proof_id, entry)| {
                entry.bound.iter().map(move |node| PeerBinding {
                    node: *node,
                    proof_id: *proof_id,
                })
            })
            .collect();
        bindings.sort();
        bindings
    }

    /// Copy of every proof and its validity flag, for re-evaluation outside
    /// the lock.
    pub fn snapshot(&self) -> Vec<(Arc<Proof>, bool)> {
        self.state
            .read()
            .entries
            .values()
            .map(|e| (Arc::clone(&e.proof), e.valid))
            .collect()
    }

    /// Apply re-evaluation results in one write.
    pub fn apply_validity(&self, updates: &[(ProofId, ProofValidity)]) -> ReorgReport {
        let mut report = ReorgReport::default();
        let mut state = self.state.write();
        for (proof_id, validity) in updates {
            let Some(was_valid) = state.entries.get(proof_id).map(|e| e.valid) else {
                continue;
            };
            match validity {
                ProofValidity::Valid => {
                    if !was_valid {
                        if let Some(entry) = state.entries.get_mut(proof_id) {
                            entry.valid = true;
                        }
                        report.became_valid.push(*proof_id);
                        report.bound.extend(state.bind_waiting(proof_id));
                    }
                }
                ProofValidity::Provisional => {
                    if was_valid {
                        report.unbound.extend(state.unbind_all(proof_id));
                        if let Some(entry) = state.entries.get_mut(proof_id) {
                            entry.valid = false;
                        }
                        report.became_invalid.push(*proof_id);
                    }
                }
                ProofValidity::Invalid => {
                    report.unbound.extend(state.unbind_all(proof_id));
                    state.remove_entry(proof_id);
                    report.removed.push(*proof_id);
                }
            }
        }
        report
    }

    /// Valid proofs with their bound connection counts, ordered by id.
    pub fn roster(&self) -> Vec<PeerRosterEntry> {
        let state = self.state.read();
        let mut roster: Vec<PeerRosterEntry> = state
            .entries
            .iter()
            .filter(|(_, e)| e.valid)
            .map(|(proof_id, e)| PeerRosterEntry {
                proof_id: *proof_id,
                proof: Arc::clone(&e.proof),
                node_count: e.bound.len(),
            })
            .collect();
        roster.sort_by(|a, b| a.proof_id.cmp(&b.proof_id));
        roster
    }

    /// Evict a proof, unbinding its connections.
    pub fn remove(&self, proof_id: &ProofId) -> Option<Arc<Proof>> {
        self.state.write().remove_entry(proof_id).map(|e| e.proof)
    }
}
