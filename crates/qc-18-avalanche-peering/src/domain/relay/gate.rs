//! Relay gate implementation.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::config::RelayConfig;
use super::types::{PendingFetch, ProofOrigin, RelayEntry, ServeDecision};
use crate::domain::{NodeId, ProofId, Timestamp};

#[derive(Debug, Default)]
struct RelayState {
    entries: HashMap<ProofId, RelayEntry>,
    /// One attempt per (proof, peer)
    in_flight: HashMap<(ProofId, NodeId), PendingFetch>,
    /// (proof, peer) pairs whose fetch timed out; never retried
    timed_out: HashSet<(ProofId, NodeId)>,
}

/// Serve and fetch bookkeeping for proofs.
///
/// Internally synchronized; every method takes `&self`.
#[derive(Debug)]
pub struct RelayGate {
    config: RelayConfig,
    state: Mutex<RelayState>,
}

impl RelayGate {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RelayState::default()),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Start tracking a proof. A proof already tracked keeps its original
    /// origin and relay clock.
    pub fn record_known(&self, proof_id: ProofId, origin: ProofOrigin, now: Timestamp) {
        let delay = self.config.unconditional_relay_delay_secs;
        self.state
            .lock()
            .entries
            .entry(proof_id)
            .or_insert_with(|| RelayEntry {
                origin,
                announced_to: HashSet::new(),
                unconditional_after: now.add_secs(delay),
            });
    }

    pub fn is_known(&self, proof_id: &ProofId) -> bool {
        self.state.lock().entries.contains_key(proof_id)
    }

    pub fn origin(&self, proof_id: &ProofId) -> Option<ProofOrigin> {
        self.state.lock().entries.get(proof_id).map(|e| e.origin)
    }

    /// Record that `proof_id` was announced to `node`.
    pub fn mark_announced(&self, proof_id: &ProofId, node: NodeId) {
        if let Some(entry) = self.state.lock().entries.get_mut(proof_id) {
            entry.announced_to.insert(node);
        }
    }

    pub fn was_announced(&self, proof_id: &ProofId, node: NodeId) -> bool {
        self.state
            .lock()
            .entries
            .get(proof_id)
            .is_some_and(|e| e.announced_to.contains(&node))
    }

    /// Whether `proof_id` may be sent to `requester` now.
    pub fn serve_decision(
        &self,
        proof_id: &ProofId,
        requester: NodeId,
        now: Timestamp,
    ) -> ServeDecision {
        let state = self.state.lock();
        let Some(entry) = state.entries.get(proof_id) else {
            return ServeDecision::Unknown;
        };
        if entry.announced_to.contains(&requester) {
            ServeDecision::Announced
        } else if now >= entry.unconditional_after {
            ServeDecision::Unconditional
        } else {
            ServeDecision::TooEarly
        }
    }

    /// Make a proof servable to anyone from `now` on.
    pub fn force_unconditional(&self, proof_id: &ProofId, now: Timestamp) -> bool {
        match self.state.lock().entries.get_mut(proof_id) {
            Some(entry) => {
                entry.unconditional_after = entry.unconditional_after.min(now);
                true
            }
            None => false,
        }
    }

    /// Register a fetch of `proof_id` from `peer`.
    ///
    /// Returns `false` when that peer is already being asked for the proof
    /// or already failed to deliver it. Other peers may be asked in parallel.
    pub fn request_fetch(&self, proof_id: ProofId, peer: NodeId, now: Timestamp) -> bool {
        let mut state = self.state.lock();
        let key = (proof_id, peer);
        if state.in_flight.contains_key(&key) || state.timed_out.contains(&key) {
            return false;
        }
        state.in_flight.insert(
            key,
            PendingFetch {
                peer,
                deadline: now.add_secs(self.config.fetch_timeout_secs),
            },
        );
        true
    }

    pub fn pending_fetch(&self, proof_id: &ProofId, peer: NodeId) -> Option<PendingFetch> {
        self.state.lock().in_flight.get(&(*proof_id, peer)).copied()
    }

    /// All outstanding fetches of `proof_id`, ordered by peer.
    pub fn pending_fetches(&self, proof_id: &ProofId) -> Vec<PendingFetch> {
        let mut fetches: Vec<PendingFetch> = self
            .state
            .lock()
            .in_flight
            .iter()
            .filter(|((id, _), _)| id == proof_id)
            .map(|(_, fetch)| *fetch)
            .collect();
        fetches.sort_by_key(|f| f.peer);
        fetches
    }

    /// Proof arrived and was accepted; returns the peers it was requested
    /// from.
    pub fn complete_fetch(&self, proof_id: &ProofId) -> Vec<NodeId> {
        let mut state = self.state.lock();
        state.timed_out.retain(|(id, _)| id != proof_id);
        let mut peers = Vec::new();
        state.in_flight.retain(|(id, peer), _| {
            if id == proof_id {
                peers.push(*peer);
                false
            } else {
                true
            }
        });
        peers.sort();
        peers
    }

    /// Expire overdue fetches, returning `(proof, peer)` for each.
    pub fn expire_fetches(&self, now: Timestamp) -> Vec<(ProofId, NodeId)> {
        let mut state = self.state.lock();
        let mut expired: Vec<(ProofId, NodeId)> = state
            .in_flight
            .iter()
            .filter(|(_, fetch)| fetch.deadline <= now)
            .map(|(key, _)| *key)
            .collect();
        expired.sort();
        for key in &expired {
            state.in_flight.remove(key);
            state.timed_out.insert(*key);
            debug!("[qc-18] proof fetch {} from peer={} timed out", key.0, key.1);
        }
        expired
    }

    /// Drop all per-peer state for a closed connection.
    pub fn forget_peer(&self, node: NodeId) {
        let mut state = self.state.lock();
        for entry in state.entries.values_mut() {
            entry.announced_to.remove(&node);
        }
        state.in_flight.retain(|(_, peer), _| *peer != node);
        state.timed_out.retain(|(_, peer)| *peer != node);
    }

    pub fn forget_proof(&self, proof_id: &ProofId) {
        let mut state = self.state.lock();
        state.entries.remove(proof_id);
        state.in_flight.retain(|(id, _), _| id != proof_id);
        state.timed_out.retain(|(id, _)| id != proof_id);
    }
}
