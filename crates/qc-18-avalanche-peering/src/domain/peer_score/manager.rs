//! Misbehavior scorer implementation.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{info, warn};

use super::banned::BannedAddresses;
use super::config::MisbehaviorConfig;
use super::security::{Misbehavior, PeerScore};
use crate::domain::{NodeId, Timestamp};

/// Result of recording a misbehavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MisbehaviorOutcome {
    /// Score after the penalty
    pub score: u32,
    /// Whether this penalty banned the peer's address
    pub banned: bool,
}

#[derive(Debug, Default)]
struct ScorerState {
    scores: HashMap<NodeId, PeerScore>,
    banned: BannedAddresses,
}

/// Tracks misbehavior for all connections and the resulting bans
#[derive(Debug)]
pub struct MisbehaviorScorer {
    config: MisbehaviorConfig,
    state: Mutex<ScorerState>,
}

impl MisbehaviorScorer {
    pub fn new(config: MisbehaviorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ScorerState::default()),
        }
    }

    /// Register a new connection
    pub fn on_peer_connected(&self, node: NodeId, address: IpAddr, now: Timestamp) {
        self.state
            .lock()
            .scores
            .insert(node, PeerScore::new(address, now));
    }

    /// Remove a connection. Bans outlive it.
    pub fn on_peer_disconnected(&self, node: NodeId) {
        self.state.lock().scores.remove(&node);
    }

    /// Record `kind` against `node`, banning its address when the threshold
    /// is crossed. Unknown connections are ignored.
    pub fn misbehaving(
        &self,
        node: NodeId,
        kind: Misbehavior,
        now: Timestamp,
    ) -> Option<MisbehaviorOutcome> {
        let penalty = kind.penalty(&self.config);
        let mut state = self.state.lock();
        let score = state.scores.get_mut(&node)?;
        let was_banned = score.should_ban();
        let (old, new) = score.misbehave(penalty, &self.config);
        let newly_banned = !was_banned && score.should_ban();
        let address = score.address();

        if newly_banned {
            warn!(
                "[qc-18] Misbehaving: peer={} ({} -> {}) BAN THRESHOLD EXCEEDED: {}",
                node,
                old,
                new,
                kind.reason()
            );
            let until = now.add_secs(self.config.ban_duration_secs);
            state.banned.ban(address, until, kind.reason());
            info!("[qc-18] Banned {} until {}", address, until.as_secs());
        } else if penalty > 0 {
            warn!(
                "[qc-18] Misbehaving: peer={} ({} -> {}): {}",
                node,
                old,
                new,
                kind.reason()
            );
        }

        Some(MisbehaviorOutcome {
            score: new,
            banned: newly_banned,
        })
    }

    pub fn score(&self, node: NodeId) -> Option<u32> {
        self.state.lock().scores.get(&node).map(|s| s.score())
    }

    pub fn is_banned(&self, address: &IpAddr, now: Timestamp) -> bool {
        self.state.lock().banned.is_banned(address, now)
    }

    pub fn ban_reason(&self, address: &IpAddr) -> Option<&'static str> {
        self.state.lock().banned.reason(address)
    }

    pub fn ban_count(&self, now: Timestamp) -> usize {
        self.state.lock().banned.count(now)
    }

    /// Remove expired bans
    pub fn gc_expired(&self, now: Timestamp) -> usize {
        self.state.lock().banned.gc_expired(now)
    }
}
