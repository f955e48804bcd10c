//! Misbehavior kinds and per-connection scores.
//!
//! SECURITY-CRITICAL: decides which protocol violations cost a peer its
//! connection and address.

use std::net::IpAddr;

use super::config::MisbehaviorConfig;
use crate::domain::Timestamp;

/// Protocol violations tracked by this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Misbehavior {
    /// avahello signature does not verify under the resolved session key
    InvalidHandshakeSignature,
    /// Delegation chain in an avahello does not resolve
    BrokenDelegation,
    /// avahello after the first one on a connection
    RepeatedHello,
}

impl Misbehavior {
    /// Reason string used in the misbehavior log line.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidHandshakeSignature => "invalid-avahello-signature",
            Self::BrokenDelegation => "invalid-delegation",
            Self::RepeatedHello => "repeated-avahello",
        }
    }

    pub fn penalty(&self, config: &MisbehaviorConfig) -> u32 {
        match self {
            Self::InvalidHandshakeSignature | Self::BrokenDelegation => config.severe_penalty,
            Self::RepeatedHello => 0,
        }
    }
}

/// Score state for a single connection
#[derive(Debug, Clone)]
pub struct PeerScore {
    score: u32,
    address: IpAddr,
    connected_at: Timestamp,
    should_ban: bool,
}

impl PeerScore {
    /// Create a new peer score (starts at 0)
    pub fn new(address: IpAddr, connected_at: Timestamp) -> Self {
        Self {
            score: 0,
            address,
            connected_at,
            should_ban: false,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    pub fn should_ban(&self) -> bool {
        self.should_ban
    }

    /// Add `penalty`, returning `(old, new)` scores. Crossing the threshold
    /// latches `should_ban`.
    pub fn misbehave(&mut self, penalty: u32, config: &MisbehaviorConfig) -> (u32, u32) {
        let old = self.score;
        self.score = self.score.saturating_add(penalty);
        if penalty > 0 && old < config.ban_threshold && self.score >= config.ban_threshold {
            self.should_ban = true;
        }
        (old, self.score)
    }
}
