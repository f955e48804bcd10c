//! Misbehavior scoring configuration.

/// Misbehavior scoring configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MisbehaviorConfig {
    /// Score at which the peer is banned
    pub ban_threshold: u32,
    /// Penalty for a forged handshake
    pub severe_penalty: u32,
    /// How long a banned address stays banned
    pub ban_duration_secs: u64,
}

impl Default for MisbehaviorConfig {
    fn default() -> Self {
        Self {
            ban_threshold: 100,
            severe_penalty: 100,
            ban_duration_secs: 86_400,
        }
    }
}

impl MisbehaviorConfig {
    /// Testing config with a short ban
    pub fn for_testing() -> Self {
        Self {
            ban_threshold: 100,
            severe_penalty: 100,
            ban_duration_secs: 300,
        }
    }
}
