//! Proof relay configuration.

/// Proof relay and fetch configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Seconds after which a known proof is served to any requester,
    /// announced to them or not
    pub unconditional_relay_delay_secs: u64,
    /// Seconds to wait for a requested proof before giving up on that peer
    pub fetch_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            unconditional_relay_delay_secs: 120,
            fetch_timeout_secs: 60,
        }
    }
}

impl RelayConfig {
    /// Testing config: same relay delay, short fetch timeout
    pub fn for_testing() -> Self {
        Self {
            unconditional_relay_delay_secs: 120,
            fetch_timeout_secs: 5,
        }
    }
}
