//! Avalanche peering configuration.

use super::peer_score::MisbehaviorConfig;
use super::relay::RelayConfig;
use super::value_objects::{Amount, COIN};

/// Proof acceptance rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofConfig {
    /// Minimum total staked amount
    pub stake_utxo_dust_threshold: Amount,
    /// Confirmations a stake's block needs before the stake is mature
    pub stake_utxo_confirmations: u32,
    /// Maximum stakes in a single proof
    pub max_proof_stakes: usize,
    /// Maximum levels in a delegation chain
    pub max_delegation_levels: usize,
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            stake_utxo_dust_threshold: COIN,
            stake_utxo_confirmations: 2016,
            max_proof_stakes: 1000,
            max_delegation_levels: 20,
        }
    }
}

impl ProofConfig {
    /// Testing config: three confirmations, 0.01 coin dust threshold
    pub fn for_testing() -> Self {
        Self {
            stake_utxo_dust_threshold: 1_000_000,
            stake_utxo_confirmations: 3,
            max_proof_stakes: 16,
            max_delegation_levels: 4,
        }
    }
}

/// The node's own proof, as configured by the operator.
///
/// All values are hex strings as produced by the proof tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalProofConfig {
    /// Serialized proof
    pub proof: Option<String>,
    /// 32-byte secret: the proof master key, or the delegated key when
    /// `delegation` is set
    pub master_key: Option<String>,
    /// Serialized delegation from the proof master to `master_key`
    pub delegation: Option<String>,
}

impl LocalProofConfig {
    pub fn is_configured(&self) -> bool {
        self.proof.is_some()
    }
}

/// Complete avalanche peering configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvalancheConfig {
    pub proof: ProofConfig,
    pub relay: RelayConfig,
    pub misbehavior: MisbehaviorConfig,
    pub local: LocalProofConfig,
}

impl AvalancheConfig {
    /// Config suitable for testing (small thresholds, short timeouts)
    pub fn for_testing() -> Self {
        Self {
            proof: ProofConfig::for_testing(),
            relay: RelayConfig::for_testing(),
            misbehavior: MisbehaviorConfig::for_testing(),
            local: LocalProofConfig::default(),
        }
    }

    /// Same config with a local proof configured.
    pub fn with_local_proof(mut self, local: LocalProofConfig) -> Self {
        self.local = local;
        self
    }
}
