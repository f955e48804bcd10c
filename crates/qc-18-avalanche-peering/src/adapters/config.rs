use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::domain::{
    AvalancheConfig, AvalancheError, LocalProofConfig, MisbehaviorConfig, ProofConfig,
    RelayConfig,
};
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - Hardcoded config for testing/development
// ============================================================================

/// Configuration provider holding a fixed config.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: AvalancheConfig,
}

impl StaticConfigProvider {
    #[must_use]
    pub fn new(config: AvalancheConfig) -> Self {
        Self { config }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn avalanche_config(&self) -> AvalancheConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - Production Config Loading
// ============================================================================

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    proof: ProofSection,
    #[serde(default)]
    relay: RelaySection,
    #[serde(default)]
    misbehavior: MisbehaviorSection,
    #[serde(default)]
    local: LocalSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ProofSection {
    stake_utxo_dust_threshold: Option<u64>,
    stake_utxo_confirmations: Option<u32>,
    max_proof_stakes: Option<usize>,
    max_delegation_levels: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RelaySection {
    unconditional_relay_delay_secs: Option<u64>,
    fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MisbehaviorSection {
    ban_threshold: Option<u32>,
    severe_penalty: Option<u32>,
    ban_duration_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LocalSection {
    proof: Option<String>,
    master_key: Option<String>,
    delegation: Option<String>,
}

/// TOML-based configuration provider.
///
/// Every key is optional and falls back to `AvalancheConfig::default()`.
///
/// # Config File Format
///
/// ```toml
/// [proof]
/// stake_utxo_dust_threshold = 100000000
/// stake_utxo_confirmations = 2016
/// max_proof_stakes = 1000
/// max_delegation_levels = 20
///
/// [relay]
/// unconditional_relay_delay_secs = 120
/// fetch_timeout_secs = 60
///
/// [misbehavior]
/// ban_threshold = 100
/// severe_penalty = 100
/// ban_duration_secs = 86400
///
/// [local]
/// proof = "<hex>"
/// master_key = "<hex secret>"
/// delegation = "<hex>"   # optional
/// ```
#[derive(Debug, Clone)]
pub struct TomlConfigProvider {
    config: AvalancheConfig,
}

impl TomlConfigProvider {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `AvalancheError::Config` if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AvalancheError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            AvalancheError::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, AvalancheError> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| AvalancheError::Config(format!("failed to parse config: {}", e)))?;

        let proof_defaults = ProofConfig::default();
        let relay_defaults = RelayConfig::default();
        let misbehavior_defaults = MisbehaviorConfig::default();
        let (p, r, m) = (file.proof, file.relay, file.misbehavior);

        let config = AvalancheConfig {
            proof: ProofConfig {
                stake_utxo_dust_threshold: p
                    .stake_utxo_dust_threshold
                    .unwrap_or(proof_defaults.stake_utxo_dust_threshold),
                stake_utxo_confirmations: p
                    .stake_utxo_confirmations
                    .unwrap_or(proof_defaults.stake_utxo_confirmations),
                max_proof_stakes: p.max_proof_stakes.unwrap_or(proof_defaults.max_proof_stakes),
                max_delegation_levels: p
                    .max_delegation_levels
                    .unwrap_or(proof_defaults.max_delegation_levels),
            },
            relay: RelayConfig {
                unconditional_relay_delay_secs: r
                    .unconditional_relay_delay_secs
                    .unwrap_or(relay_defaults.unconditional_relay_delay_secs),
                fetch_timeout_secs: r
                    .fetch_timeout_secs
                    .unwrap_or(relay_defaults.fetch_timeout_secs),
            },
            misbehavior: MisbehaviorConfig {
                ban_threshold: m.ban_threshold.unwrap_or(misbehavior_defaults.ban_threshold),
                severe_penalty: m
                    .severe_penalty
                    .unwrap_or(misbehavior_defaults.severe_penalty),
                ban_duration_secs: m
                    .ban_duration_secs
                    .unwrap_or(misbehavior_defaults.ban_duration_secs),
            },
            local: LocalProofConfig {
                proof: file.local.proof,
                master_key: file.local.master_key,
                delegation: file.local.delegation,
            },
        };

        if config.local.proof.is_some() && config.local.master_key.is_none() {
            return Err(AvalancheError::Config(
                "[local] proof requires master_key".into(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &AvalancheConfig {
        &self.config
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn avalanche_config(&self) -> AvalancheConfig {
        self.config.clone()
    }
}
