//! # Avalanche Peering Subsystem
//!
//! **Subsystem ID:** 18
//!
//! Avalanche proof peer discovery: nodes holding a staking proof identify
//! themselves to each other with a signed `avahello`, learn the proofs of
//! their peers and relay valid proofs across the network.
//!
//! ## What It Does
//!
//! - Validates proofs (structure, signatures, stake value) and checks their
//!   stakes against the UTXO set (existence, maturity, expiry)
//! - Resolves delegation chains from a proof's master key to a session key
//! - Runs the `avahello` handshake and binds each connection to the proof it
//!   claims once that proof is known and valid
//! - Fetches unknown proofs with `getdata`, relays valid ones with `inv`
//!   and withholds proofs that have not been announced to the requester
//! - Re-evaluates every pooled proof when the chain tip moves
//! - Scores handshake misbehavior and bans offending addresses
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Proofs, delegations, proof pool, relay gate, scoring
//! - **Ports Layer:** `AvalancheApi` inbound, chain/network/clock outbound
//! - **Service Layer:** `AvalancheService` wiring the domain to the ports
//! - **Adapters Layer:** System clock and TOML configuration
//! - **Wire:** The four peering messages and their codec
//!
//! ## Example
//!
//! ```rust
//! use qc_18_avalanche_peering::{
//!     KeyPair, OutPoint, ProofBuilder, ProofConfig, Stake, verify_proof, COIN,
//! };
//!
//! let master = KeyPair::generate();
//! let owner = KeyPair::generate();
//! let stake = Stake {
//!     utxo: OutPoint::new([7u8; 32], 0),
//!     amount: 10 * COIN,
//!     height: 1,
//!     is_coinbase: false,
//!     pubkey: owner.public_key(),
//! };
//!
//! let mut builder = ProofBuilder::new(0, 0, master.public_key());
//! builder.add_stake(stake, &owner).unwrap();
//! let proof = builder.build();
//!
//! assert!(verify_proof(&proof, &ProofConfig::default()).is_ok());
//! ```

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod wire;

/// Test utilities (MockTimeSource, InMemoryChain, RecordingNetwork, fixtures)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Value objects and crypto
pub use domain::{
    Amount, Coin, DelegationId, Hash256, KeyPair, LimitedProofId, NodeId, OutPoint, ProofId,
    PublicKey, ServiceFlags, Signature, Timestamp, COIN,
};

// Proofs and delegations
pub use domain::{
    check_against_chain, validate, verify_proof, Delegation, DelegationBuilder, Proof,
    ProofBuilder, SignedStake, Stake,
};

// Handshake, pool, relay and scoring
pub use domain::{
    build_hello, verify_hello, ConnectionNonces, HandshakeSession, HandshakeState, Hello,
    HelloVerdict, Misbehavior, MisbehaviorScorer, PeerRosterEntry, ProofOrigin, ProofPool,
    RelayGate, ReorgReport,
};

// Configuration and errors
pub use domain::{
    AvalancheConfig, AvalancheError, DelegationError, LocalProofConfig, MisbehaviorConfig,
    ProofConfig, ProofError, RelayConfig,
};

// Port traits
pub use ports::{
    AvalancheApi, ChainState, ConfigProvider, LocalProofStatus, NetworkError, PeerNetwork,
    TimeSource,
};

// Service
pub use service::{
    spawn_maintenance, AvalancheService, ChainEvent, MaintenanceReport, MessageOutcome,
    ProofAcceptance,
};

// Adapters
pub use adapters::{StaticConfigProvider, SystemTimeSource, TomlConfigProvider};

// Wire
pub use wire::{AvalancheMessage, MessageKind};
