//! Domain Layer - Pure business logic with no I/O
//!
//! This module contains the avalanche peering logic including:
//! - Proof identities, validation and building
//! - Key delegation chains
//! - The avahello handshake and per-connection session state
//! - Proof pool with peer bindings and conflict resolution
//! - Announcement gating and fetch tracking
//! - Misbehavior scoring and address bans

pub mod config;
pub mod crypto;
pub mod delegation;
pub mod errors;
pub mod handshake;
pub mod peer_score;
pub mod proof;
pub mod proof_pool;
pub mod relay;
pub mod value_objects;

pub use config::*;
pub use crypto::*;
pub use delegation::*;
pub use errors::*;
pub use handshake::*;
pub use peer_score::*;
pub use proof::*;
pub use proof_pool::*;
pub use relay::*;
pub use value_objects::*;
