//! # Avalanche Peering Service
//!
//! Implements the `AvalancheApi` port and drives the domain components
//! from connection, message and chain events.
//!
//! ## Event Sources
//!
//! - Connection layer: `on_peer_connected`, `handle_message`,
//!   `on_peer_disconnected`
//! - Chain engine: `on_chain_event`
//! - Timer: `spawn_maintenance` (fetch timeouts, ban expiry)

// Semantic submodules
mod api;
mod chain;
mod core;
mod handshake;
mod maintenance;

// Re-export public API
pub use chain::{ChainEvent, ChainTracker};
pub use core::AvalancheService;
pub use handshake::{MessageOutcome, ProofAcceptance};
pub use maintenance::{spawn_maintenance, MaintenanceReport};
