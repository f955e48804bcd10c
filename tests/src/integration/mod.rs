//! # Integration Scenarios
//!
//! Several `AvalancheService` instances wired together through in-memory
//! links. Every message crosses the wire codec.

pub mod avalanche_peering;
pub mod network;
