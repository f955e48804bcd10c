//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** the status and command API this subsystem
//!   exposes to the node
//! - **Driven Ports (Outbound):** what it requires from the chain engine,
//!   the connection layer and the clock

pub mod inbound;
pub mod outbound;

pub use inbound::{AvalancheApi, LocalProofStatus};
pub use outbound::{ChainState, ConfigProvider, NetworkError, PeerNetwork, TimeSource};
