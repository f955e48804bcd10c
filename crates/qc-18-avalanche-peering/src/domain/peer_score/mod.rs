//! # Misbehavior Scoring
//!
//! Accumulates penalties per connection and bans the peer's address once
//! the ban threshold is reached. Handshake forgery is the only severe
//! offence in this subsystem; a repeated avahello is logged and ignored.

// Semantic submodules
mod banned;
mod config;
mod manager;
mod security;

// Re-export public API
pub use banned::BannedAddresses;
pub use config::MisbehaviorConfig;
pub use manager::{MisbehaviorOutcome, MisbehaviorScorer};
pub use security::{Misbehavior, PeerScore};

#[cfg(test)]
mod tests;
