//! # Proof Relay Gating
//!
//! Decides when a known proof may be served to a peer that asks for it,
//! and tracks the proofs this node is fetching.
//!
//! A proof is served to a peer it was announced to, or to anyone once the
//! unconditional relay delay has elapsed since the proof became known.
//! Everything else gets no answer, which keeps getdata from being used to
//! probe for proofs this node has not made public yet.

mod config;
mod gate;
mod types;

pub use config::RelayConfig;
pub use gate::RelayGate;
pub use types::{PendingFetch, ProofOrigin, ServeDecision};
