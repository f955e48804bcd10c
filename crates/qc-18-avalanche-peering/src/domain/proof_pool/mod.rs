//! # Proof Pool and Peer Bindings
//!
//! Holds every proof this node knows, flagged valid or pending, and binds
//! connected peers to the proof their avahello claimed.
//!
//! ## Binding Rule
//!
//! A connection is bound to proof `P` iff its handshake resolved to `P`,
//! `P` is in the pool and valid, and the connection is still open. Claims
//! are remembered for open connections, so a proof that arrives or turns
//! valid later binds every peer already waiting on it.
//!
//! ## Conflicts
//!
//! Two proofs conflict when they stake a common outpoint. The higher
//! sequence wins; on a tie the lower proof id wins. The loser never
//! enters the pool, or is evicted if it was already there.

mod pool;
mod security;
mod types;

pub use pool::ProofPool;
pub use security::is_preferred;
pub use types::{
    BindOutcome, InsertResult, PeerBinding, PeerRosterEntry, PendingReason, ProofValidity,
    ReorgReport,
};
