//! # avahello Handshake
//!
//! Each side of a connection proves control of a proof (or declares it has
//! none) by signing a per-connection challenge with its session key.
//!
//! ```text
//! challenge = H(delegation_id || sender_nonce || receiver_nonce
//!               || sender_entropy || receiver_entropy)
//! ```
//!
//! Both nonces and entropies come from the version exchange of this very
//! connection, so a captured hello cannot be replayed elsewhere.

// Semantic submodules
mod security;
mod types;

// Re-export public API
pub use security::{build_hello, verify_hello, HelloVerdict};
pub use types::{hello_challenge, ConnectionNonces, HandshakeSession, HandshakeState, Hello};
