//! Value Objects for Avalanche Peering
//!
//! Identifiers, timestamps and chain references shared by every component.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::crypto::PublicKey;

/// Amount in satoshis.
pub type Amount = u64;

/// Satoshis per coin.
pub const COIN: Amount = 100_000_000;

macro_rules! hash_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Create from raw hash bytes.
            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// The all-zero identifier.
            pub fn zero() -> Self {
                Self([0u8; 32])
            }

            /// Whether every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Get the underlying bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase hex rendering.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

hash_id!(
    /// Identity of a proof's full content, master key included.
    ProofId
);

hash_id!(
    /// Hash of a proof's content excluding the master public key.
    ///
    /// The zero value is the canonical "this node holds no proof" marker.
    LimitedProofId
);

hash_id!(
    /// Identity of a delegation chain, rolled forward one level at a time.
    DelegationId
);

/// Identifier of a live connection, assigned by the connection layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in seconds
///
/// Node-relative: always read from the `TimeSource` port so tests can move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add seconds to timestamp (saturating at MAX_REASONABLE).
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs).min(Self::MAX_REASONABLE))
    }

    /// Subtract seconds from timestamp (saturating at 0).
    pub fn sub_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }
}

/// Reference to a transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    /// Transaction hash.
    pub txid: [u8; 32],
    /// Output index.
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.vout)
    }
}

/// Unspent output as reported by the chain engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    /// Output value.
    pub amount: Amount,
    /// Height of the block containing the output.
    pub height: u32,
    /// Whether the output is a coinbase output.
    pub is_coinbase: bool,
    /// Key the output pays to.
    pub owner: PublicKey,
}

/// Service bits advertised in the version handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ServiceFlags(pub u64);

impl ServiceFlags {
    pub const NONE: ServiceFlags = ServiceFlags(0);
    /// Full block relay.
    pub const NODE_NETWORK: ServiceFlags = ServiceFlags(1 << 0);
    /// Node holds a usable avalanche proof.
    pub const NODE_AVALANCHE: ServiceFlags = ServiceFlags(1 << 24);

    pub fn contains(&self, other: ServiceFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: ServiceFlags) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for ServiceFlags {
    type Output = ServiceFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.with(rhs)
    }
}
