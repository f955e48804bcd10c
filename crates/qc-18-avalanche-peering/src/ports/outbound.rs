//! # Driven Ports (Outbound SPI)
//!
//! These are the interfaces this subsystem **requires** from the host node:
//! the chain engine, the P2P connection layer and a clock.

use thiserror::Error;

use crate::domain::{AvalancheConfig, Coin, NodeId, OutPoint, Timestamp};
use crate::wire::AvalancheMessage;

/// Read-only view of the active chain.
///
/// Implemented by the chain engine; answers are treated as given facts.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: handshakes and the chain tracker
/// query it concurrently.
pub trait ChainState: Send + Sync {
    /// Height of the active tip.
    fn tip_height(&self) -> u32;

    /// Median time past of the active tip, used for proof expiration.
    fn tip_median_time(&self) -> i64;

    /// Look up an unspent output in the active chain's UTXO set.
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin>;

    /// Confirmations of a block at `height` relative to the active tip.
    fn confirmations(&self, height: u32) -> u32 {
        let tip = self.tip_height();
        if height > tip {
            0
        } else {
            tip.saturating_sub(height).saturating_add(1)
        }
    }

    /// Whether `outpoint` is unspent with at least `required` confirmations.
    fn is_mature(&self, outpoint: &OutPoint, required: u32) -> bool {
        self.coin(outpoint)
            .is_some_and(|coin| self.confirmations(coin.height) >= required)
    }
}

/// Abstract interface to the P2P connection layer.
///
/// The host serialises messages with [`AvalancheMessage::encode`] and owns
/// the sockets.
pub trait PeerNetwork: Send + Sync {
    /// Queue a message for a connected peer.
    fn send(&self, node: NodeId, message: AvalancheMessage) -> Result<(), NetworkError>;

    /// Close a connection. Must be idempotent.
    fn disconnect(&self, node: NodeId);
}

/// Errors from network operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// Peer is no longer connected
    #[error("peer {0} is not connected")]
    NotConnected(NodeId),
    /// Send queue for the peer is full
    #[error("send queue full for peer {0}")]
    QueueFull(NodeId),
}

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
pub trait TimeSource: Send + Sync {
    /// Get the current node-relative timestamp.
    fn now(&self) -> Timestamp;
}

/// Abstract interface for configuration.
pub trait ConfigProvider: Send + Sync {
    /// Full avalanche peering configuration, local proof included.
    fn avalanche_config(&self) -> AvalancheConfig;
}
