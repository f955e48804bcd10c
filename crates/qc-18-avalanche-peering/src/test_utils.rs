//! Test utilities for avalanche peering.
//!
//! Mock port implementations and proof fixtures for deterministic testing.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use qc_18_avalanche_peering::test_utils::{make_proof, InMemoryChain, MockTimeSource};
//! use qc_18_avalanche_peering::TimeSource;
//!
//! let time = MockTimeSource::new(1000);
//! time.advance(120);
//! assert_eq!(time.now().as_secs(), 1120);
//!
//! let chain = InMemoryChain::new();
//! let fixture = make_proof(&chain, 1, &[10, 11], 0);
//! assert_eq!(fixture.proof.stakes().len(), 2);
//! ```

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{
    build_hello, Coin, ConnectionNonces, Delegation, Hello, KeyPair, NodeId, OutPoint, Proof,
    ProofBuilder, Stake, Timestamp, COIN,
};
use crate::ports::{ChainState, NetworkError, PeerNetwork, TimeSource};
use crate::wire::AvalancheMessage;

/// Seconds between mined blocks.
pub const BLOCK_INTERVAL_SECS: i64 = 600;

// =============================================================================
// TIME
// =============================================================================

/// A time source tests can move forward.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    secs: AtomicU64,
}

impl MockTimeSource {
    pub fn new(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.secs.load(Ordering::SeqCst))
    }
}

// =============================================================================
// CHAIN
// =============================================================================

#[derive(Debug)]
struct ChainData {
    height: u32,
    median_time: i64,
    coins: HashMap<OutPoint, Coin>,
    /// Tips saved by `invalidate_block`, restored by `reconsider_block`
    saved_tips: Vec<(u32, i64)>,
}

/// In-memory chain: a tip, its median time and a UTXO set.
///
/// Coins above the active tip are invisible, so invalidating a block hides
/// the outputs it created.
#[derive(Debug)]
pub struct InMemoryChain {
    data: RwLock<ChainData>,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChain {
    /// Tip at height 100.
    pub fn new() -> Self {
        Self::with_tip(100, 1_700_000_000)
    }

    pub fn with_tip(height: u32, median_time: i64) -> Self {
        Self {
            data: RwLock::new(ChainData {
                height,
                median_time,
                coins: HashMap::new(),
                saved_tips: Vec::new(),
            }),
        }
    }

    pub fn add_coin(&self, outpoint: OutPoint, coin: Coin) {
        self.data.write().coins.insert(outpoint, coin);
    }

    pub fn remove_coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.data.write().coins.remove(outpoint)
    }

    /// Extend the tip by `blocks`.
    pub fn mine(&self, blocks: u32) -> u32 {
        let mut data = self.data.write();
        data.height += blocks;
        data.median_time += BLOCK_INTERVAL_SECS * i64::from(blocks);
        data.height
    }

    /// Roll the tip back to just below `height`.
    pub fn invalidate_block(&self, height: u32) {
        let mut data = self.data.write();
        let tip = (data.height, data.median_time);
        data.saved_tips.push(tip);
        let new_height = height.saturating_sub(1).min(data.height);
        data.median_time -= BLOCK_INTERVAL_SECS * i64::from(data.height - new_height);
        data.height = new_height;
    }

    /// Restore the tip saved by the last `invalidate_block`.
    pub fn reconsider_block(&self) {
        let mut data = self.data.write();
        if let Some((height, median_time)) = data.saved_tips.pop() {
            data.height = height;
            data.median_time = median_time;
        }
    }
}

impl ChainState for InMemoryChain {
    fn tip_height(&self) -> u32 {
        self.data.read().height
    }

    fn tip_median_time(&self) -> i64 {
        self.data.read().median_time
    }

    fn coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        let data = self.data.read();
        data.coins
            .get(outpoint)
            .filter(|coin| coin.height <= data.height)
            .cloned()
    }
}

// =============================================================================
// NETWORK
// =============================================================================

/// Network that records everything sent and every disconnect.
#[derive(Debug, Default)]
pub struct RecordingNetwork {
    sent: Mutex<Vec<(NodeId, AvalancheMessage)>>,
    disconnected: Mutex<Vec<NodeId>>,
}

impl RecordingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(NodeId, AvalancheMessage)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, node: NodeId) -> Vec<AvalancheMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| *to == node)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// Drain the send log.
    pub fn take_sent(&self) -> Vec<(NodeId, AvalancheMessage)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Drain only the messages addressed to `node`, in send order.
    pub fn take_sent_to(&self, node: NodeId) -> Vec<AvalancheMessage> {
        let mut sent = self.sent.lock();
        let (to_node, rest): (Vec<_>, Vec<_>) = sent.drain(..).partition(|(to, _)| *to == node);
        *sent = rest;
        to_node.into_iter().map(|(_, msg)| msg).collect()
    }

    pub fn is_disconnected(&self, node: NodeId) -> bool {
        self.disconnected.lock().contains(&node)
    }
}

impl PeerNetwork for RecordingNetwork {
    fn send(&self, node: NodeId, message: AvalancheMessage) -> Result<(), NetworkError> {
        if self.is_disconnected(node) {
            return Err(NetworkError::NotConnected(node));
        }
        self.sent.lock().push((node, message));
        Ok(())
    }

    fn disconnect(&self, node: NodeId) {
        let mut disconnected = self.disconnected.lock();
        if !disconnected.contains(&node) {
            disconnected.push(node);
        }
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

/// Deterministic keypair. `seed` must be non-zero and below 0xff.
pub fn keypair(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes([seed; 32]).expect("valid test seed")
}

/// A stake owned by `keypair(seed)`, with its coin added to `chain`.
pub fn stake_coin(chain: &InMemoryChain, seed: u8, amount: u64, height: u32) -> (Stake, KeyPair) {
    let key = keypair(seed);
    let utxo = OutPoint::new([seed; 32], 0);
    chain.add_coin(
        utxo,
        Coin {
            amount,
            height,
            is_coinbase: false,
            owner: key.public_key(),
        },
    );
    let stake = Stake {
        utxo,
        amount,
        height,
        is_coinbase: false,
        pubkey: key.public_key(),
    };
    (stake, key)
}

/// A proof and the key controlling it.
#[derive(Debug, Clone)]
pub struct ProofFixture {
    pub proof: Proof,
    pub master: KeyPair,
}

/// Proof by `keypair(master_seed)` staking one coin per seed, all mined at
/// height 1 and never expiring.
pub fn make_proof(
    chain: &InMemoryChain,
    master_seed: u8,
    stake_seeds: &[u8],
    sequence: u64,
) -> ProofFixture {
    make_proof_at(chain, master_seed, stake_seeds, sequence, 1)
}

/// Like [`make_proof`] with the stakes mined at `height`.
pub fn make_proof_at(
    chain: &InMemoryChain,
    master_seed: u8,
    stake_seeds: &[u8],
    sequence: u64,
    height: u32,
) -> ProofFixture {
    let master = keypair(master_seed);
    let mut builder = ProofBuilder::new(sequence, 0, master.public_key());
    for seed in stake_seeds {
        let (stake, key) = stake_coin(chain, *seed, COIN, height);
        builder.add_stake(stake, &key).expect("fresh stake");
    }
    ProofFixture {
        proof: builder.build(),
        master,
    }
}

/// The hello a remote peer would send on a connection this node sees as
/// `nonces`.
pub fn remote_hello(delegation: Delegation, key: &KeyPair, nonces: &ConnectionNonces) -> Hello {
    build_hello(delegation, key, &nonces.mirrored())
}
