//! In-memory links between avalanche peering services.

use std::net::IpAddr;
use std::sync::Arc;

use qc_18_avalanche_peering::test_utils::{
    InMemoryChain, MockTimeSource, ProofFixture, RecordingNetwork,
};
use qc_18_avalanche_peering::{
    AvalancheApi, AvalancheConfig, AvalancheError, AvalancheMessage, AvalancheService,
    ConnectionNonces, HandshakeSession, LocalProofConfig, MessageOutcome, NodeId, TimeSource,
};

pub type Service = AvalancheService<InMemoryChain, RecordingNetwork>;

/// One node: a service, its outbox and its clock.
pub struct TestNode {
    pub service: Arc<Service>,
    pub network: Arc<RecordingNetwork>,
    pub time: Arc<MockTimeSource>,
    pub address: IpAddr,
}

impl TestNode {
    pub fn new(
        chain: &Arc<InMemoryChain>,
        address: IpAddr,
        config: AvalancheConfig,
    ) -> Result<Self, AvalancheError> {
        let network = Arc::new(RecordingNetwork::new());
        let time = Arc::new(MockTimeSource::new(1_000));
        let service = AvalancheService::new(
            config,
            Arc::clone(chain),
            Arc::clone(&network),
            Arc::clone(&time) as Arc<dyn TimeSource>,
        )?;
        Ok(Self {
            service: Arc::new(service),
            network,
            time,
            address,
        })
    }

    /// Node without a local proof.
    pub fn plain(chain: &Arc<InMemoryChain>, last_octet: u8) -> Self {
        Self::new(
            chain,
            IpAddr::from([10, 0, 0, last_octet]),
            AvalancheConfig::for_testing(),
        )
        .expect("node without proof")
    }

    /// Node running `fixture` as its local proof; `master_seed` is the
    /// seed the fixture's master key was derived from.
    pub fn staking(
        chain: &Arc<InMemoryChain>,
        last_octet: u8,
        fixture: &ProofFixture,
        master_seed: u8,
    ) -> Self {
        Self::new(
            chain,
            IpAddr::from([10, 0, 0, last_octet]),
            AvalancheConfig::for_testing().with_local_proof(local_proof(fixture, master_seed)),
        )
        .expect("node with proof")
    }
}

pub fn local_proof(fixture: &ProofFixture, master_seed: u8) -> LocalProofConfig {
    LocalProofConfig {
        proof: Some(fixture.proof.to_hex()),
        master_key: Some(hex::encode([master_seed; 32])),
        delegation: None,
    }
}

/// Both ends of one connection.
pub struct Link {
    /// `a`'s session with `b`
    pub a_session: HandshakeSession,
    /// `b`'s session with `a`
    pub b_session: HandshakeSession,
    /// `b` as seen by `a`
    pub b_id: NodeId,
    /// `a` as seen by `b`
    pub a_id: NodeId,
}

impl Link {
    /// Connect `a` and `b`; each side sends its hello.
    pub fn open(
        a: &TestNode,
        b: &TestNode,
        a_id: NodeId,
        b_id: NodeId,
        seed: u64,
    ) -> Result<Self, AvalancheError> {
        let nonces = ConnectionNonces::new(seed, seed + 1, seed + 2, seed + 3);
        let a_session =
            a.service
                .on_peer_connected(b_id, b.address, b.service.local_services(), nonces)?;
        let b_session = b.service.on_peer_connected(
            a_id,
            a.address,
            a.service.local_services(),
            nonces.mirrored(),
        )?;
        Ok(Self {
            a_session,
            b_session,
            b_id,
            a_id,
        })
    }

    /// Deliver queued messages in both directions until both outboxes are
    /// empty for this link. Returns `(outcomes at a, outcomes at b)`.
    pub fn pump(&mut self, a: &TestNode, b: &TestNode) -> (Vec<MessageOutcome>, Vec<MessageOutcome>) {
        let mut at_a = Vec::new();
        let mut at_b = Vec::new();
        loop {
            let to_b = a.network.take_sent_to(self.b_id);
            let to_a = b.network.take_sent_to(self.a_id);
            if to_a.is_empty() && to_b.is_empty() {
                break;
            }
            for message in to_b {
                at_b.push(b.service.handle_message(&mut self.b_session, over_wire(&message)));
            }
            for message in to_a {
                at_a.push(a.service.handle_message(&mut self.a_session, over_wire(&message)));
            }
        }
        (at_a, at_b)
    }

    pub fn close(&mut self, a: &TestNode, b: &TestNode) {
        a.service.on_peer_disconnected(&mut self.a_session);
        b.service.on_peer_disconnected(&mut self.b_session);
    }
}

/// Encode and decode a message as it would cross a real connection.
pub fn over_wire(message: &AvalancheMessage) -> AvalancheMessage {
    let frame = message.encode().expect("encodable message");
    AvalancheMessage::decode(&frame).expect("decodable frame")
}
