//! # Avalanche Peering Scenarios
//!
//! End-to-end behavior of the proof peering protocol between several nodes:
//!
//! 1. Two staking nodes learn each other's proofs through hello, getdata
//!    and avaproof, and bind each other's connections
//! 2. Nodes without a proof never cause fetches and never advertise the
//!    avalanche service bit
//! 3. Forged hellos cost the sender its address in one event
//! 4. Node counts follow live connections through disconnects and reorgs
//! 5. Relay gating: announced proofs are served at once, others only after
//!    the unconditional relay delay

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::Arc;

    use qc_18_avalanche_peering::test_utils::{
        keypair, make_proof, make_proof_at, remote_hello, InMemoryChain, ProofFixture,
    };
    use qc_18_avalanche_peering::{
        AvalancheApi, AvalancheError, AvalancheMessage, ChainEvent, ConnectionNonces, Delegation,
        DelegationBuilder, HandshakeSession, HandshakeState, MessageOutcome, NodeId, Proof,
        ServiceFlags,
    };

    use crate::integration::network::{over_wire, Link, TestNode};

    fn peer_address(n: u64) -> IpAddr {
        IpAddr::from([192, 168, 0, n as u8])
    }

    /// Connect a scripted peer to `node`.
    fn scripted_peer(node: &TestNode, n: u64) -> HandshakeSession {
        let nonces = ConnectionNonces::new(n, n + 500, n + 1000, n + 1500);
        node.service
            .on_peer_connected(NodeId::new(n), peer_address(n), ServiceFlags::NODE_NETWORK, nonces)
            .unwrap()
    }

    /// Hello claiming `fixture`'s proof, signed by its master key.
    fn claim(session: &HandshakeSession, fixture: &ProofFixture) -> AvalancheMessage {
        let delegation = DelegationBuilder::new(&fixture.proof).build();
        over_wire(&AvalancheMessage::Hello(remote_hello(
            delegation,
            &fixture.master,
            session.nonces(),
        )))
    }

    fn node_count(node: &TestNode, proof: &Proof) -> usize {
        node.service
            .peer_roster()
            .iter()
            .find(|entry| entry.proof_id == proof.proof_id())
            .map_or(0, |entry| entry.node_count)
    }

    fn getdata_count(node: &TestNode) -> usize {
        node.network
            .sent()
            .iter()
            .filter(|(_, msg)| matches!(msg, AvalancheMessage::GetData { .. }))
            .count()
    }

    // =========================================================================
    // Handshake between staking nodes
    // =========================================================================

    #[test]
    fn test_staking_nodes_exchange_proofs_and_bind() {
        let chain = Arc::new(InMemoryChain::new());
        let proof_a = make_proof(&chain, 1, &[11], 0);
        let proof_b = make_proof(&chain, 2, &[22], 0);
        let a = TestNode::staking(&chain, 1, &proof_a, 1);
        let b = TestNode::staking(&chain, 2, &proof_b, 2);

        let mut link = Link::open(&a, &b, NodeId::new(100), NodeId::new(200), 7).unwrap();
        link.pump(&a, &b);

        assert_eq!(
            link.a_session.state(),
            HandshakeState::Bound {
                proof_id: proof_b.proof.proof_id()
            }
        );
        assert_eq!(
            link.b_session.state(),
            HandshakeState::Bound {
                proof_id: proof_a.proof.proof_id()
            }
        );
        assert_eq!(node_count(&a, &proof_b.proof), 1);
        assert_eq!(node_count(&b, &proof_a.proof), 1);

        link.close(&a, &b);
        assert_eq!(node_count(&a, &proof_b.proof), 0);
    }

    #[test]
    fn test_staking_node_learns_proof_from_relay() {
        // c learns a's proof through b, which is connected to both
        let chain = Arc::new(InMemoryChain::new());
        let proof_a = make_proof(&chain, 1, &[11], 0);
        let proof_b = make_proof(&chain, 2, &[22], 0);
        let a = TestNode::staking(&chain, 1, &proof_a, 1);
        let b = TestNode::staking(&chain, 2, &proof_b, 2);
        let c = TestNode::plain(&chain, 3);

        let mut bc = Link::open(&b, &c, NodeId::new(20), NodeId::new(30), 11).unwrap();
        bc.pump(&b, &c);
        let mut ab = Link::open(&a, &b, NodeId::new(10), NodeId::new(21), 13).unwrap();
        ab.pump(&a, &b);
        bc.pump(&b, &c);

        let id = proof_a.proof.proof_id();
        assert!(b.service.pool().contains(&id));
        assert!(c.service.pool().contains(&id));
    }

    // =========================================================================
    // No-proof nodes and the service bit
    // =========================================================================

    #[test]
    fn test_no_proof_hello_never_fetches() {
        let chain = Arc::new(InMemoryChain::new());
        let proof_a = make_proof(&chain, 1, &[11], 0);
        let a = TestNode::staking(&chain, 1, &proof_a, 1);
        let c = TestNode::plain(&chain, 3);

        let mut link = Link::open(&a, &c, NodeId::new(10), NodeId::new(30), 3).unwrap();
        link.pump(&a, &c);

        assert_eq!(
            link.a_session.state(),
            HandshakeState::Verified { proof_id: None }
        );
        assert_eq!(getdata_count(&a), 0);
    }

    #[test]
    fn test_service_bit_follows_local_proof() {
        let chain = Arc::new(InMemoryChain::new());
        let plain = TestNode::plain(&chain, 1);
        assert!(!plain
            .service
            .local_services()
            .contains(ServiceFlags::NODE_AVALANCHE));

        // Restart with a proof configured
        let fixture = make_proof(&chain, 1, &[11], 0);
        let restarted = TestNode::staking(&chain, 1, &fixture, 1);
        assert!(restarted
            .service
            .local_services()
            .contains(ServiceFlags::NODE_AVALANCHE));
    }

    #[test]
    fn test_immature_local_proof_not_advertised() {
        let chain = Arc::new(InMemoryChain::new());
        let fixture = make_proof_at(&chain, 1, &[11], 0, 100);
        let node = TestNode::staking(&chain, 1, &fixture, 1);

        assert_eq!(node.service.local_services(), ServiceFlags::NODE_NETWORK);
        let status = node.service.local_proof().unwrap();
        assert!(!status.valid);
        assert!(status.error.is_some());
    }

    // =========================================================================
    // Misbehavior
    // =========================================================================

    #[test]
    fn test_forged_hello_bans_in_one_event() {
        let chain = Arc::new(InMemoryChain::new());
        let node = TestNode::plain(&chain, 1);
        let victim = make_proof(&chain, 5, &[55], 0);
        let mut session = scripted_peer(&node, 1);

        let forged = remote_hello(
            DelegationBuilder::new(&victim.proof).build(),
            &keypair(66),
            session.nonces(),
        );
        let outcome = node
            .service
            .handle_message(&mut session, AvalancheMessage::Hello(forged));

        assert_eq!(
            outcome,
            MessageOutcome::HelloRejected(AvalancheError::InvalidHandshakeSignature)
        );
        let threshold = node.service.config().misbehavior.ban_threshold;
        assert!(node.service.scorer().score(NodeId::new(1)).unwrap() >= threshold);
        assert!(node.service.is_banned(&peer_address(1)));
        assert!(node.network.is_disconnected(NodeId::new(1)));

        // Nothing else is processed on the failed connection
        assert_eq!(
            node.service.handle_message(
                &mut session,
                AvalancheMessage::Inv {
                    proof_id: victim.proof.proof_id()
                }
            ),
            MessageOutcome::Dropped
        );
    }

    #[test]
    fn test_unknown_proof_fetched_once() {
        let chain = Arc::new(InMemoryChain::new());
        let node = TestNode::plain(&chain, 1);
        let peer = make_proof(&chain, 5, &[55], 0);
        let id = peer.proof.proof_id();

        let mut first = scripted_peer(&node, 1);
        let mut second = scripted_peer(&node, 2);
        let hello = claim(&first, &peer);
        node.service.handle_message(&mut first, hello.clone());
        node.service.handle_message(&mut first, hello);
        let hello = claim(&second, &peer);
        node.service.handle_message(&mut second, hello);

        // One request per claiming connection, none for the repeat
        assert_eq!(getdata_count(&node), 2);
        for peer_node in [NodeId::new(1), NodeId::new(2)] {
            assert_eq!(
                node.network.sent_to(peer_node).last(),
                Some(&AvalancheMessage::GetData { proof_id: id })
            );
        }

        // Delivery binds both waiting connections
        node.service.handle_message(
            &mut first,
            AvalancheMessage::ProofPayload {
                proof: peer.proof.clone(),
            },
        );
        node.service.refresh_session(&mut second);
        assert_eq!(node_count(&node, &peer.proof), 2);
        assert_eq!(second.state(), HandshakeState::Bound { proof_id: id });
    }

    #[test]
    fn test_repeated_hello_keeps_node_count() {
        let chain = Arc::new(InMemoryChain::new());
        let node = TestNode::plain(&chain, 1);
        let peer = make_proof(&chain, 5, &[55], 0);
        node.service.submit_proof(&peer.proof.to_bytes()).unwrap();

        let mut session = scripted_peer(&node, 1);
        let hello = claim(&session, &peer);
        node.service.handle_message(&mut session, hello.clone());
        assert_eq!(node_count(&node, &peer.proof), 1);

        for _ in 0..3 {
            assert_eq!(
                node.service.handle_message(&mut session, hello.clone()),
                MessageOutcome::HelloIgnored
            );
        }
        assert_eq!(node_count(&node, &peer.proof), 1);
        assert!(!node.service.is_banned(&peer_address(1)));
    }

    // =========================================================================
    // Node counts and reorgs
    // =========================================================================

    #[test]
    fn test_node_count_tracks_live_connections() {
        let chain = Arc::new(InMemoryChain::new());
        let node = TestNode::plain(&chain, 1);
        let peer = make_proof(&chain, 5, &[55], 0);
        node.service.submit_proof(&peer.proof.to_bytes()).unwrap();

        let mut sessions: Vec<HandshakeSession> = (1..=3)
            .map(|n| {
                let mut session = scripted_peer(&node, n);
                let hello = claim(&session, &peer);
                node.service.handle_message(&mut session, hello);
                session
            })
            .collect();
        assert_eq!(node_count(&node, &peer.proof), 3);

        node.service.on_peer_disconnected(&mut sessions[1]);
        assert_eq!(node_count(&node, &peer.proof), 2);

        // Disconnect is idempotent
        node.service.on_peer_disconnected(&mut sessions[1]);
        assert_eq!(node_count(&node, &peer.proof), 2);
    }

    #[test]
    fn test_invalidate_and_reconsider_stake_block() {
        let chain = Arc::new(InMemoryChain::new());
        let node = TestNode::plain(&chain, 1);
        let peer = make_proof_at(&chain, 5, &[55], 0, 50);
        let id = peer.proof.proof_id();
        node.service.submit_proof(&peer.proof.to_bytes()).unwrap();

        let mut stays = scripted_peer(&node, 1);
        let mut leaves = scripted_peer(&node, 2);
        for session in [&mut stays, &mut leaves] {
            let hello = claim(session, &peer);
            node.service.handle_message(session, hello);
        }
        assert_eq!(node_count(&node, &peer.proof), 2);

        chain.invalidate_block(50);
        let report = node
            .service
            .on_chain_event(ChainEvent::BlockInvalidated { height: 50 });
        assert_eq!(report.unbound.len(), 2);
        assert!(node.service.peer_roster().is_empty());
        assert!(node.service.pool().contains(&id));

        node.service.on_peer_disconnected(&mut leaves);

        chain.reconsider_block();
        let report = node
            .service
            .on_chain_event(ChainEvent::BlockReconsidered { height: 50 });
        assert_eq!(report.bound, vec![NodeId::new(1)]);
        assert_eq!(node_count(&node, &peer.proof), 1);

        node.service.refresh_session(&mut stays);
        assert_eq!(stays.state(), HandshakeState::Bound { proof_id: id });
    }

    // =========================================================================
    // Relay gating
    // =========================================================================

    #[test]
    fn test_unannounced_proof_served_after_delay() {
        let chain = Arc::new(InMemoryChain::new());
        let fixture = make_proof(&chain, 1, &[11], 0);
        let node = TestNode::staking(&chain, 1, &fixture, 1);
        let id = fixture.proof.proof_id();
        let mut session = scripted_peer(&node, 1);
        let getdata = AvalancheMessage::GetData { proof_id: id };

        assert_eq!(
            node.service.handle_message(&mut session, getdata.clone()),
            MessageOutcome::ProofWithheld(id)
        );
        node.time.advance(119);
        assert_eq!(
            node.service.handle_message(&mut session, getdata.clone()),
            MessageOutcome::ProofWithheld(id)
        );
        node.time.advance(1);
        assert_eq!(
            node.service.handle_message(&mut session, getdata),
            MessageOutcome::ProofServed(id)
        );
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    #[test]
    fn test_proof_and_delegation_identities_survive_encoding() {
        let chain = InMemoryChain::new();
        let fixture = make_proof(&chain, 1, &[11, 12, 13], 4);
        let decoded = Proof::from_bytes(&fixture.proof.to_bytes()).unwrap();
        assert_eq!(decoded.proof_id(), fixture.proof.proof_id());
        assert_eq!(decoded.limited_proof_id(), fixture.proof.limited_proof_id());

        let mut builder = DelegationBuilder::new(&fixture.proof);
        builder
            .add_level(&fixture.master, keypair(40).public_key())
            .unwrap();
        let delegation = builder.build();
        let decoded = Delegation::from_bytes(&delegation.to_bytes()).unwrap();
        assert_eq!(decoded.id(), delegation.id());
        assert_eq!(decoded.limited_proof_id(), fixture.proof.limited_proof_id());
        assert_eq!(decoded.resolve(4).unwrap(), keypair(40).public_key());
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_handshakes_during_reorgs() {
        let chain = Arc::new(InMemoryChain::new());
        let node = Arc::new(TestNode::plain(&chain, 1));
        let peer = Arc::new(make_proof_at(&chain, 5, &[55], 0, 90));
        node.service.submit_proof(&peer.proof.to_bytes()).unwrap();

        let mut handles = Vec::new();
        for n in 1..=8u64 {
            let node = Arc::clone(&node);
            let peer = Arc::clone(&peer);
            handles.push(tokio::spawn(async move {
                let mut session = scripted_peer(&node, n);
                let hello = claim(&session, &peer);
                node.service.handle_message(&mut session, hello);
                session
            }));
        }

        let reorgs = {
            let node = Arc::clone(&node);
            let chain = Arc::clone(&chain);
            tokio::spawn(async move {
                for _ in 0..20 {
                    chain.invalidate_block(90);
                    node.service
                        .on_chain_event(ChainEvent::BlockInvalidated { height: 90 });
                    tokio::task::yield_now().await;
                    chain.reconsider_block();
                    node.service
                        .on_chain_event(ChainEvent::BlockReconsidered { height: 90 });
                }
            })
        };

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }
        reorgs.await.unwrap();

        // Settle on the final tip
        node.service
            .on_chain_event(ChainEvent::BlockConnected { height: 100 });
        assert_eq!(node_count(&node, &peer.proof), 8);

        for session in &mut sessions {
            node.service.refresh_session(session);
            assert_eq!(
                session.state(),
                HandshakeState::Bound {
                    proof_id: peer.proof.proof_id()
                }
            );
        }
        let bindings = node.service.pool().bindings();
        assert_eq!(bindings.len(), 8);
        assert!(bindings
            .iter()
            .all(|binding| node.service.pool().contains(&binding.proof_id)));
    }
}
