//! Connection lifecycle and message handling.

use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::core::AvalancheService;
use crate::domain::{
    build_hello, check_against_chain, verify_hello, verify_proof, AvalancheError, BindOutcome,
    ConnectionNonces, HandshakeSession, HandshakeState, Hello, HelloVerdict, InsertResult,
    Misbehavior, NodeId, PendingReason, Proof, ProofError, ProofId, ProofOrigin, ServiceFlags,
};
use crate::ports::{ChainState, PeerNetwork};
use crate::wire::AvalancheMessage;

/// Result of accepting a proof into the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofAcceptance {
    pub proof_id: ProofId,
    /// Provisional failure when the proof was pooled but is not valid yet
    pub pending: Option<ProofError>,
    /// Connections bound by this proof's arrival
    pub bound_nodes: Vec<NodeId>,
    /// Conflicting proofs this one replaced
    pub superseded: Vec<ProofId>,
    /// Connections that were bound to a replaced proof
    pub unbound_nodes: Vec<NodeId>,
    /// Proof was already in the pool
    pub already_known: bool,
}

/// What handling a message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Hello verified; the session's new state
    HelloAccepted(HandshakeState),
    /// Hello after the first one on this connection
    HelloIgnored,
    /// Hello failed verification; connection dropped
    HelloRejected(AvalancheError),
    /// Sent a getdata for this proof
    ProofRequested(ProofId),
    /// Sent this proof to the requester
    ProofServed(ProofId),
    /// Requested proof is unknown, invalid or not yet relayable
    ProofWithheld(ProofId),
    ProofAccepted(ProofAcceptance),
    ProofRejected(ProofError),
    /// Nothing to do
    Ignored,
    /// Message not allowed in the session's current state
    Dropped,
}

impl<C, N> AvalancheService<C, N>
where
    C: ChainState,
    N: PeerNetwork,
{
    /// Register a new connection and send this node's hello.
    ///
    /// The hello goes to every peer; the local proof is announced only to
    /// peers advertising `NODE_AVALANCHE`.
    pub fn on_peer_connected(
        &self,
        node: NodeId,
        address: IpAddr,
        remote_services: ServiceFlags,
        nonces: ConnectionNonces,
    ) -> Result<HandshakeSession, AvalancheError> {
        let now = self.now();
        if self.scorer.is_banned(&address, now) {
            info!("[qc-18] Refusing connection from banned address {}", address);
            self.network.disconnect(node);
            return Err(AvalancheError::PeerBanned(node));
        }

        self.scorer.on_peer_connected(node, address, now);
        self.pool.connect(node);
        let session = HandshakeSession::new(node, remote_services, nonces);

        let hello = build_hello(self.local_delegation(), &self.session_key, &nonces);
        self.send(node, AvalancheMessage::Hello(hello));

        if let Some(local_id) = self.local_proof_id() {
            if remote_services.contains(ServiceFlags::NODE_AVALANCHE) {
                self.relay.mark_announced(&local_id, node);
                self.send(node, AvalancheMessage::Inv { proof_id: local_id });
            }
        }

        debug!(peer = node.as_u64(), "[qc-18] Peer connected");
        Ok(session)
    }

    /// Tear down all state for a closed connection. Idempotent.
    pub fn on_peer_disconnected(&self, session: &mut HandshakeSession) {
        let node = session.node();
        session.mark_disconnected();
        self.pool.disconnect(node);
        self.relay.forget_peer(node);
        self.scorer.on_peer_disconnected(node);
        debug!(peer = node.as_u64(), "[qc-18] Peer disconnected");
    }

    /// Dispatch one message received on `session`'s connection.
    pub fn handle_message(
        &self,
        session: &mut HandshakeSession,
        message: AvalancheMessage,
    ) -> MessageOutcome {
        if matches!(
            session.state(),
            HandshakeState::Failed | HandshakeState::Disconnected
        ) {
            return MessageOutcome::Dropped;
        }

        let command = message.kind().command();
        match message {
            AvalancheMessage::Hello(hello) => self.handle_hello(session, &hello),
            AvalancheMessage::GetData { proof_id } => self.handle_getdata(session, proof_id),
            AvalancheMessage::Inv { .. } | AvalancheMessage::ProofPayload { .. }
                if !session.is_verified() =>
            {
                debug!(
                    peer = session.node().as_u64(),
                    "[qc-18] Dropping {} before avahello", command
                );
                MessageOutcome::Dropped
            }
            AvalancheMessage::Inv { proof_id } => self.handle_inv(session, proof_id),
            AvalancheMessage::ProofPayload { proof } => self.handle_proof_payload(session, proof),
        }
    }

    fn handle_hello(&self, session: &mut HandshakeSession, hello: &Hello) -> MessageOutcome {
        let node = session.node();
        if !session.accepts_hello() {
            info!("[qc-18] Ignoring avahello from peer {}: already received", node);
            self.scorer
                .misbehaving(node, Misbehavior::RepeatedHello, self.now());
            return MessageOutcome::HelloIgnored;
        }

        let verdict = verify_hello(
            hello,
            session.nonces(),
            self.config.proof.max_delegation_levels,
        );
        let proof_id = match verdict {
            Ok(HelloVerdict::NoProof) => {
                session.mark_verified(None);
                debug!(peer = node.as_u64(), "[qc-18] Peer has no proof");
                return MessageOutcome::HelloAccepted(session.state());
            }
            Ok(HelloVerdict::Proof { proof_id }) => proof_id,
            Err(err) => return self.reject_hello(session, err),
        };

        session.mark_verified(Some(proof_id));
        match self.pool.resolve_node(node, proof_id) {
            BindOutcome::Bound => {
                session.sync_binding(true);
                info!("[qc-18] Peer {} bound to proof {}", node, proof_id);
            }
            BindOutcome::Pending(PendingReason::Unknown) => {
                if self.relay.request_fetch(proof_id, node, self.now()) {
                    self.send(node, AvalancheMessage::GetData { proof_id });
                }
            }
            BindOutcome::Pending(PendingReason::Invalid) => {
                debug!(
                    peer = node.as_u64(),
                    "[qc-18] Proof {} not valid yet, binding deferred", proof_id
                );
            }
            BindOutcome::NotConnected => {}
        }
        MessageOutcome::HelloAccepted(session.state())
    }

    fn reject_hello(&self, session: &mut HandshakeSession, err: AvalancheError) -> MessageOutcome {
        let node = session.node();
        session.mark_failed();
        let kind = match err {
            AvalancheError::Delegation(_) => Misbehavior::BrokenDelegation,
            _ => Misbehavior::InvalidHandshakeSignature,
        };
        self.scorer.misbehaving(node, kind, self.now());
        warn!("[qc-18] Rejected avahello from peer {}: {}", node, err);
        self.network.disconnect(node);
        MessageOutcome::HelloRejected(err)
    }

    fn handle_inv(&self, session: &HandshakeSession, proof_id: ProofId) -> MessageOutcome {
        let node = session.node();
        if self.pool.contains(&proof_id) {
            self.relay.mark_announced(&proof_id, node);
            return MessageOutcome::Ignored;
        }
        if self.relay.request_fetch(proof_id, node, self.now()) {
            self.send(node, AvalancheMessage::GetData { proof_id });
            MessageOutcome::ProofRequested(proof_id)
        } else {
            MessageOutcome::Ignored
        }
    }

    fn handle_getdata(&self, session: &HandshakeSession, proof_id: ProofId) -> MessageOutcome {
        let node = session.node();
        if !self
            .relay
            .serve_decision(&proof_id, node, self.now())
            .is_served()
        {
            return MessageOutcome::ProofWithheld(proof_id);
        }

        let proof = match &self.local {
            Some(local) if local.proof_id == proof_id => Some(Arc::clone(&local.proof)),
            _ => self
                .pool
                .get(&proof_id)
                .filter(|_| self.pool.is_valid(&proof_id) == Some(true)),
        };
        match proof {
            Some(proof) => {
                self.send(
                    node,
                    AvalancheMessage::ProofPayload {
                        proof: (*proof).clone(),
                    },
                );
                MessageOutcome::ProofServed(proof_id)
            }
            None => MessageOutcome::ProofWithheld(proof_id),
        }
    }

    fn handle_proof_payload(&self, session: &mut HandshakeSession, proof: Proof) -> MessageOutcome {
        let node = session.node();
        let proof_id = proof.proof_id();

        let outcome = match self.accept_proof(Arc::new(proof), ProofOrigin::Received(node)) {
            Ok(acceptance) => {
                self.relay.complete_fetch(&proof_id);
                MessageOutcome::ProofAccepted(acceptance)
            }
            Err(err) => {
                debug!(
                    peer = node.as_u64(),
                    "[qc-18] Rejected proof {}: {}", proof_id, err
                );
                MessageOutcome::ProofRejected(err)
            }
        };
        self.refresh_session(session);
        outcome
    }

    /// Validate a proof and add it to the pool, binding waiting connections
    /// and relaying it when valid.
    ///
    /// Signature checks run before any lock is taken. The chain check and
    /// the insert run under the chain tracker's guard. Connections listed in
    /// `unbound_nodes` should be passed to `refresh_session`.
    pub fn accept_proof(
        &self,
        proof: Arc<Proof>,
        origin: ProofOrigin,
    ) -> Result<ProofAcceptance, ProofError> {
        let proof_id = proof.proof_id();
        if self.pool.contains(&proof_id) {
            return Ok(ProofAcceptance {
                proof_id,
                pending: None,
                bound_nodes: Vec::new(),
                superseded: Vec::new(),
                unbound_nodes: Vec::new(),
                already_known: true,
            });
        }

        verify_proof(&proof, &self.config.proof)?;

        let pass = self.tracker.exclusive();
        let pending = match check_against_chain(&*proof, &*self.chain, &self.config.proof) {
            Ok(()) => None,
            Err(err) if err.is_provisional() => Some(err),
            Err(err) => return Err(err),
        };
        let valid = pending.is_none();

        let (bound_nodes, superseded, unbound_nodes) =
            match self.pool.insert(Arc::clone(&proof), valid)? {
                InsertResult::Added {
                    bound,
                    superseded,
                    unbound,
                    ..
                } => (bound, superseded, unbound),
                InsertResult::AlreadyKnown(_) => {
                    return Ok(ProofAcceptance {
                        proof_id,
                        pending,
                        bound_nodes: Vec::new(),
                        superseded: Vec::new(),
                        unbound_nodes: Vec::new(),
                        already_known: true,
                    })
                }
            };

        for old in &superseded {
            self.relay.forget_proof(old);
        }
        self.relay.record_known(proof_id, origin, self.now());
        drop(pass);

        if valid {
            let source = match origin {
                ProofOrigin::Received(node) => Some(node),
                _ => None,
            };
            self.announce(proof_id, source);
        }

        info!(
            proof_id = %proof_id,
            valid,
            bound = bound_nodes.len(),
            "[qc-18] Accepted proof"
        );
        Ok(ProofAcceptance {
            proof_id,
            pending,
            bound_nodes,
            superseded,
            unbound_nodes,
            already_known: false,
        })
    }

    /// Bring a session's state in line with the pool's bindings.
    pub fn refresh_session(&self, session: &mut HandshakeSession) {
        if let Some(claimed) = session.claimed_proof() {
            let bound = self.pool.bound_proof(session.node()) == Some(claimed);
            session.sync_binding(bound);
        }
    }

    /// Send `Inv` to every connected peer except `source`.
    pub(crate) fn announce(&self, proof_id: ProofId, source: Option<NodeId>) {
        for node in self.pool.connected_nodes() {
            if Some(node) == source {
                continue;
            }
            self.relay.mark_announced(&proof_id, node);
            self.send(node, AvalancheMessage::Inv { proof_id });
        }
    }

    pub(crate) fn send(&self, node: NodeId, message: AvalancheMessage) {
        let command = message.kind().command();
        if let Err(err) = self.network.send(node, message) {
            debug!(peer = node.as_u64(), "[qc-18] Failed to send {}: {}", command, err);
        }
    }
}
