use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use super::chain::ChainTracker;
use crate::domain::{
    check_against_chain, verify_proof, AvalancheConfig, AvalancheError, Delegation,
    DelegationBuilder, DelegationError, KeyPair, MisbehaviorScorer, Proof, ProofError, ProofId,
    ProofOrigin, ProofPool, RelayGate, Timestamp,
};
use crate::ports::{ChainState, PeerNetwork, TimeSource};

/// The node's own proof and the delegation its hellos carry.
#[derive(Debug, Clone)]
pub(crate) struct LocalProof {
    pub proof: Arc<Proof>,
    pub proof_id: ProofId,
    pub delegation: Delegation,
}

/// Avalanche peering service.
///
/// Wires the domain components to the chain, network and clock ports.
/// Handshake sessions are owned by the per-connection handlers and passed
/// in by `&mut`; everything else is internally synchronized.
///
/// # Thread Safety
///
/// `Send + Sync`; share it across connection tasks through `Arc`. No lock
/// is held across signature verification or network sends.
///
/// # Example
///
/// ```rust,ignore
/// use qc_18_avalanche_peering::service::AvalancheService;
///
/// let service = Arc::new(AvalancheService::new(
///     AvalancheConfig::default(),
///     chain,
///     network,
///     Arc::new(SystemTimeSource::new()),
/// )?);
/// let mut session = service.on_peer_connected(node, addr, services, nonces)?;
/// service.handle_message(&mut session, message);
/// ```
pub struct AvalancheService<C, N>
where
    C: ChainState,
    N: PeerNetwork,
{
    pub(crate) config: AvalancheConfig,
    pub(crate) chain: Arc<C>,
    pub(crate) network: Arc<N>,
    pub(crate) time_source: Arc<dyn TimeSource>,
    pub(crate) pool: Arc<ProofPool>,
    pub(crate) relay: Arc<RelayGate>,
    pub(crate) scorer: Arc<MisbehaviorScorer>,
    pub(crate) local: Option<LocalProof>,
    /// Why the local proof is not valid, if it is not
    pub(crate) local_error: RwLock<Option<ProofError>>,
    /// Key signing this node's hellos
    pub(crate) session_key: KeyPair,
    pub(crate) tracker: ChainTracker,
}

impl<C, N> AvalancheService<C, N>
where
    C: ChainState,
    N: PeerNetwork,
{
    /// Create the service and register the configured local proof.
    ///
    /// # Errors
    ///
    /// Fails when the local proof, key or delegation cannot be parsed, or
    /// when the proof fails chain-independent validation. A local proof that
    /// is only immature (or otherwise not yet valid against the chain) is
    /// accepted and re-checked on every chain event.
    pub fn new(
        config: AvalancheConfig,
        chain: Arc<C>,
        network: Arc<N>,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<Self, AvalancheError> {
        let (local, session_key) = load_local_proof(&config)?;
        let service = Self {
            pool: Arc::new(ProofPool::new()),
            relay: Arc::new(RelayGate::new(config.relay.clone())),
            scorer: Arc::new(MisbehaviorScorer::new(config.misbehavior.clone())),
            config,
            chain,
            network,
            time_source,
            local,
            local_error: RwLock::new(None),
            session_key,
            tracker: ChainTracker::new(),
        };
        service.register_local_proof()?;
        Ok(service)
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.time_source.now()
    }

    pub fn config(&self) -> &AvalancheConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<ProofPool> {
        &self.pool
    }

    pub fn relay(&self) -> &Arc<RelayGate> {
        &self.relay
    }

    pub fn scorer(&self) -> &Arc<MisbehaviorScorer> {
        &self.scorer
    }

    /// Id of the configured local proof.
    pub fn local_proof_id(&self) -> Option<ProofId> {
        self.local.as_ref().map(|l| l.proof_id)
    }

    /// Delegation carried by this node's hellos.
    pub(crate) fn local_delegation(&self) -> Delegation {
        match &self.local {
            Some(local) => local.delegation.clone(),
            None => Delegation::no_proof(self.session_key.public_key()),
        }
    }

    fn register_local_proof(&self) -> Result<(), AvalancheError> {
        let Some(local) = &self.local else {
            return Ok(());
        };
        verify_proof(&local.proof, &self.config.proof)?;

        let _pass = self.tracker.exclusive();
        let chain_check = check_against_chain(&*local.proof, &*self.chain, &self.config.proof);
        let valid = chain_check.is_ok();
        self.pool.insert(Arc::clone(&local.proof), valid)?;
        self.relay
            .record_known(local.proof_id, ProofOrigin::Local, self.now());

        match chain_check {
            Ok(()) => info!("[qc-18] Local proof {} is valid", local.proof_id),
            Err(ref e) => warn!("[qc-18] Local proof {} is not valid yet: {}", local.proof_id, e),
        }
        *self.local_error.write() = chain_check.err();
        Ok(())
    }
}

/// Parse the local proof, session key and delegation from config.
fn load_local_proof(
    config: &AvalancheConfig,
) -> Result<(Option<LocalProof>, KeyPair), AvalancheError> {
    let local = &config.local;
    let Some(proof_hex) = &local.proof else {
        return Ok((None, KeyPair::generate()));
    };

    let proof = Proof::from_hex(proof_hex)?;
    let key_hex = local
        .master_key
        .as_deref()
        .ok_or_else(|| AvalancheError::Config("local proof configured without a key".into()))?;
    let session_key = KeyPair::from_secret_hex(key_hex)?;

    let delegation = match &local.delegation {
        Some(hex) => {
            let delegation = Delegation::from_hex(hex)?;
            if !delegation.matches(&proof) {
                return Err(DelegationError::ProofMismatch(proof.proof_id()).into());
            }
            delegation
        }
        None => DelegationBuilder::new(&proof).build(),
    };
    let resolved = delegation.resolve(config.proof.max_delegation_levels)?;
    if resolved != session_key.public_key() {
        return Err(AvalancheError::InvalidKey(
            "configured key does not match the proof's session key".into(),
        ));
    }

    let proof_id = proof.proof_id();
    Ok((
        Some(LocalProof {
            proof: Arc::new(proof),
            proof_id,
            delegation,
        }),
        session_key,
    ))
}
