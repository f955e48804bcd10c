//! # Avalanche Proofs
//!
//! A proof binds a set of staked UTXOs to a master public key. Each stake is
//! signed by the key owning the output, committing to the proof's
//! expiration time and master key.
//!
//! ## Identities
//!
//! ```text
//! stake_id         = H(stake)
//! commitment       = H(expiration_time || master)
//! stake signature  = sign(H(commitment || stake))
//! limited_proof_id = H(sequence || expiration_time || n_stakes || stakes)
//! proof_id         = H(limited_proof_id || master)
//! ```
//!
//! `H` is double SHA-256. Stake signatures are excluded from both ids.
//!
//! ## Validation Order
//!
//! 1. Decoding and structure (`Malformed`)
//! 2. Stake signatures
//! 3. Total staked value against the dust threshold
//! 4. Chain-relative checks: UTXO presence and match, maturity, expiry

use serde::{Deserialize, Serialize};

use super::config::ProofConfig;
use super::crypto::{Hash256, HashWriter, KeyPair, PublicKey, Signature};
use super::errors::ProofError;
use super::value_objects::{Amount, LimitedProofId, OutPoint, ProofId};
use crate::ports::ChainState;
use crate::wire::codec;

/// A staked output, as claimed by the proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub utxo: OutPoint,
    pub amount: Amount,
    pub height: u32,
    pub is_coinbase: bool,
    pub pubkey: PublicKey,
}

impl Stake {
    fn write_to(&self, writer: &mut HashWriter) {
        writer
            .write_bytes(&self.utxo.txid)
            .write_u32(self.utxo.vout)
            .write_u64(self.amount)
            .write_u32(self.height)
            .write_bool(self.is_coinbase)
            .write_bytes(self.pubkey.as_bytes());
    }

    /// Stake identity, used to order stakes inside a proof.
    pub fn id(&self) -> Hash256 {
        let mut writer = HashWriter::new();
        self.write_to(&mut writer);
        writer.finalize()
    }

    /// Digest the stake key signs for a given proof commitment.
    pub fn signing_digest(&self, commitment: &Hash256) -> Hash256 {
        let mut writer = HashWriter::new();
        writer.write_bytes(commitment);
        self.write_to(&mut writer);
        writer.finalize()
    }
}

/// A stake together with its owner's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedStake {
    pub stake: Stake,
    pub signature: Signature,
}

impl SignedStake {
    /// Sign `stake` with `key` under `commitment`.
    pub fn sign(stake: Stake, key: &KeyPair, commitment: &Hash256) -> Self {
        let signature = key.sign(&stake.signing_digest(commitment));
        Self { stake, signature }
    }

    pub fn verify(&self, commitment: &Hash256) -> bool {
        self.stake
            .pubkey
            .verify(&self.stake.signing_digest(commitment), &self.signature)
    }
}

/// Stake commitment for a given expiration and master key.
pub fn stake_commitment(expiration_time: i64, master: &PublicKey) -> Hash256 {
    let mut writer = HashWriter::new();
    writer
        .write_i64(expiration_time)
        .write_bytes(master.as_bytes());
    writer.finalize()
}

/// `proof_id = H(limited_proof_id || master)`.
pub fn compute_proof_id(limited: &LimitedProofId, master: &PublicKey) -> ProofId {
    let mut writer = HashWriter::new();
    writer
        .write_bytes(limited.as_bytes())
        .write_bytes(master.as_bytes());
    ProofId::new(writer.finalize())
}

/// Avalanche proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    sequence: u64,
    expiration_time: i64,
    master: PublicKey,
    stakes: Vec<SignedStake>,
}

impl Proof {
    /// Assemble a proof from already-signed stakes. No validation happens
    /// here; see [`verify_proof`].
    pub fn new(
        sequence: u64,
        expiration_time: i64,
        master: PublicKey,
        stakes: Vec<SignedStake>,
    ) -> Self {
        Self {
            sequence,
            expiration_time,
            master,
            stakes,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Expiration as a median-time-past; zero means no expiry.
    pub fn expiration_time(&self) -> i64 {
        self.expiration_time
    }

    pub fn master(&self) -> &PublicKey {
        &self.master
    }

    pub fn stakes(&self) -> &[SignedStake] {
        &self.stakes
    }

    pub fn stake_commitment(&self) -> Hash256 {
        stake_commitment(self.expiration_time, &self.master)
    }

    pub fn limited_proof_id(&self) -> LimitedProofId {
        let mut writer = HashWriter::new();
        writer
            .write_u64(self.sequence)
            .write_i64(self.expiration_time)
            .write_u64(self.stakes.len() as u64);
        for signed in &self.stakes {
            signed.stake.write_to(&mut writer);
        }
        LimitedProofId::new(writer.finalize())
    }

    pub fn proof_id(&self) -> ProofId {
        compute_proof_id(&self.limited_proof_id(), &self.master)
    }

    /// Sum of all stake amounts (saturating).
    pub fn staked_amount(&self) -> Amount {
        self.stakes
            .iter()
            .fold(0, |total: Amount, s| total.saturating_add(s.stake.amount))
    }

    /// Whether the proof has expired at the given median-time-past.
    pub fn is_expired(&self, tip_median_time: i64) -> bool {
        self.expiration_time > 0 && tip_median_time >= self.expiration_time
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Serializing owned plain data into a Vec cannot fail.
        codec::encode(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProofError> {
        codec::decode(bytes).map_err(|e| ProofError::Malformed(e.to_string()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, ProofError> {
        let bytes = hex::decode(s.trim()).map_err(|e| ProofError::Malformed(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Structural rules: at least one and at most `max_proof_stakes` stakes,
    /// non-zero amounts, stakes strictly ascending by id, no outpoint staked
    /// twice, and a decodable master key.
    pub fn check_structure(&self, config: &ProofConfig) -> Result<(), ProofError> {
        if self.stakes.is_empty() {
            return Err(ProofError::Malformed("no stakes".into()));
        }
        if self.stakes.len() > config.max_proof_stakes {
            return Err(ProofError::Malformed(format!(
                "{} stakes exceeds maximum of {}",
                self.stakes.len(),
                config.max_proof_stakes
            )));
        }
        if PublicKey::from_bytes(*self.master.as_bytes()).is_err() {
            return Err(ProofError::Malformed("invalid master key".into()));
        }

        let mut previous: Option<Hash256> = None;
        let mut outpoints = std::collections::HashSet::with_capacity(self.stakes.len());
        for signed in &self.stakes {
            if signed.stake.amount == 0 {
                return Err(ProofError::Malformed(format!(
                    "zero amount stake {}",
                    signed.stake.utxo
                )));
            }
            let id = signed.stake.id();
            if previous.is_some_and(|prev| prev >= id) {
                return Err(ProofError::Malformed("stakes not sorted".into()));
            }
            previous = Some(id);
            if !outpoints.insert(signed.stake.utxo) {
                return Err(ProofError::Malformed(format!(
                    "duplicate stake {}",
                    signed.stake.utxo
                )));
            }
        }
        Ok(())
    }

    pub fn check_value(&self, config: &ProofConfig) -> Result<(), ProofError> {
        let total = self.staked_amount();
        if total < config.stake_utxo_dust_threshold {
            return Err(ProofError::InsufficientValue {
                total,
                threshold: config.stake_utxo_dust_threshold,
            });
        }
        Ok(())
    }

    pub fn verify_signatures(&self) -> Result<(), ProofError> {
        let commitment = self.stake_commitment();
        match self.stakes.iter().position(|s| !s.verify(&commitment)) {
            Some(index) => Err(ProofError::InvalidSignature { index }),
            None => Ok(()),
        }
    }
}

/// Chain-independent checks: structure, signatures, value.
pub fn verify_proof(proof: &Proof, config: &ProofConfig) -> Result<(), ProofError> {
    proof.check_structure(config)?;
    proof.verify_signatures()?;
    proof.check_value(config)
}

/// Checks relative to the active chain.
///
/// Hard mismatches are reported before provisional failures so a proof
/// that can never become valid is not kept around as merely immature.
pub fn check_against_chain<C: ChainState + ?Sized>(
    proof: &Proof,
    chain: &C,
    config: &ProofConfig,
) -> Result<(), ProofError> {
    let mut missing = None;
    let mut immature = None;
    for signed in &proof.stakes {
        let stake = &signed.stake;
        let Some(coin) = chain.coin(&stake.utxo) else {
            missing.get_or_insert(ProofError::MissingUtxo { utxo: stake.utxo });
            continue;
        };

        let reason = if coin.amount != stake.amount {
            Some("amount mismatch")
        } else if coin.height != stake.height {
            Some("height mismatch")
        } else if coin.is_coinbase != stake.is_coinbase {
            Some("coinbase mismatch")
        } else if coin.owner != stake.pubkey {
            Some("destination mismatch")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ProofError::UtxoMismatch {
                utxo: stake.utxo,
                reason,
            });
        }

        let confirmations = chain.confirmations(coin.height);
        if confirmations < config.stake_utxo_confirmations {
            immature.get_or_insert(ProofError::Immature {
                utxo: stake.utxo,
                confirmations,
                required: config.stake_utxo_confirmations,
            });
        }
    }

    if let Some(err) = missing.or(immature) {
        return Err(err);
    }
    if proof.is_expired(chain.tip_median_time()) {
        return Err(ProofError::Expired {
            expiration_time: proof.expiration_time,
        });
    }
    Ok(())
}

/// Full validation of a serialized proof against the active chain.
///
/// Provisional failures (`Immature`, `MissingUtxo`) still return the error;
/// callers that want to keep such proofs decode first and run
/// [`verify_proof`] and [`check_against_chain`] separately.
pub fn validate<C: ChainState + ?Sized>(
    raw: &[u8],
    chain: &C,
    config: &ProofConfig,
) -> Result<Proof, ProofError> {
    let proof = Proof::from_bytes(raw)?;
    verify_proof(&proof, config)?;
    check_against_chain(&proof, chain, config)?;
    Ok(proof)
}

/// Builds and signs a proof.
#[derive(Debug)]
pub struct ProofBuilder {
    sequence: u64,
    expiration_time: i64,
    master: PublicKey,
    stakes: Vec<SignedStake>,
}

impl ProofBuilder {
    pub fn new(sequence: u64, expiration_time: i64, master: PublicKey) -> Self {
        Self {
            sequence,
            expiration_time,
            master,
            stakes: Vec::new(),
        }
    }

    /// Sign and add a stake. `key` must own the staked output.
    pub fn add_stake(&mut self, stake: Stake, key: &KeyPair) -> Result<(), ProofError> {
        if key.public_key() != stake.pubkey {
            return Err(ProofError::Malformed(format!(
                "key does not own stake {}",
                stake.utxo
            )));
        }
        if self.stakes.iter().any(|s| s.stake.utxo == stake.utxo) {
            return Err(ProofError::Malformed(format!(
                "duplicate stake {}",
                stake.utxo
            )));
        }
        let commitment = stake_commitment(self.expiration_time, &self.master);
        self.stakes.push(SignedStake::sign(stake, key, &commitment));
        Ok(())
    }

    /// Finish the proof with stakes in canonical order.
    pub fn build(mut self) -> Proof {
        self.stakes.sort_by_cached_key(|s| s.stake.id());
        Proof::new(self.sequence, self.expiration_time, self.master, self.stakes)
    }
}
