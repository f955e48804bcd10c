//! # QC-18 Avalanche Peering Brutal Benchmarks
//!
//! Hot paths measured:
//! - Proof verification: one ECDSA verify per stake, up to the stake limit
//! - avahello verification: delegation walk plus one signature
//! - Proof pool insertion and conflict checks with thousands of proofs
//! - Chain re-evaluation of a full pool after a tip change
//!
//! Brutal Conditions:
//! - Proofs at the maximum stake count
//! - Delegation chains at the maximum depth
//! - Pools with many connections bound per proof

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use qc_18_avalanche_peering::test_utils::{
    keypair, make_proof, remote_hello, InMemoryChain, MockTimeSource, RecordingNetwork,
};
use qc_18_avalanche_peering::{
    verify_hello, verify_proof, AvalancheConfig, AvalancheService, ChainEvent, ConnectionNonces,
    DelegationBuilder, KeyPair, NodeId, OutPoint, Proof, ProofBuilder, ProofConfig, ProofOrigin,
    ProofPool, Stake, TimeSource, COIN,
};

/// Random proof with `stakes` stakes, built without a chain.
fn random_proof(stakes: usize) -> Proof {
    let mut rng = rand::thread_rng();
    let master = KeyPair::generate();
    let mut builder = ProofBuilder::new(0, 0, master.public_key());
    for _ in 0..stakes {
        let owner = KeyPair::generate();
        let stake = Stake {
            utxo: OutPoint::new(rng.gen(), rng.gen()),
            amount: COIN,
            height: 1,
            is_coinbase: false,
            pubkey: owner.public_key(),
        };
        builder
            .add_stake(stake, &owner)
            .expect("random outpoints do not repeat");
    }
    builder.build()
}

pub fn brutal_proof_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18/brutal/proof_verification");
    group.measurement_time(Duration::from_secs(10));
    let config = ProofConfig::default();

    for stakes in [1usize, 10, 100] {
        let proof = random_proof(stakes);
        group.throughput(Throughput::Elements(stakes as u64));
        group.bench_with_input(BenchmarkId::new("verify_proof", stakes), &proof, |b, proof| {
            b.iter(|| black_box(verify_proof(proof, &config).is_ok()))
        });
    }

    // Decoding is on the path of every received avaproof
    let proof = random_proof(100);
    let raw = proof.to_bytes();
    group.bench_function("decode_100_stakes", |b| {
        b.iter(|| black_box(Proof::from_bytes(&raw).is_ok()))
    });

    group.finish();
}

pub fn brutal_hello_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18/brutal/hello_verification");
    group.measurement_time(Duration::from_secs(10));

    let chain = InMemoryChain::new();
    let fixture = make_proof(&chain, 1, &[10], 0);
    let nonces = ConnectionNonces::new(1, 2, 3, 4);
    let max_levels = ProofConfig::default().max_delegation_levels;

    for depth in [0usize, 5, 20] {
        let mut builder = DelegationBuilder::new(&fixture.proof);
        let mut signer = fixture.master.clone();
        for level in 0..depth {
            let next = keypair(100 + level as u8);
            builder
                .add_level(&signer, next.public_key())
                .expect("signer holds the tip key");
            signer = next;
        }
        let hello = remote_hello(builder.build(), &signer, &nonces);

        group.bench_with_input(BenchmarkId::new("verify_hello", depth), &hello, |b, hello| {
            b.iter(|| black_box(verify_hello(hello, &nonces, max_levels).is_ok()))
        });
    }

    group.finish();
}

pub fn brutal_pool_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18/brutal/proof_pool");
    group.measurement_time(Duration::from_secs(10));

    let proofs: Vec<Arc<Proof>> = (0..1000).map(|_| Arc::new(random_proof(1))).collect();

    group.throughput(Throughput::Elements(proofs.len() as u64));
    group.bench_function("insert_1000_proofs", |b| {
        b.iter(|| {
            let pool = ProofPool::new();
            for proof in &proofs {
                let _ = pool.insert(Arc::clone(proof), true);
            }
            black_box(pool.len())
        })
    });

    // Many connections resolving against a populated pool
    let pool = ProofPool::new();
    for proof in &proofs {
        let _ = pool.insert(Arc::clone(proof), true);
    }
    let ids: Vec<_> = proofs.iter().map(|p| p.proof_id()).collect();
    group.bench_function("resolve_5000_connections", |b| {
        b.iter(|| {
            for n in 0..5000u64 {
                let node = NodeId::new(n);
                pool.connect(node);
                black_box(pool.resolve_node(node, ids[n as usize % ids.len()]));
            }
            for n in 0..5000u64 {
                pool.disconnect(NodeId::new(n));
            }
        })
    });

    group.finish();
}

pub fn brutal_chain_reevaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18/brutal/chain_reevaluation");
    group.measurement_time(Duration::from_secs(15));

    for count in [10usize, 100] {
        let chain = Arc::new(InMemoryChain::new());
        let service = AvalancheService::new(
            AvalancheConfig::for_testing(),
            Arc::clone(&chain),
            Arc::new(RecordingNetwork::new()),
            Arc::new(MockTimeSource::new(0)) as Arc<dyn TimeSource>,
        )
        .expect("service without local proof");
        for seed in 0..count {
            let fixture = make_proof(&chain, 1 + seed as u8, &[(1 + seed) as u8], 0);
            let _ = service.accept_proof(Arc::new(fixture.proof), ProofOrigin::Submitted);
        }

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("reorg_flip", count),
            &service,
            |b, service| {
                b.iter(|| {
                    chain.invalidate_block(1);
                    service.on_chain_event(ChainEvent::BlockInvalidated { height: 1 });
                    chain.reconsider_block();
                    black_box(service.on_chain_event(ChainEvent::BlockReconsidered { height: 1 }))
                })
            },
        );
    }

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    brutal_proof_verification(c);
    brutal_hello_verification(c);
    brutal_pool_operations(c);
    brutal_chain_reevaluation(c);
}
