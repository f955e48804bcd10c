//! # Quantum-Chain Subsystem Benchmarks
//!
//! | Subsystem | Hot path | Target |
//! |-----------|----------|--------|
//! | qc-18 Avalanche Peering | Proof verification (100 stakes) | < 10ms |
//! | qc-18 Avalanche Peering | avahello verification | < 1ms |
//! | qc-18 Avalanche Peering | Reorg re-evaluation (100 proofs) | < 50ms |

use criterion::{criterion_group, criterion_main, Criterion};

fn bench_avalanche_peering(c: &mut Criterion) {
    qc_tests::benchmarks::qc_18_avalanche_peering::register_benchmarks(c);
}

criterion_group!(benches, bench_avalanche_peering);

criterion_main!(benches);
