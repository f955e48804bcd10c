//! # Quantum-Chain Benchmarks
//!
//! Performance benchmarks for the avalanche peering subsystem.
//! All benchmarks are "brutal" stress tests on the hot paths of the protocol.

pub mod qc_18_avalanche_peering;
