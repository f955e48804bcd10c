//! # Quantum-Chain Test Suite
//!
//! Unified test crate for the avalanche peering subsystem.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Performance tests
//! │   └── qc_18_avalanche_peering.rs
//! │
//! └── integration/      # Multi-node scenarios
//!     ├── network.rs    # In-memory links between services
//!     └── avalanche_peering.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # By category
//! cargo test -p qc-tests integration::
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

#![allow(dead_code)]

pub mod benchmarks;
pub mod integration;
