//! # AEDPoS Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── consensus_benchmarks.rs  # Decision, LIB and secret sharing
//! └── src/integration/
//!     ├── network.rs               # Multi-node runs over the node crate
//!     ├── side_chain.rs            # Endless single-term chains
//!     └── properties.rs            # proptest over round arithmetic
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p aedpos-tests
//! cargo test -p aedpos-tests integration::network::
//! cargo bench -p aedpos-tests
//! ```

pub mod integration;
