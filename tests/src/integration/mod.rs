//! # Integration Tests
//!
//! Whole-network behaviour: every node executes every block and must end
//! with the same round.

pub mod network;
pub mod properties;
pub mod side_chain;
