//! Domain layer for the AEDPoS consensus core
//!
//! Pure, deterministic logic over rounds:
//! - round, hash, timestamp: the data model
//! - time_slot: slot arithmetic on `Round`
//! - randomness: commit-reveal values and Shamir shares
//! - behaviour, command: what a miner does next, and when
//! - transition, evil, term: building the next round or term
//! - lib_calculator: last irreversible block offset

mod behaviour;
mod command;
mod config;
mod constants;
mod error;
mod evil;
mod hash;
mod lib_calculator;
mod messages;
mod randomness;
mod round;
mod term;
mod time_slot;
mod timestamp;
mod transition;

#[cfg(test)]
pub(crate) mod testing;

pub use behaviour::*;
pub use command::*;
pub use config::*;
pub use constants::*;
pub use error::*;
pub use evil::*;
pub use hash::*;
pub use lib_calculator::*;
pub use messages::*;
pub use randomness::*;
pub use round::*;
pub use term::*;
pub use timestamp::*;
pub use transition::*;
