//! Adapters layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports. The node simulation
//! and the tests wire the service together from these.

mod cipher;
mod election;
mod event_sink;
mod round_store;

pub use cipher::*;
pub use election::*;
pub use event_sink::*;
pub use round_store::*;
