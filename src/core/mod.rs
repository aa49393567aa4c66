//! Foundational and often-reused types.

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod id;
pub mod peer_store;
pub mod routing_table;
pub mod sampler;
pub mod set;
pub(crate) mod stream_store;
pub(crate) mod traits;
