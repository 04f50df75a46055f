//! Object caches for gateway state.
//!
//! - [`ObjectCache`]: keyed records with deep merge on update
//! - [`ReadyGate`]: one-shot latch opened by the READY event
//! - [`CacheLayer`]: the per-client set of caches, fed from the gateway bus

pub mod error;
pub mod key;
pub mod layer;
pub mod merge;
pub mod ready;
pub mod store;

pub use {
    error::{CacheError, Result},
    key::CacheKey,
    layer::{CacheLayer, CacheSet},
    merge::merge_records,
    ready::ReadyGate,
    store::{ObjectCache, Record},
};
