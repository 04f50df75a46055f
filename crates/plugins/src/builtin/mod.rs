//! Plugins compiled into the binary.

mod breadcache;
mod breadcore;

pub use {breadcache::BreadCache, breadcore::BreadCore};

pub const BREADCACHE: &str = "breadcache";
pub const BREADCORE: &str = "breadcore";
