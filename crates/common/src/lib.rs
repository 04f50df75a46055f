//! Shared types, the error-context helpers, and the event bus used across
//! all breadcord crates.

pub mod bus;
pub mod error;
pub mod types;

pub use {
    bus::{EventBus, HandlerStats, Subscription},
    error::FromMessage,
    types::ArrayStrategy,
};
