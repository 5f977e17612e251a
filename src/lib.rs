//! cachegate - versioned read-through cache controller
//!
//! Intercepts resource requests and answers them from a durable,
//! generation-versioned cache, falling back to the network and refilling
//! the cache behind the caller's back. A generation is provisioned from an
//! asset manifest on install and every other generation is retired on
//! activate.

pub mod cache;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod testing;

pub use error::{CachegateError, CachegateResult};
