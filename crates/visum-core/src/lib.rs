//! # visum-core
//!
//! Core types, traits, and configuration for the visum image worker.
//!
//! This crate provides the foundational data structures, the error type,
//! the environment-sourced configuration, and the trait seams the other
//! visum crates depend on.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{
    BrokerConfig, Config, HashThreshold, LogConfig, MatcherConfig, RecognizerConfig, StoreConfig,
    WorkerConfig,
};
pub use error::{Error, Result};
pub use models::*;
pub use traits::CorpusStore;
