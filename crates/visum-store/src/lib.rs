//! # visum-store
//!
//! MongoDB-backed persistence for the visum image corpus, plus an
//! in-memory implementation with the same query semantics for tests.

pub mod corpus;
pub mod memory;

pub use corpus::Corpus;
pub use memory::MemoryCorpus;
