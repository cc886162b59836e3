//! # visum-worker
//!
//! Queue worker wiring for the visum image pipeline.
//!
//! This crate provides:
//! - AMQP transport with dead-letter topology and unbounded reconnect
//! - A priority-drain dispatcher feeding a fixed-size worker pool
//! - Task handlers for the extraction, compare, and maintenance queues
//! - The recognition resolver (corpus cache before extraction)
//!
//! ## Example
//!
//! ```ignore
//! use visum_worker::{Dispatcher, ExtractionHandler, Resolver, Transport};
//!
//! let transport = Arc::new(Transport::connect(config.broker).await);
//! let mut dispatcher = Dispatcher::new(transport.clone(), config.worker);
//! dispatcher.register_handler(ExtractionHandler::new(corpus.clone(), resolver));
//!
//! let handle = dispatcher.start();
//! tokio::signal::ctrl_c().await?;
//! handle.shutdown().await?;
//! ```

pub mod compare;
pub mod dispatcher;
pub mod extraction;
pub mod handler;
pub mod maintenance;
pub mod resolver;
pub mod transport;

// Re-export core types
pub use visum_core::*;

// Re-export worker types
pub use compare::CompareHandler;
pub use dispatcher::{Dispatcher, DispatcherHandle, WorkerEvent};
pub use extraction::ExtractionHandler;
pub use handler::{TaskHandler, TaskOutcome};
pub use maintenance::MaintenanceHandler;
pub use resolver::{Resolution, Resolver};
pub use transport::{ResultPublisher, Transport};
