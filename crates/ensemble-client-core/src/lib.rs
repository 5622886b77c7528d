//! Core abstractions for ensemble connection management.
//!
//! This crate provides the fundamental building blocks:
//! - `WatchedEvent` - Raw connectivity notifications
//! - `ConnectionConfig` - Timeouts and queue sizing
//! - `BoundedFailureQueue` - Lossy FIFO for deferred failure reporting
//! - `Tracer` / `TimeTrace` - Counter and timing sink
//! - Ensemble provider, session factory, and watcher traits

pub mod config;
pub mod event;
pub mod failure_queue;
pub mod tracer;
pub mod traits;

pub use config::ConnectionConfig;
pub use event::{EventType, KeeperState, WatchedEvent};
pub use failure_queue::BoundedFailureQueue;
pub use tracer::{DefaultTracer, TimeTrace, Tracer};
pub use traits::{EnsembleError, EnsembleProvider, SessionError, SessionFactory, Watcher};
