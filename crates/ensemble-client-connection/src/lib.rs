//! Connection lifecycle for clients of a clustered coordination service.
//!
//! Provides:
//! - `ConnectionState` - Liveness tracking, session rebuild, bounded timeouts
//! - `HandleHolder` - Owner of the single live session handle
//! - `EventDispatcher` - Ordered fan-out of notifications to observers
//! - Ensemble providers (fixed, mutable)

pub mod dispatcher;
pub mod ensemble;
pub mod error;
pub mod handle_holder;
pub mod state;

#[cfg(test)]
mod testing;

pub use dispatcher::EventDispatcher;
pub use ensemble::{FixedEnsembleProvider, MutableEnsembleProvider};
pub use error::ConnectionError;
pub use handle_holder::HandleHolder;
pub use state::ConnectionState;
