//! Built-in ensemble address providers.

pub mod fixed;
pub mod mutable;

pub use fixed::FixedEnsembleProvider;
pub use mutable::MutableEnsembleProvider;
