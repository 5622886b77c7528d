//! Provider whose address can be swapped at runtime.

use std::sync::{
    RwLock,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use ensemble_client_core::{EnsembleError, EnsembleProvider};

/// In-memory connection string that can change while connected.
///
/// Useful when membership is pushed from elsewhere (a config service,
/// an admin endpoint). The next notification or timed-out
/// `get_session` call after [`MutableEnsembleProvider::set_address`]
/// rebuilds the session against the new address.
#[derive(Debug)]
pub struct MutableEnsembleProvider {
    address: RwLock<String>,
    started: AtomicBool,
}

impl MutableEnsembleProvider {
    /// Create a provider starting at `address`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: RwLock::new(address.into()),
            started: AtomicBool::new(false),
        }
    }

    /// Replace the ensemble address.
    pub fn set_address(&self, address: impl Into<String>) {
        let address = address.into();
        tracing::debug!(%address, "Ensemble address updated");
        *self
            .address
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = address;
    }

    /// Whether `start` has been called and `close` has not.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnsembleProvider for MutableEnsembleProvider {
    async fn start(&self) -> Result<(), EnsembleError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(EnsembleError::Start("already started".to_string()));
        }
        Ok(())
    }

    fn current_address(&self) -> String {
        self.address
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn close(&self) -> Result<(), EnsembleError> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test]
    async fn test_set_address() {
        let provider = MutableEnsembleProvider::new("zk1:2181");
        assert_eq!(provider.current_address(), "zk1:2181");
        provider.set_address("zk2:2181,zk3:2181");
        assert_eq!(provider.current_address(), "zk2:2181,zk3:2181");
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let provider = MutableEnsembleProvider::new("zk1:2181");
        assert_ok!(provider.start().await);
        assert!(provider.is_started());
        assert_err!(provider.start().await);

        assert_ok!(provider.close().await);
        assert!(!provider.is_started());
        assert_ok!(provider.start().await);
    }
}
