//! Provider for an ensemble whose address never changes.

use async_trait::async_trait;
use ensemble_client_core::{EnsembleError, EnsembleProvider};

/// Fixed connection string.
#[derive(Debug, Clone)]
pub struct FixedEnsembleProvider {
    connection_string: String,
}

impl FixedEnsembleProvider {
    /// Create a provider that always reports `connection_string`.
    #[must_use]
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }
}

#[async_trait]
impl EnsembleProvider for FixedEnsembleProvider {
    async fn start(&self) -> Result<(), EnsembleError> {
        Ok(())
    }

    fn current_address(&self) -> String {
        self.connection_string.clone()
    }

    async fn close(&self) -> Result<(), EnsembleError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    #[tokio::test]
    async fn test_address_never_changes() {
        let provider = FixedEnsembleProvider::new("zk1:2181,zk2:2181");
        assert_ok!(provider.start().await);
        assert_eq!(provider.current_address(), "zk1:2181,zk2:2181");
        assert_ok!(provider.close().await);
        assert_eq!(provider.current_address(), "zk1:2181,zk2:2181");
    }
}
