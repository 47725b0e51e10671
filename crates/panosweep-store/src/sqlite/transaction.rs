use panosweep_core::error::{PanosweepError, Result};
use sqlx::{Sqlite, SqlitePool, Transaction as SqlxTransaction};
use std::time::Duration;
use tokio::time::timeout;

/// Transaction wrapper with a bounded commit.
///
/// Dropping it without calling `commit` rolls the transaction back.
pub struct Transaction<'a> {
    inner: Option<SqlxTransaction<'a, Sqlite>>,
    timeout_duration: Duration,
}

impl<'a> Transaction<'a> {
    fn new(tx: SqlxTransaction<'a, Sqlite>, timeout_duration: Duration) -> Self {
        Self { inner: Some(tx), timeout_duration }
    }

    /// The underlying transaction, for executing queries
    pub fn inner_mut(&mut self) -> Result<&mut SqlxTransaction<'a, Sqlite>> {
        self.inner
            .as_mut()
            .ok_or_else(|| PanosweepError::Storage("Transaction already completed".to_string()))
    }

    /// Commit the transaction, making all changes permanent
    pub async fn commit(mut self) -> Result<()> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| PanosweepError::Storage("Transaction already completed".to_string()))?;

        match timeout(self.timeout_duration, tx.commit()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                Err(PanosweepError::Storage(format!("Failed to commit transaction: {}", e)))
            }
            Err(_) => Err(PanosweepError::Storage(format!(
                "Transaction commit timeout after {}s",
                self.timeout_duration.as_secs()
            ))),
        }
    }

    /// Rollback the transaction, discarding all changes
    pub async fn rollback(mut self) -> Result<()> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| PanosweepError::Storage("Transaction already completed".to_string()))?;

        match timeout(self.timeout_duration, tx.rollback()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                Err(PanosweepError::Storage(format!("Failed to rollback transaction: {}", e)))
            }
            Err(_) => Err(PanosweepError::Storage(format!(
                "Transaction rollback timeout after {}s",
                self.timeout_duration.as_secs()
            ))),
        }
    }
}

/// Begins transactions on the store's pool with a default commit timeout
pub struct TransactionManager {
    pool: SqlitePool,
    default_timeout: Duration,
}

impl TransactionManager {
    pub fn new(pool: SqlitePool, default_timeout: Duration) -> Self {
        Self { pool, default_timeout }
    }

    /// Begin a new transaction with the default timeout
    pub async fn begin_transaction(&self) -> Result<Transaction<'static>> {
        self.begin_transaction_with_timeout(self.default_timeout).await
    }

    /// Begin a new transaction with a custom timeout
    pub async fn begin_transaction_with_timeout(
        &self,
        timeout_duration: Duration,
    ) -> Result<Transaction<'static>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PanosweepError::Storage(format!("Failed to begin transaction: {}", e)))?;

        Ok(Transaction::new(tx, timeout_duration))
    }
}
