//! The write seam between the pipeline and a graph backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::client::{GraphClient, GraphError};
use crate::statement::{Statement, MATCHED_COLUMN};

/// A backend that executes write statements.
///
/// A statement whose [`Statement::requires`] nodes are not all present must
/// fail with [`GraphError::Unmatched`] instead of succeeding with no effect.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn write(&self, statement: &Statement) -> Result<(), GraphError>;
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn write(&self, statement: &Statement) -> Result<(), GraphError> {
        tracing::debug!(kind = ?statement.kind(), "Executing graph write");
        if statement.requires().is_empty() {
            return self.run(statement.to_query()).await;
        }

        let matched = match self.query_one(statement.to_query()).await? {
            Some(row) => row.get::<i64>(MATCHED_COLUMN).unwrap_or(0),
            None => 0,
        };
        if matched == 0 {
            return Err(GraphError::Unmatched(statement.kind()));
        }
        Ok(())
    }
}

/// Execute `statement`, failing with [`GraphError::Timeout`] if the store does
/// not answer within `timeout`.
pub async fn write_within(
    store: &dyn GraphStore,
    statement: &Statement,
    timeout: Duration,
) -> Result<(), GraphError> {
    match tokio::time::timeout(timeout, store.write(statement)).await {
        Ok(result) => result,
        Err(_) => Err(GraphError::Timeout(timeout)),
    }
}
