//! In-memory graph store for dry runs and tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::GraphError;
use crate::statement::{NodeRef, Statement, StatementKind};
use crate::store::GraphStore;

type FailurePredicate = Box<dyn Fn(&Statement) -> bool + Send + Sync>;

/// Records every statement it accepts instead of executing it.
///
/// Statements matching a registered failure predicate are rejected and not
/// recorded, so [`MemoryGraphStore::statements`] holds only committed writes.
/// Nodes created by committed statements are tracked, and a statement that
/// requires a node nobody created fails as [`GraphError::Unmatched`].
#[derive(Default)]
pub struct MemoryGraphStore {
    state: Mutex<MemoryState>,
    fail_when: Vec<FailurePredicate>,
    latency: Option<Duration>,
}

#[derive(Default)]
struct MemoryState {
    committed: Vec<Statement>,
    nodes: HashSet<NodeRef>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any statement for which `predicate` returns true.
    pub fn fail_when(
        mut self,
        predicate: impl Fn(&Statement) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when.push(Box::new(predicate));
        self
    }

    /// Delay every write by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All committed statements, in write order.
    pub fn statements(&self) -> Vec<Statement> {
        self.lock().committed.clone()
    }

    /// Committed statements of one kind, in write order.
    pub fn statements_of(&self, kind: StatementKind) -> Vec<Statement> {
        self.lock()
            .committed
            .iter()
            .filter(|s| s.kind() == kind)
            .cloned()
            .collect()
    }

    /// Whether a statement of `kind` with string parameter `key == value` was
    /// committed.
    pub fn contains(&self, kind: StatementKind, key: &str, value: &str) -> bool {
        self.lock()
            .committed
            .iter()
            .any(|s| s.kind() == kind && s.get_str(key) == Some(value))
    }

    /// Whether a committed statement created the node `label`/`id`.
    pub fn has_node(&self, label: &str, id: &str) -> bool {
        self.lock().nodes.contains(&NodeRef::new(label, id))
    }

    pub fn len(&self) -> usize {
        self.lock().committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().committed.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn write(&self, statement: &Statement) -> Result<(), GraphError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_when.iter().any(|predicate| predicate(statement)) {
            return Err(GraphError::Rejected(format!("{:?}", statement.kind())));
        }

        let mut state = self.lock();
        if !statement.requires().iter().all(|node| state.nodes.contains(node)) {
            return Err(GraphError::Unmatched(statement.kind()));
        }
        state.nodes.extend(statement.creates().iter().cloned());
        state.committed.push(statement.clone());
        Ok(())
    }
}
