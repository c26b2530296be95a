//! Definition and execution stores.
//!
//! Collaborator traits over the persistence the orchestrator needs,
//! with in-memory implementations. A real deployment would back these
//! with a database; the orchestrator does not care.

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use switchyard_core::{ExecutionId, WorkflowId};
use switchyard_workflow::{NodeExecution, WorkflowDefinition, WorkflowExecution};
use tokio::sync::RwLock;

/// Storage for workflow definitions.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn put(&self, definition: WorkflowDefinition) -> Result<(), StoreError>;
    async fn get(&self, id: WorkflowId) -> Result<Option<WorkflowDefinition>, StoreError>;
    async fn list(&self) -> Result<Vec<WorkflowDefinition>, StoreError>;
    async fn remove(&self, id: WorkflowId) -> Result<bool, StoreError>;
}

/// Storage for execution records, workflow-level and node-level.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn put(&self, execution: WorkflowExecution) -> Result<(), StoreError>;
    async fn get(&self, id: ExecutionId) -> Result<Option<WorkflowExecution>, StoreError>;
    async fn list_for(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<WorkflowExecution>, StoreError>;
    async fn put_node(&self, record: NodeExecution) -> Result<(), StoreError>;
    /// Node records of one execution, in the order they were first
    /// written.
    async fn nodes_for(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<NodeExecution>, StoreError>;
}

/// In-memory workflow store.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<WorkflowId, WorkflowDefinition>>,
}

impl InMemoryWorkflowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn put(&self, definition: WorkflowDefinition) -> Result<(), StoreError> {
        self.workflows
            .write()
            .await
            .insert(definition.id, definition);
        Ok(())
    }

    async fn get(&self, id: WorkflowId) -> Result<Option<WorkflowDefinition>, StoreError> {
        Ok(self.workflows.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<WorkflowDefinition>, StoreError> {
        let mut all: Vec<WorkflowDefinition> =
            self.workflows.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(all)
    }

    async fn remove(&self, id: WorkflowId) -> Result<bool, StoreError> {
        Ok(self.workflows.write().await.remove(&id).is_some())
    }
}

/// In-memory execution store.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    executions: RwLock<HashMap<ExecutionId, WorkflowExecution>>,
    node_records: RwLock<HashMap<ExecutionId, Vec<NodeExecution>>>,
}

impl InMemoryExecutionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn put(&self, execution: WorkflowExecution) -> Result<(), StoreError> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution);
        Ok(())
    }

    async fn get(&self, id: ExecutionId) -> Result<Option<WorkflowExecution>, StoreError> {
        Ok(self.executions.read().await.get(&id).cloned())
    }

    async fn list_for(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<WorkflowExecution>, StoreError> {
        let mut matching: Vec<WorkflowExecution> = self
            .executions
            .read()
            .await
            .values()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.created_at);
        Ok(matching)
    }

    async fn put_node(&self, record: NodeExecution) -> Result<(), StoreError> {
        let mut node_records = self.node_records.write().await;
        let records = node_records.entry(record.execution_id).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn nodes_for(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<NodeExecution>, StoreError> {
        Ok(self
            .node_records
            .read()
            .await
            .get(&execution_id)
            .cloned()
            .unwrap_or_default())
    }
}
