//! Workflow orchestration.
//!
//! Drives one execution through its plan: batches run strictly in
//! order, every node in a batch sees the same context snapshot taken
//! at batch start, and outputs merge back into the context in batch
//! order with last write winning. The first node failure aborts the
//! run; nodes in later batches are recorded as skipped.

use crate::dispatch::{NodeTask, TaskDispatcher};
use crate::error::OrchestratorError;
use crate::history::ExecutionHistory;
use crate::runner::NodeRunner;
use crate::store::{ExecutionStore, WorkflowStore};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use switchyard_core::{ExecutionId, WorkflowId};
use switchyard_workflow::{
    ExecutionPlan, NodeExecution, WorkflowDefinition, WorkflowExecution,
};
use tracing::{info, warn};

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard ceiling on each node invocation.
    pub node_timeout: Duration,
    /// Optional ceiling on a whole run. `None` means unbounded.
    pub workflow_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            node_timeout: Duration::from_secs(30),
            workflow_timeout: None,
        }
    }
}

/// Executes registered workflows.
pub struct Orchestrator {
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    runner: Arc<NodeRunner>,
    dispatcher: Arc<dyn TaskDispatcher>,
    history: Arc<ExecutionHistory>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        runner: Arc<NodeRunner>,
        dispatcher: Arc<dyn TaskDispatcher>,
        history: Arc<ExecutionHistory>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            workflows,
            executions,
            runner,
            dispatcher,
            history,
            config,
        }
    }

    /// Registers a workflow definition.
    ///
    /// # Errors
    ///
    /// Rejects definitions that cannot be planned (structurally
    /// invalid, empty, or cyclic). Node configs are checked at
    /// execution time.
    pub async fn register(
        &self,
        definition: WorkflowDefinition,
    ) -> Result<WorkflowId, OrchestratorError> {
        ExecutionPlan::build(&definition)?;
        let id = definition.id;
        self.workflows.put(definition).await?;
        Ok(id)
    }

    /// Fetches a registered workflow.
    pub async fn workflow(
        &self,
        id: WorkflowId,
    ) -> Result<WorkflowDefinition, OrchestratorError> {
        self.workflows
            .get(id)
            .await?
            .ok_or(OrchestratorError::WorkflowNotFound { workflow_id: id })
    }

    /// Lists registered workflows.
    pub async fn workflows(&self) -> Result<Vec<WorkflowDefinition>, OrchestratorError> {
        Ok(self.workflows.list().await?)
    }

    /// Removes a workflow. Past executions are kept.
    pub async fn remove_workflow(&self, id: WorkflowId) -> Result<bool, OrchestratorError> {
        Ok(self.workflows.remove(id).await?)
    }

    /// Fetches one execution record.
    pub async fn execution(
        &self,
        id: ExecutionId,
    ) -> Result<WorkflowExecution, OrchestratorError> {
        self.executions
            .get(id)
            .await?
            .ok_or(OrchestratorError::ExecutionNotFound { execution_id: id })
    }

    /// Lists executions of one workflow, oldest first.
    pub async fn executions_for(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<WorkflowExecution>, OrchestratorError> {
        Ok(self.executions.list_for(workflow_id).await?)
    }

    /// Lists the node records of one execution in the order they were
    /// written.
    pub async fn node_executions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<NodeExecution>, OrchestratorError> {
        Ok(self.executions.nodes_for(execution_id).await?)
    }

    /// Cancels an execution. Terminal executions are unaffected.
    pub async fn cancel(
        &self,
        id: ExecutionId,
    ) -> Result<WorkflowExecution, OrchestratorError> {
        let mut execution = self.execution(id).await?;
        execution.cancel();
        self.executions.put(execution.clone()).await?;
        Ok(execution)
    }

    /// Runs a workflow to completion and returns the final execution
    /// record.
    pub async fn execute(
        &self,
        workflow_id: WorkflowId,
        trigger_type: &str,
        payload: JsonValue,
    ) -> Result<WorkflowExecution, OrchestratorError> {
        let definition = self.workflow(workflow_id).await?;
        let plan = ExecutionPlan::build(&definition)?;

        let mut execution = WorkflowExecution::new(workflow_id, trigger_type, payload);
        execution.start();
        self.executions.put(execution.clone()).await?;

        info!(
            execution_id = %execution.id,
            workflow = %definition.metadata.name,
            batches = plan.batch_count(),
            nodes = plan.node_count(),
            "execution started"
        );

        let run = self.run_plan(&definition, &plan, &mut execution);
        match self.config.workflow_timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, run).await.is_err() {
                    warn!(execution_id = %execution.id, "workflow timed out");
                    execution.fail(format!(
                        "workflow timed out after {}ms",
                        limit.as_millis()
                    ));
                }
            }
            None => run.await,
        }

        info!(
            execution_id = %execution.id,
            status = ?execution.status,
            "execution finished"
        );
        self.executions.put(execution.clone()).await?;
        Ok(execution)
    }

    async fn run_plan(
        &self,
        definition: &WorkflowDefinition,
        plan: &ExecutionPlan,
        execution: &mut WorkflowExecution,
    ) {
        for (batch_index, batch) in plan.batches().iter().enumerate() {
            let snapshot = execution.context.as_value();

            let mut tasks = Vec::with_capacity(batch.len());
            for &node_id in batch {
                let Some(instance) = definition.node(node_id) else {
                    // from_definition guarantees planned nodes exist;
                    // a miss here means the stored definition changed
                    // under us.
                    execution.fail(format!("node {node_id} missing from definition"));
                    return;
                };

                let record =
                    NodeExecution::new(execution.id, node_id, instance.node_type.clone());
                let runner = Arc::clone(&self.runner);
                let config = instance.config.clone();
                let input = snapshot.clone();
                let timeout = self.config.node_timeout;
                tasks.push(NodeTask {
                    node_id,
                    future: Box::pin(async move {
                        runner.run(record, &config, input, timeout).await
                    }),
                });
            }

            let outcomes = self.dispatcher.run_batch(tasks).await;

            let mut failure: Option<String> = None;
            for (node_id, outcome) in outcomes {
                let label = definition
                    .node(node_id)
                    .map_or_else(|| node_id.to_string(), |n| n.name.clone());
                match outcome {
                    Ok((record, result)) => {
                        self.persist_node(record).await;
                        match result {
                            Ok(JsonValue::Object(output)) => {
                                execution.context.merge(output);
                            }
                            Ok(_) => {
                                // The runner already rejects non-object
                                // output.
                            }
                            Err(e) => {
                                if failure.is_none() {
                                    failure = Some(format!("node '{label}' failed: {e}"));
                                }
                            }
                        }
                    }
                    Err(e) => {
                        if failure.is_none() {
                            failure = Some(format!("node '{label}' failed: {e}"));
                        }
                    }
                }
            }

            if let Some(message) = failure {
                self.skip_remaining(definition, plan, batch_index + 1, execution.id)
                    .await;
                execution.fail(message);
                return;
            }
        }

        let context = execution.context.clone();
        execution.complete(context);
    }

    /// Records skipped entries for every node in batches that never
    /// ran.
    async fn skip_remaining(
        &self,
        definition: &WorkflowDefinition,
        plan: &ExecutionPlan,
        from_batch: usize,
        execution_id: ExecutionId,
    ) {
        for batch in plan.batches().iter().skip(from_batch) {
            for &node_id in batch {
                let node_type = definition
                    .node(node_id)
                    .map_or("unknown", |n| n.node_type.as_str());
                let mut record = NodeExecution::new(execution_id, node_id, node_type);
                record.skip();
                self.history.push(record.clone());
                self.persist_node(record).await;
            }
        }
    }

    async fn persist_node(&self, record: NodeExecution) {
        if let Err(e) = self.executions.put_node(record).await {
            warn!(error = %e, "node execution record not persisted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::InProcessDispatcher;
    use crate::store::{InMemoryExecutionStore, InMemoryWorkflowStore};
    use serde_json::{json, Map as JsonMap};
    use switchyard_nodes::NodeRegistry;
    use switchyard_workflow::{ExecutionStatus, NodeInstance, NodeRunStatus};

    fn orchestrator(config: OrchestratorConfig) -> (Orchestrator, Arc<ExecutionHistory>) {
        let history = Arc::new(ExecutionHistory::new());
        let runner = Arc::new(NodeRunner::new(
            Arc::new(NodeRegistry::with_builtins()),
            history.clone(),
        ));
        let orchestrator = Orchestrator::new(
            Arc::new(InMemoryWorkflowStore::new()),
            Arc::new(InMemoryExecutionStore::new()),
            runner,
            Arc::new(InProcessDispatcher),
            history.clone(),
            config,
        );
        (orchestrator, history)
    }

    fn instance(node_type: &str, name: &str, config: serde_json::Value) -> NodeInstance {
        NodeInstance::new(
            node_type,
            name,
            config.as_object().cloned().unwrap_or_default(),
        )
    }

    fn order_workflow() -> WorkflowDefinition {
        let mut wf = WorkflowDefinition::new("Order total");
        let trigger = wf.add_node(instance("manual_trigger", "start", json!({})));
        let total = wf.add_node(instance(
            "calculator",
            "total",
            json!({"formula": "price * quantity", "target_field": "total", "precision": 2}),
        ));
        let done = wf.add_node(instance("log_output", "done", json!({})));
        wf.add_edge(trigger, total);
        wf.add_edge(total, done);
        wf
    }

    #[tokio::test]
    async fn linear_workflow_accumulates_context() {
        let (orchestrator, history) = orchestrator(OrchestratorConfig::default());
        let id = orchestrator.register(order_workflow()).await.unwrap();

        let execution = orchestrator
            .execute(id, "manual", json!({"price": "19.99", "quantity": 3}))
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.context.get("total"), Some(&json!(59.97)));
        assert_eq!(execution.context.get("quantity"), Some(&json!(3)));
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn failure_aborts_and_skips_downstream() {
        let (orchestrator, history) = orchestrator(OrchestratorConfig::default());

        let mut wf = WorkflowDefinition::new("Broken");
        let trigger = wf.add_node(instance("manual_trigger", "start", json!({})));
        let bad = wf.add_node(instance(
            "calculator",
            "bad math",
            json!({"formula": "ghost + 1"}),
        ));
        let never = wf.add_node(instance("log_output", "never runs", json!({})));
        wf.add_edge(trigger, bad);
        wf.add_edge(bad, never);

        let id = orchestrator.register(wf).await.unwrap();
        let execution = orchestrator.execute(id, "manual", json!({})).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error.as_deref().is_some_and(|e| e.contains("bad math")));

        let statuses: Vec<NodeRunStatus> =
            history.recent(10, None).iter().map(|r| r.status).collect();
        assert!(statuses.contains(&NodeRunStatus::Skipped));

        // Skipped nodes are persisted alongside the failed one.
        let records = orchestrator.node_executions(execution.id).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().any(|r| r.status == NodeRunStatus::Failed));
        assert!(records.iter().any(|r| r.status == NodeRunStatus::Skipped));
    }

    #[tokio::test]
    async fn node_records_outlive_history_eviction() {
        let history = Arc::new(ExecutionHistory::with_capacity(1));
        let runner = Arc::new(NodeRunner::new(
            Arc::new(NodeRegistry::with_builtins()),
            history.clone(),
        ));
        let orchestrator = Orchestrator::new(
            Arc::new(InMemoryWorkflowStore::new()),
            Arc::new(InMemoryExecutionStore::new()),
            runner,
            Arc::new(InProcessDispatcher),
            history.clone(),
            OrchestratorConfig::default(),
        );

        let id = orchestrator.register(order_workflow()).await.unwrap();
        let execution = orchestrator
            .execute(id, "manual", json!({"price": 2, "quantity": 4}))
            .await
            .unwrap();

        assert_eq!(history.len(), 1);
        let records = orchestrator.node_executions(execution.id).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|r| r.status == NodeRunStatus::Completed));
        assert_eq!(records[1].node_type, "calculator");
        assert!(records[1].output.is_some());
    }

    #[tokio::test]
    async fn batch_peers_share_the_same_snapshot() {
        let (orchestrator, _) = orchestrator(OrchestratorConfig::default());

        // Two calculators in one batch both read `base`; neither sees
        // the other's output.
        let mut wf = WorkflowDefinition::new("Fanout");
        let trigger = wf.add_node(instance("manual_trigger", "start", json!({})));
        let double = wf.add_node(instance(
            "calculator",
            "double",
            json!({"formula": "base * 2", "target_field": "doubled"}),
        ));
        let triple = wf.add_node(instance(
            "calculator",
            "triple",
            json!({"formula": "base * 3", "target_field": "tripled"}),
        ));
        wf.add_edge(trigger, double);
        wf.add_edge(trigger, triple);

        let id = orchestrator.register(wf).await.unwrap();
        let execution = orchestrator
            .execute(id, "manual", json!({"base": 10}))
            .await
            .unwrap();

        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.context.get("doubled"), Some(&json!(20.0)));
        assert_eq!(execution.context.get("tripled"), Some(&json!(30.0)));
    }

    #[tokio::test]
    async fn unknown_workflow_is_an_error() {
        let (orchestrator, _) = orchestrator(OrchestratorConfig::default());
        let result = orchestrator
            .execute(WorkflowId::new(), "manual", json!({}))
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::WorkflowNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn cyclic_workflow_is_rejected_at_registration() {
        let (orchestrator, _) = orchestrator(OrchestratorConfig::default());

        let mut wf = WorkflowDefinition::new("Cycle");
        let a = wf.add_node(instance("echo", "a", json!({})));
        let b = wf.add_node(instance("echo", "b", json!({})));
        wf.add_edge(a, b);
        wf.add_edge(b, a);

        assert!(matches!(
            orchestrator.register(wf).await,
            Err(OrchestratorError::InvalidWorkflow(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn workflow_timeout_fails_the_run() {
        let (orchestrator, _) = orchestrator(OrchestratorConfig {
            node_timeout: Duration::from_secs(7200),
            workflow_timeout: Some(Duration::from_secs(1)),
        });

        let mut wf = WorkflowDefinition::new("Slow");
        let w = wf.add_node(instance("wait", "long wait", json!({"duration_secs": 3600})));
        let _ = w;

        let id = orchestrator.register(wf).await.unwrap();
        let execution = orchestrator.execute(id, "manual", json!({})).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error.as_deref().is_some_and(|e| e.contains("timed out")));
    }

    #[tokio::test]
    async fn execution_records_are_retrievable() {
        let (orchestrator, _) = orchestrator(OrchestratorConfig::default());
        let id = orchestrator.register(order_workflow()).await.unwrap();

        let execution = orchestrator
            .execute(id, "manual", json!({"price": 1, "quantity": 1}))
            .await
            .unwrap();

        let fetched = orchestrator.execution(execution.id).await.unwrap();
        assert_eq!(fetched.status, ExecutionStatus::Completed);
        assert_eq!(orchestrator.executions_for(id).await.unwrap().len(), 1);
    }
}
