//! Batch dispatch.
//!
//! The dispatcher is the seam between a planned batch and whatever
//! runtime executes it. The in-process implementation spawns one tokio
//! task per node; a distributed backend would ship tasks elsewhere and
//! collect outcomes the same way. Outcomes always come back in task
//! order, regardless of completion order.

use crate::error::EngineError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use switchyard_workflow::{NodeExecution, NodeId};

/// The result of one node invocation: the finished record plus the
/// node's output or error.
pub type TaskOutcome = (NodeExecution, Result<JsonValue, EngineError>);

/// One unit of dispatchable work.
pub struct NodeTask {
    pub node_id: NodeId,
    pub future: BoxFuture<'static, TaskOutcome>,
}

/// Executes batches of node tasks.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Runs every task in the batch to completion.
    ///
    /// The outer `Err` means the runtime failed to produce an outcome
    /// at all, e.g. a panicked task.
    async fn run_batch(
        &self,
        tasks: Vec<NodeTask>,
    ) -> Vec<(NodeId, Result<TaskOutcome, EngineError>)>;
}

/// Dispatcher that runs tasks as tokio tasks in the current process.
pub struct InProcessDispatcher;

#[async_trait]
impl TaskDispatcher for InProcessDispatcher {
    async fn run_batch(
        &self,
        tasks: Vec<NodeTask>,
    ) -> Vec<(NodeId, Result<TaskOutcome, EngineError>)> {
        let handles: Vec<(NodeId, tokio::task::JoinHandle<TaskOutcome>)> = tasks
            .into_iter()
            .map(|task| (task.node_id, tokio::spawn(task.future)))
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (node_id, handle) in handles {
            let outcome = handle.await.map_err(|e| EngineError::Dispatch {
                message: e.to_string(),
            });
            outcomes.push((node_id, outcome));
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchyard_core::ExecutionId;

    fn task(node_id: NodeId, output: JsonValue) -> NodeTask {
        let mut record = NodeExecution::new(ExecutionId::new(), node_id, "echo");
        NodeTask {
            node_id,
            future: Box::pin(async move {
                record.complete(output.clone());
                (record, Ok(output))
            }),
        }
    }

    #[tokio::test]
    async fn outcomes_come_back_in_task_order() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let outcomes = InProcessDispatcher
            .run_batch(vec![task(a, json!({"n": 1})), task(b, json!({"n": 2}))])
            .await;

        assert_eq!(outcomes[0].0, a);
        assert_eq!(outcomes[1].0, b);
        let (_, result) = outcomes[1].1.as_ref().unwrap();
        assert_eq!(result.as_ref().unwrap()["n"], json!(2));
    }

    #[tokio::test]
    async fn panicked_task_becomes_a_dispatch_error() {
        let id = NodeId::new();
        let tasks = vec![NodeTask {
            node_id: id,
            future: Box::pin(async { panic!("node blew up") }),
        }];

        let outcomes = InProcessDispatcher.run_batch(tasks).await;
        assert!(matches!(
            outcomes[0].1,
            Err(EngineError::Dispatch { .. })
        ));
    }
}
