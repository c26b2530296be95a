//! Execution planning.
//!
//! An execution plan is the ordered batching of one definition's nodes.
//! Batches run strictly in sequence; nodes within a batch have no
//! dependencies on each other and may run concurrently. Batching is
//! dependency-aware (Kahn levels), so a node never runs before all of
//! its predecessors have finished.

use crate::definition::WorkflowDefinition;
use crate::error::PlanError;
use crate::graph::DefinitionGraph;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// The ordered batching of nodes for one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Node batches in execution order.
    batches: Vec<Vec<NodeId>>,
}

impl ExecutionPlan {
    /// Builds a plan for the given definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is structurally invalid,
    /// empty, or cyclic.
    pub fn build(definition: &WorkflowDefinition) -> Result<Self, PlanError> {
        if definition.nodes.is_empty() {
            return Err(PlanError::EmptyDefinition);
        }

        let graph = DefinitionGraph::from_definition(definition)?;
        let batches = graph.level_batches()?;
        Ok(Self { batches })
    }

    /// Returns the batches in execution order.
    #[must_use]
    pub fn batches(&self) -> &[Vec<NodeId>] {
        &self.batches
    }

    /// Returns the number of batches.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Returns the total number of planned nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Returns the zero-based batch index a node was planned into.
    #[must_use]
    pub fn batch_of(&self, node_id: NodeId) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.contains(&node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeInstance;
    use serde_json::Map as JsonMap;

    fn instance(node_type: &str) -> NodeInstance {
        NodeInstance::new(node_type, node_type, JsonMap::new())
    }

    #[test]
    fn plan_orders_chain_into_singleton_batches() {
        let mut wf = WorkflowDefinition::new("Chain");
        let a = wf.add_node(instance("manual_trigger"));
        let b = wf.add_node(instance("conditional"));
        let c = wf.add_node(instance("log_output"));
        wf.add_edge(a, b);
        wf.add_edge(b, c);

        let plan = ExecutionPlan::build(&wf).unwrap();
        assert_eq!(plan.batches(), &[vec![a], vec![b], vec![c]]);
        assert_eq!(plan.batch_of(b), Some(1));
    }

    #[test]
    fn independent_nodes_share_a_batch() {
        let mut wf = WorkflowDefinition::new("Fanout");
        let a = wf.add_node(instance("manual_trigger"));
        let b = wf.add_node(instance("field_transform"));
        let c = wf.add_node(instance("field_transform"));
        wf.add_edge(a, b);
        wf.add_edge(a, c);

        let plan = ExecutionPlan::build(&wf).unwrap();
        assert_eq!(plan.batch_count(), 2);
        assert_eq!(plan.batches()[1].len(), 2);
        assert_eq!(plan.node_count(), 3);
    }

    #[test]
    fn downstream_of_two_branches_waits_for_both() {
        // trigger -> x, trigger -> y, x -> sink, y -> sink
        let mut wf = WorkflowDefinition::new("Join");
        let t = wf.add_node(instance("manual_trigger"));
        let x = wf.add_node(instance("field_transform"));
        let y = wf.add_node(instance("wait"));
        let sink = wf.add_node(instance("log_output"));
        wf.add_edge(t, x);
        wf.add_edge(t, y);
        wf.add_edge(x, sink);
        wf.add_edge(y, sink);

        let plan = ExecutionPlan::build(&wf).unwrap();
        assert!(plan.batch_of(sink) > plan.batch_of(x));
        assert!(plan.batch_of(sink) > plan.batch_of(y));
    }

    #[test]
    fn empty_definition_is_rejected() {
        let wf = WorkflowDefinition::new("Empty");
        assert_eq!(ExecutionPlan::build(&wf), Err(PlanError::EmptyDefinition));
    }
}
