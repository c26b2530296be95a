//! Petgraph-backed view of a workflow definition.
//!
//! The definition stores nodes and edges as flat lists for easy
//! serialization; this module materializes them into a `DiGraph` for
//! structural queries (predecessors, successors, cycle detection) and
//! for execution planning.

use crate::definition::WorkflowDefinition;
use crate::error::{DefinitionError, PlanError};
use crate::node::NodeId;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// A directed graph over the node ids of one workflow definition.
#[derive(Debug, Clone)]
pub struct DefinitionGraph {
    /// The underlying directed graph; node weights are node ids.
    graph: DiGraph<NodeId, ()>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    node_index_map: HashMap<NodeId, NodeIndex>,
}

impl DefinitionGraph {
    /// Builds a graph from a validated definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition fails structural validation.
    pub fn from_definition(definition: &WorkflowDefinition) -> Result<Self, DefinitionError> {
        definition.validate()?;

        let mut graph = DiGraph::new();
        let mut node_index_map = HashMap::new();

        for node in &definition.nodes {
            let index = graph.add_node(node.id);
            node_index_map.insert(node.id, index);
        }

        for edge in &definition.edges {
            // Endpoints are known to exist after validate().
            let source = node_index_map[&edge.source];
            let target = node_index_map[&edge.target];
            graph.add_edge(source, target, ());
        }

        Ok(Self {
            graph,
            node_index_map,
        })
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph contains a directed cycle.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Returns the ids of nodes with no incoming edges.
    pub fn entry_nodes(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .filter_map(|idx| self.graph.node_weight(idx).copied())
            .collect()
    }

    /// Returns the upstream neighbors of a node.
    pub fn predecessors(&self, node_id: NodeId) -> Vec<NodeId> {
        self.neighbors(node_id, Direction::Incoming)
    }

    /// Returns the downstream neighbors of a node.
    pub fn successors(&self, node_id: NodeId) -> Vec<NodeId> {
        self.neighbors(node_id, Direction::Outgoing)
    }

    fn neighbors(&self, node_id: NodeId, direction: Direction) -> Vec<NodeId> {
        let Some(&index) = self.node_index_map.get(&node_id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(index, direction)
            .filter_map(|idx| self.graph.node_weight(idx).copied())
            .collect()
    }

    /// Groups nodes into dependency levels using Kahn's algorithm.
    ///
    /// Level 0 holds all nodes with no predecessors; level N+1 holds
    /// the nodes whose predecessors all sit in levels <= N. Nodes
    /// within a level are mutually independent.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::CycleDetected` if the graph has a cycle.
    pub fn level_batches(&self) -> Result<Vec<Vec<NodeId>>, PlanError> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph.edges_directed(idx, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut current: Vec<NodeIndex> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&idx, _)| idx)
            .collect();
        current.sort_unstable();

        let mut batches = Vec::new();
        let mut visited = 0usize;

        while !current.is_empty() {
            let mut next = Vec::new();
            let mut batch = Vec::with_capacity(current.len());

            for &idx in &current {
                visited += 1;
                if let Some(&node_id) = self.graph.node_weight(idx) {
                    batch.push(node_id);
                }
                for successor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                    if let Some(degree) = in_degree.get_mut(&successor) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(successor);
                        }
                    }
                }
            }

            next.sort_unstable();
            next.dedup();
            batches.push(batch);
            current = next;
        }

        if visited != self.graph.node_count() {
            return Err(PlanError::CycleDetected);
        }

        Ok(batches)
    }
}
